//! Concat step - polymorphic concatenation
//!
//! The behavior follows the compiled input's shape: an array of arrays
//! flattens, an array of objects shallow-merges (later keys win), any
//! other array joins its elements' string forms, and a non-array wraps
//! into a single-element array.

use crate::controllers::step::runner::{FnStepController, RunOutcome, StepRunner};
use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use crate::core::interpolate::value_to_string;
use crate::core::model::{kind, ConcatStepModel};
use crate::core::name::Name;
use serde_json::{Map, Value};

pub type ConcatStepController = FnStepController<ConcatRunner>;

pub struct ConcatRunner {
    model: ConcatStepModel,
}

impl ConcatRunner {
    pub fn new(model: ConcatStepModel) -> Self {
        Self { model }
    }
}

impl StepRunner for ConcatRunner {
    type Compiled = Value;

    fn kind(&self) -> &'static str {
        kind::CONCAT
    }

    fn name(&self) -> &Name {
        &self.model.name
    }

    fn output_variable(&self) -> Option<&str> {
        self.model.output.as_deref()
    }

    fn compile(&self, context: &PipelineContext) -> Result<Self::Compiled, StepError> {
        Ok(context.compile(&self.model.input))
    }

    fn run(&self, input: Self::Compiled) -> RunOutcome {
        RunOutcome::Ready(Ok(concat(input)))
    }
}

fn concat(input: Value) -> Value {
    let items = match input {
        Value::Array(items) => items,
        other => return Value::Array(vec![other]),
    };
    if !items.is_empty() && items.iter().all(Value::is_array) {
        let mut flat = Vec::new();
        for item in items {
            if let Value::Array(inner) = item {
                flat.extend(inner);
            }
        }
        return Value::Array(flat);
    }
    if !items.is_empty() && items.iter().all(Value::is_object) {
        let mut merged = Map::new();
        for item in items {
            if let Value::Object(map) = item {
                merged.extend(map);
            }
        }
        return Value::Object(merged);
    }
    Value::String(
        items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(""),
    )
}
