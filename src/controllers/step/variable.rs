//! Variable step - bind a compiled value to a context variable

use crate::controllers::step::runner::{FnStepController, RunOutcome, StepRunner};
use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use crate::core::model::{kind, VariableStepModel};
use crate::core::name::Name;
use serde_json::Value;

pub type VariableStepController = FnStepController<VariableRunner>;

pub struct VariableRunner {
    model: VariableStepModel,
}

impl VariableRunner {
    pub fn new(model: VariableStepModel) -> Self {
        Self { model }
    }
}

impl StepRunner for VariableRunner {
    type Compiled = Value;

    fn kind(&self) -> &'static str {
        kind::VARIABLE
    }

    fn name(&self) -> &Name {
        &self.model.name
    }

    fn output_variable(&self) -> Option<&str> {
        self.model.variable.as_deref()
    }

    fn compile(&self, context: &PipelineContext) -> Result<Self::Compiled, StepError> {
        Ok(context.compile(&self.model.set))
    }

    fn run(&self, value: Self::Compiled) -> RunOutcome {
        RunOutcome::Ready(Ok(value))
    }
}
