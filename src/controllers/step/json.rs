//! Json step - stringify or parse JSON

use crate::controllers::step::runner::{FnStepController, RunOutcome, StepRunner};
use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use crate::core::interpolate::require_string;
use crate::core::model::{kind, JsonStepModel};
use crate::core::name::Name;
use serde_json::Value;

pub type JsonStepController = FnStepController<JsonRunner>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonAction {
    #[default]
    Stringify,
    Parse,
}

impl JsonAction {
    fn parse(action: &str) -> Result<Self, StepError> {
        match action {
            "stringify" => Ok(JsonAction::Stringify),
            "parse" => Ok(JsonAction::Parse),
            other => Err(StepError::UnknownAction {
                kind: "json",
                action: other.to_string(),
            }),
        }
    }
}

pub struct JsonRunner {
    model: JsonStepModel,
}

impl JsonRunner {
    pub fn new(model: JsonStepModel) -> Self {
        Self { model }
    }
}

impl StepRunner for JsonRunner {
    type Compiled = (JsonAction, Value);

    fn kind(&self) -> &'static str {
        kind::JSON
    }

    fn name(&self) -> &Name {
        &self.model.name
    }

    fn output_variable(&self) -> Option<&str> {
        self.model.output.as_deref()
    }

    fn compile(&self, context: &PipelineContext) -> Result<Self::Compiled, StepError> {
        let action = match &self.model.action {
            Some(template) => {
                JsonAction::parse(&require_string(context.compile(template), "json action")?)?
            }
            None => JsonAction::default(),
        };
        Ok((action, context.compile(&self.model.input)))
    }

    fn run(&self, (action, input): Self::Compiled) -> RunOutcome {
        let result = match action {
            JsonAction::Stringify => serde_json::to_string_pretty(&input)
                .map(Value::String)
                .map_err(|source| StepError::Json {
                    action: "stringify",
                    source,
                }),
            JsonAction::Parse => require_string(input, "json input").and_then(|text| {
                serde_json::from_str(&text).map_err(|source| StepError::Json {
                    action: "parse",
                    source,
                })
            }),
        };
        RunOutcome::Ready(result)
    }
}
