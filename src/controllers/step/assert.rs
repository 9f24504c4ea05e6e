//! Assert step - fail the job unless two values are deeply equal

use crate::controllers::step::runner::{FnStepController, RunOutcome, StepRunner};
use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use crate::core::model::{kind, AssertStepModel};
use crate::core::name::Name;
use serde_json::Value;

pub type AssertStepController = FnStepController<AssertRunner>;

pub struct AssertRunner {
    model: AssertStepModel,
}

impl AssertRunner {
    pub fn new(model: AssertStepModel) -> Self {
        Self { model }
    }
}

impl StepRunner for AssertRunner {
    type Compiled = (Value, Value);

    fn kind(&self) -> &'static str {
        kind::ASSERT
    }

    fn name(&self) -> &Name {
        &self.model.name
    }

    fn output_variable(&self) -> Option<&str> {
        self.model.output.as_deref()
    }

    fn compile(&self, context: &PipelineContext) -> Result<Self::Compiled, StepError> {
        Ok((
            context.compile(&self.model.assert),
            context.compile(&self.model.equals),
        ))
    }

    fn run(&self, (actual, expected): Self::Compiled) -> RunOutcome {
        let result = if actual == expected {
            Ok(actual)
        } else {
            Err(StepError::AssertMismatch {
                actual: actual.to_string(),
                expected: expected.to_string(),
            })
        };
        RunOutcome::Ready(result)
    }
}
