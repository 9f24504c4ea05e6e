//! Script step - run an arbitrary command

use crate::controllers::step::process::{CommandPlanner, ProcessSpec, ProcessStepController};
use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use crate::core::interpolate::{require_string, require_string_map, require_string_vec};
use crate::core::model::{kind, ScriptStepModel};
use crate::core::name::Name;
use std::path::PathBuf;

pub type ScriptStepController = ProcessStepController<ScriptPlan>;

/// Plans a process invocation from `command`, `args`, `env` and `cwd`
/// templates.
pub struct ScriptPlan {
    model: ScriptStepModel,
}

impl ScriptPlan {
    pub fn new(model: ScriptStepModel) -> Self {
        Self { model }
    }
}

impl CommandPlanner for ScriptPlan {
    fn kind(&self) -> &'static str {
        kind::SCRIPT
    }

    fn name(&self) -> &Name {
        &self.model.name
    }

    fn output_variable(&self) -> Option<&str> {
        self.model.output.as_deref()
    }

    fn compile(&self, context: &PipelineContext) -> Result<ProcessSpec, StepError> {
        let command = require_string(context.compile(&self.model.command), "command")?;
        let args = match &self.model.args {
            Some(template) => require_string_vec(context.compile(template), "args")?,
            None => Vec::new(),
        };
        let env = match &self.model.env {
            Some(template) => require_string_map(context.compile(template), "env")?,
            None => Default::default(),
        };
        let cwd = match &self.model.cwd {
            Some(template) => Some(PathBuf::from(require_string(
                context.compile(template),
                "cwd",
            )?)),
            None => None,
        };
        Ok(ProcessSpec {
            command,
            args,
            env,
            cwd,
        })
    }
}
