//! File step - filesystem actions through the system backend
//!
//! Actions: `mkdir` creates a directory (or a temporary one when no
//! target is given), `read` loads a file, `read/create` loads a file or
//! seeds it with a default, `write` stores content. String content is
//! written verbatim; any other value is written as JSON text.

use crate::controllers::step::runner::{FnStepController, RunOutcome, StepRunner};
use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use crate::core::interpolate::require_string;
use crate::core::model::{kind, FileStepModel};
use crate::core::name::Name;
use crate::system::System;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub type FileStepController = FnStepController<FileRunner>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Mkdir,
    Read,
    ReadOrCreate,
    Write,
}

impl FileAction {
    fn parse(action: &str) -> Result<Self, StepError> {
        match action {
            "mkdir" => Ok(FileAction::Mkdir),
            "read" => Ok(FileAction::Read),
            "read/create" => Ok(FileAction::ReadOrCreate),
            "write" => Ok(FileAction::Write),
            other => Err(StepError::UnknownAction {
                kind: "file",
                action: other.to_string(),
            }),
        }
    }
}

pub struct FilePlan {
    action: FileAction,
    target: Option<PathBuf>,
    content: Option<String>,
    default: Option<String>,
    system: Arc<dyn System>,
}

pub struct FileRunner {
    model: FileStepModel,
}

impl FileRunner {
    pub fn new(model: FileStepModel) -> Self {
        Self { model }
    }
}

impl StepRunner for FileRunner {
    type Compiled = FilePlan;

    fn kind(&self) -> &'static str {
        kind::FILE
    }

    fn name(&self) -> &Name {
        &self.model.name
    }

    fn output_variable(&self) -> Option<&str> {
        self.model.output.as_deref()
    }

    fn compile(&self, context: &PipelineContext) -> Result<Self::Compiled, StepError> {
        let action = FileAction::parse(&require_string(
            context.compile(&self.model.action),
            "file action",
        )?)?;
        let target = match &self.model.target {
            Some(template) => Some(PathBuf::from(require_string(
                context.compile(template),
                "target",
            )?)),
            None => None,
        };
        let content = self
            .model
            .content
            .as_ref()
            .map(|template| render(&context.compile(template)))
            .transpose()?;
        let default = self
            .model
            .default
            .as_ref()
            .map(|template| render(&context.compile(template)))
            .transpose()?;
        Ok(FilePlan {
            action,
            target,
            content,
            default,
            system: Arc::clone(context.system()),
        })
    }

    fn run(&self, plan: Self::Compiled) -> RunOutcome {
        RunOutcome::Ready(execute(plan))
    }
}

/// Strings are used verbatim, anything else becomes JSON text
fn render(value: &Value) -> Result<String, StepError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        other => serde_json::to_string(other).map_err(|source| StepError::Json {
            action: "stringify",
            source,
        }),
    }
}

fn execute(plan: FilePlan) -> Result<Value, StepError> {
    let required_target = |what: &str| {
        plan.target.clone().ok_or_else(|| StepError::Missing {
            what: what.to_string(),
        })
    };
    match plan.action {
        FileAction::Mkdir => {
            let path = match plan.target {
                Some(path) => {
                    plan.system.create_directory(&path)?;
                    path
                }
                None => plan.system.create_temporary_directory()?,
            };
            Ok(Value::String(path.to_string_lossy().into_owned()))
        }
        FileAction::Read => {
            let path = required_target("target for file read")?;
            if !plan.system.path_exists(&path) {
                return Err(StepError::FileNotFound(path.to_string_lossy().into_owned()));
            }
            Ok(Value::String(plan.system.read_file(&path)?))
        }
        FileAction::ReadOrCreate => {
            let path = required_target("target for file read/create")?;
            if plan.system.path_exists(&path) {
                Ok(Value::String(plan.system.read_file(&path)?))
            } else {
                let content = plan.default.unwrap_or_default();
                plan.system.write_file(&path, &content)?;
                Ok(Value::String(content))
            }
        }
        FileAction::Write => {
            let path = required_target("target for file write")?;
            let content = plan.content.ok_or_else(|| StepError::Missing {
                what: "content for file write".to_string(),
            })?;
            plan.system.write_file(&path, &content)?;
            Ok(Value::String(path.to_string_lossy().into_owned()))
        }
    }
}
