//! Git step - plan a git subcommand as a process invocation
//!
//! The action is itself a template, so a pipeline can select it at run
//! time. Planned invocations never prompt: terminal prompts are
//! disabled and an SSH agent socket is forwarded when present.

use crate::controllers::step::process::{CommandPlanner, ProcessSpec, ProcessStepController};
use crate::core::context::PipelineContext;
use crate::core::error::StepError;
use crate::core::interpolate::require_string;
use crate::core::model::{kind, GitStepModel};
use crate::core::name::Name;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

pub type GitStepController = ProcessStepController<GitPlan>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GitAction {
    Clone,
    Add,
    Commit,
    Push,
    Pull,
    Config,
}

impl GitAction {
    fn parse(action: &str) -> Result<Self, StepError> {
        match action {
            "clone" => Ok(GitAction::Clone),
            "add" => Ok(GitAction::Add),
            "commit" => Ok(GitAction::Commit),
            "push" => Ok(GitAction::Push),
            "pull" => Ok(GitAction::Pull),
            "config" => Ok(GitAction::Config),
            other => Err(StepError::UnknownAction {
                kind: "git",
                action: other.to_string(),
            }),
        }
    }
}

pub struct GitPlan {
    model: GitStepModel,
}

impl GitPlan {
    pub fn new(model: GitStepModel) -> Self {
        Self { model }
    }

    fn required(
        &self,
        context: &PipelineContext,
        field: &Option<Value>,
        what: &str,
    ) -> Result<String, StepError> {
        let template = field.as_ref().ok_or_else(|| StepError::Missing {
            what: what.to_string(),
        })?;
        require_string(context.compile(template), what)
    }
}

impl CommandPlanner for GitPlan {
    fn kind(&self) -> &'static str {
        kind::GIT
    }

    fn name(&self) -> &Name {
        &self.model.name
    }

    fn output_variable(&self) -> Option<&str> {
        self.model.output.as_deref()
    }

    fn compile(&self, context: &PipelineContext) -> Result<ProcessSpec, StepError> {
        let action = require_string(context.compile(&self.model.action), "git action")?;
        let action = GitAction::parse(&action)?;

        let args = match action {
            GitAction::Clone => {
                let url = self.required(context, &self.model.url, "url for git clone")?;
                let mut args = vec!["clone".to_string(), url];
                if let Some(target) = &self.model.target {
                    args.push(require_string(context.compile(target), "target")?);
                }
                args
            }
            GitAction::Add => {
                let target = match &self.model.target {
                    Some(template) => require_string(context.compile(template), "target")?,
                    None => ".".to_string(),
                };
                vec!["add".to_string(), target]
            }
            GitAction::Commit => {
                let message =
                    self.required(context, &self.model.message, "message for git commit")?;
                vec!["commit".to_string(), "-m".to_string(), message]
            }
            GitAction::Push => vec!["push".to_string()],
            GitAction::Pull => vec!["pull".to_string()],
            GitAction::Config => {
                let key = self.required(context, &self.model.set, "key for git config")?;
                let value = self.required(context, &self.model.value, "value for git config")?;
                vec!["config".to_string(), key, value]
            }
        };

        let mut env = HashMap::new();
        env.insert("GIT_TERMINAL_PROMPT".to_string(), "0".to_string());
        env.insert("GIT_ASKPASS".to_string(), "/bin/echo".to_string());
        if let Ok(socket) = std::env::var("SSH_AUTH_SOCK") {
            env.insert("SSH_AUTH_SOCK".to_string(), socket);
        }

        let cwd = match &self.model.cwd {
            Some(template) => Some(PathBuf::from(require_string(
                context.compile(template),
                "cwd",
            )?)),
            None => None,
        };

        Ok(ProcessSpec {
            command: "git".to_string(),
            args,
            env,
            cwd,
        })
    }
}
