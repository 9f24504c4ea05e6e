//! Step type registry
//!
//! Each step type contributes a [`ControllerFactory`] that recognizes
//! its raw model shape, parses it into a typed [`StepModel`] and builds
//! the matching controller. The registry tries factories in
//! registration order; the first one whose discriminant key matches
//! wins, so types with overlapping fields (git models may carry `set`)
//! must be registered before the more generic ones.

use crate::controllers::step::{
    AssertRunner, AssertStepController, ConcatRunner, ConcatStepController, CsvRunner,
    CsvStepController, FileRunner, FileStepController, GitPlan, GitStepController, JsonRunner,
    JsonStepController, ScriptPlan, ScriptStepController, VariableRunner, VariableStepController,
};
use crate::controllers::Controller;
use crate::core::context::SharedContext;
use crate::core::error::ModelError;
use crate::core::model::{
    self, AssertStepModel, ConcatStepModel, CsvStepModel, FileStepModel, GitStepModel,
    JsonStepModel, ScriptStepModel, StepModel, VariableStepModel,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Builds one step type's models and controllers
pub trait ControllerFactory: Send + Sync {
    /// Dotted type identifier, see [`crate::core::model::kind`]
    fn kind(&self) -> &'static str;

    /// Whether the raw data looks like this step type
    fn is_controller_model(&self, value: &Value) -> bool;

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError>;

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError>;
}

/// Ordered collection of step factories
pub struct PipelineRegistry {
    factories: Vec<Arc<dyn ControllerFactory>>,
}

impl PipelineRegistry {
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Registry with every built-in step type
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ScriptFactory));
        registry.register(Arc::new(GitFactory));
        registry.register(Arc::new(JsonFactory));
        registry.register(Arc::new(CsvFactory));
        registry.register(Arc::new(ConcatFactory));
        registry.register(Arc::new(AssertFactory));
        registry.register(Arc::new(VariableFactory));
        registry.register(Arc::new(FileFactory));
        registry
    }

    /// Add a factory; registering the same kind twice is a no-op
    pub fn register(&mut self, factory: Arc<dyn ControllerFactory>) {
        if self.is_registered(factory.kind()) {
            debug!(kind = factory.kind(), "factory already registered");
            return;
        }
        self.factories.push(factory);
    }

    pub fn is_registered(&self, kind: &str) -> bool {
        self.factories.iter().any(|factory| factory.kind() == kind)
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.iter().map(|factory| factory.kind()).collect()
    }

    /// Parse one raw step, dispatching on the first matching factory
    pub fn parse_step(&self, value: &Value) -> Result<StepModel, ModelError> {
        for factory in &self.factories {
            if factory.is_controller_model(value) {
                return factory.parse_controller_model(value);
            }
        }
        let description = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string());
        Err(ModelError::UnknownStepType(description))
    }

    /// Build the controller for a parsed step model
    pub fn create_step(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let factory = self
            .factories
            .iter()
            .find(|factory| factory.kind() == model.kind())
            .ok_or_else(|| ModelError::UnknownStepType(model.kind().to_string()))?;
        factory.create_controller(context, model)
    }
}

impl Default for PipelineRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn raw_field(map: &Map<String, Value>, field: &str) -> Option<Value> {
    map.get(field).filter(|value| !value.is_null()).cloned()
}

fn mismatch(expected: &'static str, model: &StepModel) -> ModelError {
    ModelError::FactoryMismatch {
        expected,
        found: model.kind(),
    }
}

struct ScriptFactory;

impl ControllerFactory for ScriptFactory {
    fn kind(&self) -> &'static str {
        model::kind::SCRIPT
    }

    fn is_controller_model(&self, value: &Value) -> bool {
        value.get("command").is_some()
    }

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError> {
        let map = model::as_object(value, "script step")?;
        Ok(StepModel::Script(ScriptStepModel {
            name: model::parse_name(map, "script step")?,
            command: map.get("command").cloned().ok_or(ModelError::MissingField {
                kind: "script step",
                field: "command",
            })?,
            args: raw_field(map, "args"),
            env: raw_field(map, "env"),
            cwd: raw_field(map, "cwd"),
            output: model::optional_string_field(map, "script step", "output")?,
        }))
    }

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let StepModel::Script(model) = model else {
            return Err(mismatch(self.kind(), model));
        };
        Ok(Arc::new(ScriptStepController::new(
            ScriptPlan::new(model.clone()),
            Arc::clone(context),
        )))
    }
}

struct GitFactory;

impl ControllerFactory for GitFactory {
    fn kind(&self) -> &'static str {
        model::kind::GIT
    }

    fn is_controller_model(&self, value: &Value) -> bool {
        value.get("git").is_some()
    }

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError> {
        let map = model::as_object(value, "git step")?;
        Ok(StepModel::Git(GitStepModel {
            name: model::parse_name(map, "git step")?,
            action: map.get("git").cloned().ok_or(ModelError::MissingField {
                kind: "git step",
                field: "git",
            })?,
            url: raw_field(map, "url"),
            target: raw_field(map, "target"),
            message: raw_field(map, "message"),
            set: raw_field(map, "set"),
            value: raw_field(map, "value"),
            cwd: raw_field(map, "cwd"),
            output: model::optional_string_field(map, "git step", "output")?,
        }))
    }

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let StepModel::Git(model) = model else {
            return Err(mismatch(self.kind(), model));
        };
        Ok(Arc::new(GitStepController::new(
            GitPlan::new(model.clone()),
            Arc::clone(context),
        )))
    }
}

struct JsonFactory;

impl ControllerFactory for JsonFactory {
    fn kind(&self) -> &'static str {
        model::kind::JSON
    }

    fn is_controller_model(&self, value: &Value) -> bool {
        value.get("json").is_some()
    }

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError> {
        let map = model::as_object(value, "json step")?;
        Ok(StepModel::Json(JsonStepModel {
            name: model::parse_name(map, "json step")?,
            input: map.get("json").cloned().ok_or(ModelError::MissingField {
                kind: "json step",
                field: "json",
            })?,
            action: raw_field(map, "action"),
            output: model::optional_string_field(map, "json step", "output")?,
        }))
    }

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let StepModel::Json(model) = model else {
            return Err(mismatch(self.kind(), model));
        };
        Ok(Arc::new(JsonStepController::new(
            JsonRunner::new(model.clone()),
            Arc::clone(context),
        )))
    }
}

struct CsvFactory;

impl ControllerFactory for CsvFactory {
    fn kind(&self) -> &'static str {
        model::kind::CSV
    }

    fn is_controller_model(&self, value: &Value) -> bool {
        value.get("csv").is_some()
    }

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError> {
        let map = model::as_object(value, "csv step")?;
        Ok(StepModel::Csv(CsvStepModel {
            name: model::parse_name(map, "csv step")?,
            input: map.get("csv").cloned().ok_or(ModelError::MissingField {
                kind: "csv step",
                field: "csv",
            })?,
            action: raw_field(map, "action"),
            output: model::optional_string_field(map, "csv step", "output")?,
        }))
    }

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let StepModel::Csv(model) = model else {
            return Err(mismatch(self.kind(), model));
        };
        Ok(Arc::new(CsvStepController::new(
            CsvRunner::new(model.clone()),
            Arc::clone(context),
        )))
    }
}

struct ConcatFactory;

impl ControllerFactory for ConcatFactory {
    fn kind(&self) -> &'static str {
        model::kind::CONCAT
    }

    fn is_controller_model(&self, value: &Value) -> bool {
        value.get("concat").is_some()
    }

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError> {
        let map = model::as_object(value, "concat step")?;
        Ok(StepModel::Concat(ConcatStepModel {
            name: model::parse_name(map, "concat step")?,
            input: map.get("concat").cloned().ok_or(ModelError::MissingField {
                kind: "concat step",
                field: "concat",
            })?,
            output: model::optional_string_field(map, "concat step", "output")?,
        }))
    }

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let StepModel::Concat(model) = model else {
            return Err(mismatch(self.kind(), model));
        };
        Ok(Arc::new(ConcatStepController::new(
            ConcatRunner::new(model.clone()),
            Arc::clone(context),
        )))
    }
}

struct AssertFactory;

impl ControllerFactory for AssertFactory {
    fn kind(&self) -> &'static str {
        model::kind::ASSERT
    }

    fn is_controller_model(&self, value: &Value) -> bool {
        value.get("assert").is_some()
    }

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError> {
        let map = model::as_object(value, "assert step")?;
        Ok(StepModel::Assert(AssertStepModel {
            name: model::parse_name(map, "assert step")?,
            assert: map.get("assert").cloned().ok_or(ModelError::MissingField {
                kind: "assert step",
                field: "assert",
            })?,
            // `equals` may be omitted; the comparison target is then null.
            equals: map.get("equals").cloned().unwrap_or(Value::Null),
            output: model::optional_string_field(map, "assert step", "output")?,
        }))
    }

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let StepModel::Assert(model) = model else {
            return Err(mismatch(self.kind(), model));
        };
        Ok(Arc::new(AssertStepController::new(
            AssertRunner::new(model.clone()),
            Arc::clone(context),
        )))
    }
}

struct VariableFactory;

impl ControllerFactory for VariableFactory {
    fn kind(&self) -> &'static str {
        model::kind::VARIABLE
    }

    fn is_controller_model(&self, value: &Value) -> bool {
        value.get("set").is_some()
    }

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError> {
        let map = model::as_object(value, "variable step")?;
        Ok(StepModel::Variable(VariableStepModel {
            name: model::parse_name(map, "variable step")?,
            set: map.get("set").cloned().ok_or(ModelError::MissingField {
                kind: "variable step",
                field: "set",
            })?,
            variable: model::optional_string_field(map, "variable step", "variable")?,
        }))
    }

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let StepModel::Variable(model) = model else {
            return Err(mismatch(self.kind(), model));
        };
        Ok(Arc::new(VariableStepController::new(
            VariableRunner::new(model.clone()),
            Arc::clone(context),
        )))
    }
}

struct FileFactory;

impl ControllerFactory for FileFactory {
    fn kind(&self) -> &'static str {
        model::kind::FILE
    }

    fn is_controller_model(&self, value: &Value) -> bool {
        value.get("file").is_some()
    }

    fn parse_controller_model(&self, value: &Value) -> Result<StepModel, ModelError> {
        let map = model::as_object(value, "file step")?;
        Ok(StepModel::File(FileStepModel {
            name: model::parse_name(map, "file step")?,
            action: map.get("file").cloned().ok_or(ModelError::MissingField {
                kind: "file step",
                field: "file",
            })?,
            target: raw_field(map, "target"),
            content: raw_field(map, "content"),
            default: raw_field(map, "default"),
            output: model::optional_string_field(map, "file step", "output")?,
        }))
    }

    fn create_controller(
        &self,
        context: &SharedContext,
        model: &StepModel,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let StepModel::File(model) = model else {
            return Err(mismatch(self.kind(), model));
        };
        Ok(Arc::new(FileStepController::new(
            FileRunner::new(model.clone()),
            Arc::clone(context),
        )))
    }
}
