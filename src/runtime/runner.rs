//! Pipeline runner - from raw data to a ready controller tree

use crate::controllers::{
    Controller, JobController, PipelineController, StageController, StopPolicy,
};
use crate::core::context::{PipelineContext, SharedContext};
use crate::core::error::ModelError;
use crate::core::model::{JobModel, PipelineModel, StageModel};
use crate::runtime::registry::PipelineRegistry;
use crate::system::System;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerOptions {
    pub stop_policy: StopPolicy,
}

/// Parses pipelines and assembles their controller trees
pub struct PipelineRunner {
    registry: PipelineRegistry,
    options: RunnerOptions,
}

impl PipelineRunner {
    pub fn new(registry: PipelineRegistry) -> Self {
        Self::with_options(registry, RunnerOptions::default())
    }

    pub fn with_options(registry: PipelineRegistry, options: RunnerOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &PipelineRegistry {
        &self.registry
    }

    pub fn parse_pipeline(&self, value: &Value) -> Result<PipelineModel, ModelError> {
        PipelineModel::parse(value, &self.registry)
    }

    /// Fresh context for one run, with parameter defaults seeded as
    /// variables
    pub fn create_context(&self, system: Arc<dyn System>, model: &PipelineModel) -> SharedContext {
        let mut context = PipelineContext::new(system);
        context.set_parameters(model.parameters.clone());
        let context = Arc::new(context);
        for parameter in context.parameters().to_vec() {
            if let Some(default) = parameter.default {
                context.set_variable(parameter.name.as_str(), default);
            }
        }
        context
    }

    /// Build the full controller tree for a parsed pipeline
    pub fn compile(
        &self,
        model: &PipelineModel,
        context: &SharedContext,
    ) -> Result<PipelineController, ModelError> {
        let stages = model
            .stages
            .iter()
            .map(|stage| self.compile_stage(stage, context))
            .collect::<Result<Vec<_>, _>>()?;
        let pipeline = PipelineController::new(model.name.clone(), stages)?;
        info!(pipeline = %model.name, stages = model.stages.len(), "pipeline compiled");
        Ok(pipeline)
    }

    fn compile_stage(
        &self,
        model: &StageModel,
        context: &SharedContext,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let jobs = model
            .jobs
            .iter()
            .map(|job| self.compile_job(job, context))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arc::new(StageController::new(
            model.name.clone(),
            jobs,
            self.options.stop_policy,
        )?))
    }

    fn compile_job(
        &self,
        model: &JobModel,
        context: &SharedContext,
    ) -> Result<Arc<dyn Controller>, ModelError> {
        let steps = model
            .steps
            .iter()
            .map(|step| self.registry.create_step(context, step))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arc::new(JobController::new(model.name.clone(), steps)?))
    }

    /// Convenience: parse, create a context and compile in one call
    pub fn load(
        &self,
        value: &Value,
        system: Arc<dyn System>,
    ) -> Result<(PipelineController, SharedContext), ModelError> {
        let model = self.parse_pipeline(value)?;
        let context = self.create_context(system, &model);
        let pipeline = self.compile(&model, &context)?;
        Ok((pipeline, context))
    }
}

impl Default for PipelineRunner {
    fn default() -> Self {
        Self::new(PipelineRegistry::with_defaults())
    }
}
