//! Declarative model tree
//!
//! The model is the parsed, validated form of the untyped data a
//! pipeline file deserializes into. Step models keep their inputs as raw
//! template values; templates are compiled against the context when the
//! owning controller starts, never at parse time.

use crate::core::error::ModelError;
use crate::core::name::Name;
use crate::runtime::PipelineRegistry;
use serde_json::{Map, Value};

/// Dotted type identifiers used in state DTOs
pub mod kind {
    pub const PIPELINE: &str = "stagehand.pipeline";
    pub const STAGE: &str = "stagehand.stage";
    pub const JOB: &str = "stagehand.job";
    pub const SCRIPT: &str = "stagehand.step.script";
    pub const GIT: &str = "stagehand.step.git";
    pub const JSON: &str = "stagehand.step.json";
    pub const CSV: &str = "stagehand.step.csv";
    pub const CONCAT: &str = "stagehand.step.concat";
    pub const ASSERT: &str = "stagehand.step.assert";
    pub const VARIABLE: &str = "stagehand.step.variable";
    pub const FILE: &str = "stagehand.step.file";
}

/// A named parameter declaration, read-only for the run
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterModel {
    pub name: Name,
    pub kind: Option<String>,
    pub default: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct PipelineModel {
    pub name: Name,
    pub stages: Vec<StageModel>,
    pub parameters: Vec<ParameterModel>,
}

#[derive(Debug, Clone)]
pub struct StageModel {
    pub name: Name,
    pub jobs: Vec<JobModel>,
}

#[derive(Debug, Clone)]
pub struct JobModel {
    pub name: Name,
    pub steps: Vec<StepModel>,
}

/// One step, discriminated by which recognized key-set the raw data
/// matched
#[derive(Debug, Clone)]
pub enum StepModel {
    Script(ScriptStepModel),
    Git(GitStepModel),
    Json(JsonStepModel),
    Csv(CsvStepModel),
    Concat(ConcatStepModel),
    Assert(AssertStepModel),
    Variable(VariableStepModel),
    File(FileStepModel),
}

impl StepModel {
    pub fn name(&self) -> &Name {
        match self {
            StepModel::Script(m) => &m.name,
            StepModel::Git(m) => &m.name,
            StepModel::Json(m) => &m.name,
            StepModel::Csv(m) => &m.name,
            StepModel::Concat(m) => &m.name,
            StepModel::Assert(m) => &m.name,
            StepModel::Variable(m) => &m.name,
            StepModel::File(m) => &m.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StepModel::Script(_) => kind::SCRIPT,
            StepModel::Git(_) => kind::GIT,
            StepModel::Json(_) => kind::JSON,
            StepModel::Csv(_) => kind::CSV,
            StepModel::Concat(_) => kind::CONCAT,
            StepModel::Assert(_) => kind::ASSERT,
            StepModel::Variable(_) => kind::VARIABLE,
            StepModel::File(_) => kind::FILE,
        }
    }
}

/// `{ name, command, args?, env?, cwd?, output? }`
#[derive(Debug, Clone)]
pub struct ScriptStepModel {
    pub name: Name,
    pub command: Value,
    pub args: Option<Value>,
    pub env: Option<Value>,
    pub cwd: Option<Value>,
    pub output: Option<String>,
}

/// `{ name, git, url?, target?, message?, cwd?, set?, value?, output? }`
#[derive(Debug, Clone)]
pub struct GitStepModel {
    pub name: Name,
    pub action: Value,
    pub url: Option<Value>,
    pub target: Option<Value>,
    pub message: Option<Value>,
    pub set: Option<Value>,
    pub value: Option<Value>,
    pub cwd: Option<Value>,
    pub output: Option<String>,
}

/// `{ name, json, action?, output? }`
#[derive(Debug, Clone)]
pub struct JsonStepModel {
    pub name: Name,
    pub input: Value,
    pub action: Option<Value>,
    pub output: Option<String>,
}

/// `{ name, csv, action?, output? }`
#[derive(Debug, Clone)]
pub struct CsvStepModel {
    pub name: Name,
    pub input: Value,
    pub action: Option<Value>,
    pub output: Option<String>,
}

/// `{ name, concat, output? }`
#[derive(Debug, Clone)]
pub struct ConcatStepModel {
    pub name: Name,
    pub input: Value,
    pub output: Option<String>,
}

/// `{ name, assert, equals?, output? }`
#[derive(Debug, Clone)]
pub struct AssertStepModel {
    pub name: Name,
    pub assert: Value,
    pub equals: Value,
    pub output: Option<String>,
}

/// `{ name, set, variable? }`
#[derive(Debug, Clone)]
pub struct VariableStepModel {
    pub name: Name,
    pub set: Value,
    pub variable: Option<String>,
}

/// `{ name, file, target?, content?, default?, output? }`
#[derive(Debug, Clone)]
pub struct FileStepModel {
    pub name: Name,
    pub action: Value,
    pub target: Option<Value>,
    pub content: Option<Value>,
    pub default: Option<Value>,
    pub output: Option<String>,
}

impl PipelineModel {
    /// Parse and validate a whole pipeline from untyped data
    pub fn parse(value: &Value, registry: &PipelineRegistry) -> Result<Self, ModelError> {
        let map = as_object(value, "pipeline")?;
        let name = parse_name(map, "pipeline")?;
        let parameters = parse_parameters(map)?;
        let stages = child_array(map, "pipeline", &name, "stages")?
            .iter()
            .map(|stage| StageModel::parse(stage, registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PipelineModel {
            name,
            stages,
            parameters,
        })
    }
}

impl StageModel {
    pub fn parse(value: &Value, registry: &PipelineRegistry) -> Result<Self, ModelError> {
        let map = as_object(value, "stage")?;
        let name = parse_name(map, "stage")?;
        let jobs = child_array(map, "stage", &name, "jobs")?
            .iter()
            .map(|job| JobModel::parse(job, registry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StageModel { name, jobs })
    }
}

impl JobModel {
    pub fn parse(value: &Value, registry: &PipelineRegistry) -> Result<Self, ModelError> {
        let map = as_object(value, "job")?;
        let name = parse_name(map, "job")?;
        let steps = child_array(map, "job", &name, "steps")?
            .iter()
            .map(|step| registry.parse_step(step))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JobModel { name, steps })
    }
}

fn parse_parameters(map: &Map<String, Value>) -> Result<Vec<ParameterModel>, ModelError> {
    let Some(raw) = map.get("parameters") else {
        return Ok(Vec::new());
    };
    let items = raw.as_array().ok_or(ModelError::InvalidField {
        kind: "pipeline",
        field: "parameters",
        expected: "array",
    })?;
    items
        .iter()
        .map(|item| {
            let map = as_object(item, "parameter")?;
            Ok(ParameterModel {
                name: parse_name(map, "parameter")?,
                kind: optional_string_field(map, "parameter", "type")?,
                default: map.get("default").cloned(),
            })
        })
        .collect()
}

/// A child array that must exist and be non-empty; violating this is a
/// fatal construction error.
fn child_array<'a>(
    map: &'a Map<String, Value>,
    kind: &'static str,
    name: &Name,
    field: &'static str,
) -> Result<&'a Vec<Value>, ModelError> {
    let value = map.get(field).ok_or(ModelError::MissingField { kind, field })?;
    let items = value.as_array().ok_or(ModelError::InvalidField {
        kind,
        field,
        expected: "array",
    })?;
    if items.is_empty() {
        return Err(ModelError::Empty {
            kind,
            name: name.to_string(),
            child: field.trim_end_matches('s'),
        });
    }
    Ok(items)
}

pub(crate) fn as_object<'a>(
    value: &'a Value,
    kind: &'static str,
) -> Result<&'a Map<String, Value>, ModelError> {
    value.as_object().ok_or(ModelError::NotAnObject(kind))
}

pub(crate) fn parse_name(map: &Map<String, Value>, kind: &'static str) -> Result<Name, ModelError> {
    let value = map
        .get("name")
        .ok_or(ModelError::MissingField { kind, field: "name" })?;
    let text = value.as_str().ok_or(ModelError::InvalidField {
        kind,
        field: "name",
        expected: "string",
    })?;
    Name::new(text)
}

pub(crate) fn optional_string_field(
    map: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<Option<String>, ModelError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ModelError::InvalidField {
            kind,
            field,
            expected: "string",
        }),
    }
}
