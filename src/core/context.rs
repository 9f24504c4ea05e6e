//! Pipeline context - shared variables and system handle for one run

use crate::core::interpolate;
use crate::core::model::ParameterModel;
use crate::system::System;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

/// Default template delimiters
pub const DEFAULT_PREFIX: &str = "${";
pub const DEFAULT_SUFFIX: &str = "}";

/// Shared handle to the context for one pipeline run
pub type SharedContext = Arc<PipelineContext>;

/// Execution context shared by reference across the whole controller tree
///
/// Holds the mutable variable namespace, the immutable parameter list,
/// the system backend and the template delimiters. Created once per run;
/// every controller receives a clone of the shared handle at
/// construction.
///
/// The variable tree is guarded by a mutex so individual writes are
/// atomic. Two parallel jobs writing the same path still race; the
/// result is last-write-wins by design.
pub struct PipelineContext {
    variables: Mutex<Value>,
    parameters: Vec<ParameterModel>,
    system: Arc<dyn System>,
    prefix: String,
    suffix: String,
    placeholder: Regex,
}

impl PipelineContext {
    pub fn new(system: Arc<dyn System>) -> Self {
        Self::with_delimiters(system, DEFAULT_PREFIX, DEFAULT_SUFFIX)
    }

    pub fn with_delimiters(system: Arc<dyn System>, prefix: &str, suffix: &str) -> Self {
        let pattern = format!("{}(.+?){}", regex::escape(prefix), regex::escape(suffix));
        let placeholder = Regex::new(&pattern).expect("delimiters form a valid pattern");
        Self {
            variables: Mutex::new(Value::Object(Map::new())),
            parameters: Vec::new(),
            system,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            placeholder,
        }
    }

    /// Attach the run's parameter declarations; read-only afterwards
    pub fn set_parameters(&mut self, parameters: Vec<ParameterModel>) {
        self.parameters = parameters;
    }

    pub fn parameters(&self) -> &[ParameterModel] {
        &self.parameters
    }

    pub fn system(&self) -> &Arc<dyn System> {
        &self.system
    }

    pub fn delimiters(&self) -> (&str, &str) {
        (&self.prefix, &self.suffix)
    }

    pub(crate) fn placeholder(&self) -> &Regex {
        &self.placeholder
    }

    /// Look up a variable by dotted path, cloning the value
    pub fn get_variable(&self, path: &str) -> Option<Value> {
        let variables = self.variables.lock().unwrap();
        lookup_path(&variables, path).cloned()
    }

    /// Write a variable at a dotted path, creating intermediate objects
    pub fn set_variable(&self, path: &str, value: Value) {
        let mut variables = self.variables.lock().unwrap();
        set_path(&mut variables, path, value);
    }

    /// Clone the whole variable tree
    pub fn variables_snapshot(&self) -> Value {
        self.variables.lock().unwrap().clone()
    }

    /// Compile a template value against the current variables
    ///
    /// Runs fresh on every call; nodes invoke this at `start()` time so
    /// the same model can be reused across runs with different bindings.
    pub fn compile(&self, template: &Value) -> Value {
        interpolate::compile_value(self, template)
    }
}

fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.split('.') {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

fn set_path(root: &mut Value, path: &str, value: Value) {
    let mut node = root;
    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments[..segments.len() - 1] {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let map = node.as_object_mut().expect("node was made an object");
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let last = segments[segments.len() - 1];
    node.as_object_mut()
        .expect("node was made an object")
        .insert(last.to_string(), value);
}
