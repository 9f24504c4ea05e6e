//! Step controllers - the leaves of the execution tree

pub mod assert;
pub mod concat;
pub mod csv;
pub mod file;
pub mod git;
pub mod json;
pub mod process;
pub mod runner;
pub mod script;
pub mod variable;

pub use assert::{AssertRunner, AssertStepController};
pub use concat::{ConcatRunner, ConcatStepController};
pub use csv::{CsvAction, CsvRunner, CsvStepController};
pub use file::{FileAction, FileRunner, FileStepController};
pub use git::{GitPlan, GitStepController};
pub use json::{JsonAction, JsonRunner, JsonStepController};
pub use process::{CommandPlanner, ProcessSpec, ProcessStepController};
pub use runner::{FnStepController, RunOutcome, StepRunner};
pub use script::{ScriptPlan, ScriptStepController};
pub use variable::{VariableRunner, VariableStepController};
