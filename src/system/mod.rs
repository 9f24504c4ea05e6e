//! System abstraction boundary
//!
//! Every interaction with the outside world (spawning processes,
//! touching the filesystem) goes through [`System`]. The engine core
//! never calls the OS directly, which is what makes controllers testable
//! with the [`StubSystem`] backend.

mod os;
mod stub;

pub use os::OsSystem;
pub use stub::StubSystem;

use crate::core::error::SystemError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Callback invoked once when a process exits; `None` means the exit
/// status could not be determined (killed by signal).
pub type ExitCallback = Box<dyn FnOnce(Option<i32>) + Send>;

/// Everything needed to launch one child process
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

/// Execution backend for one pipeline run
pub trait System: Send + Sync {
    /// Create a process handle; the process is not started yet
    fn create_process(&self, options: ProcessOptions)
        -> Result<Arc<dyn SystemProcess>, SystemError>;

    fn create_directory(&self, path: &Path) -> Result<(), SystemError>;

    fn read_file(&self, path: &Path) -> Result<String, SystemError>;

    fn write_file(&self, path: &Path, content: &str) -> Result<(), SystemError>;

    fn path_exists(&self, path: &Path) -> bool;

    fn create_temporary_directory(&self) -> Result<PathBuf, SystemError>;

    fn create_temporary_file(&self, content: &str) -> Result<PathBuf, SystemError>;

    fn working_directory(&self) -> Result<PathBuf, SystemError>;
}

/// Handle to one child process
///
/// `on_exit` callbacks registered after the process already exited are
/// invoked immediately with the recorded status.
pub trait SystemProcess: Send + Sync {
    fn start(&self) -> Result<(), SystemError>;

    fn pause(&self) -> Result<(), SystemError>;

    fn resume(&self) -> Result<(), SystemError>;

    fn stop(&self) -> Result<(), SystemError>;

    fn on_exit(&self, callback: ExitCallback);

    /// `None` while the process is still running
    fn exit_status(&self) -> Option<Option<i32>>;

    /// Captured standard output, available after exit
    fn output_string(&self) -> String;

    /// Captured standard error, available after exit
    fn error_string(&self) -> String;
}
