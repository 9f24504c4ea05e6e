//! Inert [`System`] backend
//!
//! Used where a context is required but nothing should touch the real
//! machine, e.g. compiling a pipeline only to render its state tree.

use super::{ProcessOptions, System, SystemProcess};
use crate::core::error::SystemError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct StubSystem;

impl StubSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for StubSystem {
    fn create_process(
        &self,
        _options: ProcessOptions,
    ) -> Result<Arc<dyn SystemProcess>, SystemError> {
        Err(SystemError::Unsupported)
    }

    fn create_directory(&self, _path: &Path) -> Result<(), SystemError> {
        Err(SystemError::Unsupported)
    }

    fn read_file(&self, _path: &Path) -> Result<String, SystemError> {
        Err(SystemError::Unsupported)
    }

    fn write_file(&self, _path: &Path, _content: &str) -> Result<(), SystemError> {
        Err(SystemError::Unsupported)
    }

    fn path_exists(&self, _path: &Path) -> bool {
        false
    }

    fn create_temporary_directory(&self) -> Result<PathBuf, SystemError> {
        Err(SystemError::Unsupported)
    }

    fn create_temporary_file(&self, _content: &str) -> Result<PathBuf, SystemError> {
        Err(SystemError::Unsupported)
    }

    fn working_directory(&self) -> Result<PathBuf, SystemError> {
        Err(SystemError::Unsupported)
    }
}
