//! Operating-system backed [`System`] implementation
//!
//! Processes are spawned through tokio with captured stdout/stderr and
//! signalled (pause/resume/stop) through POSIX signals. Must run inside
//! a tokio runtime.

use super::{ExitCallback, ProcessOptions, System, SystemProcess};
use crate::core::error::SystemError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::warn;
use uuid::Uuid;

/// Real OS backend
#[derive(Debug, Default)]
pub struct OsSystem;

impl OsSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for OsSystem {
    fn create_process(
        &self,
        options: ProcessOptions,
    ) -> Result<Arc<dyn SystemProcess>, SystemError> {
        Ok(Arc::new(OsProcess::new(options)))
    }

    fn create_directory(&self, path: &Path) -> Result<(), SystemError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String, SystemError> {
        Ok(fs::read_to_string(path)?)
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<(), SystemError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_temporary_directory(&self) -> Result<PathBuf, SystemError> {
        let path = std::env::temp_dir().join(format!("stagehand-{}", Uuid::new_v4()));
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    fn create_temporary_file(&self, content: &str) -> Result<PathBuf, SystemError> {
        let path = std::env::temp_dir().join(format!("stagehand-{}.tmp", Uuid::new_v4()));
        fs::write(&path, content)?;
        Ok(path)
    }

    fn working_directory(&self) -> Result<PathBuf, SystemError> {
        Ok(std::env::current_dir()?)
    }
}

#[derive(Default)]
struct ProcessInner {
    started: bool,
    pid: Option<i32>,
    // Some once the process has exited; the inner Option is the exit
    // code, None when killed by a signal.
    exit: Option<Option<i32>>,
    stdout: String,
    stderr: String,
    callbacks: Vec<ExitCallback>,
}

/// One spawned child process
pub struct OsProcess {
    options: ProcessOptions,
    inner: Arc<Mutex<ProcessInner>>,
}

impl OsProcess {
    fn new(options: ProcessOptions) -> Self {
        Self {
            options,
            inner: Arc::new(Mutex::new(ProcessInner::default())),
        }
    }

    fn signal(&self, signal: Signal) -> Result<(), SystemError> {
        let pid = self
            .inner
            .lock()
            .unwrap()
            .pid
            .ok_or(SystemError::NotStarted)?;
        kill(Pid::from_raw(pid), signal).map_err(|errno| SystemError::Signal(errno.to_string()))
    }
}

impl SystemProcess for OsProcess {
    fn start(&self) -> Result<(), SystemError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.started {
            return Err(SystemError::AlreadyStarted);
        }

        let mut command = Command::new(&self.options.command);
        command
            .args(&self.options.args)
            .envs(&self.options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A tree dropped without destroy() must not leak children
            // past runtime shutdown.
            .kill_on_drop(true);
        if let Some(cwd) = &self.options.cwd {
            command.current_dir(cwd);
        }
        let child = command.spawn()?;
        inner.started = true;
        inner.pid = child.id().map(|pid| pid as i32);
        drop(inner);

        let shared = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = child.wait_with_output().await;
            let status;
            let callbacks = {
                let mut inner = shared.lock().unwrap();
                match result {
                    Ok(output) => {
                        inner.stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                        inner.stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                        status = output.status.code();
                    }
                    Err(error) => {
                        warn!(%error, "failed to collect process output");
                        status = None;
                    }
                }
                inner.exit = Some(status);
                std::mem::take(&mut inner.callbacks)
            };
            for callback in callbacks {
                callback(status);
            }
        });
        Ok(())
    }

    fn pause(&self) -> Result<(), SystemError> {
        self.signal(Signal::SIGSTOP)
    }

    fn resume(&self) -> Result<(), SystemError> {
        self.signal(Signal::SIGCONT)
    }

    fn stop(&self) -> Result<(), SystemError> {
        self.signal(Signal::SIGTERM)
    }

    fn on_exit(&self, callback: ExitCallback) {
        // Registering under the lock closes the race with the waiter
        // task recording the exit status.
        let status = {
            let mut inner = self.inner.lock().unwrap();
            match inner.exit {
                Some(status) => status,
                None => {
                    inner.callbacks.push(callback);
                    return;
                }
            }
        };
        callback(status);
    }

    fn exit_status(&self) -> Option<Option<i32>> {
        self.inner.lock().unwrap().exit
    }

    fn output_string(&self) -> String {
        self.inner.lock().unwrap().stdout.clone()
    }

    fn error_string(&self) -> String {
        self.inner.lock().unwrap().stderr.clone()
    }
}
