//! Solver process lifecycle.
//!
//! The supervisor owns the child handle exclusively: created on spawn,
//! invalidated on stop, never shared as ambient state. No run-time
//! parameters travel through argv — the only argument is the script
//! path; everything else goes through the shared region.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use crate::error::SupervisorError;

/// Default interpreter for generated solver scripts.
pub const DEFAULT_RUNNER: &str = "julia";

/// Outcome of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The child had already exited before the stop request; callers
    /// treat this as a lifecycle warning, not an error.
    AlreadyExited(ExitStatus),
    /// The child was terminated and reaped by this call.
    Stopped(ExitStatus),
}

/// An owned handle to a running solver process.
///
/// `stop` signals SIGTERM and then blocks in `wait()` with no timeout
/// and no SIGKILL escalation: a solver that ignores the signal blocks
/// the caller indefinitely. Callers wanting cancellable shutdown must
/// wrap their own timeout around it. The fully cooperative path is to
/// write `StopRequested` into the shared region first and poll
/// [`SolverProcess::is_running`].
#[derive(Debug)]
pub struct SolverProcess {
    child: Child,
    script: PathBuf,
}

impl SolverProcess {
    /// Launch `runner <script>` with piped stdout/stderr.
    ///
    /// Fails with [`SupervisorError::SolverScriptNotFound`] when the
    /// generated artifact is missing — recoverable by regenerating.
    pub fn spawn(script: &Path, runner: &str) -> Result<Self, SupervisorError> {
        if !script.is_file() {
            return Err(SupervisorError::SolverScriptNotFound {
                path: script.to_path_buf(),
            });
        }
        let child = Command::new(runner)
            .arg(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                path: script.to_path_buf(),
                source,
            })?;
        Ok(SolverProcess {
            child,
            script: script.to_path_buf(),
        })
    }

    /// The script this process was launched from.
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Non-blocking liveness poll.
    pub fn is_running(&mut self) -> Result<bool, SupervisorError> {
        Ok(self.child.try_wait()?.is_none())
    }

    /// Exit status if the child has already exited, without blocking.
    pub fn exit_status(&mut self) -> Result<Option<ExitStatus>, SupervisorError> {
        Ok(self.child.try_wait()?)
    }

    /// Block until the child exits.
    pub fn wait(&mut self) -> Result<ExitStatus, SupervisorError> {
        Ok(self.child.wait()?)
    }

    /// Request termination (SIGTERM) and block until the child exits.
    ///
    /// SIGTERM rather than SIGKILL so a solver that traps it can flush
    /// results before exiting. Idempotent: an already-exited child
    /// yields [`StopOutcome::AlreadyExited`] and nothing is signaled.
    pub fn stop(&mut self) -> Result<StopOutcome, SupervisorError> {
        match self.child.try_wait()? {
            Some(status) => Ok(StopOutcome::AlreadyExited(status)),
            None => {
                let pid = self.child.id() as libc::pid_t;
                // Safety: plain kill(2); try_wait above returned None, so
                // the pid has not been reaped and still names our child.
                if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
                    return Err(SupervisorError::Io(std::io::Error::last_os_error()));
                }
                // No timeout here by design; see the type docs.
                let status = self.child.wait()?;
                Ok(StopOutcome::Stopped(status))
            }
        }
    }

    /// Drain the child's captured stderr for diagnostics.
    ///
    /// Call after the child has exited; reading a live child's pipe
    /// blocks until it closes the stream.
    pub fn stderr_output(&mut self) -> Result<String, SupervisorError> {
        let mut buf = String::new();
        if let Some(mut stderr) = self.child.stderr.take() {
            stderr.read_to_string(&mut buf)?;
        }
        Ok(buf)
    }

    /// Drain the child's captured stdout.
    pub fn stdout_output(&mut self) -> Result<String, SupervisorError> {
        let mut buf = String::new();
        if let Some(mut stdout) = self.child.stdout.take() {
            stdout.read_to_string(&mut buf)?;
        }
        Ok(buf)
    }
}
