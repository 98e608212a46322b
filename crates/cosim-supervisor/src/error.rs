//! Supervisor errors.

use std::path::PathBuf;

/// Errors from launching or managing the solver process.
///
/// These are fatal to the launch attempt only: the caller can regenerate
/// the artifact and retry without restarting the controlling process.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("solver script not found: {} (run `cosim generate` first)", path.display())]
    SolverScriptNotFound { path: PathBuf },

    #[error("failed to spawn solver {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("solver process error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SupervisorError::SolverScriptNotFound {
            path: PathBuf::from("models/minsky.jl"),
        };
        let msg = err.to_string();
        assert!(msg.contains("minsky.jl"));
        assert!(msg.contains("cosim generate"));
    }
}
