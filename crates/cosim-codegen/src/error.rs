//! Compilation and emission errors.

use std::path::PathBuf;

/// Errors from equation compilation or artifact emission.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A declared state variable has neither an explicit derivative
    /// equation nor any Godley row touching its account.
    #[error("no derivative for state variable '{variable}': add an f_{variable} equation or a godley row")]
    MissingDerivative { variable: String },

    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
