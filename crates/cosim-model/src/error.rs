//! Specification errors.

use std::path::PathBuf;

/// Errors raised while loading or validating a model specification.
///
/// All of these are fatal to the operation that triggered them and are
/// reported before any solver process is spawned or shared segment created.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing model file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unsupported type for parameter '{name}': expected integer or float literal")]
    UnsupportedParameterType { name: String },

    #[error("parameter '{name}' does not fit in a 32-bit integer")]
    IntegerOutOfRange { name: String },

    #[error("parameter name '{name}' is reserved by the shared-memory schema")]
    ReservedParameterName { name: String },

    #[error("model declares no state variables")]
    NoStateVariables,

    #[error("state variable '{name}' is declared more than once")]
    DuplicateVariable { name: String },

    #[error("equation key '{key}' does not name a declared state variable")]
    UnknownEquationKey { key: String },

    #[error("godley row '{id}' has {len} elements, expected at least 4")]
    MalformedGodleyRow { id: String, len: usize },
}
