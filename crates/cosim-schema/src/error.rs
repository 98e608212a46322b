//! Shared-region errors.

use std::path::PathBuf;

/// Errors from opening or accessing a shared region.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("shared region not found at {} (is the owning process running?)", path.display())]
    NotFound { path: PathBuf },

    #[error(
        "shared region size mismatch at {}: schema expects {expected} bytes, segment has {actual}",
        path.display()
    )]
    SizeMismatch {
        path: PathBuf,
        expected: usize,
        actual: u64,
    },

    #[error("no field named '{name}' in the shared schema")]
    UnknownField { name: String },

    #[error("value type does not match schema type for field '{name}'")]
    TypeMismatch { name: String },

    #[error("unknown control byte 0x{byte:02x} in shared region")]
    UnknownControlByte { byte: u8 },

    #[error("shared region I/O error: {0}")]
    Io(#[from] std::io::Error),
}
