//! Declarative ODE model specification.
//!
//! Parses one TOML model file into a validated [`ModelSpec`]: scalar
//! parameters, ordered state variables, initial conditions, time span,
//! solver settings, explicit derivative equations, and the Godley flow
//! table. Everything downstream — the shared-memory schema and the
//! generated solver — is derived from this one structure.

pub mod error;
pub mod spec;

pub use error::SpecError;
pub use spec::{GodleyRow, ModelSpec, ParamValue, DERIVATIVE_PREFIX, RESERVED_NAMES};
