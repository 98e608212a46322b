//! Equation compilation and solver source generation.
//!
//! Resolves the model's Godley flow table into per-variable derivative
//! contributions, merges them with explicitly authored equations
//! (explicit wins), validates that every state variable ends up with
//! exactly one derivative, and emits the two Julia solver artifacts from
//! the resolved set.

pub mod compile;
pub mod emit;
pub mod error;
pub mod godley;

pub use compile::{compile, CompiledEquations};
pub use emit::{
    emit_artifacts, shared_artifact_path, standalone_artifact_path, EmittedArtifacts,
};
pub use error::CompileError;
pub use godley::{flow_accounts, resolve_flows};
