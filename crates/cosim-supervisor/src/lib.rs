//! External solver process supervision: spawn, liveness polling, and
//! blocking shutdown of the generated solver.

pub mod error;
pub mod supervisor;

pub use error::SupervisorError;
pub use supervisor::{SolverProcess, StopOutcome, DEFAULT_RUNNER};
