//! Shared-memory schema and region.
//!
//! [`Schema`] derives the fixed byte layout of the shared record from a
//! model specification — the sole contract between the controlling
//! process and the generated solver. [`SharedRegion`] overlays a tmpfs
//! file with that layout and provides typed field access plus the
//! one-byte control channel. There is deliberately no synchronization in
//! the layout; see the `region` module docs for the access discipline.

pub mod control;
pub mod error;
pub mod region;
pub mod schema;

pub use control::ControlState;
pub use error::RegionError;
pub use region::{segment_name, FieldValue, SharedRegion, DEFAULT_SHM_DIR};
pub use schema::{ScalarType, Schema, SchemaField, STATE_FIELD};
