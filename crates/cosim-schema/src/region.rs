//! The shared-memory region: a schema-sized file on tmpfs overlaid with a
//! writable memory map.
//!
//! Exactly one process is the owner (the creator); it sizes the file,
//! zeroes it, and writes the initial parameter values and control byte.
//! A non-owner only attaches, and must fail if the existing segment's
//! size does not match the schema it derived itself.
//!
//! # Synchronization (deliberately absent)
//!
//! The layout carries no lock, semaphore, or sequence number, and writes
//! are not serialized against reads from the other process. Adding one
//! would silently change the byte layout both sides compiled against, so
//! the discipline is behavioral instead: the controller writes parameters
//! only before the solver is spawned or while the control byte holds
//! `Paused`. Violating that yields torn reads with no detection.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use cosim_model::{ModelSpec, ParamValue};

use crate::control::ControlState;
use crate::error::RegionError;
use crate::schema::{ScalarType, Schema};

/// Directory where segments live by default.
pub const DEFAULT_SHM_DIR: &str = "/dev/shm";

/// Well-known segment name for a model.
pub fn segment_name(model: &str) -> String {
    format!("{model}_shared")
}

/// A typed value read from or written to a schema field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Float(f64),
}

impl FieldValue {
    /// The value as an `f64`, whatever its schema type.
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Int(v) => f64::from(*v),
            FieldValue::Float(v) => *v,
        }
    }
}

impl From<ParamValue> for FieldValue {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Int(v) => FieldValue::Int(v),
            ParamValue::Float(v) => FieldValue::Float(v),
        }
    }
}

/// A mapped shared segment with typed field access.
///
/// Dropping the handle unmaps the local view but leaves the segment in
/// place; only an explicit owner [`SharedRegion::destroy`] unlinks it.
#[derive(Debug)]
pub struct SharedRegion {
    schema: Schema,
    map: MmapMut,
    path: PathBuf,
    owner: bool,
}

impl SharedRegion {
    /// Open the segment for `name` under [`DEFAULT_SHM_DIR`].
    ///
    /// With `as_owner` the segment is created and zeroed; if it already
    /// exists this falls back to attaching (a second launch joins the
    /// first launch's session and is not the owner). Without `as_owner`
    /// the segment must already exist.
    pub fn open(schema: Schema, name: &str, as_owner: bool) -> Result<Self, RegionError> {
        Self::open_at(Path::new(DEFAULT_SHM_DIR), schema, name, as_owner)
    }

    /// Like [`SharedRegion::open`] with an explicit backing directory.
    /// Tests use a tempdir here instead of `/dev/shm`.
    pub fn open_at(
        dir: &Path,
        schema: Schema,
        name: &str,
        as_owner: bool,
    ) -> Result<Self, RegionError> {
        let path = dir.join(name);
        if as_owner {
            match OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => Self::finish_create(schema, file, path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Self::attach(schema, path),
                Err(e) => Err(RegionError::Io(e)),
            }
        } else {
            Self::attach(schema, path)
        }
    }

    /// Open the segment for a model and, when this handle ends up the
    /// owner, initialize every field (and the control byte) from the
    /// spec. A failed initialization unlinks the segment before
    /// returning so no partially-initialized segment is left behind.
    pub fn open_model(
        dir: &Path,
        spec: &ModelSpec,
        as_owner: bool,
    ) -> Result<Self, RegionError> {
        Self::open_model_init(dir, spec, as_owner, Self::initialize)
    }

    // Seam for the unlink-on-failed-initialization path: `initialize`
    // cannot fail on a schema derived from the same spec, so tests
    // inject a failing initializer here.
    fn open_model_init(
        dir: &Path,
        spec: &ModelSpec,
        as_owner: bool,
        init: impl FnOnce(&mut Self, &ModelSpec) -> Result<(), RegionError>,
    ) -> Result<Self, RegionError> {
        let schema = Schema::from_spec(spec);
        let mut region = Self::open_at(dir, schema, &segment_name(&spec.name), as_owner)?;
        if region.owner {
            if let Err(e) = init(&mut region, spec) {
                let _ = std::fs::remove_file(&region.path);
                return Err(e);
            }
        }
        Ok(region)
    }

    fn finish_create(schema: Schema, file: std::fs::File, path: PathBuf) -> Result<Self, RegionError> {
        let unlink_on_err = |e: RegionError| {
            let _ = std::fs::remove_file(&path);
            e
        };
        file.set_len(schema.total_size() as u64)
            .map_err(RegionError::Io)
            .map_err(unlink_on_err)?;
        // Safety: the mapping never outlives the file and the segment is
        // shared mutable by design (see module docs).
        let mut map = unsafe { MmapMut::map_mut(&file) }
            .map_err(RegionError::Io)
            .map_err(unlink_on_err)?;
        map[0] = ControlState::Initializing.byte();
        Ok(SharedRegion {
            schema,
            map,
            path,
            owner: true,
        })
    }

    fn attach(schema: Schema, path: PathBuf) -> Result<Self, RegionError> {
        let file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RegionError::NotFound { path })
            }
            Err(e) => return Err(RegionError::Io(e)),
        };
        let actual = file.metadata()?.len();
        if actual != schema.total_size() as u64 {
            return Err(RegionError::SizeMismatch {
                path,
                expected: schema.total_size(),
                actual,
            });
        }
        // Safety: as above.
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(SharedRegion {
            schema,
            map,
            path,
            owner: false,
        })
    }

    fn initialize(&mut self, spec: &ModelSpec) -> Result<(), RegionError> {
        self.write_state(ControlState::Initializing);
        self.write_field("t0", FieldValue::Float(spec.t0))?;
        self.write_field("t1", FieldValue::Float(spec.t1))?;
        for (name, value) in &spec.parameters {
            self.write_field(name, FieldValue::from(*value))?;
        }
        Ok(())
    }

    /// Whether this handle created (and therefore owns) the segment.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The schema this region was opened with.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Read a parameter or time-span field by name.
    pub fn read_field(&self, name: &str) -> Result<FieldValue, RegionError> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| RegionError::UnknownField { name: name.to_string() })?;
        let b = &self.map[field.offset..field.offset + field.size];
        match field.ty {
            ScalarType::Int32 => Ok(FieldValue::Int(i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))),
            ScalarType::Float64 => Ok(FieldValue::Float(f64::from_ne_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ]))),
            // The control field goes through read_state/write_state.
            ScalarType::Char => Err(RegionError::TypeMismatch {
                name: name.to_string(),
            }),
        }
    }

    /// Write a parameter or time-span field by name. The value kind must
    /// match the field's schema type; no silent coercion.
    pub fn write_field(&mut self, name: &str, value: FieldValue) -> Result<(), RegionError> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| RegionError::UnknownField { name: name.to_string() })?;
        let bytes: &mut [u8] = &mut self.map[field.offset..field.offset + field.size];
        match (field.ty, value) {
            (ScalarType::Int32, FieldValue::Int(v)) => {
                bytes.copy_from_slice(&v.to_ne_bytes());
                Ok(())
            }
            (ScalarType::Float64, FieldValue::Float(v)) => {
                bytes.copy_from_slice(&v.to_ne_bytes());
                Ok(())
            }
            _ => Err(RegionError::TypeMismatch {
                name: name.to_string(),
            }),
        }
    }

    /// Read the control byte. By construction the control field sits at
    /// offset 0.
    pub fn read_state(&self) -> Result<ControlState, RegionError> {
        ControlState::from_byte(self.map[0])
    }

    /// Write the control byte.
    pub fn write_state(&mut self, state: ControlState) {
        self.map[0] = state.byte();
    }

    /// Detach the local view, leaving the segment in place for the other
    /// process. Equivalent to dropping the handle, spelled out for
    /// shutdown paths.
    pub fn release(self) {
        drop(self);
    }

    /// Unlink the segment so no process can attach afterward. Owner only:
    /// as a non-owner this detaches but leaves the segment, since the
    /// owner (or its solver) may still be using it.
    pub fn destroy(self) -> Result<(), RegionError> {
        if self.owner {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ModelSpec {
        ModelSpec::from_toml_str(
            r#"
model_name = "m"
[parameters]
a = 1.5
b = 2
[variables]
names = ["x"]
[tspan]
t0 = 0.0
t1 = 5.0
[solver]
dt = 0.1
[equations.ode]
f_x = "-x"
"#,
        )
        .unwrap()
    }

    #[test]
    fn owner_creates_and_initializes() {
        let dir = tempfile::tempdir().unwrap();
        let region = SharedRegion::open_model(dir.path(), &spec(), true).unwrap();
        assert!(region.is_owner());
        assert_eq!(region.read_state().unwrap(), ControlState::Initializing);
        assert_eq!(region.read_field("t1").unwrap(), FieldValue::Float(5.0));
        assert_eq!(region.read_field("a").unwrap(), FieldValue::Float(1.5));
        assert_eq!(region.read_field("b").unwrap(), FieldValue::Int(2));
    }

    #[test]
    fn field_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut region = SharedRegion::open_model(dir.path(), &spec(), true).unwrap();
        region.write_field("a", FieldValue::Float(-3.25)).unwrap();
        region.write_field("b", FieldValue::Int(42)).unwrap();
        assert_eq!(region.read_field("a").unwrap(), FieldValue::Float(-3.25));
        assert_eq!(region.read_field("b").unwrap(), FieldValue::Int(42));
    }

    #[test]
    fn attacher_sees_owner_writes() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec();
        let mut owner = SharedRegion::open_model(dir.path(), &spec, true).unwrap();
        owner.write_state(ControlState::Running);
        owner.write_field("a", FieldValue::Float(7.0)).unwrap();

        let attached = SharedRegion::open_model(dir.path(), &spec, false).unwrap();
        assert!(!attached.is_owner());
        assert_eq!(attached.read_state().unwrap(), ControlState::Running);
        assert_eq!(attached.read_field("a").unwrap(), FieldValue::Float(7.0));
    }

    #[test]
    fn second_owner_open_falls_back_to_attach() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec();
        let _first = SharedRegion::open_model(dir.path(), &spec, true).unwrap();
        let second = SharedRegion::open_model(dir.path(), &spec, true).unwrap();
        assert!(!second.is_owner());
    }

    #[test]
    fn attach_size_mismatch_fails_without_touching_segment() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec();
        let name = segment_name(&spec.name);
        let path = dir.path().join(&name);
        std::fs::write(&path, vec![0xabu8; 7]).unwrap();

        let schema = Schema::from_spec(&spec);
        let err = SharedRegion::open_at(dir.path(), schema, &name, false).unwrap_err();
        assert!(matches!(
            err,
            RegionError::SizeMismatch { expected: 29, actual: 7, .. }
        ));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xabu8; 7]);
    }

    #[test]
    fn attach_missing_segment_fails() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec();
        let err = SharedRegion::open_model(dir.path(), &spec, false).unwrap_err();
        assert!(matches!(err, RegionError::NotFound { .. }));
    }

    #[test]
    fn failed_owner_initialization_leaves_no_segment() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec();
        let path = dir.path().join(segment_name(&spec.name));

        let err = SharedRegion::open_model_init(dir.path(), &spec, true, |_, _| {
            Err(RegionError::UnknownField {
                name: "injected".to_string(),
            })
        })
        .unwrap_err();
        assert!(matches!(err, RegionError::UnknownField { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn non_owner_destroy_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec();
        let owner = SharedRegion::open_model(dir.path(), &spec, true).unwrap();
        let path = owner.path().to_path_buf();

        let attached = SharedRegion::open_model(dir.path(), &spec, false).unwrap();
        attached.destroy().unwrap();
        assert!(path.exists());

        owner.destroy().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn release_leaves_segment_for_other_process() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec();
        let owner = SharedRegion::open_model(dir.path(), &spec, true).unwrap();
        let path = owner.path().to_path_buf();
        owner.release();
        assert!(path.exists());

        // Segment still attachable afterward.
        let attached = SharedRegion::open_model(dir.path(), &spec, false).unwrap();
        assert_eq!(
            attached.read_state().unwrap(),
            ControlState::Initializing
        );
    }

    #[test]
    fn unknown_field_and_type_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut region = SharedRegion::open_model(dir.path(), &spec(), true).unwrap();
        assert!(matches!(
            region.read_field("ghost"),
            Err(RegionError::UnknownField { .. })
        ));
        assert!(matches!(
            region.write_field("b", FieldValue::Float(1.0)),
            Err(RegionError::TypeMismatch { .. })
        ));
        // The control field is not reachable through typed field access.
        assert!(matches!(
            region.read_field("state"),
            Err(RegionError::TypeMismatch { .. })
        ));
    }
}
