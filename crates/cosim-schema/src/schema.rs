//! Field schema derivation: the byte layout of the shared record.
//!
//! Both processes derive this layout independently from the same model
//! file, and the layout is the only contract between them. Field order is
//! fixed: the control byte first, then `t0` and `t1`, then every declared
//! parameter in file order. The layout is packed — offsets are running
//! byte sums with no alignment padding — which is why the generated
//! solver addresses fields by explicit offset rather than overlaying a
//! native struct.

use cosim_model::{ModelSpec, ParamValue};

/// Scalar types that can occupy a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// One byte; only the control field uses this.
    Char,
    /// 32-bit signed integer, native endianness.
    Int32,
    /// 64-bit float, native endianness.
    Float64,
}

impl ScalarType {
    /// Size of a field of this type in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            ScalarType::Char => 1,
            ScalarType::Int32 => 4,
            ScalarType::Float64 => 8,
        }
    }

    /// The matching Julia scalar type name, used by the code generator.
    pub fn julia_name(&self) -> &'static str {
        match self {
            ScalarType::Char => "UInt8",
            ScalarType::Int32 => "Int32",
            ScalarType::Float64 => "Float64",
        }
    }
}

impl From<ParamValue> for ScalarType {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Int(_) => ScalarType::Int32,
            ParamValue::Float(_) => ScalarType::Float64,
        }
    }
}

/// One field of the shared record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    /// Field name (control field is `state`).
    pub name: String,
    /// Scalar type.
    pub ty: ScalarType,
    /// Byte offset from the start of the record.
    pub offset: usize,
    /// Size in bytes.
    pub size: usize,
}

/// Ordered field table plus total record size.
///
/// Deterministic given the same [`ModelSpec`]: same fields, same order,
/// same offsets, same total — rebuilding on either side of the process
/// boundary must produce an identical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<SchemaField>,
    total_size: usize,
}

/// Name of the control/state field, always first in the layout.
pub const STATE_FIELD: &str = "state";

impl Schema {
    /// Derive the field table from a model specification.
    ///
    /// Pure function of the spec; parameter literals have already been
    /// type-checked at parse time (`SpecError::UnsupportedParameterType`),
    /// so every parameter maps to exactly one scalar type here.
    pub fn from_spec(spec: &ModelSpec) -> Schema {
        let mut builder = SchemaBuilder::new();
        builder.push(STATE_FIELD, ScalarType::Char);
        builder.push("t0", ScalarType::Float64);
        builder.push("t1", ScalarType::Float64);
        for (name, value) in &spec.parameters {
            builder.push(name, ScalarType::from(*value));
        }
        builder.finish()
    }

    /// All fields in layout order.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Total record size in bytes (sum of field sizes, no padding).
    pub fn total_size(&self) -> usize {
        self.total_size
    }
}

struct SchemaBuilder {
    fields: Vec<SchemaField>,
    offset: usize,
}

impl SchemaBuilder {
    fn new() -> Self {
        SchemaBuilder {
            fields: Vec::new(),
            offset: 0,
        }
    }

    fn push(&mut self, name: &str, ty: ScalarType) {
        let size = ty.size_bytes();
        self.fields.push(SchemaField {
            name: name.to_string(),
            ty,
            offset: self.offset,
            size,
        });
        self.offset += size;
    }

    fn finish(self) -> Schema {
        Schema {
            fields: self.fields,
            total_size: self.offset,
        }
    }
}
