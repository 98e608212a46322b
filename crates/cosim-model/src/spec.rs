//! Model specification: TOML parsing and validation.
//!
//! A model file declares parameters, state variables, initial conditions,
//! a time span, solver settings, explicit ODE right-hand sides, and a
//! Godley flow table. Declaration order matters everywhere: the shared
//! memory schema and the generated solver both index fields and equations
//! positionally, so maps here are `IndexMap` and the TOML parser is built
//! with `preserve_order`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::SpecError;

/// Prefix that marks a derivative name: the equation for state variable
/// `x` is keyed `f_x`, and `f_x` may appear symbolically inside other
/// equations' right-hand sides.
pub const DERIVATIVE_PREFIX: &str = "f_";

/// Field names claimed by the shared-memory schema; parameters may not
/// shadow them.
pub const RESERVED_NAMES: [&str; 3] = ["state", "t0", "t1"];

/// A scalar parameter value, tagged with the type it will occupy in the
/// shared record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    /// 32-bit integer parameter (TOML integer literal).
    Int(i32),
    /// 64-bit float parameter (TOML float literal).
    Float(f64),
}

impl ParamValue {
    /// The parameter value as an `f64`, whatever its declared type.
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Int(v) => f64::from(*v),
            ParamValue::Float(v) => *v,
        }
    }
}

/// One resolved Godley table row: a transaction moving `amount` from
/// `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GodleyRow {
    /// Row key in the model file, kept for diagnostics.
    pub id: String,
    /// Account debited by this transaction.
    pub source: String,
    /// Account credited by this transaction.
    pub target: String,
    /// Amount expression (free arithmetic text over parameters and
    /// state variables).
    pub amount: String,
    /// Human-readable description, used for table output.
    pub description: String,
}

/// Validated in-memory model specification.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    /// Model name; keys the model file, the generated artifacts, and the
    /// shared segment name.
    pub name: String,
    /// Scalar parameters in file declaration order.
    pub parameters: IndexMap<String, ParamValue>,
    /// State variable names in declaration order.
    pub variables: Vec<String>,
    /// Initial condition per state variable, in variable order; variables
    /// without an entry in the file default to 0.0.
    pub initial_conditions: IndexMap<String, f64>,
    /// Integration start time.
    pub t0: f64,
    /// Integration stop time.
    pub t1: f64,
    /// Solver step size.
    pub dt: f64,
    /// Solver method name passed through to the generated source.
    pub method: String,
    /// Explicit derivative equations, keyed `f_<variable>`.
    pub ode_equations: IndexMap<String, String>,
    /// Auxiliary (non-state) expressions, emitted before the derivatives.
    pub auxiliary: IndexMap<String, String>,
    /// Godley flow table rows in file order.
    pub godley: Vec<GodleyRow>,
}

#[derive(Debug, Deserialize)]
struct RawModelSpec {
    model_name: String,
    #[serde(default)]
    parameters: IndexMap<String, toml::Value>,
    variables: RawVariables,
    #[serde(default)]
    initial_conditions: IndexMap<String, f64>,
    #[serde(default)]
    tspan: RawTspan,
    solver: RawSolver,
    #[serde(default)]
    equations: RawEquations,
    #[serde(default)]
    godley: IndexMap<String, Vec<toml::Value>>,
}

#[derive(Debug, Deserialize)]
struct RawVariables {
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawTspan {
    #[serde(default)]
    t0: f64,
    #[serde(default = "default_t1")]
    t1: f64,
}

impl Default for RawTspan {
    fn default() -> Self {
        RawTspan {
            t0: 0.0,
            t1: default_t1(),
        }
    }
}

fn default_t1() -> f64 {
    10.0
}

#[derive(Debug, Deserialize)]
struct RawSolver {
    dt: f64,
    #[serde(default = "default_method")]
    method: String,
}

fn default_method() -> String {
    "Tsit5".to_string()
}

#[derive(Debug, Default, Deserialize)]
struct RawEquations {
    #[serde(default)]
    ode: IndexMap<String, String>,
    #[serde(default)]
    auxiliary: IndexMap<String, String>,
}

impl ModelSpec {
    /// Load and validate `<models_dir>/<name>.toml`.
    pub fn load(models_dir: &Path, name: &str) -> Result<Self, SpecError> {
        let path = models_dir.join(format!("{name}.toml"));
        if !path.is_file() {
            return Err(SpecError::ModelNotFound { path });
        }
        let content = std::fs::read_to_string(&path).map_err(|source| SpecError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a model specification from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SpecError> {
        let raw: RawModelSpec = toml::from_str(content)?;
        validate(raw)
    }

    /// Path of the model file for `name` under `models_dir`.
    pub fn model_path(models_dir: &Path, name: &str) -> PathBuf {
        models_dir.join(format!("{name}.toml"))
    }

    /// The derivative equation key for a state variable.
    pub fn derivative_key(variable: &str) -> String {
        format!("{DERIVATIVE_PREFIX}{variable}")
    }

    /// Initial condition for a variable (0.0 when unspecified).
    pub fn initial_value(&self, variable: &str) -> f64 {
        self.initial_conditions.get(variable).copied().unwrap_or(0.0)
    }
}

fn validate(raw: RawModelSpec) -> Result<ModelSpec, SpecError> {
    if raw.variables.names.is_empty() {
        return Err(SpecError::NoStateVariables);
    }
    let mut seen = Vec::with_capacity(raw.variables.names.len());
    for name in &raw.variables.names {
        if seen.contains(&name.as_str()) {
            return Err(SpecError::DuplicateVariable { name: name.clone() });
        }
        seen.push(name);
    }

    let mut parameters = IndexMap::with_capacity(raw.parameters.len());
    for (name, value) in raw.parameters {
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(SpecError::ReservedParameterName { name });
        }
        let parsed = match value {
            toml::Value::Float(v) => ParamValue::Float(v),
            toml::Value::Integer(v) => ParamValue::Int(
                i32::try_from(v).map_err(|_| SpecError::IntegerOutOfRange { name: name.clone() })?,
            ),
            _ => return Err(SpecError::UnsupportedParameterType { name }),
        };
        parameters.insert(name, parsed);
    }

    // Equation keys must follow the f_<variable> convention and name a
    // declared variable; anything else is a typo the solver would
    // silently ignore.
    for key in raw.equations.ode.keys() {
        let variable = key
            .strip_prefix(DERIVATIVE_PREFIX)
            .ok_or_else(|| SpecError::UnknownEquationKey { key: key.clone() })?;
        if !raw.variables.names.iter().any(|v| v == variable) {
            return Err(SpecError::UnknownEquationKey { key: key.clone() });
        }
    }

    let mut godley = Vec::with_capacity(raw.godley.len());
    for (id, row) in raw.godley {
        if row.len() < 4 {
            return Err(SpecError::MalformedGodleyRow { id, len: row.len() });
        }
        let mut cells = Vec::with_capacity(4);
        for cell in row.iter().take(4) {
            match cell.as_str() {
                Some(s) => cells.push(s.to_string()),
                None => return Err(SpecError::MalformedGodleyRow { id, len: row.len() }),
            }
        }
        let description = cells.pop().unwrap_or_default();
        let amount = cells.pop().unwrap_or_default();
        let target = cells.pop().unwrap_or_default();
        let source = cells.pop().unwrap_or_default();
        godley.push(GodleyRow {
            id,
            source,
            target,
            amount,
            description,
        });
    }

    // Normalize initial conditions to one entry per variable, in
    // declaration order.
    let mut initial_conditions = IndexMap::with_capacity(raw.variables.names.len());
    for name in &raw.variables.names {
        let value = raw.initial_conditions.get(name).copied().unwrap_or(0.0);
        initial_conditions.insert(name.clone(), value);
    }

    Ok(ModelSpec {
        name: raw.model_name,
        parameters,
        variables: raw.variables.names,
        initial_conditions,
        t0: raw.tspan.t0,
        t1: raw.tspan.t1,
        dt: raw.solver.dt,
        method: raw.solver.method,
        ode_equations: raw.equations.ode,
        auxiliary: raw.equations.auxiliary,
        godley,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINSKY: &str = r#"
model_name = "minsky"

[parameters]
r = 0.05
g = 1.2
n = 3

[variables]
names = ["Bank", "Firm"]

[initial_conditions]
Bank = 100.0

[tspan]
t0 = 0.0
t1 = 5.0

[solver]
dt = 0.01

[equations.ode]
f_Bank = "g - r*L"

[equations.auxiliary]
L = "Bank + Firm"

[godley]
t1 = ["Bank", "Firm", "r*L", "interest on loans"]
"#;

    #[test]
    fn parse_full_model() {
        let spec = ModelSpec::from_toml_str(MINSKY).unwrap();
        assert_eq!(spec.name, "minsky");
        assert_eq!(spec.variables, vec!["Bank", "Firm"]);
        assert_eq!(spec.t0, 0.0);
        assert_eq!(spec.t1, 5.0);
        assert_eq!(spec.dt, 0.01);
        assert_eq!(spec.method, "Tsit5");
        assert_eq!(spec.godley.len(), 1);
        assert_eq!(spec.godley[0].source, "Bank");
        assert_eq!(spec.godley[0].target, "Firm");
        assert_eq!(spec.godley[0].amount, "r*L");
    }

    #[test]
    fn parameter_order_and_types_preserved() {
        let spec = ModelSpec::from_toml_str(MINSKY).unwrap();
        let names: Vec<_> = spec.parameters.keys().cloned().collect();
        assert_eq!(names, vec!["r", "g", "n"]);
        assert_eq!(spec.parameters["r"], ParamValue::Float(0.05));
        assert_eq!(spec.parameters["n"], ParamValue::Int(3));
    }

    #[test]
    fn missing_initial_condition_defaults_to_zero() {
        let spec = ModelSpec::from_toml_str(MINSKY).unwrap();
        assert_eq!(spec.initial_value("Bank"), 100.0);
        assert_eq!(spec.initial_value("Firm"), 0.0);
        // Normalized map covers every variable in order.
        let keys: Vec<_> = spec.initial_conditions.keys().cloned().collect();
        assert_eq!(keys, vec!["Bank", "Firm"]);
    }

    #[test]
    fn tspan_defaults() {
        let spec = ModelSpec::from_toml_str(
            r#"
model_name = "m"
[variables]
names = ["x"]
[solver]
dt = 0.1
[equations.ode]
f_x = "-x"
"#,
        )
        .unwrap();
        assert_eq!(spec.t0, 0.0);
        assert_eq!(spec.t1, 10.0);
    }

    #[test]
    fn reject_string_parameter() {
        let err = ModelSpec::from_toml_str(
            r#"
model_name = "m"
[parameters]
label = "oops"
[variables]
names = ["x"]
[solver]
dt = 0.1
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SpecError::UnsupportedParameterType { name } if name == "label"
        ));
    }

    #[test]
    fn reject_reserved_parameter_name() {
        let err = ModelSpec::from_toml_str(
            r#"
model_name = "m"
[parameters]
t0 = 1.0
[variables]
names = ["x"]
[solver]
dt = 0.1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::ReservedParameterName { .. }));
    }

    #[test]
    fn reject_short_godley_row() {
        let err = ModelSpec::from_toml_str(
            r#"
model_name = "m"
[variables]
names = ["x"]
[solver]
dt = 0.1
[godley]
t1 = ["A", "B"]
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SpecError::MalformedGodleyRow { len: 2, .. }
        ));
    }

    #[test]
    fn extra_godley_cells_are_ignored() {
        let spec = ModelSpec::from_toml_str(
            r#"
model_name = "m"
[variables]
names = ["A", "B"]
[solver]
dt = 0.1
[godley]
t1 = ["A", "B", "k", "desc", "spare"]
"#,
        )
        .unwrap();
        assert_eq!(spec.godley[0].description, "desc");
    }

    #[test]
    fn reject_equation_for_undeclared_variable() {
        let err = ModelSpec::from_toml_str(
            r#"
model_name = "m"
[variables]
names = ["x"]
[solver]
dt = 0.1
[equations.ode]
f_y = "x"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::UnknownEquationKey { key } if key == "f_y"));
    }

    #[test]
    fn reject_duplicate_variable() {
        let err = ModelSpec::from_toml_str(
            r#"
model_name = "m"
[variables]
names = ["x", "x"]
[solver]
dt = 0.1
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::DuplicateVariable { .. }));
    }

    #[test]
    fn load_from_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("minsky.toml"), MINSKY).unwrap();

        let spec = ModelSpec::load(dir.path(), "minsky").unwrap();
        assert_eq!(spec.name, "minsky");

        let err = ModelSpec::load(dir.path(), "absent").unwrap_err();
        assert!(matches!(err, SpecError::ModelNotFound { .. }));
    }
}
