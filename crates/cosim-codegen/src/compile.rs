//! Equation compilation: merge flow-derived and explicit derivatives into
//! one complete, declaration-ordered equation set.

use indexmap::IndexMap;

use cosim_model::ModelSpec;

use crate::error::CompileError;
use crate::godley::resolve_flows;

/// The complete equation set for a model, one derivative per state
/// variable in declaration order, plus the auxiliary expressions.
#[derive(Debug, Clone)]
pub struct CompiledEquations {
    /// `f_<variable>` → right-hand-side text, in state-variable
    /// declaration order (the templates emit these positionally).
    pub equations: IndexMap<String, String>,
    /// Auxiliary expressions in file order, emitted before the
    /// derivatives.
    pub auxiliary: IndexMap<String, String>,
}

/// Compile the model's equation set.
///
/// An explicitly authored `f_<var>` equation always wins over the
/// flow-derived sum for the same variable, so an author can hand-tune a
/// derivative without deleting the godley rows that document it. A
/// variable with neither is [`CompileError::MissingDerivative`].
///
/// `f_<other>` references inside equation text are left symbolic: the
/// generated solver binds each derivative to a local in declaration
/// order, so cross-references resolve at evaluation time rather than by
/// textual inlining here.
pub fn compile(spec: &ModelSpec) -> Result<CompiledEquations, CompileError> {
    let flows = resolve_flows(spec);

    let mut equations = IndexMap::with_capacity(spec.variables.len());
    for variable in &spec.variables {
        let key = ModelSpec::derivative_key(variable);
        let rhs = match spec.ode_equations.get(&key) {
            Some(explicit) => explicit.clone(),
            None => match flows.get(variable) {
                Some(derived) => derived.clone(),
                None => {
                    return Err(CompileError::MissingDerivative {
                        variable: variable.clone(),
                    })
                }
            },
        };
        equations.insert(key, rhs);
    }

    Ok(CompiledEquations {
        equations,
        auxiliary: spec.auxiliary.clone(),
    })
}

impl CompiledEquations {
    /// Which variables took their equation from the flow table rather
    /// than an explicit `f_<var>` entry.
    pub fn flow_derived<'a>(&'a self, spec: &'a ModelSpec) -> Vec<&'a str> {
        spec.variables
            .iter()
            .filter(|v| !spec.ode_equations.contains_key(&ModelSpec::derivative_key(v)))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK_FIRM: &str = r#"
model_name = "m"
[parameters]
r = 0.05
[variables]
names = ["Bank", "Firm"]
[solver]
dt = 0.1
"#;

    fn with_sections(extra: &str) -> ModelSpec {
        ModelSpec::from_toml_str(&format!("{BANK_FIRM}\n{extra}")).unwrap()
    }

    #[test]
    fn flow_derived_equations() {
        let spec = with_sections(
            r#"
[godley]
t1 = ["Bank", "Firm", "r*L", "interest"]
"#,
        );
        let compiled = compile(&spec).unwrap();
        assert_eq!(compiled.equations["f_Bank"], "-(r*L)");
        assert_eq!(compiled.equations["f_Firm"], "+(r*L)");
        assert_eq!(compiled.flow_derived(&spec), vec!["Bank", "Firm"]);
    }

    #[test]
    fn explicit_wins_over_flow() {
        let spec = with_sections(
            r#"
[equations.ode]
f_Bank = "g - r*L"
[godley]
t1 = ["Bank", "Firm", "r*L", "interest"]
"#,
        );
        let compiled = compile(&spec).unwrap();
        assert_eq!(compiled.equations["f_Bank"], "g - r*L");
        assert_eq!(compiled.equations["f_Firm"], "+(r*L)");
        assert_eq!(compiled.flow_derived(&spec), vec!["Firm"]);
    }

    #[test]
    fn missing_derivative_fails() {
        let spec = with_sections(
            r#"
[equations.ode]
f_Bank = "g"
"#,
        );
        let err = compile(&spec).unwrap_err();
        assert!(matches!(
            err,
            CompileError::MissingDerivative { variable } if variable == "Firm"
        ));
    }

    #[test]
    fn one_equation_per_variable_in_declaration_order() {
        let spec = with_sections(
            r#"
[equations.ode]
f_Firm = "0"
f_Bank = "1"
"#,
        );
        let compiled = compile(&spec).unwrap();
        let keys: Vec<_> = compiled.equations.keys().cloned().collect();
        // Declaration order, not file order of the equations section.
        assert_eq!(keys, vec!["f_Bank", "f_Firm"]);
    }

    #[test]
    fn derivative_references_stay_symbolic() {
        let spec = with_sections(
            r#"
[equations.ode]
f_Bank = "g - r*L"
f_Firm = "f_Bank + w"
"#,
        );
        let compiled = compile(&spec).unwrap();
        // No textual inlining of f_Bank into f_Firm.
        assert_eq!(compiled.equations["f_Firm"], "f_Bank + w");
    }
}
