//! Julia solver source emission.
//!
//! Two artifacts per model, built from the same compiled equation set:
//! `<name>.jl` attaches to the shared region, re-reads parameters from
//! it, and honors the control byte; `<name>_cmdl.jl` bakes the spec
//! values in as constants and runs standalone. Field offsets in the
//! shared artifact come straight from [`Schema`], so both sides of the
//! process boundary agree on the layout by construction.

use std::path::{Path, PathBuf};

use cosim_model::ModelSpec;
use cosim_schema::{segment_name, ScalarType, Schema, STATE_FIELD};

use crate::compile::CompiledEquations;
use crate::error::CompileError;

/// Paths of the two generated artifacts.
#[derive(Debug, Clone)]
pub struct EmittedArtifacts {
    /// Shared-memory-aware solver, launched by the supervisor.
    pub shared: PathBuf,
    /// Standalone solver for offline runs.
    pub standalone: PathBuf,
}

/// Path of the shared-memory-aware artifact for a model.
pub fn shared_artifact_path(out_dir: &Path, model: &str) -> PathBuf {
    out_dir.join(format!("{model}.jl"))
}

/// Path of the standalone artifact for a model.
pub fn standalone_artifact_path(out_dir: &Path, model: &str) -> PathBuf {
    out_dir.join(format!("{model}_cmdl.jl"))
}

/// Write both solver artifacts into `out_dir`.
pub fn emit_artifacts(
    spec: &ModelSpec,
    schema: &Schema,
    equations: &CompiledEquations,
    out_dir: &Path,
) -> Result<EmittedArtifacts, CompileError> {
    let shared = shared_artifact_path(out_dir, &spec.name);
    let standalone = standalone_artifact_path(out_dir, &spec.name);

    write_artifact(&shared, &shared_source(spec, schema, equations))?;
    write_artifact(&standalone, &standalone_source(spec, equations))?;

    Ok(EmittedArtifacts { shared, standalone })
}

fn write_artifact(path: &Path, source: &str) -> Result<(), CompileError> {
    std::fs::write(path, source).map_err(|source| CompileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Render the shared-memory-aware solver source.
pub fn shared_source(spec: &ModelSpec, schema: &Schema, equations: &CompiledEquations) -> String {
    let mut lines: Vec<String> = Vec::new();
    let name = &spec.name;

    lines.push(format!("# {name}.jl — generated by cosim, do not edit."));
    lines.push("# Shared-memory solver: attaches to the controller's segment and".to_string());
    lines.push("# honors the control byte (i/r/p/s/f).".to_string());
    lines.push(String::new());
    lines.push("using DifferentialEquations".to_string());
    lines.push("using Mmap".to_string());
    lines.push(String::new());
    lines.push(format!(
        "const SHM_PATH = \"/dev/shm/{}\"",
        segment_name(name)
    ));
    lines.push(format!("const SHM_SIZE = {}", schema.total_size()));
    lines.push(String::new());
    lines.push("# Packed field offsets (0-based); must match the controller's schema.".to_string());
    for field in schema.fields() {
        lines.push(format!("const OFF_{} = {}", field.name, field.offset));
    }
    lines.push(String::new());

    lines.push("function open_shared()".to_string());
    lines.push(
        "    isfile(SHM_PATH) || error(\"shared region not found at $(SHM_PATH); is the controller running?\")"
            .to_string(),
    );
    lines.push(
        "    filesize(SHM_PATH) == SHM_SIZE || error(\"shared region size mismatch; regenerate the solver\")"
            .to_string(),
    );
    lines.push("    io = open(SHM_PATH, \"r+\")".to_string());
    lines.push("    return Mmap.mmap(io, Vector{UInt8}, SHM_SIZE)".to_string());
    lines.push("end".to_string());
    lines.push(String::new());
    lines.push("read_f64(arr, off) = reinterpret(Float64, arr[off+1:off+8])[1]".to_string());
    lines.push("read_i32(arr, off) = reinterpret(Int32, arr[off+1:off+4])[1]".to_string());
    lines.push(format!("read_state(arr) = Char(arr[OFF_{STATE_FIELD}+1])"));
    lines.push(format!(
        "write_state!(arr, c) = arr[OFF_{STATE_FIELD}+1] = UInt8(c)"
    ));
    lines.push(String::new());

    lines.push("function read_params(arr)".to_string());
    if spec.parameters.is_empty() {
        lines.push("    return NamedTuple()".to_string());
    } else {
        lines.push("    return (".to_string());
        for field in schema.fields() {
            let reader = match field.ty {
                ScalarType::Float64 => "read_f64",
                ScalarType::Int32 => "read_i32",
                ScalarType::Char => continue,
            };
            if field.name == "t0" || field.name == "t1" {
                continue;
            }
            lines.push(format!(
                "        {} = {reader}(arr, OFF_{}),",
                field.name, field.name
            ));
        }
        lines.push("    )".to_string());
    }
    lines.push("end".to_string());
    lines.push(String::new());

    lines.extend(rhs_function(spec, equations));
    lines.push(String::new());

    lines.push("function main()".to_string());
    lines.push("    arr = open_shared()".to_string());
    lines.push("    # Wait out the controller's initialization window.".to_string());
    lines.push("    while read_state(arr) == 'i'".to_string());
    lines.push("        sleep(0.05)".to_string());
    lines.push("    end".to_string());
    lines.push("    p = read_params(arr)".to_string());
    lines.push("    t0 = read_f64(arr, OFF_t0)".to_string());
    lines.push("    t1 = read_f64(arr, OFF_t1)".to_string());
    lines.push(format!("    u0 = {}", initial_vector(spec)));
    lines.push(format!(
        "    prob = ODEProblem({name}_rhs!, u0, (t0, t1), p)"
    ));
    lines.push(format!(
        "    integrator = init(prob, {}(); dt = {:?})",
        spec.method, spec.dt
    ));
    lines.push("    while integrator.t < t1".to_string());
    lines.push("        s = read_state(arr)".to_string());
    lines.push("        if s == 's'".to_string());
    lines.push("            break".to_string());
    lines.push("        elseif s == 'p'".to_string());
    lines.push("            sleep(0.1)".to_string());
    lines.push("            continue".to_string());
    lines.push("        end".to_string());
    lines.push(format!("        step!(integrator, {:?}, true)", spec.dt));
    lines.push("    end".to_string());
    lines.push("    write_state!(arr, 'f')".to_string());
    lines.push("    return nothing".to_string());
    lines.push("end".to_string());
    lines.push(String::new());
    lines.push("main()".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Render the standalone solver source (no shared-memory code; spec
/// values baked in as constants).
pub fn standalone_source(spec: &ModelSpec, equations: &CompiledEquations) -> String {
    let mut lines: Vec<String> = Vec::new();
    let name = &spec.name;

    lines.push(format!(
        "# {name}_cmdl.jl — generated by cosim, do not edit."
    ));
    lines.push("# Standalone solver: runs the static specification, no controller.".to_string());
    lines.push(String::new());
    lines.push("using DifferentialEquations".to_string());
    lines.push("using DelimitedFiles".to_string());
    lines.push(String::new());

    lines.extend(rhs_function(spec, equations));
    lines.push(String::new());

    lines.push("function main()".to_string());
    if spec.parameters.is_empty() {
        lines.push("    p = NamedTuple()".to_string());
    } else {
        lines.push("    p = (".to_string());
        for (pname, value) in &spec.parameters {
            lines.push(format!("        {pname} = {},", julia_literal(*value)));
        }
        lines.push("    )".to_string());
    }
    lines.push(format!("    u0 = {}", initial_vector(spec)));
    lines.push(format!(
        "    prob = ODEProblem({name}_rhs!, u0, ({:?}, {:?}), p)",
        spec.t0, spec.t1
    ));
    lines.push(format!(
        "    sol = solve(prob, {}(); saveat = {:?})",
        spec.method, spec.dt
    ));
    lines.push(format!(
        "    writedlm(\"{name}_results.csv\", hcat(sol.t, reduce(hcat, sol.u)'), ',')"
    ));
    lines.push(format!("    println(\"wrote {name}_results.csv\")"));
    lines.push("    return nothing".to_string());
    lines.push("end".to_string());
    lines.push(String::new());
    lines.push("main()".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// The in-place right-hand-side function shared by both artifacts.
///
/// State variables unpack positionally, auxiliary expressions come next,
/// then each derivative binds to a local `f_<var>` in declaration order —
/// which is what keeps `f_<other>` references symbolic: a later equation
/// simply reads the local an earlier one assigned.
fn rhs_function(spec: &ModelSpec, equations: &CompiledEquations) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("function {}_rhs!(du, u, p, t)", spec.name));
    for (i, variable) in spec.variables.iter().enumerate() {
        lines.push(format!("    {variable} = u[{}]", i + 1));
    }
    if !spec.parameters.is_empty() {
        let names: Vec<_> = spec.parameters.keys().cloned().collect();
        lines.push(format!("    (; {}) = p", names.join(", ")));
    }
    for (aux_name, expr) in &equations.auxiliary {
        lines.push(format!("    {aux_name} = {expr}"));
    }
    for (key, expr) in &equations.equations {
        lines.push(format!("    {key} = {expr}"));
    }
    for (i, variable) in spec.variables.iter().enumerate() {
        lines.push(format!(
            "    du[{}] = {}",
            i + 1,
            ModelSpec::derivative_key(variable)
        ));
    }
    lines.push("    return nothing".to_string());
    lines.push("end".to_string());
    lines
}

fn initial_vector(spec: &ModelSpec) -> String {
    let values: Vec<String> = spec
        .variables
        .iter()
        .map(|v| format!("{:?}", spec.initial_value(v)))
        .collect();
    format!("Float64[{}]", values.join(", "))
}

fn julia_literal(value: cosim_model::ParamValue) -> String {
    match value {
        cosim_model::ParamValue::Int(v) => format!("Int32({v})"),
        cosim_model::ParamValue::Float(v) => format!("{v:?}"),
    }
}
