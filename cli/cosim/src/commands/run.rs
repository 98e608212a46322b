//! `cosim run` — create the shared region, launch the generated solver,
//! and supervise it until it exits.
//!
//! Parameter writes happen only before the solver is spawned (or while
//! the control byte holds `Paused`); the region carries no locks, so
//! that discipline is what keeps reads untorn.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use cosim_codegen::{compile, emit_artifacts, shared_artifact_path, standalone_artifact_path};
use cosim_model::ModelSpec;
use cosim_schema::{ControlState, Schema, SharedRegion, DEFAULT_SHM_DIR};
use cosim_supervisor::SolverProcess;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(
    models_dir: &Path,
    model: &str,
    standalone: bool,
    runner: &str,
    generate: bool,
) -> Result<()> {
    let spec = ModelSpec::load(models_dir, model)
        .with_context(|| format!("loading model '{model}'"))?;

    if generate {
        let schema = Schema::from_spec(&spec);
        let compiled = compile(&spec)?;
        emit_artifacts(&spec, &schema, &compiled, models_dir)
            .with_context(|| format!("regenerating solver sources for '{model}'"))?;
    }

    if standalone {
        run_standalone(models_dir, model, runner)
    } else {
        run_shared(models_dir, &spec, runner, Path::new(DEFAULT_SHM_DIR))
    }
}

fn run_standalone(models_dir: &Path, model: &str, runner: &str) -> Result<()> {
    let script = standalone_artifact_path(models_dir, model);
    let mut solver = SolverProcess::spawn(&script, runner)?;
    println!("Launched {} (standalone)", script.display());

    let status = solver.wait()?;
    report_streams(&mut solver)?;
    if !status.success() {
        bail!("solver exited with {status}");
    }
    println!("Solver finished: {status}");
    Ok(())
}

/// Shared-memory run: owner-open the region, initialize it from the
/// spec, spawn the solver, mark the session running, and poll until the
/// child exits. `shm_dir` is `/dev/shm` in production; tests substitute
/// a tempdir.
fn run_shared(models_dir: &Path, spec: &ModelSpec, runner: &str, shm_dir: &Path) -> Result<()> {
    let mut region = SharedRegion::open_model(shm_dir, spec, true)
        .with_context(|| format!("opening shared region for '{}'", spec.name))?;
    if region.is_owner() {
        println!("Created shared region {}", region.path().display());
    } else {
        println!(
            "Attached to existing session at {}",
            region.path().display()
        );
    }

    let script = shared_artifact_path(models_dir, &spec.name);
    let mut solver = match SolverProcess::spawn(&script, runner) {
        Ok(solver) => solver,
        Err(e) => {
            // Launch failed before the solver ever attached; do not
            // leave an orphaned segment behind.
            region.destroy().ok();
            return Err(e.into());
        }
    };
    println!("Launched {}", script.display());

    region.write_state(ControlState::Running);

    let status = loop {
        if let Some(status) = solver.exit_status()? {
            break status;
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    match region.read_state() {
        Ok(state) => println!("Final control state: {state}"),
        Err(e) => eprintln!("warning: {e}"),
    }
    report_streams(&mut solver)?;

    region
        .destroy()
        .with_context(|| format!("destroying shared region for '{}'", spec.name))?;

    if !status.success() {
        bail!("solver exited with {status}");
    }
    println!("Solver finished: {status}");
    Ok(())
}

fn report_streams(solver: &mut SolverProcess) -> Result<()> {
    let out = solver.stdout_output()?;
    if !out.is_empty() {
        print!("{out}");
    }
    let diag = solver.stderr_output()?;
    if !diag.is_empty() {
        eprint!("{diag}");
    }
    Ok(())
}
