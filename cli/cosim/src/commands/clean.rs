//! `cosim clean` — remove generated artifacts and any stale region.

use std::path::{Path, PathBuf};

use anyhow::Result;

use cosim_codegen::{shared_artifact_path, standalone_artifact_path};
use cosim_schema::{segment_name, DEFAULT_SHM_DIR};

pub fn run(models_dir: &Path, model: &str) -> Result<()> {
    let targets = [
        shared_artifact_path(models_dir, model),
        standalone_artifact_path(models_dir, model),
        PathBuf::from(DEFAULT_SHM_DIR).join(segment_name(model)),
    ];

    let mut removed = 0;
    for path in &targets {
        if path.exists() {
            std::fs::remove_file(path)?;
            println!("Removed {}", path.display());
            removed += 1;
        }
    }
    if removed == 0 {
        println!("Already clean: nothing generated for '{model}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_removes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("demo.jl"), "x").unwrap();
        std::fs::write(dir.path().join("demo_cmdl.jl"), "x").unwrap();

        run(dir.path(), "demo").unwrap();
        assert!(!dir.path().join("demo.jl").exists());
        assert!(!dir.path().join("demo_cmdl.jl").exists());
    }

    #[test]
    fn clean_handles_already_clean() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), "demo").unwrap();
    }
}
