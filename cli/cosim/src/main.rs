//! cosim CLI — compile declarative ODE models and supervise the external
//! solver process they run in.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cosim", version, about = "ODE model compiler and co-simulation controller")]
struct Cli {
    /// Directory holding model files and generated artifacts
    #[arg(long, global = true, default_value = "./models")]
    models_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a model and emit both solver artifacts
    Generate {
        /// Model name (reads <models-dir>/<model>.toml)
        model: String,
    },
    /// Print the Godley table and resolved equation set
    Check {
        /// Model name
        model: String,
    },
    /// Print the shared-memory field layout
    Schema {
        /// Model name
        model: String,
        /// Emit the layout as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Create the shared region, launch the solver, and supervise it
    Run {
        /// Model name
        model: String,
        /// Run the standalone artifact, no shared region
        #[arg(long)]
        standalone: bool,
        /// Interpreter for the generated solver
        #[arg(long, default_value = cosim_supervisor::DEFAULT_RUNNER)]
        runner: String,
        /// Regenerate artifacts before launching
        #[arg(long)]
        generate: bool,
    },
    /// Remove generated artifacts and any stale shared region
    Clean {
        /// Model name
        model: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate { model } => commands::generate::run(&cli.models_dir, &model),
        Commands::Check { model } => commands::check::run(&cli.models_dir, &model),
        Commands::Schema { model, json } => commands::schema::run(&cli.models_dir, &model, json),
        Commands::Run {
            model,
            standalone,
            runner,
            generate,
        } => commands::run::run(&cli.models_dir, &model, standalone, &runner, generate),
        Commands::Clean { model } => commands::clean::run(&cli.models_dir, &model),
    }
}
