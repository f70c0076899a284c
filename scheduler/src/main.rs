#![forbid(unsafe_code)]
use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use log::{debug, error};
use mrcpsp::EngineKind;

mod commands;

#[derive(Debug, Parser)]
/// Multi-mode resource constrained project scheduler
struct App {
    #[command(flatten)]
    verbose: Verbosity,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate random instances
    Generate(Generate),
    /// Solve a batch of instances and write the results
    Solve(Solve),
    /// Re-verify a stored solution against its instance
    Check {
        #[arg(required = true)]
        instance: PathBuf,
        #[arg(required = true)]
        solution: PathBuf,
    },
    /// Create a graphviz notation of the precedence graph of an instance
    Graph {
        #[arg(required = true)]
        instance: PathBuf,
        #[arg(required = true)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct Generate {
    /// Generator configuration, defaults are used without one
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct Solve {
    /// Batch configuration
    #[arg(short, long, required = true)]
    config: PathBuf,
    /// Overrides the configured engine (milp, tabu_search)
    #[arg(long)]
    engine: Option<EngineKind>,
    /// Overrides the configured time limit in seconds, 0 disables it
    #[arg(long)]
    time_limit: Option<f64>,
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> ExitCode {
    let args: App = App::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    debug!("{args:?}");

    match match args.command {
        Commands::Generate(generate) => commands::generate(generate),
        Commands::Solve(solve) => commands::solve(solve),
        Commands::Check { instance, solution } => commands::check(instance, solution),
        Commands::Graph { instance, output } => commands::graph(instance, output),
    } {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            error!("An error occurred: {err:#}");
            ExitCode::from(3)
        }
    }
}
