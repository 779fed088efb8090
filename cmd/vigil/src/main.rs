//! vigil - enrollment, administration and replay for the vigil engine.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod paths;

use commands::{
    ConfigCommand, ConflictsCommand, EnrollCommand, IdentifyCommand, ReplayCommand,
    SubjectCommand, VectorsCommand,
};

/// vigil - identity resolution and temporal stabilization.
///
/// Manages the subject store (enrollment, merging, cleanup) and runs the
/// engine over recorded feature-vector streams.
///
/// Configuration is read from ~/.vigil/config.yaml and the store lives in
/// ~/.vigil/data/vigil.redb unless overridden.
#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Identity resolution and temporal stabilization engine")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.vigil/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Store file (default is ~/.vigil/data/vigil.redb)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show or initialise the configuration
    Config(ConfigCommand),
    /// Manage subjects
    Subject(SubjectCommand),
    /// Enroll reference vectors for a subject
    Enroll(EnrollCommand),
    /// Manage reference vectors
    Vectors(VectorsCommand),
    /// List reference vectors of two subjects that lie too close together
    Conflicts(ConflictsCommand),
    /// Resolve a single vector against the store
    Identify(IdentifyCommand),
    /// Run a recorded frame stream through the engine
    Replay(ReplayCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli),
        Commands::Subject(cmd) => cmd.run(&cli),
        Commands::Enroll(cmd) => cmd.run(&cli),
        Commands::Vectors(cmd) => cmd.run(&cli),
        Commands::Conflicts(cmd) => cmd.run(&cli),
        Commands::Identify(cmd) => cmd.run(&cli),
        Commands::Replay(cmd) => cmd.run(&cli),
    }
}
