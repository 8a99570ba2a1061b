mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tilestitch", about = "Microscope tile stitching tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize coordinates and stitch an acquisition
    Stitch(commands::stitch::StitchArgs),
    /// Normalize an acquisition's coordinates only
    Normalize(commands::normalize::NormalizeArgs),
    /// Print or write a parameter document
    Params(commands::params::ParamsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Stitch(args) => commands::stitch::run(args),
        Commands::Normalize(args) => commands::normalize::run(args),
        Commands::Params(args) => commands::params::run(args),
    }
}
