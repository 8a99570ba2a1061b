use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tilestitch_core::coords::CoordinateCache;
use tilestitch_core::engine::EngineKind;
use tilestitch_core::params::StitchingParameters;
use tilestitch_core::pipeline::Orchestrator;
use tracing::debug;

use super::args::ParameterArgs;
use super::progress::SpinnerReporter;
use crate::summary::{print_outputs, print_parameter_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum EngineArg {
    Coordinate,
    Grid,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Coordinate => EngineKind::Coordinate,
            EngineArg::Grid => EngineKind::Grid,
        }
    }
}

#[derive(Args)]
pub struct StitchArgs {
    #[command(flatten)]
    pub params: ParameterArgs,

    /// Parameter document (JSON, or TOML by extension); overrides every other parameter flag
    #[arg(long)]
    pub params_json: Option<PathBuf>,

    /// Stitching engine
    #[arg(long, value_enum, default_value = "coordinate")]
    pub engine: EngineArg,
}

pub fn run(args: &StitchArgs) -> Result<()> {
    let params = match &args.params_json {
        Some(path) => StitchingParameters::from_document(path)
            .with_context(|| format!("Failed to load parameters from {}", path.display()))?,
        None => args.params.to_parameters()?,
    };
    let engine = EngineKind::from(args.engine);

    print_parameter_summary(&params, Some(engine));

    let cache = CoordinateCache::user_default()?;
    debug!(cache = %cache.dir().display(), "Coordinate cache");
    let reporter = Arc::new(SpinnerReporter::new()?);
    let orchestrator = Orchestrator::new(cache)
        .with_engine(engine)
        .with_reporter(reporter.clone());

    let result = orchestrator.run(params);
    reporter.finish();
    let handle = result.context("Stitching failed")?;

    print_outputs(&handle);
    Ok(())
}
