use std::sync::Arc;

use tracing::info;

use crate::coords::CoordinateCache;
use crate::engine::{create_engine, EngineKind, StitchedDatasetHandle, StitchingEngine};
use crate::error::Result;
use crate::params::StitchingParameters;

use super::types::{NoOpReporter, ProgressReporter, RunStage};

/// Binds coordinate normalization to a stitching engine for one run.
pub struct Orchestrator {
    cache: CoordinateCache,
    engine: EngineKind,
    reporter: Arc<dyn ProgressReporter>,
}

impl Orchestrator {
    pub fn new(cache: CoordinateCache) -> Self {
        Self {
            cache,
            engine: EngineKind::default(),
            reporter: Arc::new(NoOpReporter),
        }
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    /// Normalize coordinates, then stitch with the configured built-in engine.
    pub fn run(&self, params: StitchingParameters) -> Result<StitchedDatasetHandle> {
        let engine = create_engine(self.engine, Arc::clone(&self.reporter));
        self.run_with_engine(params, engine.as_ref())
    }

    /// Normalize coordinates, then hand them to `engine`.
    ///
    /// The engine's result is returned as is. Engine errors are not retried.
    pub fn run_with_engine(
        &self,
        params: StitchingParameters,
        engine: &dyn StitchingEngine,
    ) -> Result<StitchedDatasetHandle> {
        self.reporter
            .begin_stage(RunStage::NormalizingCoordinates, None);
        let processed = self.cache.process_coordinates(params.input_folder());
        self.reporter.finish_stage();
        let processed = processed?;

        log_parameters(&params);
        info!(
            engine = engine.name(),
            coordinates = %processed.path.display(),
            rows = processed.table.len(),
            "Starting stitching engine"
        );

        let handle = engine.run(&params, &processed.table)?;
        info!(
            output_dir = %handle.output_dir.display(),
            datasets = handle.datasets.len(),
            "Stitching complete"
        );
        Ok(handle)
    }
}

fn log_parameters(params: &StitchingParameters) {
    info!(input_folder = %params.input_folder().display(), "Input folder");
    info!(output_format = %params.output_format(), "Output format");
    info!(apply_flatfield = params.apply_flatfield(), "Flatfield correction");
    info!(use_registration = params.use_registration(), "Registration");
    if params.use_registration() {
        info!(
            registration_channel = params.registration_channel().unwrap_or("<first available>"),
            "Registration channel"
        );
        info!(registration_z_level = params.registration_z_level(), "Registration z-level");
        info!(
            dynamic_registration = params.dynamic_registration(),
            "Dynamic registration"
        );
    }
    info!(scan_pattern = %params.scan_pattern(), "Scan pattern");
    info!(merge_timepoints = params.merge_timepoints(), "Merge timepoints");
    info!(merge_hcs_regions = params.merge_hcs_regions(), "Merge HCS regions");
}

/// Run with the per-user coordinate cache and the coordinate engine.
pub fn run_stitching(params: StitchingParameters) -> Result<StitchedDatasetHandle> {
    Orchestrator::new(CoordinateCache::user_default()?).run(params)
}
