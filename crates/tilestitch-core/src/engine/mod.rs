//! The stitching engine boundary.
//!
//! An engine receives validated parameters and the canonical coordinate
//! table and produces a stitched dataset. The orchestrator only sees the
//! [`StitchingEngine`] trait; [`EngineKind`] selects one of the built-in
//! implementations.

pub mod acquisition;
pub mod flatfield;
pub mod layout;
pub mod mosaic;
pub mod pyramid;
pub mod registration;
mod stitcher;
pub mod tile;
pub mod writer;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::coords::CanonicalTable;
use crate::error::{Result, StitchError};
use crate::params::{OutputFormat, StitchingParameters};
use crate::pipeline::ProgressReporter;

pub use stitcher::{CoordinateStitcher, GridStitcher};

/// A stitching engine: consumes parameters and canonical coordinates, produces a dataset.
pub trait StitchingEngine {
    /// Short name, used in logs and engine errors.
    fn name(&self) -> &'static str;

    fn run(
        &self,
        params: &StitchingParameters,
        coordinates: &CanonicalTable,
    ) -> Result<StitchedDatasetHandle>;
}

/// Built-in engine selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineKind {
    /// Tiles placed by stage coordinates.
    #[default]
    Coordinate,
    /// Tiles placed on a regular grid by FOV number.
    Grid,
}

impl EngineKind {
    pub const ALL: [EngineKind; 2] = [Self::Coordinate, Self::Grid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coordinate => "coordinate",
            Self::Grid => "grid",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = StitchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StitchError::config("engine", format!("unknown engine {s:?}")))
    }
}

/// Build the engine selected by `kind`.
pub fn create_engine(
    kind: EngineKind,
    reporter: Arc<dyn ProgressReporter>,
) -> Box<dyn StitchingEngine> {
    match kind {
        EngineKind::Coordinate => Box::new(CoordinateStitcher::new(reporter)),
        EngineKind::Grid => Box::new(GridStitcher::new(reporter)),
    }
}

/// One written dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetInfo {
    pub name: String,
    pub path: PathBuf,
    /// `[t, c, z, y, x]` at full resolution.
    pub shape: [usize; 5],
    pub levels: usize,
    pub channels: Vec<String>,
}

/// What a successful engine run produced.
#[derive(Clone, Debug, PartialEq)]
pub struct StitchedDatasetHandle {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub datasets: Vec<DatasetInfo>,
}
