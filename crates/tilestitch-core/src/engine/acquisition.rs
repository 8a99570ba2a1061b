//! Acquisition folder discovery: timepoint folders, tile files and the
//! microscope's acquisition metadata.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::consts::{ACQUISITION_PARAMETERS_FILE, TILE_EXTENSIONS};
use crate::coords::CanonicalTable;
use crate::error::{Result, StitchError};

/// Address of one tile image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub timepoint: u32,
    pub region: String,
    pub fov: u64,
    pub z_level: u32,
    pub channel: String,
}

/// One timepoint folder (`<input>/<n>`).
#[derive(Clone, Debug, PartialEq)]
pub struct Timepoint {
    pub index: u32,
    pub dir: PathBuf,
}

/// Objective section of `acquisition parameters.json`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ObjectiveMetadata {
    pub magnification: Option<f64>,
    pub tube_lens_f_mm: Option<f64>,
}

/// The subset of `acquisition parameters.json` the engines need.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AcquisitionMetadata {
    pub pixel_size_um: Option<f64>,
    pub sensor_pixel_size_um: Option<f64>,
    pub tube_lens_mm: Option<f64>,
    #[serde(default)]
    pub objective: ObjectiveMetadata,
    #[serde(rename = "dx(mm)")]
    pub dx_mm: Option<f64>,
    #[serde(rename = "dy(mm)")]
    pub dy_mm: Option<f64>,
}

impl AcquisitionMetadata {
    /// Read `<input>/acquisition parameters.json`; absent file means no metadata.
    pub fn load(input_folder: &Path) -> Result<Option<Self>> {
        let path = input_folder.join(ACQUISITION_PARAMETERS_FILE);
        if !path.is_file() {
            debug!(path = %path.display(), "No acquisition metadata");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Object-space pixel size in micrometers.
    ///
    /// An explicit `pixel_size_um` wins; otherwise derived from the sensor
    /// pixel size and the effective magnification of the objective behind
    /// the system's tube lens.
    pub fn pixel_size_um(&self) -> Option<f64> {
        if let Some(size) = self.pixel_size_um.filter(|s| *s > 0.0) {
            return Some(size);
        }
        let sensor = self.sensor_pixel_size_um?;
        let magnification = self.objective.magnification?;
        let effective = match (self.objective.tube_lens_f_mm, self.tube_lens_mm) {
            (Some(objective_tube), Some(system_tube)) if objective_tube > 0.0 => {
                magnification / (objective_tube / system_tube)
            }
            _ => magnification,
        };
        (effective > 0.0).then(|| sensor / effective)
    }

    /// Nominal stage step between neighbouring FOVs, `(dy, dx)` in millimeters.
    pub fn grid_step_mm(&self) -> Option<(f64, f64)> {
        Some((self.dy_mm?, self.dx_mm?))
    }
}

/// Everything the engines know about an input folder besides coordinates.
#[derive(Clone, Debug)]
pub struct Acquisition {
    pub timepoints: Vec<Timepoint>,
    /// Channel names in sorted order.
    pub channels: Vec<String>,
    pub tiles: HashMap<TileKey, PathBuf>,
    pub metadata: AcquisitionMetadata,
}

impl Acquisition {
    /// Scan an input folder for timepoints and tiles of the regions in `coordinates`.
    pub fn discover(input_folder: &Path, coordinates: &CanonicalTable) -> Result<Self> {
        let timepoints = discover_timepoints(input_folder)?;
        let regions = coordinates.regions();

        let mut tiles = HashMap::new();
        let mut channels = BTreeSet::new();
        for timepoint in &timepoints {
            for entry in std::fs::read_dir(&timepoint.dir)? {
                let path = entry?.path();
                if !is_tile_file(&path) {
                    continue;
                }
                let Some(stem) = tile_stem(&path) else {
                    continue;
                };
                let Some(key) = parse_tile_name(stem, timepoint.index, &regions) else {
                    debug!(path = %path.display(), "Skipping file with unrecognised name");
                    continue;
                };
                if timepoint.index == timepoints[0].index {
                    channels.insert(key.channel.clone());
                }
                tiles.insert(key, path);
            }
        }

        // Channels come from the first timepoint, which must hold tiles.
        if channels.is_empty() {
            return Err(StitchError::NotFound {
                what: "Tile images",
                path: timepoints[0].dir.clone(),
            });
        }

        let metadata = AcquisitionMetadata::load(input_folder)?.unwrap_or_default();
        debug!(
            timepoints = timepoints.len(),
            channels = channels.len(),
            tiles = tiles.len(),
            "Discovered acquisition"
        );

        Ok(Self {
            timepoints,
            channels: channels.into_iter().collect(),
            tiles,
            metadata,
        })
    }
}

/// Numeric subfolders of the input folder, ascending.
pub fn discover_timepoints(input_folder: &Path) -> Result<Vec<Timepoint>> {
    let mut timepoints = Vec::new();
    for entry in std::fs::read_dir(input_folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(|n| n.parse::<u32>().ok()) {
            timepoints.push(Timepoint {
                index,
                dir: entry.path(),
            });
        }
    }
    timepoints.sort_by_key(|t| t.index);

    if timepoints.is_empty() {
        warn!(path = %input_folder.display(), "No timepoint folders");
        return Err(StitchError::NotFound {
            what: "Timepoint folders",
            path: input_folder.to_path_buf(),
        });
    }
    Ok(timepoints)
}

fn is_tile_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| TILE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn tile_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Parse `<region>_<fov>_<z_level>_<channel>`.
///
/// Region names may themselves contain underscores, so the known regions are
/// matched as prefixes, longest first. The channel is everything after the
/// z-level and may contain underscores too.
pub fn parse_tile_name(stem: &str, timepoint: u32, regions: &[&str]) -> Option<TileKey> {
    let mut candidates: Vec<&str> = regions.to_vec();
    candidates.sort_by_key(|r| std::cmp::Reverse(r.len()));

    candidates.into_iter().find_map(|region| {
        let rest = stem.strip_prefix(region)?.strip_prefix('_')?;
        let mut parts = rest.splitn(3, '_');
        let fov = parts.next()?.parse().ok()?;
        let z_level = parts.next()?.parse().ok()?;
        let channel = parts.next().filter(|c| !c.is_empty())?;
        Some(TileKey {
            timepoint,
            region: region.to_string(),
            fov,
            z_level,
            channel: channel.to_string(),
        })
    })
}
