use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::consts::{ACQUISITION_PARAMETERS_FILE, OUTPUT_DIR_SUFFIX};
use crate::coords::CanonicalTable;
use crate::error::{Result, StitchError};
use crate::params::StitchingParameters;
use crate::pipeline::{ProgressReporter, RunStage};

use super::acquisition::{Acquisition, TileKey};
use super::flatfield::{apply_flatfield, estimate_flatfield};
use super::layout::{coordinate_layout, grid_layout, RegionLayout};
use super::mosaic::{compose_plane, merge_timepoints, plate_montage, Mosaic};
use super::registration::register_layout;
use super::tile::load_tile;
use super::writer::write_mosaic;
use super::{DatasetInfo, StitchedDatasetHandle, StitchingEngine};

/// Places every tile at its recorded stage position.
pub struct CoordinateStitcher {
    reporter: Arc<dyn ProgressReporter>,
}

impl CoordinateStitcher {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self { reporter }
    }
}

impl StitchingEngine for CoordinateStitcher {
    fn name(&self) -> &'static str {
        "coordinate"
    }

    fn run(
        &self,
        params: &StitchingParameters,
        coordinates: &CanonicalTable,
    ) -> Result<StitchedDatasetHandle> {
        let job = StitchJob::prepare(self.name(), params, coordinates, self.reporter.as_ref())?;
        let pixel_size_um = job.acquisition.metadata.pixel_size_um().ok_or_else(|| {
            StitchError::engine(
                self.name(),
                format!(
                    "pixel size unknown; {} needs pixel_size_um or sensor and objective optics",
                    ACQUISITION_PARAMETERS_FILE
                ),
            )
        })?;
        job.run(|region, dims| {
            coordinate_layout(coordinates, region, pixel_size_um, dims, params.scan_pattern())
        })
    }
}

/// Places tiles on a regular grid derived from their FOV numbers.
pub struct GridStitcher {
    reporter: Arc<dyn ProgressReporter>,
}

impl GridStitcher {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self { reporter }
    }
}

impl StitchingEngine for GridStitcher {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn run(
        &self,
        params: &StitchingParameters,
        coordinates: &CanonicalTable,
    ) -> Result<StitchedDatasetHandle> {
        let job = StitchJob::prepare(self.name(), params, coordinates, self.reporter.as_ref())?;
        let metadata = &job.acquisition.metadata;
        let step_px = match (metadata.grid_step_mm(), metadata.pixel_size_um()) {
            (Some((dy, dx)), Some(pixel)) => Some((dy * 1000.0 / pixel, dx * 1000.0 / pixel)),
            _ => None,
        };
        job.run(|region, dims| grid_layout(coordinates, region, step_px, dims, params.scan_pattern()))
    }
}

/// Tiles loaded and corrected, ready to be laid out.
struct StitchJob<'a> {
    engine: &'static str,
    params: &'a StitchingParameters,
    coordinates: &'a CanonicalTable,
    reporter: &'a dyn ProgressReporter,
    acquisition: Acquisition,
    tiles: HashMap<TileKey, Array2<f32>>,
    tile_dims: (usize, usize),
}

impl<'a> StitchJob<'a> {
    fn prepare(
        engine: &'static str,
        params: &'a StitchingParameters,
        coordinates: &'a CanonicalTable,
        reporter: &'a dyn ProgressReporter,
    ) -> Result<Self> {
        reporter.begin_stage(RunStage::Discovering, None);
        let acquisition = Acquisition::discover(params.input_folder(), coordinates)?;
        reporter.finish_stage();

        let tiles = load_tiles(&acquisition, reporter)?;
        let tile_dims = uniform_tile_dims(engine, &tiles)?;

        let mut job = Self {
            engine,
            params,
            coordinates,
            reporter,
            acquisition,
            tiles,
            tile_dims,
        };
        if params.apply_flatfield() {
            job.correct_flatfield();
        }
        Ok(job)
    }

    fn first_timepoint(&self) -> u32 {
        self.acquisition.timepoints[0].index
    }

    /// Divide every tile by its channel's flatfield, estimated on the first timepoint.
    fn correct_flatfield(&mut self) {
        let channels = self.acquisition.channels.clone();
        let first = self.first_timepoint();
        self.reporter.begin_stage(RunStage::Flatfield, Some(channels.len()));
        for (done, channel) in channels.iter().enumerate() {
            let flatfield = estimate_flatfield(
                self.tiles
                    .iter()
                    .filter(|(k, _)| k.timepoint == first && &k.channel == channel)
                    .map(|(_, tile)| tile),
            );
            match flatfield {
                Some(flat) => {
                    self.tiles
                        .par_iter_mut()
                        .filter(|(k, _)| &k.channel == channel)
                        .for_each(|(_, tile)| {
                            apply_flatfield(tile, &flat);
                        });
                }
                None => warn!(%channel, "No usable tiles for flatfield estimation"),
            }
            self.reporter.advance(done + 1);
        }
        self.reporter.finish_stage();
    }

    fn run<F>(self, layout_for: F) -> Result<StitchedDatasetHandle>
    where
        F: Fn(&str, (usize, usize)) -> RegionLayout,
    {
        let mut layouts: Vec<RegionLayout> = self
            .coordinates
            .regions()
            .into_iter()
            .map(|region| layout_for(region, self.tile_dims))
            .collect();

        if self.params.use_registration() {
            self.register(&mut layouts)?;
        }

        let mosaics = self.compose(&layouts);
        let datasets = self.group(mosaics)?;
        self.write(datasets)
    }

    fn register(&self, layouts: &mut [RegionLayout]) -> Result<()> {
        let channel = match self.params.registration_channel() {
            Some(name) if self.acquisition.channels.iter().any(|c| c == name) => name.to_string(),
            Some(name) => {
                return Err(StitchError::engine(
                    self.engine,
                    format!(
                        "registration channel {name:?} not found; available: {}",
                        self.acquisition.channels.join(", ")
                    ),
                ))
            }
            None => self.acquisition.channels[0].clone(),
        };
        let z_level = self.params.registration_z_level();
        if !self.coordinates.z_levels().contains(&z_level) {
            return Err(StitchError::engine(
                self.engine,
                format!("registration z-level {z_level} not present in coordinates"),
            ));
        }

        let first = self.first_timepoint();
        self.reporter
            .begin_stage(RunStage::Registration, Some(layouts.len()));
        for (done, layout) in layouts.iter_mut().enumerate() {
            let reference: HashMap<u64, &Array2<f32>> = self
                .tiles
                .iter()
                .filter(|(k, _)| {
                    k.timepoint == first
                        && k.region == layout.region
                        && k.z_level == z_level
                        && k.channel == channel
                })
                .map(|(k, tile)| (k.fov, tile))
                .collect();
            let outcome = register_layout(layout, &reference, self.params.dynamic_registration());
            info!(
                region = %layout.region,
                %channel,
                z_level,
                pairs = outcome.pairs,
                accepted = outcome.accepted,
                "Registration"
            );
            self.reporter.advance(done + 1);
        }
        self.reporter.finish_stage();
        Ok(())
    }

    /// One mosaic per `(region, timepoint)`, region-major.
    fn compose(&self, layouts: &[RegionLayout]) -> Vec<Vec<Mosaic>> {
        let channels = &self.acquisition.channels;
        let z_levels = self.coordinates.z_levels();
        let pixel_size_um = self.acquisition.metadata.pixel_size_um();
        let total = layouts.len() * self.acquisition.timepoints.len();
        self.reporter.begin_stage(RunStage::Composing, Some(total));

        let mut done = 0;
        let mut result = Vec::with_capacity(layouts.len());
        for layout in layouts {
            let mut per_timepoint = Vec::with_capacity(self.acquisition.timepoints.len());
            for timepoint in &self.acquisition.timepoints {
                let plane_keys: Vec<(&String, u32)> = channels
                    .iter()
                    .flat_map(|c| z_levels.iter().map(move |&z| (c, z)))
                    .collect();
                let composed: Vec<(Array2<f32>, usize)> = plane_keys
                    .par_iter()
                    .map(|&(channel, z_level)| {
                        compose_plane(layout, |fov| {
                            self.tiles.get(&TileKey {
                                timepoint: timepoint.index,
                                region: layout.region.clone(),
                                fov,
                                z_level,
                                channel: channel.clone(),
                            })
                        })
                    })
                    .collect();

                let missing: usize = composed.iter().map(|(_, m)| m).sum();
                if missing > 0 {
                    warn!(
                        region = %layout.region,
                        timepoint = timepoint.index,
                        missing,
                        "Tiles missing from mosaic"
                    );
                }
                per_timepoint.push(Mosaic {
                    name: format!("{}_t{}", layout.region, timepoint.index),
                    channels: channels.clone(),
                    timepoints: vec![timepoint.index],
                    z_levels: z_levels.clone(),
                    pixel_size_um,
                    planes: composed.into_iter().map(|(plane, _)| plane).collect(),
                });
                done += 1;
                self.reporter.advance(done);
            }
            result.push(per_timepoint);
        }
        self.reporter.finish_stage();
        result
    }

    /// Apply the timepoint and region merge settings.
    fn group(&self, mosaics: Vec<Vec<Mosaic>>) -> Result<Vec<Mosaic>> {
        let regions = self.coordinates.regions();
        let inconsistent = |what: &str| {
            StitchError::engine(self.engine, format!("cannot merge {what}: mosaics differ in shape"))
        };

        if self.params.merge_timepoints() {
            let merged = regions
                .iter()
                .zip(mosaics)
                .map(|(region, series)| {
                    merge_timepoints(region.to_string(), series).ok_or_else(|| inconsistent("timepoints"))
                })
                .collect::<Result<Vec<_>>>()?;
            return if self.params.merge_hcs_regions() {
                let plate = plate_montage("plate".to_string(), merged)
                    .ok_or_else(|| inconsistent("regions"))?;
                Ok(vec![plate])
            } else {
                Ok(merged)
            };
        }

        if !self.params.merge_hcs_regions() {
            return Ok(mosaics.into_iter().flatten().collect());
        }

        // Transpose region-major into timepoint-major, then one plate per timepoint.
        let mut per_timepoint: Vec<Vec<Mosaic>> = Vec::new();
        for (region, series) in regions.iter().zip(mosaics) {
            for (t, mut mosaic) in series.into_iter().enumerate() {
                // Plate cells are placed by well name.
                mosaic.name = region.to_string();
                if per_timepoint.len() <= t {
                    per_timepoint.push(Vec::new());
                }
                per_timepoint[t].push(mosaic);
            }
        }
        per_timepoint
            .into_iter()
            .zip(&self.acquisition.timepoints)
            .map(|(region_mosaics, timepoint)| {
                plate_montage(format!("plate_t{}", timepoint.index), region_mosaics)
                    .ok_or_else(|| inconsistent("regions"))
            })
            .collect()
    }

    fn write(self, mosaics: Vec<Mosaic>) -> Result<StitchedDatasetHandle> {
        let output_dir = output_dir_for(self.params.input_folder())?;
        std::fs::create_dir_all(&output_dir)?;
        let format = self.params.output_format();

        self.reporter
            .begin_stage(RunStage::Writing, Some(mosaics.len()));
        let mut datasets = Vec::with_capacity(mosaics.len());
        for (done, mosaic) in mosaics.iter().enumerate() {
            let path = output_dir.join(format!("{}{}", mosaic.name, format.extension()));
            let levels = write_mosaic(mosaic, format, &path)?;
            info!(path = %path.display(), levels, "Dataset written");
            datasets.push(DatasetInfo {
                name: mosaic.name.clone(),
                path,
                shape: mosaic.shape(),
                levels,
                channels: mosaic.channels.clone(),
            });
            self.reporter.advance(done + 1);
        }
        self.reporter.finish_stage();

        Ok(StitchedDatasetHandle {
            output_dir,
            format,
            datasets,
        })
    }
}

/// Load every discovered tile, in parallel.
fn load_tiles(
    acquisition: &Acquisition,
    reporter: &dyn ProgressReporter,
) -> Result<HashMap<TileKey, Array2<f32>>> {
    reporter.begin_stage(RunStage::LoadingTiles, Some(acquisition.tiles.len()));
    let loaded = AtomicUsize::new(0);
    let tiles = acquisition
        .tiles
        .par_iter()
        .map(|(key, path)| {
            let tile = load_tile(path)?;
            reporter.advance(loaded.fetch_add(1, Ordering::Relaxed) + 1);
            Ok((key.clone(), tile))
        })
        .collect::<Result<HashMap<_, _>>>()?;
    reporter.finish_stage();
    Ok(tiles)
}

fn uniform_tile_dims(engine: &'static str, tiles: &HashMap<TileKey, Array2<f32>>) -> Result<(usize, usize)> {
    let mut dims = tiles.values().map(Array2::dim);
    let first = dims
        .next()
        .ok_or_else(|| StitchError::engine(engine, "no tiles loaded"))?;
    if let Some(other) = dims.find(|d| *d != first) {
        return Err(StitchError::engine(
            engine,
            format!(
                "tiles differ in size: {}x{} and {}x{}",
                first.1, first.0, other.1, other.0
            ),
        ));
    }
    Ok(first)
}

/// `<parent>/<input name>_stitched`.
pub(crate) fn output_dir_for(input_folder: &Path) -> Result<PathBuf> {
    let absolute = std::fs::canonicalize(input_folder)?;
    let name = absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let parent = absolute.parent().unwrap_or(&absolute);
    Ok(parent.join(format!("{name}{OUTPUT_DIR_SUFFIX}")))
}
