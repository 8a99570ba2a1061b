use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tilestitch_core::params::{OutputFormat, ParameterFields, ScanPattern, StitchingParameters};

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    #[value(name = ".ome.zarr")]
    OmeZarr,
    #[value(name = ".ome.tiff")]
    OmeTiff,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::OmeZarr => OutputFormat::OmeZarr,
            OutputFormatArg::OmeTiff => OutputFormat::OmeTiff,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScanPatternArg {
    #[value(name = "Unidirectional")]
    Unidirectional,
    #[value(name = "S-Pattern")]
    SPattern,
}

impl From<ScanPatternArg> for ScanPattern {
    fn from(arg: ScanPatternArg) -> Self {
        match arg {
            ScanPatternArg::Unidirectional => ScanPattern::Unidirectional,
            ScanPatternArg::SPattern => ScanPattern::SPattern,
        }
    }
}

/// Stitching parameter flags shared by `stitch` and `params`.
#[derive(Args)]
pub struct ParameterArgs {
    /// Acquisition folder (holds `0/coordinates.csv`)
    #[arg(short, long)]
    pub input_folder: Option<PathBuf>,

    /// Output container format
    #[arg(short = 'f', long, value_enum, default_value = ".ome.zarr")]
    pub output_format: OutputFormatArg,

    /// Apply flatfield correction
    #[arg(long)]
    pub apply_flatfield: bool,

    /// Register overlapping tiles
    #[arg(short = 'r', long)]
    pub use_registration: bool,

    /// Channel used for registration (default: first available)
    #[arg(long)]
    pub registration_channel: Option<String>,

    /// Z-level used for registration
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub registration_z_level: i64,

    /// Chain registration shifts tile by tile instead of a uniform grid correction
    #[arg(long)]
    pub dynamic_registration: bool,

    /// Acquisition scan pattern
    #[arg(short, long, value_enum, default_value = "Unidirectional")]
    pub scan_pattern: ScanPatternArg,

    /// Merge all timepoints into one dataset per region
    #[arg(long)]
    pub merge_timepoints: bool,

    /// Merge all HCS regions (wells) into one plate dataset
    #[arg(long)]
    pub merge_hcs_regions: bool,
}

impl ParameterArgs {
    pub fn to_fields(&self) -> Result<ParameterFields> {
        let input_folder = self
            .input_folder
            .clone()
            .context("--input-folder is required")?;
        Ok(ParameterFields {
            output_format: OutputFormat::from(self.output_format).to_string(),
            apply_flatfield: self.apply_flatfield,
            use_registration: self.use_registration,
            registration_channel: self.registration_channel.clone(),
            registration_z_level: self.registration_z_level,
            dynamic_registration: self.dynamic_registration,
            scan_pattern: ScanPattern::from(self.scan_pattern).to_string(),
            merge_timepoints: self.merge_timepoints,
            merge_hcs_regions: self.merge_hcs_regions,
            ..ParameterFields::new(input_folder)
        })
    }

    pub fn to_parameters(&self) -> Result<StitchingParameters> {
        StitchingParameters::from_fields(self.to_fields()?).context("Invalid stitching parameters")
    }
}
