//! Stitching parameters.
//!
//! [`ParameterFields`] is the loose, serde-facing shape shared by the CLI and
//! parameter documents. [`StitchingParameters`] is the validated, read-only
//! form consumed by one orchestration run. Both [`StitchingParameters::from_fields`]
//! and [`StitchingParameters::from_document`] funnel through the same
//! validation, so a document holding the same values as a set of fields
//! always yields an equal object.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};

/// Output container of the stitched dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Tiled multiscale pyramid in an OME-Zarr store.
    #[default]
    OmeZarr,
    /// Multi-resolution (multi-page) OME-TIFF.
    OmeTiff,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 2] = [Self::OmeZarr, Self::OmeTiff];

    /// File extension, leading dot included.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::OmeZarr => ".ome.zarr",
            Self::OmeTiff => ".ome.tiff",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = StitchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension() == s)
            .ok_or_else(|| {
                StitchError::config(
                    "output_format",
                    format!("{s:?} is not one of \".ome.zarr\", \".ome.tiff\""),
                )
            })
    }
}

/// Order in which the microscope visited the FOVs of a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScanPattern {
    /// Every row left to right.
    #[default]
    Unidirectional,
    /// Serpentine: odd rows right to left.
    SPattern,
}

impl ScanPattern {
    pub const ALL: [ScanPattern; 2] = [Self::Unidirectional, Self::SPattern];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unidirectional => "Unidirectional",
            Self::SPattern => "S-Pattern",
        }
    }
}

impl fmt::Display for ScanPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanPattern {
    type Err = StitchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|pattern| pattern.as_str() == s)
            .ok_or_else(|| {
                StitchError::config(
                    "scan_pattern",
                    format!("{s:?} is not one of \"Unidirectional\", \"S-Pattern\""),
                )
            })
    }
}

/// Discrete parameter values, as written in a parameter document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterFields {
    pub input_folder: PathBuf,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub apply_flatfield: bool,
    #[serde(default)]
    pub use_registration: bool,
    #[serde(default)]
    pub registration_channel: Option<String>,
    #[serde(default)]
    pub registration_z_level: i64,
    #[serde(default = "default_scan_pattern")]
    pub scan_pattern: String,
    #[serde(default)]
    pub merge_timepoints: bool,
    #[serde(default)]
    pub merge_hcs_regions: bool,
    #[serde(default)]
    pub dynamic_registration: bool,
}

fn default_output_format() -> String {
    OutputFormat::default().to_string()
}

fn default_scan_pattern() -> String {
    ScanPattern::default().to_string()
}

impl ParameterFields {
    /// Defaults for everything except the input folder.
    pub fn new(input_folder: impl Into<PathBuf>) -> Self {
        Self {
            input_folder: input_folder.into(),
            output_format: default_output_format(),
            apply_flatfield: false,
            use_registration: false,
            registration_channel: None,
            registration_z_level: 0,
            scan_pattern: default_scan_pattern(),
            merge_timepoints: false,
            merge_hcs_regions: false,
            dynamic_registration: false,
        }
    }
}

/// Validated stitching parameters for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct StitchingParameters {
    input_folder: PathBuf,
    output_format: OutputFormat,
    apply_flatfield: bool,
    use_registration: bool,
    registration_channel: Option<String>,
    registration_z_level: u32,
    dynamic_registration: bool,
    scan_pattern: ScanPattern,
    merge_timepoints: bool,
    merge_hcs_regions: bool,
}

impl StitchingParameters {
    /// Validate discrete field values.
    pub fn from_fields(fields: ParameterFields) -> Result<Self> {
        let output_format: OutputFormat = fields.output_format.parse()?;
        let scan_pattern: ScanPattern = fields.scan_pattern.parse()?;

        if !fields.input_folder.is_dir() {
            return Err(StitchError::config(
                "input_folder",
                format!("{} does not exist", fields.input_folder.display()),
            ));
        }

        let registration_z_level = u32::try_from(fields.registration_z_level).map_err(|_| {
            StitchError::config(
                "registration_z_level",
                format!("{} is not a valid z-level", fields.registration_z_level),
            )
        })?;

        Ok(Self {
            input_folder: fields.input_folder,
            output_format,
            apply_flatfield: fields.apply_flatfield,
            use_registration: fields.use_registration,
            registration_channel: fields.registration_channel,
            registration_z_level,
            dynamic_registration: fields.dynamic_registration,
            scan_pattern,
            merge_timepoints: fields.merge_timepoints,
            merge_hcs_regions: fields.merge_hcs_regions,
        })
    }

    /// Load a parameter document: TOML for `.toml` files, JSON otherwise.
    pub fn from_document(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StitchError::NotFound {
                what: "Parameter document",
                path: path.to_path_buf(),
            },
            _ => StitchError::Io(e),
        })?;
        let fields: ParameterFields = if is_toml(path) {
            toml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)?
        };
        Self::from_fields(fields)
    }

    /// Discrete field values of this object.
    pub fn to_fields(&self) -> ParameterFields {
        ParameterFields {
            input_folder: self.input_folder.clone(),
            output_format: self.output_format.to_string(),
            apply_flatfield: self.apply_flatfield,
            use_registration: self.use_registration,
            registration_channel: self.registration_channel.clone(),
            registration_z_level: i64::from(self.registration_z_level),
            scan_pattern: self.scan_pattern.to_string(),
            merge_timepoints: self.merge_timepoints,
            merge_hcs_regions: self.merge_hcs_regions,
            dynamic_registration: self.dynamic_registration,
        }
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_fields())?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.to_fields())?)
    }

    /// Write a document readable by [`Self::from_document`], format chosen by extension.
    pub fn write_document(&self, path: &Path) -> Result<()> {
        let contents = if is_toml(path) {
            self.to_toml_string()?
        } else {
            self.to_json_string()?
        };
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn input_folder(&self) -> &Path {
        &self.input_folder
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn apply_flatfield(&self) -> bool {
        self.apply_flatfield
    }

    pub fn use_registration(&self) -> bool {
        self.use_registration
    }

    /// `None` means the engine picks the first available channel.
    pub fn registration_channel(&self) -> Option<&str> {
        self.registration_channel.as_deref()
    }

    pub fn registration_z_level(&self) -> u32 {
        self.registration_z_level
    }

    pub fn dynamic_registration(&self) -> bool {
        self.dynamic_registration
    }

    pub fn scan_pattern(&self) -> ScanPattern {
        self.scan_pattern
    }

    pub fn merge_timepoints(&self) -> bool {
        self.merge_timepoints
    }

    pub fn merge_hcs_regions(&self) -> bool {
        self.merge_hcs_regions
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_display_roundtrip() {
        for format in OutputFormat::ALL {
            assert_eq!(format.to_string().parse::<OutputFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_output_format_rejects_unknown() {
        let err = "zarr".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, StitchError::Config { field: "output_format", .. }));
    }

    #[test]
    fn test_scan_pattern_strings() {
        assert_eq!(ScanPattern::SPattern.to_string(), "S-Pattern");
        assert_eq!("Unidirectional".parse::<ScanPattern>().unwrap(), ScanPattern::Unidirectional);
    }

    #[test]
    fn test_fields_defaults() {
        let fields = ParameterFields::new("/data");
        assert_eq!(fields.output_format, ".ome.zarr");
        assert_eq!(fields.scan_pattern, "Unidirectional");
        assert_eq!(fields.registration_z_level, 0);
        assert!(fields.registration_channel.is_none());
    }
}
