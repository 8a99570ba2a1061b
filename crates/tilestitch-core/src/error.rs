use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("Missing required column(s) {} in {}", columns.join(", "), path.display())]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("Invalid value {value:?} in column '{column}' at line {line} of {}", path.display())]
    InvalidValue {
        path: PathBuf,
        column: &'static str,
        line: u64,
        value: String,
    },

    #[error("Invalid parameter '{field}': {message}")]
    Config { field: &'static str, message: String },

    #[error("{engine} engine error: {message}")]
    Engine { engine: &'static str, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TIFF encoding error: {0}")]
    Tiff(#[from] tiff::TiffError),
}

impl StitchError {
    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn engine(engine: &'static str, message: impl Into<String>) -> Self {
        Self::Engine {
            engine,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StitchError>;
