use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::info;

use crate::consts::{COORDINATES_FILE, FIRST_ACQUISITION_DIR, PROCESSED_DIR_NAME, PROCESSED_FILE_PREFIX};
use crate::error::{Result, StitchError};

use super::normalize::{normalize, read_raw_table, write_canonical};
use super::record::CanonicalTable;

/// Output of coordinate processing: where the canonical table was cached, and the table itself.
#[derive(Clone, Debug)]
pub struct ProcessedCoordinates {
    pub path: PathBuf,
    pub table: CanonicalTable,
}

/// Directory of processed coordinate tables, one file per input folder.
#[derive(Clone, Debug)]
pub struct CoordinateCache {
    dir: PathBuf,
}

impl CoordinateCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.image_stitcher_processed`.
    pub fn user_default() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| StitchError::NotFound {
            what: "Home directory",
            path: PathBuf::from("~"),
        })?;
        Ok(Self::new(home.join(PROCESSED_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file for an input folder.
    ///
    /// Named after the SHA-256 of the canonicalized absolute path, so the
    /// same folder always maps to the same file regardless of how it was
    /// spelled, and distinct folders never share one.
    pub fn path_for(&self, input_folder: &Path) -> Result<PathBuf> {
        let key = cache_key(input_folder)?;
        Ok(self.dir.join(format!("{PROCESSED_FILE_PREFIX}{key}.csv")))
    }

    /// Normalize `<input_folder>/0/coordinates.csv` and persist the result.
    ///
    /// Nothing is written unless reading and normalization succeed.
    pub fn process_coordinates(&self, input_folder: &Path) -> Result<ProcessedCoordinates> {
        if !input_folder.is_dir() {
            return Err(StitchError::NotFound {
                what: "Input folder",
                path: input_folder.to_path_buf(),
            });
        }
        let source = raw_coordinates_path(input_folder);
        let raw = read_raw_table(&source)?;
        let table = normalize(&raw);

        let path = self.path_for(input_folder)?;
        self.persist(&table, &path)?;

        info!(
            path = %path.display(),
            rows = table.len(),
            unique_fovs = table.unique_fovs(),
            "Processed coordinates saved"
        );
        Ok(ProcessedCoordinates { path, table })
    }

    /// Write to a temporary file in the cache directory, then rename over `path`.
    fn persist(&self, table: &CanonicalTable, path: &Path) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        write_canonical(table, tmp.as_file_mut())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StitchError::Io(e.error))?;
        Ok(())
    }
}

/// Expected location of the raw coordinate log inside an input folder.
pub fn raw_coordinates_path(input_folder: &Path) -> PathBuf {
    input_folder.join(FIRST_ACQUISITION_DIR).join(COORDINATES_FILE)
}

/// Lowercase hex SHA-256 of the canonicalized input folder path.
pub fn cache_key(input_folder: &Path) -> Result<String> {
    let canonical = std::fs::canonicalize(input_folder).map_err(|_| StitchError::NotFound {
        what: "Input folder",
        path: input_folder.to_path_buf(),
    })?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_os_str().as_encoded_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
