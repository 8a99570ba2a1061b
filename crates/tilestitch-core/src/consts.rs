/// Subfolder of the input folder holding the first acquisition (timepoint 0).
pub const FIRST_ACQUISITION_DIR: &str = "0";

/// Raw per-acquisition coordinate log, relative to the first acquisition folder.
pub const COORDINATES_FILE: &str = "coordinates.csv";

/// Acquisition metadata written by the microscope next to the timepoint folders.
pub const ACQUISITION_PARAMETERS_FILE: &str = "acquisition parameters.json";

/// Per-user directory (under the home directory) holding processed coordinate tables.
pub const PROCESSED_DIR_NAME: &str = ".image_stitcher_processed";

/// File name prefix of processed coordinate tables inside the cache directory.
pub const PROCESSED_FILE_PREFIX: &str = "coordinates_processed_";

/// Suffix appended to the input folder name to form the output directory.
pub const OUTPUT_DIR_SUFFIX: &str = "_stitched";

pub const COL_REGION: &str = "region";
pub const COL_I: &str = "i";
pub const COL_J: &str = "j";
pub const COL_FOV: &str = "fov";
pub const COL_Z_LEVEL: &str = "z_level";
pub const COL_X_MM: &str = "x (mm)";
pub const COL_Y_MM: &str = "y (mm)";
pub const COL_Z_UM: &str = "z (um)";

/// Columns every raw coordinate table must carry, in canonical order.
pub const REQUIRED_RAW_COLUMNS: [&str; 7] = [
    COL_REGION, COL_I, COL_J, COL_Z_LEVEL, COL_X_MM, COL_Y_MM, COL_Z_UM,
];

/// Tile file extensions recognised by the built-in engines.
pub const TILE_EXTENSIONS: [&str; 4] = ["tiff", "tif", "png", "bmp"];

/// Lower bound applied to the normalized flatfield before dividing tiles by it.
pub const FLATFIELD_FLOOR: f32 = 1e-3;

/// Overlap strips narrower than this (in pixels) are not registered.
pub const MIN_REGISTRATION_OVERLAP_PX: usize = 8;

/// Registration shifts larger than this fraction of the overlap width are rejected.
pub const MAX_REGISTRATION_SHIFT_FRACTION: f64 = 0.5;

/// Resolution levels are added until the longer canvas side is at most this many pixels.
pub const PYRAMID_MIN_SIZE: usize = 512;

/// Upper bound on the number of resolution levels (including full resolution).
pub const PYRAMID_MAX_LEVELS: usize = 8;

/// Edge length of Zarr chunks along the y and x axes.
pub const ZARR_CHUNK_SIZE: usize = 1024;

/// Full-scale value of 16-bit output samples.
pub const U16_MAX_F32: f32 = 65535.0;
