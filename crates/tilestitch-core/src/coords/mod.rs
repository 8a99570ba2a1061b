pub mod cache;
pub mod normalize;
pub mod record;

pub use cache::{cache_key, raw_coordinates_path, CoordinateCache, ProcessedCoordinates};
pub use normalize::{normalize, read_canonical, read_raw_table, write_canonical, CANONICAL_COLUMNS};
pub use record::{CanonicalCoordinateRecord, CanonicalTable, RawCoordinateRecord};
