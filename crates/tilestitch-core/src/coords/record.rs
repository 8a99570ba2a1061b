use serde::{Deserialize, Serialize};

/// One row of the raw acquisition log: a tile at grid position `(i, j)`.
#[derive(Clone, Debug, PartialEq)]
pub struct RawCoordinateRecord {
    pub region: String,
    pub i: u32,
    pub j: u32,
    pub z_level: u32,
    pub x_mm: f64,
    pub y_mm: f64,
    pub z_um: f64,
}

/// One row of the normalized table, addressed by a row-major linear FOV index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCoordinateRecord {
    pub region: String,
    pub fov: u64,
    pub z_level: u32,
    #[serde(rename = "x (mm)")]
    pub x_mm: f64,
    #[serde(rename = "y (mm)")]
    pub y_mm: f64,
    #[serde(rename = "z (um)")]
    pub z_um: f64,
}

/// Normalized coordinate table.
///
/// `grid_columns` is the global `max_j` the FOV numbers were computed with,
/// so `fov / grid_columns` and `fov % grid_columns` recover the grid row and
/// column of every record.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalTable {
    pub records: Vec<CanonicalCoordinateRecord>,
    pub grid_columns: u64,
}

impl CanonicalTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Region identifiers in order of first appearance.
    pub fn regions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.region.as_str()) {
                seen.push(&record.region);
            }
        }
        seen
    }

    /// Distinct z-levels, ascending.
    pub fn z_levels(&self) -> Vec<u32> {
        let mut levels: Vec<u32> = self.records.iter().map(|r| r.z_level).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    pub fn records_for<'a>(
        &'a self,
        region: &'a str,
    ) -> impl Iterator<Item = &'a CanonicalCoordinateRecord> + 'a {
        self.records.iter().filter(move |r| r.region == region)
    }

    /// Number of distinct `(region, fov)` pairs.
    pub fn unique_fovs(&self) -> usize {
        let mut keys: Vec<(&str, u64)> = self
            .records
            .iter()
            .map(|r| (r.region.as_str(), r.fov))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    }

    /// Grid `(row, column)` of a FOV number.
    pub fn grid_position(&self, fov: u64) -> (u64, u64) {
        let cols = self.grid_columns.max(1);
        (fov / cols, fov % cols)
    }
}
