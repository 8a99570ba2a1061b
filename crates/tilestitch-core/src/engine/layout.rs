//! Tile placement inside a region's canvas.

use std::collections::{HashMap, HashSet};

use crate::coords::CanonicalTable;
use crate::params::ScanPattern;

/// Where one FOV lands on the region canvas, in pixels from the canvas origin.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePlacement {
    pub fov: u64,
    pub row: u64,
    pub col: u64,
    pub y: f64,
    pub x: f64,
}

/// Placements of every FOV of one region, in scan-traversal order.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionLayout {
    pub region: String,
    pub placements: Vec<TilePlacement>,
    pub tile_height: usize,
    pub tile_width: usize,
}

impl RegionLayout {
    /// Canvas `(height, width)` covering every placed tile.
    pub fn canvas_size(&self) -> (usize, usize) {
        let height = self
            .placements
            .iter()
            .map(|p| p.y.round().max(0.0) as usize + self.tile_height)
            .max()
            .unwrap_or(0);
        let width = self
            .placements
            .iter()
            .map(|p| p.x.round().max(0.0) as usize + self.tile_width)
            .max()
            .unwrap_or(0);
        (height, width)
    }

    /// Index of each placement by grid `(row, col)`.
    pub fn grid_index(&self) -> HashMap<(u64, u64), usize> {
        self.placements
            .iter()
            .enumerate()
            .map(|(idx, p)| ((p.row, p.col), idx))
            .collect()
    }

    /// Shift all placements so the smallest y and x are zero.
    pub fn rebase(&mut self) {
        let min_y = self.placements.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let min_x = self.placements.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        if !min_y.is_finite() || !min_x.is_finite() {
            return;
        }
        for p in &mut self.placements {
            p.y -= min_y;
            p.x -= min_x;
        }
    }
}

/// Sort placements into the order the microscope visited them.
pub fn sort_traversal(placements: &mut [TilePlacement], pattern: ScanPattern) {
    placements.sort_by_key(|p| {
        let col_key = match pattern {
            ScanPattern::SPattern if p.row % 2 == 1 => u64::MAX - p.col,
            _ => p.col,
        };
        (p.row, col_key)
    });
}

/// One entry per FOV of `region`, taking the stage position of its first record.
fn region_fovs(table: &CanonicalTable, region: &str) -> Vec<(u64, f64, f64)> {
    let mut seen = HashSet::new();
    let mut fovs = Vec::new();
    for record in table.records_for(region) {
        if seen.insert(record.fov) {
            fovs.push((record.fov, record.y_mm, record.x_mm));
        }
    }
    fovs
}

/// Place tiles at their stage positions.
///
/// Stage millimeters convert to pixels through `pixel_size_um`; stage y
/// increases with image rows.
pub fn coordinate_layout(
    table: &CanonicalTable,
    region: &str,
    pixel_size_um: f64,
    tile_dims: (usize, usize),
    pattern: ScanPattern,
) -> RegionLayout {
    let mm_to_px = 1000.0 / pixel_size_um;
    let mut placements: Vec<TilePlacement> = region_fovs(table, region)
        .into_iter()
        .map(|(fov, y_mm, x_mm)| {
            let (row, col) = table.grid_position(fov);
            TilePlacement {
                fov,
                row,
                col,
                y: y_mm * mm_to_px,
                x: x_mm * mm_to_px,
            }
        })
        .collect();
    sort_traversal(&mut placements, pattern);

    let mut layout = RegionLayout {
        region: region.to_string(),
        placements,
        tile_height: tile_dims.0,
        tile_width: tile_dims.1,
    };
    layout.rebase();
    layout
}

/// Place tiles on a regular grid from their FOV numbers.
///
/// `step_px` is the `(dy, dx)` distance between neighbouring FOVs; `None`
/// abuts tiles edge to edge.
pub fn grid_layout(
    table: &CanonicalTable,
    region: &str,
    step_px: Option<(f64, f64)>,
    tile_dims: (usize, usize),
    pattern: ScanPattern,
) -> RegionLayout {
    let (step_y, step_x) = step_px.unwrap_or((tile_dims.0 as f64, tile_dims.1 as f64));
    let mut placements: Vec<TilePlacement> = region_fovs(table, region)
        .into_iter()
        .map(|(fov, _, _)| {
            let (row, col) = table.grid_position(fov);
            TilePlacement {
                fov,
                row,
                col,
                y: row as f64 * step_y,
                x: col as f64 * step_x,
            }
        })
        .collect();
    sort_traversal(&mut placements, pattern);

    let mut layout = RegionLayout {
        region: region.to_string(),
        placements,
        tile_height: tile_dims.0,
        tile_width: tile_dims.1,
    };
    layout.rebase();
    layout
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(row: u64, col: u64) -> TilePlacement {
        TilePlacement {
            fov: row * 3 + col,
            row,
            col,
            y: 0.0,
            x: 0.0,
        }
    }

    fn order(pattern: ScanPattern) -> Vec<u64> {
        let mut placements: Vec<TilePlacement> = (0..2)
            .flat_map(|r| (0..3).map(move |c| placement(r, c)))
            .rev()
            .collect();
        sort_traversal(&mut placements, pattern);
        placements.iter().map(|p| p.fov).collect()
    }

    #[test]
    fn test_unidirectional_traversal_is_row_major() {
        assert_eq!(order(ScanPattern::Unidirectional), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_serpentine_traversal_reverses_odd_rows() {
        assert_eq!(order(ScanPattern::SPattern), vec![0, 1, 2, 5, 4, 3]);
    }
}
