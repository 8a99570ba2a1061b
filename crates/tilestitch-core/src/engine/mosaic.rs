//! Mosaic composition: tiles onto region canvases, canvases onto plates and time series.

use ndarray::{s, Array2};
use tracing::warn;

use super::layout::RegionLayout;

/// A stitched 5D dataset, planes stored per `(t, c, z)`.
#[derive(Clone, Debug)]
pub struct Mosaic {
    pub name: String,
    pub channels: Vec<String>,
    pub timepoints: Vec<u32>,
    pub z_levels: Vec<u32>,
    pub pixel_size_um: Option<f64>,
    /// Indexed by `(t * channels + c) * z_levels + z`, all of the same shape.
    pub planes: Vec<Array2<f32>>,
}

impl Mosaic {
    /// `(height, width)` of every plane.
    pub fn plane_dim(&self) -> (usize, usize) {
        self.planes.first().map_or((0, 0), Array2::dim)
    }

    /// `[t, c, z, y, x]`.
    pub fn shape(&self) -> [usize; 5] {
        let (h, w) = self.plane_dim();
        [
            self.timepoints.len(),
            self.channels.len(),
            self.z_levels.len(),
            h,
            w,
        ]
    }

    pub fn plane_index(&self, t: usize, c: usize, z: usize) -> usize {
        (t * self.channels.len() + c) * self.z_levels.len() + z
    }

    pub fn plane(&self, t: usize, c: usize, z: usize) -> &Array2<f32> {
        &self.planes[self.plane_index(t, c, z)]
    }
}

/// Paint tiles onto a blank canvas in layout (traversal) order; later tiles
/// overwrite earlier ones where they overlap. `tile_for` returns `None` for
/// missing tiles, which leave their area blank.
pub fn compose_plane<'a, F>(layout: &RegionLayout, mut tile_for: F) -> (Array2<f32>, usize)
where
    F: FnMut(u64) -> Option<&'a Array2<f32>>,
{
    let (height, width) = layout.canvas_size();
    let mut canvas = Array2::<f32>::zeros((height, width));
    let mut missing = 0;

    for placement in &layout.placements {
        let Some(tile) = tile_for(placement.fov) else {
            missing += 1;
            continue;
        };
        let y0 = placement.y.round().max(0.0) as usize;
        let x0 = placement.x.round().max(0.0) as usize;
        let (th, tw) = tile.dim();
        let y1 = (y0 + th).min(height);
        let x1 = (x0 + tw).min(width);
        if y1 <= y0 || x1 <= x0 {
            continue;
        }
        canvas
            .slice_mut(s![y0..y1, x0..x1])
            .assign(&tile.slice(s![..y1 - y0, ..x1 - x0]));
    }

    (canvas, missing)
}

/// Concatenate mosaics of the same region along the time axis.
///
/// Every input must have the same channels, z-levels and plane shape.
pub fn merge_timepoints(name: String, mosaics: Vec<Mosaic>) -> Option<Mosaic> {
    let first = mosaics.first()?;
    let channels = first.channels.clone();
    let z_levels = first.z_levels.clone();
    let pixel_size_um = first.pixel_size_um;
    let dim = first.plane_dim();
    if mosaics
        .iter()
        .any(|m| m.channels != channels || m.z_levels != z_levels || m.plane_dim() != dim)
    {
        return None;
    }

    let mut timepoints = Vec::new();
    let mut planes = Vec::new();
    for mosaic in mosaics {
        timepoints.extend(mosaic.timepoints);
        planes.extend(mosaic.planes);
    }
    Some(Mosaic {
        name,
        channels,
        timepoints,
        z_levels,
        pixel_size_um,
        planes,
    })
}

/// Plate `(row, column)` of a well name like `A1` or `AB12`.
pub fn well_position(region: &str) -> Option<(usize, usize)> {
    let split = region.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = region.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    let column: usize = digits.parse().ok()?;
    let row = letters.bytes().try_fold(0usize, |acc, b| {
        acc.checked_mul(26)?.checked_add(usize::from(b - b'A' + 1))
    })?;
    Some((row - 1, column.checked_sub(1)?))
}

/// Montage region mosaics onto one plate canvas.
///
/// Regions go to their well position when every region name is a well name,
/// otherwise into a single row in the given order. Each cell is as large as
/// the largest region. Inputs must share timepoints, channels and z-levels.
pub fn plate_montage(name: String, regions: Vec<Mosaic>) -> Option<Mosaic> {
    let first = regions.first()?;
    let channels = first.channels.clone();
    let timepoints = first.timepoints.clone();
    let z_levels = first.z_levels.clone();
    let pixel_size_um = first.pixel_size_um;
    if regions
        .iter()
        .any(|m| m.channels != channels || m.timepoints != timepoints || m.z_levels != z_levels)
    {
        return None;
    }

    let wells: Option<Vec<(usize, usize)>> =
        regions.iter().map(|m| well_position(&m.name)).collect();
    let cells = wells.unwrap_or_else(|| {
        warn!("Region names are not well names; placing regions in a single row");
        (0..regions.len()).map(|i| (0, i)).collect()
    });

    let min_row = cells.iter().map(|c| c.0).min().unwrap_or(0);
    let min_col = cells.iter().map(|c| c.1).min().unwrap_or(0);
    let rows = cells.iter().map(|c| c.0 - min_row).max().unwrap_or(0) + 1;
    let cols = cells.iter().map(|c| c.1 - min_col).max().unwrap_or(0) + 1;
    let cell_h = regions.iter().map(|m| m.plane_dim().0).max().unwrap_or(0);
    let cell_w = regions.iter().map(|m| m.plane_dim().1).max().unwrap_or(0);

    let plane_count = first.planes.len();
    let mut planes = vec![Array2::<f32>::zeros((rows * cell_h, cols * cell_w)); plane_count];
    for (mosaic, &(row, col)) in regions.iter().zip(&cells) {
        let y0 = (row - min_row) * cell_h;
        let x0 = (col - min_col) * cell_w;
        for (dst, src) in planes.iter_mut().zip(&mosaic.planes) {
            let (h, w) = src.dim();
            dst.slice_mut(s![y0..y0 + h, x0..x0 + w]).assign(src);
        }
    }

    Some(Mosaic {
        name,
        channels,
        timepoints,
        z_levels,
        pixel_size_um,
        planes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_position() {
        assert_eq!(well_position("A1"), Some((0, 0)));
        assert_eq!(well_position("C12"), Some((2, 11)));
        assert_eq!(well_position("AA3"), Some((26, 2)));
        assert_eq!(well_position("manual0"), None);
        assert_eq!(well_position("A0"), None);
        assert_eq!(well_position("12"), None);
        assert_eq!(well_position("ABCDEFGHIJKLMNOP1"), None);
    }
}
