//! Illumination flatfield: the average tile of a channel, normalized to mean 1.

use ndarray::Array2;
use tracing::warn;

use crate::consts::FLATFIELD_FLOOR;

/// Estimate a flatfield from tiles of one channel.
///
/// Tiles whose shape differs from the first are ignored. Returns `None` when
/// there are no tiles or the average is entirely dark.
pub fn estimate_flatfield<'a, I>(tiles: I) -> Option<Array2<f32>>
where
    I: IntoIterator<Item = &'a Array2<f32>>,
{
    let mut sum: Option<Array2<f64>> = None;
    let mut count = 0usize;
    let mut skipped = 0usize;

    for tile in tiles {
        let acc = sum.get_or_insert_with(|| Array2::zeros(tile.dim()));
        if acc.dim() != tile.dim() {
            skipped += 1;
            continue;
        }
        acc.zip_mut_with(tile, |a, &v| *a += f64::from(v));
        count += 1;
    }
    if skipped > 0 {
        warn!(skipped, "Tiles with mismatched shape left out of flatfield");
    }

    let sum = sum?;
    let mean_tile = sum.mapv(|v| v / count as f64);
    let overall = mean_tile.mean()?;
    if overall <= 0.0 {
        return None;
    }
    Some(mean_tile.mapv(|v| ((v / overall) as f32).max(FLATFIELD_FLOOR)))
}

/// Divide a tile by the flatfield in place. Mismatched shapes are left untouched.
pub fn apply_flatfield(tile: &mut Array2<f32>, flatfield: &Array2<f32>) -> bool {
    if tile.dim() != flatfield.dim() {
        return false;
    }
    tile.zip_mut_with(flatfield, |v, &f| *v = (*v / f).clamp(0.0, 1.0));
    true
}
