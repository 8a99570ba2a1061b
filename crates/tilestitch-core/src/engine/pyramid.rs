//! Resolution levels of a stitched plane.

use ndarray::Array2;

use crate::consts::{PYRAMID_MAX_LEVELS, PYRAMID_MIN_SIZE};

/// Number of levels (full resolution included) for a `(height, width)` canvas.
///
/// Halves until the longer side is at most [`PYRAMID_MIN_SIZE`].
pub fn level_count(height: usize, width: usize) -> usize {
    let mut levels = 1;
    let mut longest = height.max(width);
    while longest > PYRAMID_MIN_SIZE && levels < PYRAMID_MAX_LEVELS {
        longest = longest.div_ceil(2);
        levels += 1;
    }
    levels
}

/// Downsample by 2x, averaging each 2x2 block. Odd edges average what exists.
pub fn downsample_2x(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let new_h = h.div_ceil(2);
    let new_w = w.div_ceil(2);
    let mut result = Array2::<f32>::zeros((new_h, new_w));

    for r in 0..new_h {
        for c in 0..new_w {
            let mut sum = 0.0;
            let mut count = 0.0;
            for row in (r * 2)..(r * 2 + 2).min(h) {
                for col in (c * 2)..(c * 2 + 2).min(w) {
                    sum += data[[row, col]];
                    count += 1.0;
                }
            }
            result[[r, c]] = sum / count;
        }
    }

    result
}

/// `levels` planes, index 0 at full resolution, each next one half the size.
pub fn build_levels(plane: &Array2<f32>, levels: usize) -> Vec<Array2<f32>> {
    let mut pyramid = Vec::with_capacity(levels);
    pyramid.push(plane.clone());
    for _ in 1..levels {
        let next = match pyramid.last() {
            Some(prev) => downsample_2x(prev),
            None => break,
        };
        pyramid.push(next);
    }
    pyramid
}
