use std::path::Path;

use ndarray::Array2;

use crate::consts::U16_MAX_F32;
use crate::error::Result;

/// Load a tile as a grayscale plane with values in [0.0, 1.0].
pub fn load_tile(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (w, h) = gray.dimensions();
    let mut data = Array2::<f32>::zeros((h as usize, w as usize));

    for (col, row, pixel) in gray.enumerate_pixels() {
        data[[row as usize, col as usize]] = f32::from(pixel.0[0]) / U16_MAX_F32;
    }

    Ok(data)
}

/// Quantize a [0.0, 1.0] plane to 16-bit samples, row-major.
pub fn to_u16_samples(plane: &Array2<f32>) -> Vec<u16> {
    plane
        .iter()
        .map(|v| (v.clamp(0.0, 1.0) * U16_MAX_F32).round() as u16)
        .collect()
}
