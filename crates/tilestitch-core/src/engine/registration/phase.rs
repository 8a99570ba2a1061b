//! FFT phase correlation between two equally sized strips.

use ndarray::Array2;
use num_complex::Complex;
use rustfft::FftPlanner;

/// Displacement that aligns `target` onto `reference`: `reference(p) ≈ target(p - shift)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Shift {
    pub dy: f64,
    pub dx: f64,
}

/// Phase-correlate two arrays of identical shape.
///
/// Returns `None` when the shapes differ or either array is empty.
pub fn phase_correlate(reference: &Array2<f32>, target: &Array2<f32>) -> Option<Shift> {
    let (h, w) = reference.dim();
    if target.dim() != (h, w) || h == 0 || w == 0 {
        return None;
    }

    let ref_fft = fft2d(&apply_hann(reference));
    let tgt_fft = fft2d(&apply_hann(target));
    let correlation = ifft2d(&normalized_cross_power(&ref_fft, &tgt_fft));

    let (peak_row, peak_col) = find_peak(&correlation);

    // Indices past the midpoint are negative shifts.
    let dy = if peak_row > h / 2 {
        peak_row as f64 - h as f64
    } else {
        peak_row as f64
    };
    let dx = if peak_col > w / 2 {
        peak_col as f64 - w as f64
    } else {
        peak_col as f64
    };

    let (sub_dy, sub_dx) = refine_peak(&correlation, peak_row, peak_col);
    Some(Shift {
        dy: dy + sub_dy,
        dx: dx + sub_dx,
    })
}

/// Zero-mean, Hann-windowed copy.
fn apply_hann(data: &Array2<f32>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mean = data.mean().map_or(0.0, f64::from);
    let mut result = Array2::<f64>::zeros((h, w));

    for row in 0..h {
        let wy = 0.5 * (1.0 - (std::f64::consts::TAU * row as f64 / h as f64).cos());
        for col in 0..w {
            let wx = 0.5 * (1.0 - (std::f64::consts::TAU * col as f64 / w as f64).cos());
            result[[row, col]] = (f64::from(data[[row, col]]) - mean) * wy * wx;
        }
    }

    result
}

/// 2D FFT: row-wise FFT, then column-wise FFT.
fn fft2d(data: &Array2<f64>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = data.mapv(|v| Complex::new(v, 0.0));
    transform_rows(&mut result, |row| fft_row.process(row));
    transform_cols(&mut result, |col| fft_col.process(col));
    result
}

/// Inverse 2D FFT, real part, normalized.
fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();
    transform_cols(&mut work, |col| ifft_col.process(col));
    transform_rows(&mut work, |row| ifft_row.process(row));

    let scale = 1.0 / (h * w) as f64;
    work.mapv(|c| c.re * scale)
}

fn transform_rows<F: FnMut(&mut [Complex<f64>])>(data: &mut Array2<Complex<f64>>, mut f: F) {
    let mut buf = Vec::with_capacity(data.ncols());
    for mut row in data.rows_mut() {
        buf.clear();
        buf.extend(row.iter().copied());
        f(&mut buf);
        row.iter_mut().zip(&buf).for_each(|(dst, src)| *dst = *src);
    }
}

fn transform_cols<F: FnMut(&mut [Complex<f64>])>(data: &mut Array2<Complex<f64>>, mut f: F) {
    let mut buf = Vec::with_capacity(data.nrows());
    for mut col in data.columns_mut() {
        buf.clear();
        buf.extend(col.iter().copied());
        f(&mut buf);
        col.iter_mut().zip(&buf).for_each(|(dst, src)| *dst = *src);
    }
}

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f64>>,
    tgt_fft: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut result = ref_fft.clone();
    result.zip_mut_with(tgt_fft, |r, t| {
        let cross = *r * t.conj();
        let mag = cross.norm();
        *r = if mag > 1e-12 {
            cross / mag
        } else {
            Complex::new(0.0, 0.0)
        };
    });
    result
}

fn find_peak(data: &Array2<f64>) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_val = f64::NEG_INFINITY;
    for ((row, col), &val) in data.indexed_iter() {
        if val > best_val {
            best_val = val;
            best = (row, col);
        }
    }
    best
}

/// Parabola fit through the 3x3 neighbourhood of the peak, clamped to half a pixel.
fn refine_peak(correlation: &Array2<f64>, peak_row: usize, peak_col: usize) -> (f64, f64) {
    let (h, w) = correlation.dim();
    if peak_row == 0 || peak_row + 1 >= h || peak_col == 0 || peak_col + 1 >= w {
        return (0.0, 0.0);
    }

    let fit = |prev: f64, curr: f64, next: f64| {
        let denom = prev - 2.0 * curr + next;
        if denom.abs() > 1e-12 {
            ((prev - next) / (2.0 * denom)).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };

    let delta_row = fit(
        correlation[[peak_row - 1, peak_col]],
        correlation[[peak_row, peak_col]],
        correlation[[peak_row + 1, peak_col]],
    );
    let delta_col = fit(
        correlation[[peak_row, peak_col - 1]],
        correlation[[peak_row, peak_col]],
        correlation[[peak_row, peak_col + 1]],
    );
    (delta_row, delta_col)
}
