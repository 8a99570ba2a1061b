//! Registration of neighbouring tiles.
//!
//! Every horizontally or vertically adjacent pair is phase-correlated over
//! the strip where the layout expects the two tiles to overlap. The
//! resulting residuals (true relative position minus expected relative
//! position) then correct the layout, either uniformly per grid step or
//! tile by tile along the scan traversal.

mod phase;

pub use phase::{phase_correlate, Shift};

use std::collections::HashMap;

use ndarray::{s, Array2};
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{MAX_REGISTRATION_SHIFT_FRACTION, MIN_REGISTRATION_OVERLAP_PX};

use super::layout::RegionLayout;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Vertical,
}

/// Accepted residual for the pair `(from, to)`, `to` being right of or below `from`.
#[derive(Clone, Copy, Debug)]
struct PairResidual {
    from: usize,
    to: usize,
    direction: Direction,
    shift: Shift,
}

/// Counts of a registration pass over one region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub pairs: usize,
    pub accepted: usize,
}

/// Correct `layout` in place using the reference tiles (`fov` → plane).
///
/// `dynamic` chains per-pair residuals along the traversal order; otherwise
/// the median horizontal and vertical residuals are applied to every grid step.
pub fn register_layout(
    layout: &mut RegionLayout,
    tiles: &HashMap<u64, &Array2<f32>>,
    dynamic: bool,
) -> RegistrationOutcome {
    let pairs = neighbour_pairs(layout);
    let residuals: Vec<PairResidual> = pairs
        .par_iter()
        .filter_map(|&(from, to, direction)| {
            let a = *tiles.get(&layout.placements[from].fov)?;
            let b = *tiles.get(&layout.placements[to].fov)?;
            let shift = pair_residual(layout, from, to, a, b)?;
            Some(PairResidual {
                from,
                to,
                direction,
                shift,
            })
        })
        .collect();

    let outcome = RegistrationOutcome {
        pairs: pairs.len(),
        accepted: residuals.len(),
    };
    debug!(
        region = %layout.region,
        pairs = outcome.pairs,
        accepted = outcome.accepted,
        dynamic,
        "Registered tile pairs"
    );
    if residuals.is_empty() {
        return outcome;
    }

    let median_h = median_shift(&residuals, Direction::Horizontal);
    let median_v = median_shift(&residuals, Direction::Vertical);

    if dynamic {
        apply_chained(layout, &residuals, median_h, median_v);
    } else {
        apply_uniform(layout, median_h, median_v);
    }
    layout.rebase();
    outcome
}

fn neighbour_pairs(layout: &RegionLayout) -> Vec<(usize, usize, Direction)> {
    let index = layout.grid_index();
    let mut pairs = Vec::new();
    for (from, p) in layout.placements.iter().enumerate() {
        if let Some(&to) = index.get(&(p.row, p.col + 1)) {
            pairs.push((from, to, Direction::Horizontal));
        }
        if let Some(&to) = index.get(&(p.row + 1, p.col)) {
            pairs.push((from, to, Direction::Vertical));
        }
    }
    pairs
}

/// Residual of tile `to` relative to tile `from`, if the overlap is usable
/// and the measured shift is plausible.
fn pair_residual(
    layout: &RegionLayout,
    from: usize,
    to: usize,
    a: &Array2<f32>,
    b: &Array2<f32>,
) -> Option<Shift> {
    let (h, w) = a.dim();
    if b.dim() != (h, w) {
        return None;
    }
    let pa = &layout.placements[from];
    let pb = &layout.placements[to];
    let ey = (pb.y - pa.y).round() as i64;
    let ex = (pb.x - pa.x).round() as i64;
    let (h_i, w_i) = (h as i64, w as i64);

    // Overlap in `a`'s pixel frame; the same window in `b` is offset by -(ey, ex).
    let y0 = ey.max(0);
    let y1 = (h_i + ey).min(h_i);
    let x0 = ex.max(0);
    let x1 = (w_i + ex).min(w_i);
    let overlap_h = y1 - y0;
    let overlap_w = x1 - x0;
    let min_overlap = MIN_REGISTRATION_OVERLAP_PX as i64;
    if overlap_h < min_overlap || overlap_w < min_overlap {
        return None;
    }

    let strip_a = a.slice(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize]);
    let strip_b = b.slice(s![
        (y0 - ey) as usize..(y1 - ey) as usize,
        (x0 - ex) as usize..(x1 - ex) as usize
    ]);
    let shift = phase_correlate(&strip_a.to_owned(), &strip_b.to_owned())?;

    let limit = MAX_REGISTRATION_SHIFT_FRACTION * overlap_h.min(overlap_w) as f64;
    (shift.dy.abs() <= limit && shift.dx.abs() <= limit).then_some(shift)
}

fn median_shift(residuals: &[PairResidual], direction: Direction) -> Shift {
    let (mut dys, mut dxs): (Vec<f64>, Vec<f64>) = residuals
        .iter()
        .filter(|r| r.direction == direction)
        .map(|r| (r.shift.dy, r.shift.dx))
        .unzip();
    Shift {
        dy: median(&mut dys),
        dx: median(&mut dxs),
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Every column step adds the horizontal residual, every row step the vertical one.
fn apply_uniform(layout: &mut RegionLayout, median_h: Shift, median_v: Shift) {
    let min_row = layout.placements.iter().map(|p| p.row).min().unwrap_or(0);
    let min_col = layout.placements.iter().map(|p| p.col).min().unwrap_or(0);
    for p in &mut layout.placements {
        let rows = (p.row - min_row) as f64;
        let cols = (p.col - min_col) as f64;
        p.y += cols * median_h.dy + rows * median_v.dy;
        p.x += cols * median_h.dx + rows * median_v.dx;
    }
}

/// Position each tile relative to its predecessor in traversal order.
///
/// The predecessor is the previous tile when it is a same-row neighbour,
/// otherwise the tile above. Pairs without an accepted residual fall back to
/// the median for their direction; tiles without a predecessor keep their
/// expected position.
fn apply_chained(
    layout: &mut RegionLayout,
    residuals: &[PairResidual],
    median_h: Shift,
    median_v: Shift,
) {
    let by_pair: HashMap<(usize, usize), Shift> =
        residuals.iter().map(|r| ((r.from, r.to), r.shift)).collect();
    let index = layout.grid_index();
    let expected: Vec<(f64, f64)> = layout.placements.iter().map(|p| (p.y, p.x)).collect();
    let mut corrected = expected.clone();

    for idx in 1..layout.placements.len() {
        let p = &layout.placements[idx];
        let prev = &layout.placements[idx - 1];

        let link = if prev.row == p.row && prev.col + 1 == p.col {
            Some((idx - 1, by_pair.get(&(idx - 1, idx)).copied().unwrap_or(median_h)))
        } else if prev.row == p.row && p.col + 1 == prev.col {
            let r = by_pair.get(&(idx, idx - 1)).copied().unwrap_or(median_h);
            Some((idx - 1, Shift { dy: -r.dy, dx: -r.dx }))
        } else if let Some(&above) = p.row.checked_sub(1).and_then(|r| index.get(&(r, p.col))) {
            Some((above, by_pair.get(&(above, idx)).copied().unwrap_or(median_v)))
        } else {
            None
        };

        if let Some((pred, r)) = link {
            corrected[idx] = (
                corrected[pred].0 + (expected[idx].0 - expected[pred].0) + r.dy,
                corrected[pred].1 + (expected[idx].1 - expected[pred].1) + r.dx,
            );
        }
    }

    for (p, (y, x)) in layout.placements.iter_mut().zip(corrected) {
        p.y = y;
        p.x = x;
    }
}
