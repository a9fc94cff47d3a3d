//! Interpolation kernels collaborator (§6): pointwise linear interpolation
//! and bounds-based interval (layer-overlap) averaging. Pure math, no
//! product-specific state, so these are free functions rather than a trait.

use crate::error::{CoreError, ErrorKind};

/// Linear interpolation of `(src_x, src_y)` onto `tgt_x`, writing into
/// `tgt_y_out`. `src_x` must be sorted ascending. Targets outside
/// `[src_x[0], src_x[last]]` get `NaN` unless `extrapolate` is set, in
/// which case the boundary segment's slope is extended.
pub fn interp_linear_1d(
    src_x: &[f64],
    src_y: &[f64],
    tgt_x: &[f64],
    tgt_y_out: &mut [f64],
    extrapolate: bool,
) -> Result<(), CoreError> {
    if src_x.len() != src_y.len() {
        return Err(CoreError::with_message(
            ErrorKind::ArrayRankMismatch,
            format!("src_x has {} elements, src_y has {}", src_x.len(), src_y.len()),
        ));
    }
    if tgt_x.len() != tgt_y_out.len() {
        return Err(CoreError::with_message(
            ErrorKind::ArrayRankMismatch,
            format!("tgt_x has {} elements, tgt_y_out has {}", tgt_x.len(), tgt_y_out.len()),
        ));
    }
    if src_x.is_empty() {
        tgt_y_out.fill(f64::NAN);
        return Ok(());
    }
    if src_x.len() == 1 {
        let only = src_y[0];
        for (out, &x) in tgt_y_out.iter_mut().zip(tgt_x) {
            *out = if (x - src_x[0]).abs() < f64::EPSILON || extrapolate { only } else { f64::NAN };
        }
        return Ok(());
    }

    for (out, &x) in tgt_y_out.iter_mut().zip(tgt_x) {
        *out = interp_one(src_x, src_y, x, extrapolate);
    }
    Ok(())
}

fn interp_one(src_x: &[f64], src_y: &[f64], x: f64, extrapolate: bool) -> f64 {
    let n = src_x.len();
    if x < src_x[0] {
        if !extrapolate {
            return f64::NAN;
        }
        return lerp(src_x[0], src_y[0], src_x[1], src_y[1], x);
    }
    if x > src_x[n - 1] {
        if !extrapolate {
            return f64::NAN;
        }
        return lerp(src_x[n - 2], src_y[n - 2], src_x[n - 1], src_y[n - 1], x);
    }
    // Binary search for the bracketing segment `[i, i+1]`.
    let mut lo = 0usize;
    let mut hi = n - 1;
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if src_x[mid] <= x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lerp(src_x[lo], src_y[lo], src_x[hi], src_y[hi], x)
}

fn lerp(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if (x1 - x0).abs() < f64::EPSILON {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// The six distinguishable overlap relationships between two closed
/// intervals, collapsing the two no-overlap orderings into one case since
/// they carry zero weight either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    None,
    Exact,
    /// `a` starts before `b` and ends inside `b`: overlap is `[b0, a1]`.
    PartialLeft,
    /// `b` starts before `a` and ends inside `a`: overlap is `[a0, b1]`.
    PartialRight,
    AContainsB,
    BContainsA,
}

/// Classifies the overlap of two bounds, each given as `(lower, upper)`
/// with `lower <= upper`.
pub fn classify_overlap(a: (f64, f64), b: (f64, f64)) -> Overlap {
    let (a0, a1) = a;
    let (b0, b1) = b;
    if a1 <= b0 || b1 <= a0 {
        return Overlap::None;
    }
    if a0 == b0 && a1 == b1 {
        return Overlap::Exact;
    }
    if a0 <= b0 && a1 >= b1 {
        return Overlap::AContainsB;
    }
    if b0 <= a0 && b1 >= a1 {
        return Overlap::BContainsA;
    }
    if a0 < b0 {
        Overlap::PartialLeft
    } else {
        Overlap::PartialRight
    }
}

/// Length of the intersection of `a` and `b`, or 0.0 if they don't overlap.
fn overlap_length(a: (f64, f64), b: (f64, f64)) -> f64 {
    match classify_overlap(a, b) {
        Overlap::None => 0.0,
        Overlap::Exact => a.1 - a.0,
        Overlap::AContainsB => b.1 - b.0,
        Overlap::BContainsA => a.1 - a.0,
        Overlap::PartialLeft => a.1 - b.0,
        Overlap::PartialRight => b.1 - a.0,
    }
}

/// Bounds-based interval (layer-overlap) interpolation: each target layer's
/// value is the overlap-length-weighted average of every source layer it
/// intersects. NaN source values contribute zero weight; a target layer
/// that overlaps nothing (or only NaN layers) gets NaN.
pub fn interp_interval(
    src_bounds: &[(f64, f64)],
    src_y: &[f64],
    tgt_bounds: &[(f64, f64)],
    tgt_y_out: &mut [f64],
) -> Result<(), CoreError> {
    if src_bounds.len() != src_y.len() {
        return Err(CoreError::with_message(
            ErrorKind::ArrayRankMismatch,
            format!("src_bounds has {} elements, src_y has {}", src_bounds.len(), src_y.len()),
        ));
    }
    if tgt_bounds.len() != tgt_y_out.len() {
        return Err(CoreError::with_message(
            ErrorKind::ArrayRankMismatch,
            format!("tgt_bounds has {} elements, tgt_y_out has {}", tgt_bounds.len(), tgt_y_out.len()),
        ));
    }
    for (out, &tb) in tgt_y_out.iter_mut().zip(tgt_bounds) {
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        for (&sb, &y) in src_bounds.iter().zip(src_y) {
            if y.is_nan() {
                continue;
            }
            let w = overlap_length(normalize(sb), normalize(tb));
            if w > 0.0 {
                weight_sum += w;
                value_sum += w * y;
            }
        }
        *out = if weight_sum > 0.0 { value_sum / weight_sum } else { f64::NAN };
    }
    Ok(())
}

fn normalize(bound: (f64, f64)) -> (f64, f64) {
    if bound.0 <= bound.1 {
        bound
    } else {
        (bound.1, bound.0)
    }
}
