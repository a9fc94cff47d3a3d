//! Shared helpers used by both the fixed-axis and collocation regridders:
//! locating the vertical axis on a product, broadcasting time-independent
//! variables, and the `unpadded_len` convention for NaN-padded columns
//! (§9's redesign note: "introduce an internal `unpadded_len(row)` helper
//! so that all loops use it rather than recomputing").

use log::trace;

use crate::error::CoreError;
use crate::model::{DimensionKind, ElementType, Product, Variable};
use crate::registry::DimSpec;
use crate::resolver::Resolver;

/// Index one past the last non-NaN entry of `row`; `0` if every entry is
/// NaN (or the row is empty). Used to recover a sample's "real" column
/// length out of a buffer that was padded to the crate-wide maximum.
pub fn unpadded_len(row: &[f64]) -> usize {
    row.iter().rposition(|v| !v.is_nan()).map_or(0, |i| i + 1)
}

/// Derives the axis variable named `name` with unit `unit`, preferring a
/// 1-D `{vertical}` signature and falling back to 2-D `{time, vertical}`,
/// per the fixed-axis regrid algorithm's first step. Goes through the full
/// resolver (not just a product lookup) since the axis may itself need
/// deriving via a registered conversion (e.g. a unit coercion chain).
pub fn derive_axis(resolver: &Resolver, product: &Product, name: &str, unit: &str) -> Result<Variable, CoreError> {
    let dims_1d = [DimSpec::shared(DimensionKind::Vertical)];
    match resolver.get_derived(product, name, Some(unit), &dims_1d) {
        Ok(v) => return Ok(v),
        Err(e) => trace!("1-D axis '{name}' unavailable ({e}), falling back to 2-D {{time, vertical}}"),
    }
    let dims_2d = [DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical)];
    resolver.get_derived(product, name, Some(unit), &dims_2d)
}

/// Broadcasts `var` along a leading `time` axis of length `time_len` if it
/// does not already carry one. Used both by fixed-axis regrid ("if `v` is
/// time-independent but the source axis is time-dependent, broadcast `v`
/// along `time`") and by the collocation regridder's preprocessing pass.
pub fn broadcast_along_time_if_needed(var: &mut Variable, time_len: usize, max_rank: usize) -> Result<(), CoreError> {
    let already_time_dependent = var.dimensions().first().map(|(k, _)| *k) == Some(DimensionKind::Time);
    if already_time_dependent {
        return Ok(());
    }
    var.insert_broadcast_axis(0, DimensionKind::Time, time_len, max_rank)
}

/// Ensures `var` is `float64`, coercing in place if needed. Regrid working
/// buffers are always `float64` (§4.3: "All interpolation is performed in
/// `float64`").
pub fn ensure_float64(var: &mut Variable) -> Result<(), CoreError> {
    var.convert_type(ElementType::Float64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpadded_len_finds_last_non_nan() {
        assert_eq!(unpadded_len(&[1.0, 2.0, f64::NAN, f64::NAN]), 2);
        assert_eq!(unpadded_len(&[f64::NAN, f64::NAN]), 0);
        assert_eq!(unpadded_len(&[1.0, 2.0, 3.0]), 3);
        assert_eq!(unpadded_len(&[]), 0);
    }
}
