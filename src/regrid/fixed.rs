//! Regrid with fixed axis (§4.3): resample every variable of a product
//! onto a caller-supplied vertical axis.

use log::{debug, warn};
use rayon::prelude::*;

use crate::error::{CoreError, ErrorKind};
use crate::external::{interp_interval, interp_linear_1d, log_transform, VerticalProfileOps};
use crate::model::{DimensionKind, ElementBuffer, ElementType, Product, Variable};
use crate::regrid::category::{classify, ResampleCategory};
use crate::regrid::support::{broadcast_along_time_if_needed, derive_axis, ensure_float64};
use crate::resolver::Resolver;

/// Resamples every resamplable variable of `product` onto `target_axis`,
/// then replaces the product's own axis variable with a copy of
/// `target_axis` and updates `dimension_lengths[Vertical]`.
///
/// `profile_ops` supplies the bounds-from-profile construction used by
/// `Interval`-category variables (layer-overlap averaging needs bounds,
/// not just levels; see [`crate::external::profile::VerticalProfileOps`]).
pub fn regrid_fixed_axis(
    resolver: &Resolver,
    profile_ops: &dyn VerticalProfileOps,
    product: &mut Product,
    target_axis: &Variable,
    max_rank: usize,
) -> Result<(), CoreError> {
    let axis_name = target_axis.name().to_string();
    let axis_unit = target_axis
        .unit()
        .ok_or_else(|| CoreError::with_message(ErrorKind::InvalidArgument, "target axis must carry a unit").with_path(axis_name.clone()))?
        .to_string();
    let n_t = target_axis
        .dimensions()
        .last()
        .filter(|(k, _)| *k == DimensionKind::Vertical)
        .map(|(_, l)| *l)
        .ok_or_else(|| {
            CoreError::with_message(ErrorKind::ArrayRankMismatch, "target axis has no vertical axis").with_path(axis_name.clone())
        })?;

    let source_axis = derive_axis(resolver, product, &axis_name, &axis_unit)?;
    let source_time_dependent = source_axis.rank() == 2;
    let is_pressure = axis_name == "pressure";

    let mut target_axis_values = target_axis.data().to_f64_vec()?;
    if is_pressure {
        log_transform(&mut target_axis_values);
    }
    let mut source_axis_values = source_axis.data().to_f64_vec()?;
    if is_pressure {
        log_transform(&mut source_axis_values);
    }

    let time_len = product.dimension_length(DimensionKind::Time).unwrap_or(1);

    let mut working: Vec<(String, Variable, ResampleCategory)> = Vec::new();
    let mut removals: Vec<String> = Vec::new();

    for name in product.names_reverse_insertion_order() {
        if name == axis_name {
            continue;
        }
        let var = product.get(&name).expect("name came from product iteration");
        let category = classify(var);
        match category {
            ResampleCategory::Skip => continue,
            ResampleCategory::Remove => {
                removals.push(name);
                continue;
            }
            ResampleCategory::Linear | ResampleCategory::Interval => {
                let mut copy = var.clone();
                ensure_float64(&mut copy)?;
                if source_time_dependent {
                    broadcast_along_time_if_needed(&mut copy, time_len, max_rank)?;
                }
                working.push((name, copy, category));
            }
        }
    }

    let resampled: Vec<Result<Variable, CoreError>> = working
        .into_par_iter()
        .map(|(_, var, category)| {
            resample_one(
                &var,
                &source_axis_values,
                source_time_dependent,
                &target_axis_values,
                n_t,
                category,
                profile_ops,
                max_rank,
            )
        })
        .collect();

    for name in removals {
        product.remove(&name);
        warn!("dropped '{name}' during fixed-axis regrid (resample category Remove)");
    }
    for result in resampled {
        product.replace(result?)?;
    }

    let mut new_axis = target_axis.clone();
    new_axis.rename(axis_name.clone());
    product.replace(new_axis)?;
    product.set_dimension_length(DimensionKind::Vertical, n_t);
    debug!("fixed-axis regrid of '{axis_name}' to {n_t} levels complete");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn resample_one(
    var: &Variable,
    source_axis_values: &[f64],
    source_time_dependent: bool,
    target_axis_values: &[f64],
    n_t: usize,
    category: ResampleCategory,
    profile_ops: &dyn VerticalProfileOps,
    max_rank: usize,
) -> Result<Variable, CoreError> {
    let rank = var.rank();
    let vertical_pos = rank - 1;
    let old_vlen = var.dimensions()[vertical_pos].1;
    let outer: usize = var.dimensions()[..vertical_pos].iter().map(|(_, l)| *l).product();
    let time_len = if rank > 0 && var.dimensions()[0].0 == DimensionKind::Time { var.dimensions()[0].1 } else { 1 };
    let per_time_outer = if time_len > 0 { outer / time_len } else { 0 };

    let src = var.data().as_f64_slice().map_err(|e| e.with_path(var.name().to_string()))?;
    let mut out = vec![0.0_f64; outer * n_t];

    for col in 0..outer {
        let t = if source_time_dependent && time_len > 0 { col / per_time_outer.max(1) } else { 0 };
        let src_row = &src[col * old_vlen..(col + 1) * old_vlen];
        let axis_row: &[f64] =
            if source_time_dependent { &source_axis_values[t * old_vlen..(t + 1) * old_vlen] } else { source_axis_values };
        let out_row = &mut out[col * n_t..(col + 1) * n_t];
        match category {
            ResampleCategory::Linear => {
                interp_linear_1d(axis_row, src_row, target_axis_values, out_row, false)
                    .map_err(|e| e.with_path(var.name().to_string()))?;
            }
            ResampleCategory::Interval => {
                if axis_row.len() < 2 || target_axis_values.len() < 2 {
                    out_row.fill(f64::NAN);
                    continue;
                }
                let src_bounds = profile_ops.altitude_bounds_from_altitude(axis_row).map_err(|e| e.with_path(var.name().to_string()))?;
                let tgt_bounds =
                    profile_ops.altitude_bounds_from_altitude(target_axis_values).map_err(|e| e.with_path(var.name().to_string()))?;
                interp_interval(&src_bounds, src_row, &tgt_bounds, out_row).map_err(|e| e.with_path(var.name().to_string()))?;
            }
            ResampleCategory::Skip | ResampleCategory::Remove => unreachable!("filtered out before resampling"),
        }
    }

    let mut new_dims = var.dimensions().to_vec();
    new_dims[vertical_pos].1 = n_t;
    Variable::from_buffer(var.name().to_string(), new_dims, var.unit().map(str::to_string), ElementBuffer::Float64(out), max_rank)
}

/// Coerces any non-`float64` output back toward its declared element type.
/// Exposed for callers that want to restore the original numeric type
/// after a regrid pass (the engine itself always leaves resampled
/// variables as `float64`, per §4.3's float64-only interpolation rule).
pub fn coerce_back(var: &mut Variable, element_type: ElementType) -> Result<(), CoreError> {
    var.convert_type(element_type)
}
