//! Regrid/smooth against a collocated matching product (§4.3): every
//! resamplable variable of `P` is resampled onto the per-sample vertical
//! grid of whichever product collocation pairs it with, then optionally
//! smoothed with an averaging kernel and a priori profile.

use log::{debug, trace, warn};
use ndarray::{s, Array1, Array2};

use crate::error::{CoreError, ErrorKind};
use crate::external::{interp_interval, interp_linear_1d, log_transform, CollocationPair, CollocationTable, ProductImporter, VerticalProfileOps};
use crate::model::{DimensionKind, ElementBuffer, Product, Variable};
use crate::registry::DimSpec;
use crate::regrid::category::{classify, ResampleCategory};
use crate::regrid::support::{broadcast_along_time_if_needed, ensure_float64, unpadded_len};
use crate::resolver::Resolver;

/// Bundles the collaborators the collocation regridder needs: the
/// resolver (to derive axes/bounds, possibly via registered conversions),
/// and the product importer for opening matching B-side products.
pub struct CollocationRegridder<'a> {
    pub resolver: &'a Resolver<'a>,
    pub profile_ops: &'a dyn VerticalProfileOps,
    pub importer: &'a dyn ProductImporter,
    pub max_rank: usize,
}

/// Per-row working buffer for one variable being resampled, `N_max`-wide
/// and NaN-filled up front so every written sample only needs to cover its
/// own `n_tgt` leading entries.
struct OutputColumn {
    name: String,
    unit: Option<String>,
    dims_without_vertical: Vec<(DimensionKind, usize)>,
    middle_size: usize,
    category: ResampleCategory,
    data: Vec<f64>,
}

/// Bounds row pairs (lower, upper) for one time sample, sliced out of a
/// rank-3 `{time, vertical, independent=2}` bounds variable.
fn extract_bounds_row(full: &Variable, time_idx: usize, take: usize) -> Result<Vec<(f64, f64)>, CoreError> {
    let vlen = full.dimensions()[1].1;
    let data = full.data().as_f64_slice().map_err(|e| e.with_path(full.name().to_string()))?;
    let base = time_idx * vlen * 2;
    let n = take.min(vlen);
    Ok((0..n).map(|v| (data[base + v * 2], data[base + v * 2 + 1])).collect())
}

impl<'a> CollocationRegridder<'a> {
    pub fn new(resolver: &'a Resolver<'a>, profile_ops: &'a dyn VerticalProfileOps, importer: &'a dyn ProductImporter, max_rank: usize) -> Self {
        Self { resolver, profile_ops, importer, max_rank }
    }

    /// Runs the full regrid + optional AVK smoothing pass described in
    /// §4.3's second algorithm.
    pub fn regrid_and_smooth(
        &self,
        product: &mut Product,
        axis_name: &str,
        axis_unit: &str,
        collocation: &dyn CollocationTable,
        smooth_species: &[String],
    ) -> Result<(), CoreError> {
        let source_id = product
            .source_product()
            .ok_or_else(|| CoreError::with_message(ErrorKind::ProductError, "product has no source_product identifier to filter collocation pairs by"))?
            .to_string();

        // Step 1: shallow-copy, filter, sort.
        let mut table = collocation.shallow_copy();
        table.filter_by_source_a(&source_id);
        table.sort_by_collocation_id();
        let pairs: Vec<CollocationPair> = table.pairs().to_vec();

        // Step 2: N_max across all matching B products.
        let n_max = pairs
            .iter()
            .filter_map(|p| p.metadata_b.dimension_lengths.get(&DimensionKind::Vertical).copied())
            .max()
            .unwrap_or_else(|| product.dimension_length(DimensionKind::Vertical).unwrap_or(0));

        let time_len = product
            .dimension_length(DimensionKind::Time)
            .ok_or_else(|| CoreError::new(ErrorKind::ProductError).with_path("time"))?;

        // Step 3: drop Remove-category variables; broadcast the rest.
        let mut removals = Vec::new();
        let mut keep = Vec::new();
        for name in product.names_reverse_insertion_order() {
            if name == axis_name || name == "collocation_index" {
                continue;
            }
            let var = product.get(&name).expect("name came from product iteration");
            match classify(var) {
                ResampleCategory::Skip => continue,
                ResampleCategory::Remove => removals.push(name),
                category => keep.push((name, category)),
            }
        }
        for name in &removals {
            product.remove(name);
            warn!("dropped '{name}' during collocation regrid (resample category Remove)");
        }

        for (name, _) in &keep {
            let var = product.get_mut(name).expect("just collected from product");
            ensure_float64(var)?;
            broadcast_along_time_if_needed(var, time_len, self.max_rank)?;
        }

        let needs_bounds = keep.iter().any(|(_, c)| *c == ResampleCategory::Interval);
        let is_pressure = axis_name == "pressure";

        // Step 4: derive the source axis (2-D {time, vertical}), log-transform if pressure.
        let dims_2d = [DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical)];
        let source_axis = self.resolver.get_derived(product, axis_name, Some(axis_unit), &dims_2d)?;
        let source_old_vlen = source_axis.dimensions()[1].1;
        let mut source_axis_values = source_axis.data().to_f64_vec()?;
        if is_pressure {
            log_transform(&mut source_axis_values);
        }

        // The bounds of P are fixed for the whole pass; derive once if any
        // kept variable is Interval-category.
        let p_bounds_full = if needs_bounds {
            let dims_3d = [DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical), DimSpec::independent(2)];
            Some(self.resolver.get_derived(product, &format!("{axis_name}_bounds"), Some(axis_unit), &dims_3d)?)
        } else {
            None
        };

        let collocation_index = product
            .get("collocation_index")
            .ok_or_else(|| CoreError::new(ErrorKind::VariableNotFound).with_path("collocation_index"))?
            .data()
            .to_f64_vec()?;

        // Step 5/7: every output column is allocated at N_max and NaN-filled;
        // the final dimension length is always N_max (this realizes both the
        // "grow, pad with NaN" and "shrink to N_max" behaviors without
        // needing to special-case which direction the existing axis length
        // moved).
        let mut columns: Vec<OutputColumn> = keep
            .iter()
            .map(|(name, category)| {
                let var = product.get(name).expect("collected above");
                let rank = var.rank();
                let dims_without_vertical = var.dimensions()[..rank - 1].to_vec();
                let middle_size: usize = dims_without_vertical.iter().skip(1).map(|(_, l)| *l).product::<usize>().max(1);
                OutputColumn {
                    name: name.clone(),
                    unit: var.unit().map(str::to_string),
                    dims_without_vertical,
                    middle_size,
                    category: *category,
                    data: vec![f64::NAN; time_len * middle_size * n_max],
                }
            })
            .collect();

        // (filename, product, axis_var, axis_values, collocation_index, bounds)
        let mut loaded: Option<(String, Product, Variable, Vec<f64>, Vec<f64>, Option<Variable>)> = None;

        for i in 0..time_len {
            let id = collocation_index.get(i).copied().unwrap_or(f64::NAN).round() as i64;
            let pair = find_pair(&pairs, id).ok_or_else(|| {
                CoreError::with_message(ErrorKind::VariableNotFound, format!("no collocation pair with id {id} for sample {i}"))
            })?;

            if loaded.as_ref().map(|(f, ..)| f != &pair.metadata_b.filename).unwrap_or(true) {
                let b_product = self.importer.import(&pair.metadata_b.filename).map_err(|e| e.annotate("could not import collocation match product"))?;
                let b_axis = self.resolver.get_derived(&b_product, axis_name, Some(axis_unit), &dims_2d)?;
                let mut b_axis_values = b_axis.data().to_f64_vec()?;
                if is_pressure {
                    log_transform(&mut b_axis_values);
                }
                let b_index = b_product
                    .get("collocation_index")
                    .ok_or_else(|| CoreError::new(ErrorKind::VariableNotFound).with_path("collocation_index"))?
                    .data()
                    .to_f64_vec()?;
                let b_bounds = if needs_bounds {
                    let dims_3d = [DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical), DimSpec::independent(2)];
                    Some(self.resolver.get_derived(&b_product, &format!("{axis_name}_bounds"), Some(axis_unit), &dims_3d)?)
                } else {
                    None
                };
                trace!("loaded collocation match product '{}'", pair.metadata_b.filename);
                loaded = Some((pair.metadata_b.filename.clone(), b_product, b_axis, b_axis_values, b_index, b_bounds));
            }
            let (_, b_product, b_axis, b_axis_values, b_index, b_bounds_full) = loaded.as_ref().expect("just populated");

            let j = find_row(b_index, pair.id).ok_or_else(|| {
                CoreError::with_message(ErrorKind::VariableNotFound, format!("collocation pair {} has no matching row in the match product", pair.id))
            })?;
            let b_vlen = b_axis.dimensions()[1].1;
            let src_row = &source_axis_values[i * source_old_vlen..(i + 1) * source_old_vlen];
            let tgt_row_full = &b_axis_values[j * b_vlen..(j + 1) * b_vlen];
            let n_src = unpadded_len(src_row);
            let n_tgt = unpadded_len(tgt_row_full);
            let tgt_row = &tgt_row_full[..n_tgt];
            let src_row_trimmed = &src_row[..n_src];

            let bounds = match (&p_bounds_full, b_bounds_full) {
                (Some(p_full), Some(b_full)) if n_src >= 2 && n_tgt >= 2 => {
                    let src_bounds = extract_bounds_row(p_full, i, n_src)?;
                    let tgt_bounds = extract_bounds_row(b_full, j, n_tgt)?;
                    Some((src_bounds, tgt_bounds))
                }
                _ => None,
            };

            for column in &mut columns {
                let var = product.get(&column.name).expect("collected above");
                let old_vlen = var.dimensions().last().unwrap().1;
                let src_data = var.data().as_f64_slice().map_err(|e| e.with_path(column.name.clone()))?;
                let row_base = i * column.middle_size * old_vlen;
                let out_base = i * column.middle_size * n_max;

                for block in 0..column.middle_size {
                    let block_src = &src_data[row_base + block * old_vlen..row_base + (block + 1) * old_vlen];
                    let block_src = &block_src[..n_src.min(block_src.len())];
                    let out_slice = &mut column.data[out_base + block * n_max..out_base + block * n_max + n_tgt.min(n_max)];

                    match column.category {
                        ResampleCategory::Linear => {
                            interp_linear_1d(src_row_trimmed, block_src, tgt_row, out_slice, false)
                                .map_err(|e| e.with_path(column.name.clone()))?;
                        }
                        ResampleCategory::Interval => {
                            if let Some((src_bounds, tgt_bounds)) = &bounds {
                                interp_interval(src_bounds, block_src, tgt_bounds, out_slice).map_err(|e| e.with_path(column.name.clone()))?;
                            }
                        }
                        ResampleCategory::Skip | ResampleCategory::Remove => unreachable!("filtered out before this loop"),
                    }
                }

                if smooth_species.iter().any(|s| s == &column.name) {
                    self.apply_avk(b_product, j, column, out_base, n_max)?;
                }
            }
        }

        for name in columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>() {
            product.remove(&name);
        }
        for column in columns {
            let mut dims = column.dims_without_vertical;
            dims.push((DimensionKind::Vertical, n_max));
            let var = Variable::from_buffer(column.name, dims, column.unit, ElementBuffer::Float64(column.data), self.max_rank)?;
            product.add(var)?;
        }

        product.set_dimension_length(DimensionKind::Vertical, n_max);
        debug!("collocation regrid of '{axis_name}' complete, {n_max} levels");
        Ok(())
    }

    fn apply_avk(&self, b_product: &Product, row: usize, column: &mut OutputColumn, out_base: usize, n_max: usize) -> Result<(), CoreError> {
        let avk_name = format!("{}_avk", column.name);
        let apriori_name = format!("{}_apriori", column.name);
        let avk = b_product
            .get(&avk_name)
            .ok_or_else(|| CoreError::with_message(ErrorKind::VariableNotFound, format!("'{avk_name}' required for smoothing '{}'", column.name)))?;
        if avk.dimensions().len() != 3 || avk.dimensions()[1].1 != avk.dimensions()[2].1 {
            return Err(CoreError::with_message(ErrorKind::ArrayRankMismatch, format!("'{avk_name}' must be rank-3 and square")));
        }
        let m = avk.dimensions()[1].1;
        let time_len = avk.dimensions()[0].1;
        if row >= time_len {
            return Err(CoreError::new(ErrorKind::InvalidIndex).with_path(avk_name));
        }
        let avk_data = avk.data().as_f64_slice()?;
        let avk_row = &avk_data[row * m * m..(row + 1) * m * m];

        let apriori_row: Option<Vec<f64>> = match b_product.get(&apriori_name) {
            Some(apriori) => {
                let mut copy = apriori.clone();
                copy.convert_type(crate::model::ElementType::Float64)?;
                let flat = copy.data().to_f64_vec()?;
                let row_len = copy.dimensions().last().map(|(_, l)| *l).unwrap_or(0);
                Some(flat[row * row_len..(row + 1) * row_len].to_vec())
            }
            None => None,
        };

        let n = m.min(n_max);
        let out = &mut column.data[out_base..out_base + n_max];
        apply_avk_smoothing(out, avk_row, m, apriori_row.as_deref(), n);
        Ok(())
    }
}

/// `out = A·(in − a) + a`, NaN entries of `in`/`a` treated as zero during
/// the matrix-vector product (§4.3 step 6.e.). `out` is at least `n` long
/// and holds the pre-smoothing resampled values on entry. `avk_row` is the
/// full `m×m` kernel row-major; only its leading `n×n` block is used once
/// `n_max` has shrunk the output below `m` levels.
fn apply_avk_smoothing(out: &mut [f64], avk_row: &[f64], m: usize, apriori_row: Option<&[f64]>, n: usize) {
    let zero_nan = |v: f64| if v.is_nan() { 0.0 } else { v };
    let kernel = Array2::from_shape_vec((m, m), avk_row.to_vec()).expect("avk_row is m*m");
    let a = kernel.slice(s![..n, ..n]);
    let input: Array1<f64> = (0..n).map(|k| zero_nan(out.get(k).copied().unwrap_or(f64::NAN))).collect();
    let apriori: Array1<f64> = (0..n).map(|k| zero_nan(apriori_row.and_then(|a| a.get(k)).copied().unwrap_or(0.0))).collect();
    let smoothed = a.dot(&(&input - &apriori)) + &apriori;
    out[..n].copy_from_slice(smoothed.as_slice().expect("contiguous"));
}

fn find_pair(pairs: &[CollocationPair], id: i64) -> Option<&CollocationPair> {
    pairs.iter().find(|p| p.id as i64 == id)
}

fn find_row(collocation_index: &[f64], id: u64) -> Option<usize> {
    collocation_index.iter().position(|&v| v.round() as i64 == id as i64)
}
