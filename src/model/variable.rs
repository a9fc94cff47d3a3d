//! The variable model: an immutable-shape, mutable-data tensor.

use crate::error::{CoreError, ErrorKind};
use crate::model::dim::DimensionKind;
use crate::model::dtype::{ElementBuffer, ElementType};

fn row_major_strides(lengths: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; lengths.len()];
    for i in (0..lengths.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * lengths[i + 1].max(1);
    }
    strides
}

/// Broadcasts `old` (row-major, shape `old_lengths`) along a freshly
/// inserted axis at `position` of length `insert_len`, producing a new
/// row-major buffer of the combined shape. Used for "broadcast v along
/// time" during fixed-axis regridding.
fn tile_insert_axis<T: Clone>(old: &[T], old_lengths: &[usize], position: usize, insert_len: usize) -> Vec<T> {
    let mut new_lengths = old_lengths[..position].to_vec();
    new_lengths.push(insert_len);
    new_lengths.extend_from_slice(&old_lengths[position..]);

    let old_strides = row_major_strides(old_lengths);
    let new_strides = row_major_strides(&new_lengths);
    let total_new: usize = new_lengths.iter().product::<usize>().max(if new_lengths.is_empty() { 0 } else { 1 });

    let mut out = Vec::with_capacity(total_new);
    for flat in 0..total_new {
        let mut old_flat = 0usize;
        let mut rem = flat;
        for (axis, &len) in new_lengths.iter().enumerate() {
            let stride = new_strides[axis];
            let idx = if len == 0 { 0 } else { rem / stride };
            rem %= stride.max(1);
            if axis == position {
                continue;
            }
            let old_axis = if axis < position { axis } else { axis - 1 };
            old_flat += idx * old_strides[old_axis];
        }
        out.push(old[old_flat].clone());
    }
    out
}

/// A named, typed, unit-carrying tensor with declared dimension kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    dims: Vec<(DimensionKind, usize)>,
    unit: Option<String>,
    data: ElementBuffer,
}

impl Variable {
    /// Allocates a zero-filled variable of the given shape. `max_rank`
    /// enforces the configured rank bound ([`crate::config::CoreConfig`]).
    pub fn new(
        name: impl Into<String>,
        element_type: ElementType,
        dims: Vec<(DimensionKind, usize)>,
        unit: Option<String>,
        max_rank: usize,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        let len = dims.iter().map(|(_, l)| *l).product();
        Self::from_buffer(name, dims, unit, ElementBuffer::zeros(element_type, len), max_rank)
    }

    /// Builds a variable from already-populated storage, validating the
    /// shape invariants (`P1`: `num_elements = ∏ dim_lengths`; rank bound;
    /// last-dimension-vertical rule).
    pub fn from_buffer(
        name: impl Into<String>,
        dims: Vec<(DimensionKind, usize)>,
        unit: Option<String>,
        data: ElementBuffer,
        max_rank: usize,
    ) -> Result<Self, CoreError> {
        let name = name.into();
        if dims.len() > max_rank {
            return Err(CoreError::with_message(
                ErrorKind::ArrayRankMismatch,
                format!("rank {} exceeds max_rank {max_rank}", dims.len()),
            )
            .with_path(name));
        }
        let expected: usize = dims.iter().map(|(_, l)| *l).product();
        if data.len() != expected {
            return Err(CoreError::with_message(
                ErrorKind::ArrayRankMismatch,
                format!("buffer has {} elements, shape implies {expected}", data.len()),
            )
            .with_path(name));
        }
        let var = Self { name, dims, unit, data };
        var.check_vertical_is_last()?;
        Ok(var)
    }

    fn check_vertical_is_last(&self) -> Result<(), CoreError> {
        let vertical_count = self.dims.iter().filter(|(k, _)| *k == DimensionKind::Vertical).count();
        if vertical_count > 1 {
            return Err(CoreError::with_message(
                ErrorKind::ArrayRankMismatch,
                "a variable may carry at most one vertical axis",
            )
            .with_path(self.name.clone()));
        }
        if vertical_count == 1 {
            let last_is_vertical = self.dims.last().map(|(k, _)| *k == DimensionKind::Vertical).unwrap_or(false);
            if !last_is_vertical {
                return Err(CoreError::with_message(
                    ErrorKind::ArrayRankMismatch,
                    "the vertical axis of a variable must be its last dimension",
                )
                .with_path(self.name.clone()));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn dimensions(&self) -> &[(DimensionKind, usize)] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn set_unit(&mut self, unit: Option<String>) {
        self.unit = unit;
    }

    pub fn data(&self) -> &ElementBuffer {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ElementBuffer {
        &mut self.data
    }

    /// Replaces this variable's storage in place. The replacement must
    /// match the current shape exactly (named operation: replace-data).
    pub fn replace_data(&mut self, data: ElementBuffer) -> Result<(), CoreError> {
        let expected: usize = self.dims.iter().map(|(_, l)| *l).product();
        if data.len() != expected {
            return Err(CoreError::with_message(
                ErrorKind::ArrayRankMismatch,
                format!("replacement buffer has {} elements, shape implies {expected}", data.len()),
            )
            .with_path(self.name.clone()));
        }
        self.data = data;
        Ok(())
    }

    /// `P1`: total element count equals the product of per-axis lengths.
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Syntactic equality after normalization (trim), matching the unit
    /// conversion collaborator's `variable_has_unit` contract.
    pub fn has_unit(&self, unit: &str) -> bool {
        self.unit.as_deref().map(|cur| cur.trim() == unit.trim()).unwrap_or(false)
    }

    /// Whether this variable's dimension *kinds*, in order, equal `kinds`.
    /// Lengths are not compared; callers that care about an `independent`
    /// axis's length check it separately.
    pub fn has_dimension_kinds(&self, kinds: &[DimensionKind]) -> bool {
        self.dims.len() == kinds.len() && self.dims.iter().zip(kinds).all(|((k, _), want)| k == want)
    }

    pub fn convert_type(&mut self, target: ElementType) -> Result<(), CoreError> {
        if self.element_type() == target {
            return Ok(());
        }
        self.data = self.data.coerce(target).map_err(|e| e.with_path(self.name.clone()))?;
        Ok(())
    }

    /// Inserts a new axis of kind `kind` and length `length` at `position`,
    /// broadcasting existing data across the new axis (tiling, not
    /// zero-fill). Used to broadcast a time-independent variable along
    /// `time` before fixed-axis regridding.
    pub fn insert_broadcast_axis(
        &mut self,
        position: usize,
        kind: DimensionKind,
        length: usize,
        max_rank: usize,
    ) -> Result<(), CoreError> {
        if position > self.dims.len() {
            return Err(CoreError::new(ErrorKind::InvalidIndex).with_path(self.name.clone()));
        }
        if self.dims.len() >= max_rank {
            return Err(CoreError::with_message(
                ErrorKind::ArrayRankMismatch,
                format!("inserting an axis would exceed max_rank {max_rank}"),
            )
            .with_path(self.name.clone()));
        }
        let old_lengths: Vec<usize> = self.dims.iter().map(|(_, l)| *l).collect();
        self.data = match &self.data {
            ElementBuffer::Int8(v) => ElementBuffer::Int8(tile_insert_axis(v, &old_lengths, position, length)),
            ElementBuffer::Int16(v) => ElementBuffer::Int16(tile_insert_axis(v, &old_lengths, position, length)),
            ElementBuffer::Int32(v) => ElementBuffer::Int32(tile_insert_axis(v, &old_lengths, position, length)),
            ElementBuffer::Float32(v) => ElementBuffer::Float32(tile_insert_axis(v, &old_lengths, position, length)),
            ElementBuffer::Float64(v) => ElementBuffer::Float64(tile_insert_axis(v, &old_lengths, position, length)),
            ElementBuffer::String(v) => ElementBuffer::String(tile_insert_axis(v, &old_lengths, position, length)),
        };
        self.dims.insert(position, (kind, length));
        self.check_vertical_is_last()?;
        Ok(())
    }

    /// Resizes the last axis in place (requires a `float64` buffer, since
    /// this is only ever called on already-coerced regrid working data).
    /// Growing pads the new columns of every row with `fill`; shrinking
    /// truncates each row.
    pub fn resize_last_axis(&mut self, new_length: usize, fill: f64) -> Result<(), CoreError> {
        let rank = self.dims.len();
        if rank == 0 {
            return Err(CoreError::new(ErrorKind::ArrayRankMismatch).with_path(self.name.clone()));
        }
        let old_length = self.dims[rank - 1].1;
        if new_length == old_length {
            return Ok(());
        }
        let outer: usize = self.dims[..rank - 1].iter().map(|(_, l)| *l).product();
        let old = self.data.as_f64_slice().map_err(|e| e.with_path(self.name.clone()))?;
        let mut grown = vec![fill; outer * new_length];
        let copy_len = old_length.min(new_length);
        for row in 0..outer {
            let src = &old[row * old_length..row * old_length + copy_len];
            grown[row * new_length..row * new_length + copy_len].copy_from_slice(src);
        }
        self.data = ElementBuffer::Float64(grown);
        self.dims[rank - 1].1 = new_length;
        Ok(())
    }
}
