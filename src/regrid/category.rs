//! Resample category classification (§4.3): every variable of a product
//! falls into exactly one of `Skip`, `Remove`, `Interval`, `Linear` before
//! the regrid engine touches it.

use crate::model::{DimensionKind, ElementType, Variable};

/// A variable's structural classification for vertical regridding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleCategory {
    /// No `vertical` axis at all; left untouched.
    Skip,
    /// More than one `vertical` axis, string-typed, or a `_uncertainty`/
    /// `_avk` name suffix; dropped with a warning rather than resampled.
    Remove,
    /// Exactly one `vertical` axis (last), name contains `_column_`:
    /// layer-overlap (bounds-based) averaging.
    Interval,
    /// Exactly one `vertical` axis (last), none of the `Remove` exceptions:
    /// pointwise linear interpolation.
    Linear,
}

/// Classifies `var` per the rules above. The "more than one vertical axis"
/// branch of `Remove` is checked for fidelity to the specification even
/// though [`Variable`]'s own invariant (at most one `vertical` axis, and it
/// must be last) makes it unreachable in this crate's model — a
/// hypothetical looser model could still produce it.
pub fn classify(var: &Variable) -> ResampleCategory {
    let vertical_count = var.dimensions().iter().filter(|(k, _)| *k == DimensionKind::Vertical).count();
    if vertical_count == 0 {
        return ResampleCategory::Skip;
    }
    if vertical_count > 1 || var.element_type() == ElementType::String {
        return ResampleCategory::Remove;
    }
    let name = var.name();
    if name.ends_with("_uncertainty") || name.ends_with("_avk") {
        return ResampleCategory::Remove;
    }
    if name.contains("_column_") {
        return ResampleCategory::Interval;
    }
    ResampleCategory::Linear
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DimensionKind, ElementBuffer};

    fn var(name: &str, dims: Vec<(DimensionKind, usize)>, element_type: ElementType) -> Variable {
        let len = dims.iter().map(|(_, l)| *l).product();
        Variable::from_buffer(name, dims, None, ElementBuffer::zeros(element_type, len), 8).unwrap()
    }

    #[test]
    fn no_vertical_axis_is_skip() {
        let v = var("longitude", vec![(DimensionKind::Longitude, 3)], ElementType::Float64);
        assert_eq!(classify(&v), ResampleCategory::Skip);
    }

    #[test]
    fn string_typed_is_remove() {
        let v = var("flag", vec![(DimensionKind::Vertical, 3)], ElementType::String);
        assert_eq!(classify(&v), ResampleCategory::Remove);
    }

    #[test]
    fn uncertainty_suffix_is_remove() {
        let v = var("o3_uncertainty", vec![(DimensionKind::Vertical, 3)], ElementType::Float64);
        assert_eq!(classify(&v), ResampleCategory::Remove);
    }

    #[test]
    fn avk_suffix_is_remove() {
        let v = var("o3_avk", vec![(DimensionKind::Vertical, 3)], ElementType::Float64);
        assert_eq!(classify(&v), ResampleCategory::Remove);
    }

    #[test]
    fn column_infix_is_interval() {
        let v = var("o3_column_amf", vec![(DimensionKind::Vertical, 3)], ElementType::Float64);
        assert_eq!(classify(&v), ResampleCategory::Interval);
    }

    #[test]
    fn plain_vertical_variable_is_linear() {
        let v = var("temperature", vec![(DimensionKind::Time, 2), (DimensionKind::Vertical, 3)], ElementType::Float64);
        assert_eq!(classify(&v), ResampleCategory::Linear);
    }
}
