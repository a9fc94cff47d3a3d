//! Unit conversion collaborator (§6).
//!
//! The resolver and regridder depend only on the [`UnitConverter`] trait;
//! [`TableUnitConverter`] is a reference implementation covering the
//! handful of units this crate's own tests and builtin conversions name.
//! A real deployment would plug in a collaborator backed by a full
//! UDUNITS-style unit-string parser instead.

use std::collections::HashMap;

use crate::error::{CoreError, ErrorKind};
use crate::model::{ElementBuffer, Variable};

/// `can_convert` / `convert_variable` / `variable_has_unit`, as specified.
pub trait UnitConverter: Send + Sync {
    fn can_convert(&self, src_unit: &str, dst_unit: &str) -> bool;
    fn convert_variable(&self, v: &mut Variable, dst_unit: &str) -> Result<(), CoreError>;

    /// Syntactic equality after normalization. Default delegates to the
    /// variable model's own predicate; collaborators with a richer unit
    /// grammar (e.g. `kg.m-3` vs `kg m^-3`) may override this.
    fn variable_has_unit(&self, v: &Variable, unit: &str) -> bool {
        v.has_unit(unit)
    }
}

#[derive(Debug, Clone, Copy)]
struct UnitEntry {
    kind: &'static str,
    /// Affine scale-table entry: `canonical = raw * k + b`.
    k: f64,
    b: f64,
}

/// An affine (k, b) scale-table unit converter: `value_dst = (value_src *
/// k_src + b_src - b_dst) / k_dst`. Grounded in the teacher crate's
/// `UnitDefinition`/`Dimension` model (`units.rs`), restricted to a flat
/// string-keyed table since cross-dimension algebra (multiplying/dividing
/// physical dimensions) is out of scope here.
pub struct TableUnitConverter {
    entries: HashMap<String, UnitEntry>,
}

impl TableUnitConverter {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Registers the units named by this crate's own builtin conversions
    /// and test scenarios: `hPa`/`Pa`, `m`/`km`, `K`/`degC`.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register("Pa", "pressure", 1.0, 0.0);
        table.register("hPa", "pressure", 100.0, 0.0);
        table.register("m", "length", 1.0, 0.0);
        table.register("km", "length", 1000.0, 0.0);
        table.register("K", "temperature", 1.0, 0.0);
        table.register("degC", "temperature", 1.0, 273.15);
        table.register("mol/m^2", "column_density", 1.0, 0.0);
        table
    }

    pub fn register(&mut self, symbol: &str, kind: &'static str, k: f64, b: f64) {
        self.entries.insert(symbol.to_string(), UnitEntry { kind, k, b });
    }
}

impl Default for TableUnitConverter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl UnitConverter for TableUnitConverter {
    fn can_convert(&self, src_unit: &str, dst_unit: &str) -> bool {
        if src_unit.trim() == dst_unit.trim() {
            return true;
        }
        match (self.entries.get(src_unit.trim()), self.entries.get(dst_unit.trim())) {
            (Some(src), Some(dst)) => src.kind == dst.kind,
            _ => false,
        }
    }

    fn convert_variable(&self, v: &mut Variable, dst_unit: &str) -> Result<(), CoreError> {
        let src_unit = v
            .unit()
            .ok_or_else(|| {
                CoreError::with_message(ErrorKind::UnitConversion, "variable has no unit to convert from")
                    .with_path(v.name().to_string())
            })?
            .to_string();

        if src_unit.trim() == dst_unit.trim() {
            // A unit conversion that is a no-op is locally recoverable, not an error.
            return Ok(());
        }

        let src = self.entries.get(src_unit.trim()).ok_or_else(|| {
            CoreError::with_message(ErrorKind::UnitConversion, format!("unregistered unit '{src_unit}'"))
                .with_path(v.name().to_string())
        })?;
        let dst = self.entries.get(dst_unit.trim()).ok_or_else(|| {
            CoreError::with_message(ErrorKind::UnitConversion, format!("unregistered unit '{dst_unit}'"))
                .with_path(v.name().to_string())
        })?;
        if src.kind != dst.kind {
            return Err(CoreError::with_message(
                ErrorKind::UnitConversion,
                format!("cannot convert '{src_unit}' to '{dst_unit}': incompatible quantity kinds"),
            )
            .with_path(v.name().to_string()));
        }

        let original_type = v.element_type();
        let floats = v.data().to_f64_vec().map_err(|e| e.with_path(v.name().to_string()))?;
        let converted: Vec<f64> = floats.iter().map(|&x| (x * src.k + src.b - dst.b) / dst.k).collect();
        let converted = ElementBuffer::Float64(converted)
            .coerce(original_type)
            .map_err(|e| e.with_path(v.name().to_string()))?;
        v.replace_data(converted)?;
        v.set_unit(Some(dst_unit.to_string()));
        Ok(())
    }
}

/// Transforms `values` in place to natural-log space. Used by the regrid
/// engine for the pressure axis, which is interpolated uniformly in
/// log-space (see the log-transform policy decision in DESIGN.md).
pub fn log_transform(values: &mut [f64]) {
    for value in values {
        *value = value.ln();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DimensionKind, ElementType};

    #[test]
    fn hpa_to_pa_scales_by_one_hundred() {
        let converter = TableUnitConverter::with_defaults();
        let mut v = Variable::from_buffer(
            "pressure",
            vec![(DimensionKind::Vertical, 3)],
            Some("hPa".to_string()),
            ElementBuffer::Float64(vec![1.0, 2.0, 3.0]),
            8,
        )
        .unwrap();
        converter.convert_variable(&mut v, "Pa").unwrap();
        assert_eq!(v.data().as_f64_slice().unwrap(), &[100.0, 200.0, 300.0]);
        assert_eq!(v.unit(), Some("Pa"));
    }

    #[test]
    fn celsius_to_kelvin_applies_offset() {
        let converter = TableUnitConverter::with_defaults();
        let mut v = Variable::from_buffer(
            "t",
            vec![(DimensionKind::Time, 1)],
            Some("degC".to_string()),
            ElementBuffer::Float64(vec![0.0]),
            8,
        )
        .unwrap();
        converter.convert_variable(&mut v, "K").unwrap();
        assert!((v.data().as_f64_slice().unwrap()[0] - 273.15).abs() < 1e-9);
    }

    #[test]
    fn incompatible_kinds_are_rejected() {
        let converter = TableUnitConverter::with_defaults();
        let mut v = Variable::from_buffer(
            "x",
            vec![(DimensionKind::Time, 1)],
            Some("K".to_string()),
            ElementBuffer::Float64(vec![1.0]),
            8,
        )
        .unwrap();
        let err = converter.convert_variable(&mut v, "m").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnitConversion);
        assert!(v.element_type() == ElementType::Float64);
    }
}
