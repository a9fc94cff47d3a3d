//! Builtin demonstration conversions (§4.1 **[ADDED]**).
//!
//! These give the resolver something real to plan over in this crate's own
//! tests and document the registration pattern for embedding binaries. The
//! `pressure [hPa] → pressure [Pa]` conversion named alongside these in the
//! design notes is deliberately *not* registered here: it is pure unit
//! coercion, served entirely by the resolver's cheap path plus
//! [`crate::external::UnitConverter`], with no descriptor needed.

use std::sync::Arc;

use crate::error::{CoreError, ErrorKind};
use crate::external::VerticalProfileOps;
use crate::model::{DimensionKind, ElementBuffer, ElementType, Variable};
use crate::registry::{ComputeFn, ConversionDescriptor, ConversionRegistryBuilder, DimSpec, VarSignature};

fn time_and_vertical_lengths(dims: &[(DimensionKind, usize)]) -> Result<(usize, usize), CoreError> {
    let time_len = dims.iter().find(|(k, _)| *k == DimensionKind::Time).map(|(_, l)| *l).unwrap_or(1);
    let vertical_len = dims
        .iter()
        .find(|(k, _)| *k == DimensionKind::Vertical)
        .map(|(_, l)| *l)
        .ok_or_else(|| CoreError::with_message(ErrorKind::ArrayRankMismatch, "expected a vertical axis"))?;
    Ok((time_len, vertical_len))
}

/// `altitude_bounds [m] {time, vertical, independent=2}` ← `altitude [m]
/// {time, vertical}`, implementing the bounds-from-midpoint construction
/// of R1. Delegates to whatever `VerticalProfileOps` the caller supplies.
fn altitude_bounds_descriptor(ops: Arc<dyn VerticalProfileOps>) -> ConversionDescriptor {
    let compute: Arc<ComputeFn> = Arc::new(move |output, sources| {
        let altitude = &sources[0];
        let (time_len, vertical_len) = time_and_vertical_lengths(altitude.dimensions())?;
        let src = altitude.data().as_f64_slice().map_err(|e| e.annotate("altitude_bounds"))?;
        let mut out = vec![0.0; time_len * vertical_len * 2];
        for t in 0..time_len {
            let row = &src[t * vertical_len..(t + 1) * vertical_len];
            let bounds = ops.altitude_bounds_from_altitude(row).map_err(|e| e.annotate("altitude_bounds"))?;
            for (v, (lower, upper)) in bounds.into_iter().enumerate() {
                out[(t * vertical_len + v) * 2] = lower;
                out[(t * vertical_len + v) * 2 + 1] = upper;
            }
        }
        output.replace_data(ElementBuffer::Float64(out))
    });

    ConversionDescriptor {
        output: VarSignature::new(
            "altitude_bounds",
            ElementType::Float64,
            Some("m".to_string()),
            vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical), DimSpec::independent(2)],
        ),
        sources: vec![VarSignature::new(
            "altitude",
            ElementType::Float64,
            Some("m".to_string()),
            vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical)],
        )],
        enabled: None,
        note: Some("bounds-from-midpoint construction (R1), via VerticalProfileOps".to_string()),
        compute,
    }
}

/// `{species}_column [mol/m^2] {time, independent=1}` ← `{species}_partial_column
/// [mol/m^2] {time, vertical}`, implementing the NaN-ignoring sum of R2.
///
/// The design notes name this family with a `*_column` wildcard; this
/// registry resolves descriptors by exact output name, so each species is
/// registered as its own concrete descriptor. `species` is typically an
/// embedding binary's product-specific name (e.g. `"o3"`, `"no2"`).
fn column_descriptor(species: &str, ops: Arc<dyn VerticalProfileOps>) -> ConversionDescriptor {
    let compute: Arc<ComputeFn> = Arc::new(move |output, sources| {
        let partial = &sources[0];
        let (time_len, vertical_len) = time_and_vertical_lengths(partial.dimensions())?;
        let src = partial.data().as_f64_slice().map_err(|e| e.annotate("column"))?;
        let mut out = vec![0.0; time_len];
        for (t, slot) in out.iter_mut().enumerate() {
            let row = &src[t * vertical_len..(t + 1) * vertical_len];
            *slot = ops.column_from_partial_column(row);
        }
        output.replace_data(ElementBuffer::Float64(out))
    });

    ConversionDescriptor {
        output: VarSignature::new(
            format!("{species}_column"),
            ElementType::Float64,
            Some("mol/m^2".to_string()),
            vec![DimSpec::shared(DimensionKind::Time), DimSpec::independent(1)],
        ),
        sources: vec![VarSignature::new(
            format!("{species}_partial_column"),
            ElementType::Float64,
            Some("mol/m^2".to_string()),
            vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical)],
        )],
        enabled: None,
        note: Some("NaN-ignoring partial-column sum (R2), via VerticalProfileOps".to_string()),
        compute,
    }
}

/// Registers this crate's builtin demonstration conversions: `altitude_bounds`
/// plus one concrete `*_column` instance (`o3_column`, standing in for the
/// wildcard family named in the design notes).
pub fn register_builtins(builder: &mut ConversionRegistryBuilder, ops: Arc<dyn VerticalProfileOps>) -> Result<(), CoreError> {
    builder.register(altitude_bounds_descriptor(Arc::clone(&ops)))?;
    builder.register(column_descriptor("o3", ops))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::SimpleProfileOps;
    use crate::model::Variable;

    fn altitude_variable() -> Variable {
        Variable::from_buffer(
            "altitude",
            vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, 3)],
            Some("m".to_string()),
            ElementBuffer::Float64(vec![1000.0, 2000.0, 3000.0]),
            8,
        )
        .unwrap()
    }

    #[test]
    fn altitude_bounds_matches_scenario_2() {
        let descriptor = altitude_bounds_descriptor(Arc::new(SimpleProfileOps));
        let mut output = Variable::new(
            "altitude_bounds",
            ElementType::Float64,
            vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, 3), (DimensionKind::Independent, 2)],
            Some("m".to_string()),
            8,
        )
        .unwrap();
        (descriptor.compute)(&mut output, &[altitude_variable()]).unwrap();
        assert_eq!(
            output.data().as_f64_slice().unwrap(),
            &[500.0, 1500.0, 1500.0, 2500.0, 2500.0, 3500.0]
        );
    }

    #[test]
    fn column_ignores_nan_contributions() {
        let descriptor = column_descriptor("o3", Arc::new(SimpleProfileOps));
        let partial = Variable::from_buffer(
            "o3_partial_column",
            vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, 4)],
            Some("mol/m^2".to_string()),
            ElementBuffer::Float64(vec![f64::NAN, 2.0, 3.0, f64::NAN]),
            8,
        )
        .unwrap();
        let mut output = Variable::new(
            "o3_column",
            ElementType::Float64,
            vec![(DimensionKind::Time, 1), (DimensionKind::Independent, 1)],
            Some("mol/m^2".to_string()),
            8,
        )
        .unwrap();
        (descriptor.compute)(&mut output, &[partial]).unwrap();
        assert_eq!(output.data().as_f64_slice().unwrap(), &[5.0]);
    }
}
