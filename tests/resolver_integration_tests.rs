// tests/resolver_integration_tests.rs

//! Black-box coverage for the derived-variable resolver, driven entirely
//! through the crate's public API rather than its internal modules.

use std::sync::Arc;

use geovar_core::conversions::register_builtins;
use geovar_core::external::{SimpleProfileOps, TableUnitConverter};
use geovar_core::registry::{ConversionRegistryBuilder, DimSpec};
use geovar_core::{DimensionKind, ElementBuffer, ErrorKind, Product, Resolver, Variable};

fn altitude_product(levels: Vec<f64>) -> Product {
    let n = levels.len();
    let mut product = Product::new();
    product
        .add(
            Variable::from_buffer(
                "altitude",
                vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, n)],
                Some("m".to_string()),
                ElementBuffer::Float64(levels),
                8,
            )
            .unwrap(),
        )
        .unwrap();
    product
}

#[test]
fn get_derived_builds_altitude_bounds_from_a_registered_conversion() {
    let mut builder = ConversionRegistryBuilder::new(8);
    register_builtins(&mut builder, Arc::new(SimpleProfileOps)).unwrap();
    let registry = builder.freeze();
    let units = TableUnitConverter::with_defaults();
    let resolver = Resolver::new(&registry, &units, 8, 64);

    let product = altitude_product(vec![1000.0, 2000.0, 3000.0]);
    let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical), DimSpec::independent(2)];

    let bounds = resolver.get_derived(&product, "altitude_bounds", None, &dims).unwrap();
    assert_eq!(bounds.data().as_f64_slice().unwrap(), &[500.0, 1500.0, 1500.0, 2500.0, 2500.0, 3500.0]);
}

#[test]
fn get_derived_column_sums_over_partial_column_ignoring_nan() {
    let mut builder = ConversionRegistryBuilder::new(8);
    register_builtins(&mut builder, Arc::new(SimpleProfileOps)).unwrap();
    let registry = builder.freeze();
    let units = TableUnitConverter::with_defaults();
    let resolver = Resolver::new(&registry, &units, 8, 64);

    let mut product = Product::new();
    product
        .add(
            Variable::from_buffer(
                "o3_partial_column",
                vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, 4)],
                Some("mol/m^2".to_string()),
                ElementBuffer::Float64(vec![f64::NAN, 2.0, 3.0, f64::NAN]),
                8,
            )
            .unwrap(),
        )
        .unwrap();

    let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::independent(1)];
    let column = resolver.get_derived(&product, "o3_column", None, &dims).unwrap();
    assert_eq!(column.data().as_f64_slice().unwrap(), &[5.0]);
}

#[test]
fn add_derived_installs_the_derived_variable_exactly_once() {
    let mut builder = ConversionRegistryBuilder::new(8);
    register_builtins(&mut builder, Arc::new(SimpleProfileOps)).unwrap();
    let registry = builder.freeze();
    let units = TableUnitConverter::with_defaults();
    let resolver = Resolver::new(&registry, &units, 8, 64);

    let mut product = altitude_product(vec![1000.0, 2000.0, 3000.0]);
    let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical), DimSpec::independent(2)];

    resolver.add_derived(&mut product, "altitude_bounds", None, &dims).unwrap();
    resolver.add_derived(&mut product, "altitude_bounds", None, &dims).unwrap();

    assert_eq!(product.variables().iter().filter(|v| v.name() == "altitude_bounds").count(), 1);
}

#[test]
fn get_derived_propagates_a_committed_candidates_compute_error() {
    // A single-level altitude has no neighbor to build bounds from; the
    // `altitude_bounds` conversion's compute step rejects it outright. That
    // must surface as the real cause, not get masked as "no plan found".
    let mut builder = ConversionRegistryBuilder::new(8);
    register_builtins(&mut builder, Arc::new(SimpleProfileOps)).unwrap();
    let registry = builder.freeze();
    let units = TableUnitConverter::with_defaults();
    let resolver = Resolver::new(&registry, &units, 8, 64);

    let product = altitude_product(vec![1000.0]);
    let dims = vec![DimSpec::shared(DimensionKind::Time), DimSpec::shared(DimensionKind::Vertical), DimSpec::independent(2)];

    let err = resolver.get_derived(&product, "altitude_bounds", None, &dims).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn get_derived_reports_variable_not_found_when_no_plan_exists() {
    let registry = ConversionRegistryBuilder::new(8).freeze();
    let units = TableUnitConverter::with_defaults();
    let resolver = Resolver::new(&registry, &units, 8, 64);

    let product = Product::new();
    let dims = vec![DimSpec::shared(DimensionKind::Time)];
    let err = resolver.get_derived(&product, "nonexistent", None, &dims).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VariableNotFound);
}
