// tests/regrid_integration_tests.rs

//! Black-box coverage for the vertical regridding engine — both the
//! fixed-axis path and the collocation path — driven through the crate's
//! public API.

use std::collections::HashMap;
use std::sync::Mutex;

use geovar_core::external::{
    CollocationPair, MetadataB, ProductImporter, SimpleProfileOps, TableUnitConverter, VecCollocationTable,
};
use geovar_core::registry::ConversionRegistryBuilder;
use geovar_core::{CollocationRegridder, CoreError, DimensionKind, ElementBuffer, ErrorKind, Product, Resolver, Variable};

fn vertical_axis(name: &str, unit: &str, values: Vec<f64>) -> Variable {
    let len = values.len();
    Variable::from_buffer(name, vec![(DimensionKind::Vertical, len)], Some(unit.to_string()), ElementBuffer::Float64(values), 8).unwrap()
}

#[test]
fn regrid_fixed_axis_resamples_a_profile_onto_a_coarser_altitude_grid() {
    let mut product = Product::new();
    product.add(vertical_axis("altitude", "m", vec![0.0, 1000.0, 2000.0])).unwrap();
    product
        .add(Variable::from_buffer("temperature", vec![(DimensionKind::Vertical, 3)], None, ElementBuffer::Float64(vec![10.0, 20.0, 30.0]), 8).unwrap())
        .unwrap();
    product.set_dimension_length(DimensionKind::Vertical, 3);

    let registry = ConversionRegistryBuilder::new(8).freeze();
    let units = TableUnitConverter::with_defaults();
    let resolver = Resolver::new(&registry, &units, 8, 64);
    let target = vertical_axis("altitude", "m", vec![500.0, 1500.0]);

    geovar_core::regrid_fixed_axis(&resolver, &SimpleProfileOps, &mut product, &target, 8).unwrap();

    let temperature = product.get("temperature").unwrap();
    assert_eq!(temperature.data().as_f64_slice().unwrap(), &[15.0, 25.0]);
    assert_eq!(product.dimension_length(DimensionKind::Vertical), Some(2));
}

struct FakeImporter {
    products: Mutex<HashMap<String, Product>>,
}

impl ProductImporter for FakeImporter {
    fn import(&self, filename: &str) -> Result<Product, CoreError> {
        self.products.lock().unwrap().get(filename).cloned().ok_or_else(|| CoreError::new(ErrorKind::FileNotFound).with_path(filename))
    }
}

fn match_product() -> Product {
    let mut p = Product::new();
    p.add(Variable::from_buffer("collocation_index", vec![(DimensionKind::Time, 1)], None, ElementBuffer::Float64(vec![1.0]), 8).unwrap())
        .unwrap();
    p.add(
        Variable::from_buffer(
            "altitude",
            vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, 2)],
            Some("m".to_string()),
            ElementBuffer::Float64(vec![250.0, 750.0]),
            8,
        )
        .unwrap(),
    )
    .unwrap();
    p.set_dimension_length(DimensionKind::Time, 1);
    p.set_dimension_length(DimensionKind::Vertical, 2);
    p
}

#[test]
fn collocation_regridder_resamples_onto_the_matched_products_grid() {
    let mut product = Product::new();
    product.set_source_product(Some("p".to_string()));
    product.set_dimension_length(DimensionKind::Time, 1);
    product.set_dimension_length(DimensionKind::Vertical, 3);
    product
        .add(Variable::from_buffer("collocation_index", vec![(DimensionKind::Time, 1)], None, ElementBuffer::Float64(vec![1.0]), 8).unwrap())
        .unwrap();
    product
        .add(
            Variable::from_buffer(
                "altitude",
                vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, 3)],
                Some("m".to_string()),
                ElementBuffer::Float64(vec![0.0, 500.0, 1000.0]),
                8,
            )
            .unwrap(),
        )
        .unwrap();
    product
        .add(
            Variable::from_buffer(
                "temperature",
                vec![(DimensionKind::Time, 1), (DimensionKind::Vertical, 3)],
                None,
                ElementBuffer::Float64(vec![10.0, 20.0, 30.0]),
                8,
            )
            .unwrap(),
        )
        .unwrap();

    let mut metadata_dims = HashMap::new();
    metadata_dims.insert(DimensionKind::Vertical, 2);
    let pair = CollocationPair {
        id: 1,
        source_id_a: "p".to_string(),
        source_index_a: 0,
        source_index_b: 0,
        metadata_b: MetadataB { filename: "match.nc".to_string(), source_id: "b".to_string(), dimension_lengths: metadata_dims },
    };
    let table = VecCollocationTable::new(vec![pair]);

    let mut products = HashMap::new();
    products.insert("match.nc".to_string(), match_product());
    let importer = FakeImporter { products: Mutex::new(products) };

    let registry = ConversionRegistryBuilder::new(8).freeze();
    let units = TableUnitConverter::with_defaults();
    let resolver = Resolver::new(&registry, &units, 8, 64);
    let regridder = CollocationRegridder::new(&resolver, &SimpleProfileOps, &importer, 8);

    regridder.regrid_and_smooth(&mut product, "altitude", "m", &table, &[]).unwrap();

    let temperature = product.get("temperature").unwrap();
    assert_eq!(temperature.dimensions().last().unwrap().1, 2);
    let values = temperature.data().as_f64_slice().unwrap();
    assert!((values[0] - 15.0).abs() < 1e-9);
    assert!((values[1] - 25.0).abs() < 1e-9);
}
