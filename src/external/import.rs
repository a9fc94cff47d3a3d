//! Product import collaborator (§6). File-format reading (HDF-EOS, HDF4,
//! HDF5, netCDF, CODA) is fully out of scope for this crate; only the
//! interface shape is specified here, to be implemented by an embedding
//! binary's format-specific reader.

use crate::error::CoreError;
use crate::model::Product;

pub trait ProductImporter: Send + Sync {
    fn import(&self, filename: &str) -> Result<Product, CoreError>;
}
