//! # Atmospheric Data Core
//!
//! **Layer:** Scientific data core
//!
//! This crate is the computational core behind an atmospheric remote-sensing
//! post-processing pipeline: a derived-variable resolver that plans and
//! executes chains of registered conversions over a product's variables
//! (§4.2), and a vertical regridding/smoothing engine that resamples a
//! product's profiles onto a fixed axis or onto a collocated product's grid,
//! optionally applying averaging-kernel smoothing (§4.3).
//!
//! ## Architectural guarantees
//! 1. **Closed error taxonomy**: every fallible operation returns
//!    `Result<T, CoreError>` from a fixed [`error::ErrorKind`] set; nothing
//!    panics on malformed input.
//! 2. **Frozen registry**: conversion descriptors are registered through a
//!    builder and then frozen into an immutable [`registry::ConversionRegistry`],
//!    so the resolver never observes a registry under mutation.
//! 3. **Data parallelism at the edges**: the fixed-axis regridder resamples
//!    independent variables concurrently via `rayon`; the resolver and
//!    collocation regridder are single-threaded by nature (each variable's
//!    resolution can depend on another's).

pub mod config;
pub mod conversions;
pub mod error;
pub mod external;
pub mod model;
pub mod regrid;
pub mod registry;
pub mod resolver;

pub use config::CoreConfig;
pub use error::{CoreError, ErrorKind};
pub use model::{DimensionKind, ElementBuffer, ElementType, Product, Variable};
pub use regrid::{classify, coerce_back, regrid_fixed_axis, CollocationRegridder, ResampleCategory};
pub use registry::{ConversionDescriptor, ConversionRegistry, ConversionRegistryBuilder, DimSpec, VarSignature};
pub use resolver::Resolver;
