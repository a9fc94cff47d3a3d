//! Vertical regridding and smoothing (§4.3): resample every vertical
//! variable of a product onto either a caller-supplied fixed axis or the
//! per-sample grid of whatever product it collocates with, optionally
//! smoothing the result with an averaging kernel.

pub mod category;
pub mod collocation;
pub mod fixed;
pub mod support;

pub use category::{classify, ResampleCategory};
pub use collocation::CollocationRegridder;
pub use fixed::{coerce_back, regrid_fixed_axis};
