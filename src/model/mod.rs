//! Variable and product models (§3 of the core specification).

pub mod dim;
pub mod dtype;
pub mod product;
pub mod variable;

pub use dim::DimensionKind;
pub use dtype::{ElementBuffer, ElementType};
pub use product::Product;
pub use variable::Variable;
