//! Collaborator interfaces and helpers that sit at the edges of this
//! crate's core model (§6): unit conversion, interpolation primitives,
//! vertical-profile physics, collocation tables, CSV vertical-grid files,
//! ingestion-option strings, and product import.

pub mod collocation;
pub mod csv_grid;
pub mod import;
pub mod interp;
pub mod options;
pub mod profile;
pub mod units;

pub use collocation::{CollocationPair, CollocationTable, MetadataB, VecCollocationTable};
pub use csv_grid::{parse_csv_grid, VerticalGridFile};
pub use import::ProductImporter;
pub use interp::{classify_overlap, interp_interval, interp_linear_1d, Overlap};
pub use profile::{Simple as SimpleProfileOps, VerticalProfileOps};
pub use units::{log_transform, TableUnitConverter, UnitConverter};
