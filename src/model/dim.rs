//! Dimension kinds and the small compile-time bounds that govern rank.

/// Default upper bound on a variable's number of dimensions. Overridable
/// per-process via [`crate::config::CoreConfig`].
pub const DEFAULT_MAX_RANK: usize = 8;

/// Default upper bound on a conversion descriptor's source-requirement
/// count. Overridable per-process via [`crate::config::CoreConfig`].
pub const DEFAULT_MAX_CONVERSION_SOURCES: usize = 8;

/// A symbolic axis label. `Independent` denotes a fixed small-length axis
/// whose length participates in type identity (e.g. `bounds` axes of
/// length 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DimensionKind {
    Time,
    Vertical,
    Spectral,
    Latitude,
    Longitude,
    Independent,
}

impl DimensionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DimensionKind::Time => "time",
            DimensionKind::Vertical => "vertical",
            DimensionKind::Spectral => "spectral",
            DimensionKind::Latitude => "latitude",
            DimensionKind::Longitude => "longitude",
            DimensionKind::Independent => "independent",
        }
    }

    /// Whether a product-wide `dimension_lengths` entry governs this kind's
    /// axis length. `Independent` axes carry their length on the variable
    /// itself instead.
    pub fn is_shared(self) -> bool {
        !matches!(self, DimensionKind::Independent)
    }
}

impl std::fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
