//! TOML-backed configuration for resolver and regrid tunables.
//!
//! The original tool compiled these in as constants; this crate exposes
//! them as a small struct so an embedding binary can tune recursion limits
//! or smoothing tolerance without a rebuild. `CoreConfig::default()` matches
//! the original compiled-in values.

use serde::Deserialize;

use crate::error::{CoreError, ErrorKind};
use crate::model::dim::{DEFAULT_MAX_CONVERSION_SOURCES, DEFAULT_MAX_RANK};

/// Tunables for the resolver and regrid engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Upper bound on a variable's number of dimensions.
    pub max_rank: usize,
    /// Upper bound on a conversion descriptor's source-requirement count.
    pub max_conversion_sources: usize,
    /// Recursion depth guard for the resolver's planner, independent of the
    /// cycle-detection stack (bounds pathological, non-cyclic chains too).
    pub max_recursion_depth: usize,
    /// Default epsilon used when an AVK smoothing apriori column is absent
    /// and a caller needs a numerically stable zero-fill tolerance.
    pub avk_epsilon: f64,
    /// Log verbosity hint for embedding binaries that wire up a subscriber;
    /// the crate itself never reads this, it only documents the intended
    /// level for resolver/regrid trace output.
    pub log_verbosity: LogVerbosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogVerbosity {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogVerbosity {
    fn default() -> Self {
        LogVerbosity::Info
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_rank: DEFAULT_MAX_RANK,
            max_conversion_sources: DEFAULT_MAX_CONVERSION_SOURCES,
            max_recursion_depth: 64,
            avk_epsilon: 1e-12,
            log_verbosity: LogVerbosity::Info,
        }
    }
}

impl CoreConfig {
    /// Parses a config from a TOML document. Missing fields fall back to
    /// [`CoreConfig::default`].
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        toml::from_str(text).map_err(|e| {
            CoreError::with_message(ErrorKind::InvalidFormat, e.to_string())
        })
    }

    /// Reads and parses a config file from disk.
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::with_message(ErrorKind::FileRead, e.to_string()).with_path(path))?;
        Self::from_toml_str(&text).map_err(|e| e.with_path(path))
    }
}
