//! Error hierarchy for the resolver and regridding engine.
//!
//! Every fallible operation in this crate returns a `Result<T, CoreError>`.
//! `CoreError` carries a `kind` from the closed taxonomy below, a
//! human-readable `message`, an optional `path` annotation (the variable or
//! product name the error occurred against), and an optional boxed `source`
//! for the wrapped cause. Annotating via [`CoreError::annotate`] preserves
//! "inner error first" ordering: the returned error's `source()` is the
//! original error, and its own message is the new outer context.

use std::fmt;
use thiserror::Error;

/// The closed error taxonomy surfaced by this crate's external interfaces.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[error("out of memory")]
    OutOfMemory,
    #[error("file not found")]
    FileNotFound,
    #[error("could not open file")]
    FileOpen,
    #[error("could not close file")]
    FileClose,
    #[error("could not read file")]
    FileRead,
    #[error("could not write file")]
    FileWrite,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("invalid index")]
    InvalidIndex,
    #[error("invalid name")]
    InvalidName,
    #[error("invalid format")]
    InvalidFormat,
    #[error("invalid date/time")]
    InvalidDatetime,
    #[error("invalid type")]
    InvalidType,
    #[error("array rank mismatch")]
    ArrayRankMismatch,
    #[error("array index out of bounds")]
    ArrayOutOfBounds,
    #[error("variable not found")]
    VariableNotFound,
    #[error("unit conversion error")]
    UnitConversion,
    #[error("product error")]
    ProductError,
    #[error("ingestion error")]
    IngestionError,
    #[error("ingestion option syntax error")]
    IngestionOptionSyntax,
    #[error("invalid ingestion option")]
    InvalidIngestionOption,
    #[error("invalid ingestion option value")]
    InvalidIngestionOptionValue,
    #[error("no data")]
    NoData,
    #[error("unsupported product")]
    UnsupportedProduct,
    #[error("import error")]
    Import,
    #[error("csv parse error")]
    CsvParse,
}

/// The error type returned by every fallible operation in this crate.
///
/// `source` is boxed rather than generic so that `CoreError` itself stays a
/// plain, `'static` type usable across the resolver's recursion without
/// infecting every signature with a type parameter.
#[derive(Debug)]
pub struct CoreError {
    kind: ErrorKind,
    message: String,
    path: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl CoreError {
    /// Builds an error carrying the kind's default message.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, message: kind.to_string(), path: None, source: None }
    }

    /// Builds an error with a caller-supplied message instead of the kind's default.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), path: None, source: None }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attaches a path annotation (the variable or product name involved).
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attaches a wrapped cause without changing this error's own message.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Wraps `self` as the cause of a new, higher-level error, prefixing the
    /// message with `context`. Used by the resolver to append the
    /// "could not derive variable X" annotation while keeping the original
    /// failure as `source()` (inner error first, per the error handling
    /// design).
    #[must_use]
    pub fn annotate(self, context: impl Into<String>) -> Self {
        let context = context.into();
        let kind = self.kind;
        let path = self.path.clone();
        let message = format!("{context}: {}", self.message);
        Self { kind, message, path, source: Some(Box::new(self)) }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({path}): {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotate_preserves_inner_error_as_source() {
        let inner = CoreError::new(ErrorKind::VariableNotFound).with_path("pressure");
        let outer = inner.annotate("could not derive variable pressure");
        assert_eq!(outer.kind(), ErrorKind::VariableNotFound);
        assert!(outer.message().starts_with("could not derive variable pressure"));
        let source = std::error::Error::source(&outer).expect("annotate must keep the cause");
        assert!(source.to_string().contains("variable not found"));
    }

    #[test]
    fn display_includes_path_annotation() {
        let err = CoreError::with_message(ErrorKind::UnitConversion, "no registered table entry")
            .with_path("altitude");
        let text = err.to_string();
        assert!(text.contains("altitude"));
        assert!(text.contains("no registered table entry"));
    }
}
