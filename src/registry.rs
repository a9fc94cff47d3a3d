//! The conversion registry: a process-wide, read-only-after-build mapping
//! from variable name to an ordered list of conversion descriptors.
//!
//! §9's redesign note replaces the original's global mutable list with a
//! builder that is frozen into an immutable structure once construction is
//! complete, so the resolver never observes a registry under mutation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CoreError, ErrorKind};
use crate::model::{DimensionKind, ElementType, Variable};

/// One axis requirement within a conversion's input/output signature.
#[derive(Debug, Clone)]
pub struct DimSpec {
    pub kind: DimensionKind,
    /// Only meaningful when `kind` is `Independent`: pins the axis length
    /// the signature requires (e.g. a `bounds` axis of length 2). `None`
    /// leaves the length to be resolved against the product's shared
    /// dimension table.
    pub independent_length: Option<usize>,
}

impl DimSpec {
    pub fn shared(kind: DimensionKind) -> Self {
        Self { kind, independent_length: None }
    }

    pub fn independent(length: usize) -> Self {
        Self { kind: DimensionKind::Independent, independent_length: Some(length) }
    }
}

/// The shape/type/unit a conversion either produces or requires as input.
#[derive(Debug, Clone)]
pub struct VarSignature {
    pub name: String,
    pub element_type: ElementType,
    pub unit: Option<String>,
    pub dims: Vec<DimSpec>,
}

impl VarSignature {
    pub fn new(name: impl Into<String>, element_type: ElementType, unit: Option<String>, dims: Vec<DimSpec>) -> Self {
        Self { name: name.into(), element_type, unit, dims }
    }

    pub fn kinds(&self) -> Vec<DimensionKind> {
        self.dims.iter().map(|d| d.kind).collect()
    }
}

/// Pure function mutating a preallocated output variable from its already
/// resolved, already coerced source variables, in declared order.
pub type ComputeFn = dyn Fn(&mut Variable, &[Variable]) -> Result<(), CoreError> + Send + Sync;

/// Dynamic capability gate; evaluated at plan time.
pub type EnabledFn = dyn Fn() -> bool + Send + Sync;

/// A single registered rule producing `output` from `sources`.
#[derive(Clone)]
pub struct ConversionDescriptor {
    pub output: VarSignature,
    pub sources: Vec<VarSignature>,
    pub enabled: Option<Arc<EnabledFn>>,
    pub note: Option<String>,
    pub compute: Arc<ComputeFn>,
}

impl std::fmt::Debug for ConversionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionDescriptor")
            .field("output", &self.output)
            .field("sources", &self.sources)
            .field("note", &self.note)
            .finish_non_exhaustive()
    }
}

impl ConversionDescriptor {
    pub fn is_enabled(&self) -> bool {
        self.enabled.as_ref().map(|f| f()).unwrap_or(true)
    }
}

/// Mutable accumulator for conversion descriptors, frozen into a
/// [`ConversionRegistry`] once construction is complete.
pub struct ConversionRegistryBuilder {
    by_name: HashMap<String, Vec<ConversionDescriptor>>,
    max_conversion_sources: usize,
}

impl ConversionRegistryBuilder {
    pub fn new(max_conversion_sources: usize) -> Self {
        Self { by_name: HashMap::new(), max_conversion_sources }
    }

    /// Appends `descriptor` to the per-name list. The output name must be
    /// non-empty and the source count must not exceed the configured cap.
    pub fn register(&mut self, descriptor: ConversionDescriptor) -> Result<(), CoreError> {
        if descriptor.output.name.trim().is_empty() {
            return Err(CoreError::with_message(ErrorKind::InvalidName, "conversion output name must be non-empty"));
        }
        if descriptor.sources.len() > self.max_conversion_sources {
            return Err(CoreError::with_message(
                ErrorKind::InvalidArgument,
                format!(
                    "conversion '{}' has {} sources, exceeding the cap of {}",
                    descriptor.output.name,
                    descriptor.sources.len(),
                    self.max_conversion_sources
                ),
            ));
        }
        self.by_name.entry(descriptor.output.name.clone()).or_default().push(descriptor);
        Ok(())
    }

    pub fn freeze(self) -> ConversionRegistry {
        ConversionRegistry { by_name: self.by_name }
    }
}

/// Immutable, process-wide registry of conversion descriptors, read-only
/// during resolver execution.
pub struct ConversionRegistry {
    by_name: HashMap<String, Vec<ConversionDescriptor>>,
}

impl ConversionRegistry {
    /// Descriptors registered under `name`, in registration order. This
    /// order is the resolver's tie-break: the first successfully planned
    /// candidate is used.
    pub fn lookup(&self, name: &str) -> Option<&[ConversionDescriptor]> {
        self.by_name.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConversionDescriptor)> {
        self.by_name.iter().flat_map(|(name, descs)| descs.iter().map(move |d| (name.as_str(), d)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn stub_descriptor(name: &str) -> ConversionDescriptor {
        ConversionDescriptor {
            output: VarSignature::new(name, ElementType::Float64, None, vec![]),
            sources: vec![],
            enabled: None,
            note: None,
            compute: Arc::new(|_out, _srcs| Ok(())),
        }
    }

    #[test]
    fn alternatives_are_kept_in_insertion_order() {
        let mut builder = ConversionRegistryBuilder::new(8);
        builder.register(stub_descriptor("a")).unwrap();
        builder.register(stub_descriptor("a")).unwrap();
        let registry = builder.freeze();
        assert_eq!(registry.lookup("a").unwrap().len(), 2);
    }

    #[test]
    fn too_many_sources_is_rejected() {
        let mut builder = ConversionRegistryBuilder::new(1);
        let mut descriptor = stub_descriptor("a");
        descriptor.sources = vec![
            VarSignature::new("s1", ElementType::Float64, None, vec![]),
            VarSignature::new("s2", ElementType::Float64, None, vec![]),
        ];
        let err = builder.register(descriptor).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
