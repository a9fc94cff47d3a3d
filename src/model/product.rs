//! The product model: an ordered, named collection of variables sharing a
//! table of per-dimension-kind lengths.

use std::collections::HashMap;

use crate::error::{CoreError, ErrorKind};
use crate::model::dim::DimensionKind;

/// An ordered collection of variables addressable by name, plus the shared
/// axis-length table that enforces §3's product invariant: every
/// non-`independent` axis length equals `dimension_lengths[kind]`.
#[derive(Debug, Clone, Default)]
pub struct Product {
    variables: Vec<Variable>,
    dimension_lengths: HashMap<DimensionKind, usize>,
    source_product: Option<String>,
    metadata: HashMap<String, String>,
}

use crate::model::variable::Variable;

impl Product {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_product(&self) -> Option<&str> {
        self.source_product.as_deref()
    }

    pub fn set_source_product(&mut self, source: Option<String>) {
        self.source_product = source;
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn dimension_length(&self, kind: DimensionKind) -> Option<usize> {
        self.dimension_lengths.get(&kind).copied()
    }

    /// Directly sets a shared axis length. Used by the regrid engine after
    /// growing/shrinking the vertical axis (`P.dimension_lengths[vertical]
    /// = N_t`); callers are responsible for having already resized every
    /// affected variable to match.
    pub fn set_dimension_length(&mut self, kind: DimensionKind, length: usize) {
        self.dimension_lengths.insert(kind, length);
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name() == name)
    }

    /// Validates `var`'s shared axes against the product's dimension-length
    /// table, establishing a fresh entry the first time a kind is seen.
    fn reconcile_dimension_lengths(&mut self, var: &Variable) -> Result<(), CoreError> {
        for &(kind, length) in var.dimensions() {
            if !kind.is_shared() {
                continue;
            }
            match self.dimension_lengths.get(&kind) {
                Some(&existing) if existing != length => {
                    return Err(CoreError::with_message(
                        ErrorKind::ArrayRankMismatch,
                        format!(
                            "variable '{}' has {kind} length {length}, product expects {existing}",
                            var.name()
                        ),
                    )
                    .with_path(var.name().to_string()));
                }
                Some(_) => {}
                None => {
                    self.dimension_lengths.insert(kind, length);
                }
            }
        }
        Ok(())
    }

    /// Appends `var`. `P2`: names must be unique within a product.
    pub fn add(&mut self, var: Variable) -> Result<(), CoreError> {
        if self.get(var.name()).is_some() {
            return Err(CoreError::with_message(
                ErrorKind::InvalidName,
                format!("a variable named '{}' already exists in this product", var.name()),
            )
            .with_path(var.name().to_string()));
        }
        self.reconcile_dimension_lengths(&var)?;
        self.variables.push(var);
        Ok(())
    }

    /// Removes and returns the variable named `name`, preserving the
    /// relative order of the remaining variables.
    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        let idx = self.index_of(name)?;
        Some(self.variables.remove(idx))
    }

    /// Removes any existing variable named `var.name()` (regardless of
    /// shape) and re-adds `var` in its place at the end.
    pub fn replace(&mut self, var: Variable) -> Result<(), CoreError> {
        self.remove(var.name());
        self.add(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    /// Variable names in reverse insertion order, the iteration order the
    /// regrid engine uses so that in-place removals are safe.
    pub fn names_reverse_insertion_order(&self) -> Vec<String> {
        self.variables.iter().rev().map(|v| v.name().to_string()).collect()
    }
}
