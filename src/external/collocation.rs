//! Collocation table collaborator (§6).

use std::collections::HashMap;

use crate::model::DimensionKind;

/// B-side metadata carried by a collocation pair.
#[derive(Debug, Clone)]
pub struct MetadataB {
    pub filename: String,
    pub source_id: String,
    pub dimension_lengths: HashMap<DimensionKind, usize>,
}

/// `(id, source_index_a, source_index_b)` plus B-side metadata. The A-side
/// source identifier is carried alongside so the table can be filtered to
/// "pairs whose A source matches this product" without a separate lookup.
#[derive(Debug, Clone)]
pub struct CollocationPair {
    pub id: u64,
    pub source_id_a: String,
    pub source_index_a: usize,
    pub source_index_b: usize,
    pub metadata_b: MetadataB,
}

/// Shallow-copy, filter-by-source-A-identifier, sort-by-collocation-id,
/// iterate.
pub trait CollocationTable: Send + Sync {
    fn shallow_copy(&self) -> Box<dyn CollocationTable>;
    fn filter_by_source_a(&mut self, source_a_identifier: &str);
    fn sort_by_collocation_id(&mut self);
    fn pairs(&self) -> &[CollocationPair];
}

/// An in-memory, `Vec`-backed collocation table.
#[derive(Debug, Clone, Default)]
pub struct VecCollocationTable {
    pairs: Vec<CollocationPair>,
}

impl VecCollocationTable {
    pub fn new(pairs: Vec<CollocationPair>) -> Self {
        Self { pairs }
    }
}

impl CollocationTable for VecCollocationTable {
    fn shallow_copy(&self) -> Box<dyn CollocationTable> {
        Box::new(self.clone())
    }

    fn filter_by_source_a(&mut self, source_a_identifier: &str) {
        self.pairs.retain(|p| p.source_id_a == source_a_identifier);
    }

    fn sort_by_collocation_id(&mut self) {
        self.pairs.sort_by_key(|p| p.id);
    }

    fn pairs(&self) -> &[CollocationPair] {
        &self.pairs
    }
}
