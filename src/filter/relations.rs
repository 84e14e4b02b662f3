//! Memoized subset/disjoint relationships between cell filters.
//!
//! One `FilterRelations` instance belongs to one partition-resolution
//! context (a [`DofMapBuilder`](crate::map::builder::DofMapBuilder) run over
//! one mesh); facts cached here are only valid against that mesh. Filters
//! are keyed by identity, so clones hit the same cache entries.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use crate::filter::cell_filter::CellFilter;
use crate::mesh::MeshTopology;

/// Cache of pairwise filter facts against a single mesh.
#[derive(Default)]
pub struct FilterRelations {
    cells: HashMap<u64, Arc<BTreeSet<usize>>>,
    subset: HashMap<(u64, u64), bool>,
    disjoint: HashMap<(u64, u64), bool>,
}

impl FilterRelations {
    /// An empty relations cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialized (and memoized) cell set of a filter.
    pub fn cell_set(&mut self, f: &CellFilter, mesh: &dyn MeshTopology) -> Arc<BTreeSet<usize>> {
        Arc::clone(
            self.cells
                .entry(f.id())
                .or_insert_with(|| Arc::new(f.cells(mesh).into_iter().collect())),
        )
    }

    /// Whether the filter selects no cells on this rank.
    pub fn is_empty(&mut self, f: &CellFilter, mesh: &dyn MeshTopology) -> bool {
        self.cell_set(f, mesh).is_empty()
    }

    /// Whether every cell of `a` is a cell of `b`.
    pub fn is_subset(&mut self, a: &CellFilter, b: &CellFilter, mesh: &dyn MeshTopology) -> bool {
        let key = (a.id(), b.id());
        if let Some(&known) = self.subset.get(&key) {
            return known;
        }
        let sa = self.cell_set(a, mesh);
        let sb = self.cell_set(b, mesh);
        let result = sa.is_subset(&sb);
        self.subset.insert(key, result);
        result
    }

    /// Whether `a` and `b` share no cells.
    pub fn are_disjoint(&mut self, a: &CellFilter, b: &CellFilter, mesh: &dyn MeshTopology) -> bool {
        let key = if a.id() <= b.id() {
            (a.id(), b.id())
        } else {
            (b.id(), a.id())
        };
        if let Some(&known) = self.disjoint.get(&key) {
            return known;
        }
        let sa = self.cell_set(a, mesh);
        let sb = self.cell_set(b, mesh);
        let result = sa.is_disjoint(&sb);
        self.disjoint.insert(key, result);
        result
    }

    /// Whether `a` and `b` select exactly the same cells.
    pub fn are_equivalent(&mut self, a: &CellFilter, b: &CellFilter, mesh: &dyn MeshTopology) -> bool {
        self.is_subset(a, b, mesh) && self.is_subset(b, a, mesh)
    }
}
