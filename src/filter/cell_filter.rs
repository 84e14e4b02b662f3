//! Cell filters: immutable region selectors over mesh cells.
//!
//! A filter is a value object pairing a dimension with a predicate closure
//! over `(mesh, cell LID)`. Filters compose by union, intersection, and
//! difference; composition never mutates its operands. Each filter carries a
//! process-unique identity so that relation caches
//! ([`crate::filter::FilterRelations`]) can memoize pairwise facts without
//! hashing closures.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dof_error::DofSieveError;
use crate::mesh::MeshTopology;

type CellPredicate = Arc<dyn Fn(&dyn MeshTopology, usize) -> bool + Send + Sync>;

static NEXT_FILTER_ID: AtomicU64 = AtomicU64::new(1);

fn fresh_id() -> u64 {
    NEXT_FILTER_ID.fetch_add(1, Ordering::Relaxed)
}

/// An immutable selector of cells of one dimension.
#[derive(Clone)]
pub struct CellFilter {
    id: u64,
    dim: usize,
    maximal: bool,
    label: Arc<str>,
    pred: CellPredicate,
}

impl std::fmt::Debug for CellFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellFilter")
            .field("id", &self.id)
            .field("dim", &self.dim)
            .field("label", &self.label)
            .finish()
    }
}

impl PartialEq for CellFilter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CellFilter {}

impl std::hash::Hash for CellFilter {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl CellFilter {
    /// The filter selecting every maximal cell of dimension `dim`.
    pub fn maximal(dim: usize) -> Self {
        Self {
            id: fresh_id(),
            dim,
            maximal: true,
            label: Arc::from("maximal"),
            pred: Arc::new(|_, _| true),
        }
    }

    /// A filter selecting cells of `dim` satisfying `pred`.
    pub fn predicate<F>(dim: usize, label: &str, pred: F) -> Self
    where
        F: Fn(&dyn MeshTopology, usize) -> bool + Send + Sync + 'static,
    {
        Self {
            id: fresh_id(),
            dim,
            maximal: false,
            label: Arc::from(label),
            pred: Arc::new(pred),
        }
    }

    /// Process-unique identity; clones share it.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Dimension of the cells this filter selects.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Whether this filter was constructed as the maximal-cell filter.
    pub fn is_maximal(&self) -> bool {
        self.maximal
    }

    /// Human-readable label for diagnostics.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether `lid` belongs to this filter.
    pub fn contains(&self, mesh: &dyn MeshTopology, lid: usize) -> bool {
        (self.pred)(mesh, lid)
    }

    /// Materialize the selected LIDs in ascending order.
    ///
    /// Ascending LID order is the iteration order local DOF assignment
    /// relies on for determinism.
    pub fn cells(&self, mesh: &dyn MeshTopology) -> Vec<usize> {
        (0..mesh.num_cells(self.dim))
            .filter(|&lid| (self.pred)(mesh, lid))
            .collect()
    }

    fn require_same_dim(&self, other: &Self) -> Result<(), DofSieveError> {
        if self.dim != other.dim {
            return Err(DofSieveError::FilterDimMismatch(self.dim, other.dim));
        }
        Ok(())
    }

    /// Cells in either filter.
    pub fn union(&self, other: &Self) -> Result<Self, DofSieveError> {
        self.require_same_dim(other)?;
        let (a, b) = (Arc::clone(&self.pred), Arc::clone(&other.pred));
        Ok(Self {
            id: fresh_id(),
            dim: self.dim,
            maximal: self.maximal || other.maximal,
            label: Arc::from(format!("({} ∪ {})", self.label, other.label)),
            pred: Arc::new(move |mesh, lid| a(mesh, lid) || b(mesh, lid)),
        })
    }

    /// Cells in both filters.
    pub fn intersection(&self, other: &Self) -> Result<Self, DofSieveError> {
        self.require_same_dim(other)?;
        let (a, b) = (Arc::clone(&self.pred), Arc::clone(&other.pred));
        Ok(Self {
            id: fresh_id(),
            dim: self.dim,
            maximal: self.maximal && other.maximal,
            label: Arc::from(format!("({} ∩ {})", self.label, other.label)),
            pred: Arc::new(move |mesh, lid| a(mesh, lid) && b(mesh, lid)),
        })
    }

    /// Cells in `self` but not `other`.
    pub fn difference(&self, other: &Self) -> Result<Self, DofSieveError> {
        self.require_same_dim(other)?;
        let (a, b) = (Arc::clone(&self.pred), Arc::clone(&other.pred));
        Ok(Self {
            id: fresh_id(),
            dim: self.dim,
            maximal: false,
            label: Arc::from(format!("({} \\ {})", self.label, other.label)),
            pred: Arc::new(move |mesh, lid| a(mesh, lid) && !b(mesh, lid)),
        })
    }
}
