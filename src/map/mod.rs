//! DOF maps: local assignment, global offsets, remote resolution, and the
//! map kinds the builder chooses between.
//!
//! A map kind is a closed variant, selected once by
//! [`builder::DofMapBuilder`] and dispatched by pattern matching; each
//! variant holds only the state it needs.

pub mod assign;
pub mod builder;
pub mod inhomogeneous;
pub mod nodal;
pub mod offsets;
pub mod partial_element;
pub mod remote;

use std::collections::BTreeSet;

use crate::constraint::{HangingDofConstraint, HangingNodeConstraintMap};
use crate::dof_error::DofSieveError;
use crate::map::offsets::GlobalOffsets;
use crate::mesh::MeshTopology;

pub use assign::LocalDofAssigner;
pub use builder::{DofMapBuilder, FuncRegion};
pub use inhomogeneous::InhomogeneousNodalDofMap;
pub use nodal::NodalDofMap;
pub use partial_element::PartialElementDofMap;
pub use remote::{DofHost, RemoteDofResolver, ResolverState};

/// Sentinel for a DOF slot that has no index: never assigned (entity
/// outside the region, function not hosted) or not yet resolved.
pub const UNASSIGNED_DOF: i64 = -1;

/// Ordered set of function IDs (field components).
pub type FuncSet = BTreeSet<usize>;

/// Convenience constructor for a [`FuncSet`].
pub fn func_set<I: IntoIterator<Item = usize>>(ids: I) -> FuncSet {
    ids.into_iter().collect()
}

/// One homogeneous chunk of a batched DOF lookup.
///
/// Layout: `dofs[(cell * funcs.len() + func_slot) * nodes_per_cell + node]`,
/// with cells in batch order, function slots in `funcs` order.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BatchChunk {
    /// Function IDs covered by this chunk, ascending.
    pub funcs: Vec<usize>,
    /// DOF slots per cell per function.
    pub nodes_per_cell: usize,
    /// Flat DOF indices; [`UNASSIGNED_DOF`] marks "no DOF here".
    pub dofs: Vec<i64>,
}

/// Result of a batched DOF lookup.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CellBatchDofs {
    /// Per-basis-chunk DOF tables; the maps in this crate produce one.
    pub chunks: Vec<BatchChunk>,
}

impl CellBatchDofs {
    /// The single chunk of a single-basis map.
    pub fn single(&self) -> &BatchChunk {
        &self.chunks[0]
    }
}

/// The map kinds the builder chooses between.
#[derive(Clone, Debug)]
pub enum MapKind {
    /// Homogeneous vertex-attached map over the whole domain.
    Nodal(NodalDofMap),
    /// Vertex-attached map with per-region function subsets.
    InhomogeneousNodal(InhomogeneousNodalDofMap),
    /// Element-attached map over a subregion.
    PartialElement(PartialElementDofMap),
}

/// A finished DOF map: one numbering kind plus, on non-conforming meshes,
/// the hanging-node constraints attached to it.
#[derive(Clone, Debug)]
pub struct DofMap {
    kind: MapKind,
    constraints: Option<HangingNodeConstraintMap>,
}

impl DofMap {
    pub(crate) fn new(kind: MapKind, constraints: Option<HangingNodeConstraintMap>) -> Self {
        Self { kind, constraints }
    }

    /// The underlying map kind, for pattern-matching consumers.
    pub fn kind(&self) -> &MapKind {
        &self.kind
    }

    fn offsets(&self) -> GlobalOffsets {
        match &self.kind {
            MapKind::Nodal(m) => m.offsets(),
            MapKind::InhomogeneousNodal(m) => m.offsets(),
            MapKind::PartialElement(m) => m.offsets(),
        }
    }

    /// First DOF index owned by this rank.
    pub fn lowest_local_dof(&self) -> u64 {
        self.offsets().my_offset
    }

    /// Number of DOFs owned by this rank.
    pub fn num_local_dofs(&self) -> u64 {
        self.offsets().num_local
    }

    /// Total DOF count across all ranks.
    pub fn total_dof_count(&self) -> u64 {
        self.offsets().total
    }

    /// DOF indices owned by other ranks but referenced locally.
    pub fn ghost_indices(&self) -> &BTreeSet<u64> {
        match &self.kind {
            MapKind::Nodal(m) => m.ghost_indices(),
            MapKind::InhomogeneousNodal(m) => m.ghost_indices(),
            MapKind::PartialElement(m) => m.ghost_indices(),
        }
    }

    /// Batched DOF lookup; see [`BatchChunk`] for the layout.
    pub fn dofs_for_cell_batch<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        cell_dim: usize,
        cell_lids: &[usize],
        requested: &FuncSet,
    ) -> Result<CellBatchDofs, DofSieveError> {
        match &self.kind {
            MapKind::Nodal(m) => m.dofs_for_cell_batch(mesh, cell_dim, cell_lids, requested),
            MapKind::InhomogeneousNodal(m) => {
                m.dofs_for_cell_batch(mesh, cell_dim, cell_lids, requested)
            }
            MapKind::PartialElement(m) => {
                m.dofs_for_cell_batch(mesh, cell_dim, cell_lids, requested)
            }
        }
    }

    /// Functions available on every cell of the batch.
    pub fn allowed_funcs_on_cell_batch<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        cell_dim: usize,
        cell_lids: &[usize],
    ) -> FuncSet {
        match &self.kind {
            MapKind::Nodal(m) => m.allowed_funcs_on_cell_batch(cell_dim, cell_lids),
            MapKind::InhomogeneousNodal(m) => {
                m.allowed_funcs_on_cell_batch(mesh, cell_dim, cell_lids)
            }
            MapKind::PartialElement(m) => m.allowed_funcs_on_cell_batch(cell_dim, cell_lids),
        }
    }

    /// Hanging-node constraints, present on maps built over non-conforming
    /// meshes.
    pub fn constraints(&self) -> Option<&HangingNodeConstraintMap> {
        self.constraints.as_ref()
    }

    /// Constraint record for one hanging DOF of a child cell.
    pub fn constraints_for_hanging_dof(
        &self,
        child_cell: usize,
        facet_dim: usize,
        facet_index: usize,
        node_index: usize,
    ) -> Result<&HangingDofConstraint, DofSieveError> {
        let constraints = self.constraints.as_ref().ok_or(DofSieveError::NotHanging {
            cell: child_cell,
            facet_dim,
            facet_index,
            node: node_index,
        })?;
        constraints.constraints_for_hanging_dof(child_cell, facet_dim, facet_index, node_index)
    }

    /// Local ghost-consistency check: every index in the map's tables is
    /// either in this rank's owned range or registered as a ghost.
    pub fn validate_invariants(&self) -> Result<(), DofSieveError> {
        match &self.kind {
            MapKind::Nodal(m) => m.validate_invariants(),
            MapKind::InhomogeneousNodal(m) => m.validate_invariants(),
            MapKind::PartialElement(m) => m.validate_invariants(),
        }
    }
}
