//! DofSieveError: unified error type for dof-sieve public APIs.
//!
//! Every fallible public API in this crate returns `Result<_, DofSieveError>`.
//! Two invariant violations are deliberately *not* represented here and abort
//! instead: a remote-resolution request for a global ID the target rank does
//! not own, and an out-of-range [`MatrixStore`](crate::constraint::MatrixStore)
//! lookup. Continuing past either would silently corrupt the global numbering.

use thiserror::Error;

/// Unified error type for dof-sieve operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DofSieveError {
    /// A function ID outside the map's function set.
    #[error("function {func} is not known to this DOF map")]
    UnknownFunction {
        /// Offending function ID.
        func: usize,
    },
    /// Map construction was invoked with an empty basis/region list.
    #[error("DOF map construction requires at least one basis/region pair")]
    EmptyBasis,
    /// Set algebra on cell filters of different dimension.
    #[error("cell filter dimension mismatch: {0} vs {1}")]
    FilterDimMismatch(usize, usize),
    /// A trace of an element-attached basis on a shared lower-dimensional cell.
    #[error("cell (dim={dim}, lid={lid}) has {count} maximal cofacets; traces require exactly one")]
    AmbiguousCofacet {
        /// Cell dimension.
        dim: usize,
        /// Local cell index.
        lid: usize,
        /// Number of maximal cofacets found.
        count: usize,
    },
    /// A cell batch referenced an entity whose DOFs were never assigned.
    #[error("cell (dim={dim}, lid={lid}) has no DOFs assigned in this map")]
    UnassignedDof {
        /// Cell dimension.
        dim: usize,
        /// Local cell index.
        lid: usize,
    },
    /// Refinement fan-out other than bisection or trisection.
    #[error("unsupported refinement fan-out: parent cell {parent} has {children} children (supported: bisection/trisection and their tensor forms)")]
    UnsupportedRefinement {
        /// Parent cell LID.
        parent: usize,
        /// Number of children reported by the mesh.
        children: usize,
    },
    /// Constraint lookup on a cell/node that is not hanging.
    #[error("cell {cell} facet (dim={facet_dim}, index={facet_index}) node {node} is not a hanging DOF")]
    NotHanging {
        /// Child cell LID.
        cell: usize,
        /// Facet dimension within the child cell.
        facet_dim: usize,
        /// Facet index within the child cell.
        facet_index: usize,
        /// Node index on the facet.
        node: usize,
    },
    /// A hanging cell without refinement ancestry.
    #[error("cell {0} is flagged hanging but the mesh reports no parent cell")]
    MissingParent(usize),
    /// A basis with no hanging-DOF interpolation rule was asked for one.
    #[error("basis of order {order} has no hanging-DOF interpolation rule")]
    NoInterpolationRule {
        /// Order of the offending basis.
        order: usize,
    },
    /// Communication with a peer rank failed.
    #[error("communication error with rank {neighbor}: {detail}")]
    CommError {
        /// Peer rank.
        neighbor: usize,
        /// Human-readable detail.
        detail: String,
    },
    /// A collective was entered with a request table of the wrong width.
    #[error("request table has {found} destination slots but the communicator has {ranks} ranks")]
    BadRequestTable {
        /// Slots provided.
        found: usize,
        /// Communicator size.
        ranks: usize,
    },
}
