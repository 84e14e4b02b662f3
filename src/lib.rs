//! # dof-sieve
//!
//! dof-sieve assigns every basis-function instance on a partitioned
//! finite-element mesh a globally unique, rank-contiguous DOF index,
//! resolves the indices of entities a rank references but does not own
//! ("ghosts"), and, for non-conforming (hanging-node) refinements, builds
//! interpolation constraints from child-cell DOFs to parent-cell DOFs.
//!
//! ## Features
//! - Nodal, inhomogeneous-nodal, and partial-element DOF maps, selected by
//!   [`map::builder::DofMapBuilder`] from basis homogeneity and region
//!   structure
//! - Rank-contiguous global numbering via a deterministic, rank-ordered
//!   exclusive scan
//! - Two-phase request/response resolution of ghost DOFs over pluggable
//!   communication backends (serial, in-process, MPI)
//! - Hanging-node constraint records with content-addressed deduplication
//!   of interpolation matrices
//!
//! ## Determinism
//!
//! Entity iteration follows ascending local indices, the offset scan
//! reduces in fixed rank order, and request/response payloads are matched
//! positionally, so building the same map twice on the same partition
//! yields bit-identical assignments.
//!
//! ## Collaborators
//!
//! The mesh data structure, basis evaluation, and linear algebra live
//! outside this crate; they enter through [`mesh::MeshTopology`] and
//! [`basis::BasisDofTopology`]. A reference [`basis::Lagrange`] family
//! (orders 0..=2) is included for tests and simple discretizations.

// Re-export our major subsystems:
pub mod basis;
pub mod comm;
pub mod constraint;
pub mod dof_error;
pub mod filter;
pub mod map;
pub mod mesh;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::basis::{BasisDofTopology, Lagrange};
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::comm::{CommTag, Communicator, LocalComm, NoComm, Wait};
    pub use crate::constraint::{HangingNodeConstraintMap, MatrixStore};
    pub use crate::dof_error::DofSieveError;
    pub use crate::filter::{CellFilter, FilterRelations};
    pub use crate::map::{
        CellBatchDofs, DofMap, DofMapBuilder, FuncRegion, FuncSet, MapKind, UNASSIGNED_DOF,
        func_set,
    };
    pub use crate::mesh::MeshTopology;
}
