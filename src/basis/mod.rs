//! Basis collaborator contract.
//!
//! Basis functions enter this crate as opaque per-entity DOF counts plus,
//! for hanging-node support, an interpolation rule evaluated at a parametric
//! point on a parent facet. No basis values are ever computed here.

mod lagrange;

pub use lagrange::Lagrange;

use crate::dof_error::DofSieveError;

/// Inputs identifying one hanging DOF on a refined child cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HangingQuery {
    /// Position of the child cell within its parent's child list.
    pub index_in_parent: usize,
    /// Dimension of the maximal cells.
    pub max_cell_dim: usize,
    /// Parent fan-out: 2 for bisection, 3 for trisection.
    pub n_children: usize,
    /// Dimension of the hanging entity as a facet of the child cell.
    pub facet_dim: usize,
    /// Index of that facet within the child cell.
    pub facet_index: usize,
    /// Which DOF on the facet (entities may carry several for higher orders).
    pub node_index: usize,
}

/// Interpolation of one hanging DOF from the parent cell's DOFs.
///
/// `parent_local_dofs[i]` is a position in the parent cell's DOF list and
/// contributes with weight `coefficients[i]`. For affine interpolation the
/// coefficients sum to 1.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HangingInterpolation {
    /// Dimension of the parent facet carrying the contributing DOFs.
    pub parent_facet_dim: usize,
    /// Index of that facet within the parent cell.
    pub parent_facet_index: usize,
    /// Positions in the parent cell's DOF list.
    pub parent_local_dofs: Vec<usize>,
    /// Interpolation weights, one per parent DOF.
    pub coefficients: Vec<f64>,
}

/// DOF topology of one basis family, per cell dimension.
pub trait BasisDofTopology: Send + Sync {
    /// Polynomial order.
    fn order(&self) -> usize;

    /// True when DOFs are attached only to vertices.
    fn is_nodal(&self) -> bool;

    /// True when DOFs are attached only to cell interiors (no sharing).
    fn is_cell_attached(&self) -> bool;

    /// DOFs on the *interior* of an entity of `entity_dim`, excluding its
    /// facets, for cells of dimension `cell_dim`.
    fn dofs_on_entity(&self, cell_dim: usize, entity_dim: usize) -> usize;

    /// Total DOFs visible from one cell, facet DOFs included.
    fn total_dofs_per_cell(&self, cell_dim: usize) -> usize;

    /// Interpolation coefficients for a hanging DOF, evaluated at its
    /// parametric position on the parent facet.
    fn hanging_interpolation(
        &self,
        query: &HangingQuery,
    ) -> Result<HangingInterpolation, DofSieveError>;
}
