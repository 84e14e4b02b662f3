//! Hanging-node constraints: interpolation of child-cell DOFs from parent
//! cells on non-conforming refinements.
//!
//! One constraint map belongs to one (basis, mesh) combination. Hanging
//! flags are computed once from refinement ancestry at build time; records
//! are immutable afterward. Per-cell interpolation matrices are submitted to
//! a [`MatrixStore`] and only `(chunk, index)` references are kept here.

use std::collections::HashMap;

use crate::basis::{BasisDofTopology, HangingQuery};
use crate::constraint::matrix_store::MatrixStore;
use crate::dof_error::DofSieveError;
use crate::mesh::MeshTopology;

/// One weighted contribution of a parent-cell DOF.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConstraintTerm {
    /// Position in the parent cell's DOF list.
    pub parent_local_dof: usize,
    /// Interpolation weight.
    pub coefficient: f64,
}

/// Interpolation record for one hanging DOF of a child cell.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HangingDofConstraint {
    /// LID of the parent cell carrying the contributing DOFs.
    pub parent_cell: usize,
    /// Weighted parent contributions; for affine interpolation the
    /// coefficients sum to 1.
    pub terms: Vec<ConstraintTerm>,
}

impl HangingDofConstraint {
    /// Sum of the interpolation weights.
    pub fn coefficient_sum(&self) -> f64 {
        self.terms.iter().map(|t| t.coefficient).sum()
    }
}

/// Interpolate the value of a hanging DOF from the parent cell's DOF
/// values. Returns `None` when a term indexes past `parent_values` or a
/// weight is not representable in `V`.
pub fn interpolate_hanging_value<V: num_traits::Float>(
    constraint: &HangingDofConstraint,
    parent_values: &[V],
) -> Option<V> {
    let mut acc = V::zero();
    for term in &constraint.terms {
        let weight = V::from(term.coefficient)?;
        acc = acc + *parent_values.get(term.parent_local_dof)? * weight;
    }
    Some(acc)
}

/// Per-(basis, mesh) map of hanging flags and constraint records.
#[derive(Clone, Debug, Default)]
pub struct HangingNodeConstraintMap {
    node_is_hanging: Vec<bool>,
    has_cell_hanging: Vec<bool>,
    records: HashMap<(usize, usize, usize, usize), HangingDofConstraint>,
    trafo_refs: HashMap<usize, (usize, usize)>,
}

/// Cell-local DOF position of `(facet_dim, facet_index)` under the
/// vertices-then-edges numbering shared with the reference basis.
fn cell_local_dof(n_vertices: usize, facet_dim: usize, facet_index: usize) -> usize {
    if facet_dim == 0 {
        facet_index
    } else {
        n_vertices + facet_index
    }
}

impl HangingNodeConstraintMap {
    /// Build the constraint map for `region_cells` (maximal-cell LIDs).
    ///
    /// Fails with [`DofSieveError::UnsupportedRefinement`] on fan-outs other
    /// than bisection/trisection (and their 2D tensor forms), and with
    /// [`DofSieveError::MissingParent`] when a hanging cell has no recorded
    /// ancestry.
    pub fn build<M: MeshTopology>(
        mesh: &M,
        basis: &dyn BasisDofTopology,
        region_cells: &[usize],
        store: &mut MatrixStore,
    ) -> Result<Self, DofSieveError> {
        let dim = mesh.spatial_dim();
        let n_nodes = mesh.num_cells(0);
        let node_is_hanging: Vec<bool> = (0..n_nodes)
            .map(|lid| mesh.is_hanging_node(0, lid))
            .collect();
        let mut has_cell_hanging = vec![false; mesh.num_cells(dim)];
        let mut records = HashMap::new();
        let mut trafo_refs = HashMap::new();

        let n_dofs = basis.total_dofs_per_cell(dim);
        // Chunk matrices by their row count; maps over different bases
        // sharing one store then never cross-compare.
        let chunk = n_dofs;

        for &cell in region_cells {
            let n_vertices = mesh.num_facets(dim, cell, 0);

            // Hanging entities of this cell, as (facet_dim, facet_index).
            let mut hanging = Vec::new();
            if basis.dofs_on_entity(dim, 0) > 0 {
                for fi in 0..n_vertices {
                    let lid = mesh.facet_lid(dim, cell, 0, fi);
                    if node_is_hanging[lid] {
                        hanging.push((0usize, fi));
                    }
                }
            }
            for fd in 1..=dim {
                if basis.dofs_on_entity(dim, fd) == 0 {
                    continue;
                }
                if fd == dim {
                    if mesh.is_hanging_node(fd, cell) {
                        hanging.push((fd, 0));
                    }
                } else {
                    for fi in 0..mesh.num_facets(dim, cell, fd) {
                        let lid = mesh.facet_lid(dim, cell, fd, fi);
                        if mesh.is_hanging_node(fd, lid) {
                            hanging.push((fd, fi));
                        }
                    }
                }
            }
            if hanging.is_empty() {
                continue;
            }
            has_cell_hanging[cell] = true;

            let parent = mesh
                .parent_cell(cell)
                .ok_or(DofSieveError::MissingParent(cell))?;
            let n_children = mesh.num_children(parent);
            if !matches!(n_children, 2 | 3 | 4 | 9) {
                return Err(DofSieveError::UnsupportedRefinement {
                    parent,
                    children: n_children,
                });
            }
            let index_in_parent = mesh.index_in_parent(cell);

            // Child-to-parent interpolation matrix, row-major: identity
            // rows for conforming DOFs, interpolation rows for hanging ones.
            let mut trafo = vec![0.0f64; n_dofs * n_dofs];
            for i in 0..n_dofs {
                trafo[i * n_dofs + i] = 1.0;
            }

            for &(fd, fi) in &hanging {
                for node_index in 0..basis.dofs_on_entity(dim, fd) {
                    let query = HangingQuery {
                        index_in_parent,
                        max_cell_dim: dim,
                        n_children,
                        facet_dim: fd,
                        facet_index: fi,
                        node_index,
                    };
                    let interp = basis.hanging_interpolation(&query)?;
                    debug_assert!(
                        (interp.coefficients.iter().sum::<f64>() - 1.0).abs() < 1e-12,
                        "interpolation weights must sum to 1"
                    );
                    let terms: Vec<ConstraintTerm> = interp
                        .parent_local_dofs
                        .iter()
                        .zip(&interp.coefficients)
                        .map(|(&parent_local_dof, &coefficient)| ConstraintTerm {
                            parent_local_dof,
                            coefficient,
                        })
                        .collect();

                    let row = cell_local_dof(n_vertices, fd, fi);
                    for v in &mut trafo[row * n_dofs..(row + 1) * n_dofs] {
                        *v = 0.0;
                    }
                    for term in &terms {
                        trafo[row * n_dofs + term.parent_local_dof] = term.coefficient;
                    }

                    records.insert(
                        (cell, fd, fi, node_index),
                        HangingDofConstraint {
                            parent_cell: parent,
                            terms,
                        },
                    );
                }
            }

            let matrix_index = store.add_matrix(chunk, &trafo);
            trafo_refs.insert(cell, (chunk, matrix_index));
        }

        log::debug!(
            "hanging-node constraint map: {} records over {} cells",
            records.len(),
            trafo_refs.len()
        );

        Ok(Self {
            node_is_hanging,
            has_cell_hanging,
            records,
            trafo_refs,
        })
    }

    /// Whether any DOF of this maximal cell is hanging.
    pub fn has_hanging_dofs(&self, cell_lid: usize) -> bool {
        self.has_cell_hanging.get(cell_lid).copied().unwrap_or(false)
    }

    /// Whether a vertex is a hanging node.
    pub fn is_hanging_node(&self, node_lid: usize) -> bool {
        self.node_is_hanging.get(node_lid).copied().unwrap_or(false)
    }

    /// Constraint record for one hanging DOF of a child cell.
    pub fn constraints_for_hanging_dof(
        &self,
        child_cell: usize,
        facet_dim: usize,
        facet_index: usize,
        node_index: usize,
    ) -> Result<&HangingDofConstraint, DofSieveError> {
        self.records
            .get(&(child_cell, facet_dim, facet_index, node_index))
            .ok_or(DofSieveError::NotHanging {
                cell: child_cell,
                facet_dim,
                facet_index,
                node: node_index,
            })
    }

    /// `(chunk, index)` of the cell's interpolation matrix in the store.
    pub fn transformation(&self, cell_lid: usize) -> Option<(usize, usize)> {
        self.trafo_refs.get(&cell_lid).copied()
    }

    /// Number of constraint records held.
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Iterate all records as `((cell, facet_dim, facet_index, node), record)`.
    pub fn records(
        &self,
    ) -> impl Iterator<Item = (&(usize, usize, usize, usize), &HangingDofConstraint)> {
        self.records.iter()
    }
}
