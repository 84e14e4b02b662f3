//! Mesh collaborator contract.
//!
//! The DOF maps in this crate never own mesh topology; they consume it
//! through [`MeshTopology`], which covers entity counts, facet/cofacet
//! lookups, local/global ID translation, the partition-ownership predicate,
//! and (for non-conforming meshes) refinement-ancestry queries.
//!
//! Entity references are `(dimension, local index)` pairs, meaningful only
//! on one rank; global IDs are plain `u64` and stable across ranks.

/// Read-only topology and partition queries the DOF mapping core needs.
///
/// The trait is object-safe: cell-filter predicates hold `&dyn MeshTopology`.
pub trait MeshTopology {
    /// Spatial dimension of the mesh (dimension of its maximal cells).
    fn spatial_dim(&self) -> usize;

    /// Number of cells of dimension `dim` visible on this rank (owned + ghost).
    fn num_cells(&self, dim: usize) -> usize;

    /// Number of facets of dimension `facet_dim` of one cell.
    fn num_facets(&self, cell_dim: usize, cell_lid: usize, facet_dim: usize) -> usize;

    /// Local index of the `facet_index`-th facet of a cell.
    fn facet_lid(
        &self,
        cell_dim: usize,
        cell_lid: usize,
        facet_dim: usize,
        facet_index: usize,
    ) -> usize;

    /// Batch facet lookup, appending to `out` cell by cell.
    fn facet_lids(&self, cell_dim: usize, cell_lids: &[usize], facet_dim: usize, out: &mut Vec<usize>) {
        for &c in cell_lids {
            let n = self.num_facets(cell_dim, c, facet_dim);
            for f in 0..n {
                out.push(self.facet_lid(cell_dim, c, facet_dim, f));
            }
        }
    }

    /// Number of maximal cells having this entity on their boundary.
    fn num_max_cofacets(&self, dim: usize, lid: usize) -> usize;

    /// The `k`-th maximal cofacet of an entity, as
    /// `(cofacet LID, facet index of the entity within the cofacet)`.
    fn max_cofacet_lid(&self, dim: usize, lid: usize, k: usize) -> (usize, usize);

    /// Partition-ownership predicate: `Some(owner)` if the entity is owned
    /// by another rank, `None` if this rank owns it.
    fn remote_owner(&self, dim: usize, lid: usize) -> Option<usize>;

    /// Translate a local index to the partition-global ID.
    fn lid_to_gid(&self, dim: usize, lid: usize) -> u64;

    /// Translate a global ID back to a local index, if the entity is
    /// visible on this rank.
    fn gid_to_lid(&self, dim: usize, gid: u64) -> Option<usize>;

    /// Whether any refinement level of this mesh produced hanging nodes.
    fn has_hanging_nodes(&self) -> bool {
        false
    }

    /// Whether an entity is hanging: it lies on the interior of a facet of
    /// an unrefined neighbor cell.
    fn is_hanging_node(&self, _dim: usize, _lid: usize) -> bool {
        false
    }

    /// Parent of a refined maximal cell, if any.
    fn parent_cell(&self, _cell_lid: usize) -> Option<usize> {
        None
    }

    /// Position of a child cell within its parent's child list.
    fn index_in_parent(&self, _cell_lid: usize) -> usize {
        0
    }

    /// Number of children a refined cell was split into
    /// (2 = bisection, 3 = trisection).
    fn num_children(&self, _cell_lid: usize) -> usize {
        0
    }
}
