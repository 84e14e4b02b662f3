#![allow(dead_code)] // not every test binary uses every fixture
//! Shared mesh fixtures for integration tests.
//!
//! `LineMesh` is a 1D mesh of segments with a contiguous element
//! partition: rank `r` owns a block of elements, sees the block's endpoint
//! nodes, and a node shared between two ranks is owned by the lower one.
//! `RefinedLineMesh` is a serial mesh whose single parent segment was
//! split into `n_children` children, with the interior split points
//! reported as hanging nodes.

use dof_sieve::mesh::MeshTopology;

/// Partitioned 1D mesh of `n_elems_global` segments.
pub struct LineMesh {
    rank: usize,
    first_elem: u64,
    n_local_elems: usize,
}

impl LineMesh {
    /// The serial (single-rank) mesh.
    pub fn serial(n_elems: usize) -> Self {
        Self::partitioned(n_elems, 0, 1)
    }

    /// Rank `rank`'s view of the mesh split contiguously over `n_ranks`.
    pub fn partitioned(n_elems_global: usize, rank: usize, n_ranks: usize) -> Self {
        assert!(rank < n_ranks);
        let base = n_elems_global / n_ranks;
        let extra = n_elems_global % n_ranks;
        let count = base + usize::from(rank < extra);
        let first: usize = (0..rank)
            .map(|r| base + usize::from(r < extra))
            .sum();
        Self {
            rank,
            first_elem: first as u64,
            n_local_elems: count,
        }
    }

    fn n_local_nodes(&self) -> usize {
        if self.n_local_elems == 0 {
            0
        } else {
            self.n_local_elems + 1
        }
    }

    /// Owning rank of a node by global ID: the rank owning the element to
    /// its left (node 0 goes with element 0).
    fn node_owner_by_gid(&self, gid: u64) -> usize {
        if gid == 0 || gid > self.first_elem {
            self.rank
        } else {
            // Shared left endpoint: owned by the rank holding element gid-1.
            self.rank - 1
        }
    }
}

impl MeshTopology for LineMesh {
    fn spatial_dim(&self) -> usize {
        1
    }

    fn num_cells(&self, dim: usize) -> usize {
        match dim {
            0 => self.n_local_nodes(),
            1 => self.n_local_elems,
            _ => 0,
        }
    }

    fn num_facets(&self, cell_dim: usize, _cell_lid: usize, facet_dim: usize) -> usize {
        if cell_dim == 1 && facet_dim == 0 { 2 } else { 0 }
    }

    fn facet_lid(&self, _cell_dim: usize, cell_lid: usize, _facet_dim: usize, facet_index: usize) -> usize {
        cell_lid + facet_index
    }

    fn num_max_cofacets(&self, dim: usize, lid: usize) -> usize {
        if dim != 0 {
            return 0;
        }
        usize::from(lid > 0) + usize::from(lid < self.n_local_elems)
    }

    fn max_cofacet_lid(&self, _dim: usize, lid: usize, k: usize) -> (usize, usize) {
        let mut cofacets = Vec::new();
        if lid > 0 {
            cofacets.push((lid - 1, 1));
        }
        if lid < self.n_local_elems {
            cofacets.push((lid, 0));
        }
        cofacets[k]
    }

    fn remote_owner(&self, dim: usize, lid: usize) -> Option<usize> {
        if dim != 0 {
            return None;
        }
        let owner = self.node_owner_by_gid(self.lid_to_gid(0, lid));
        (owner != self.rank).then_some(owner)
    }

    fn lid_to_gid(&self, _dim: usize, lid: usize) -> u64 {
        self.first_elem + lid as u64
    }

    fn gid_to_lid(&self, dim: usize, gid: u64) -> Option<usize> {
        let lid = gid.checked_sub(self.first_elem)? as usize;
        (lid < self.num_cells(dim)).then_some(lid)
    }
}

/// Serial mesh of one parent segment refined into `n_children` children.
///
/// Cells `0..n_children` are the children; cell `n_children` is the parent.
/// Nodes `0..=n_children` are the split points, the interior ones hanging.
pub struct RefinedLineMesh {
    n_children: usize,
}

impl RefinedLineMesh {
    pub fn bisected() -> Self {
        Self { n_children: 2 }
    }

    pub fn trisected() -> Self {
        Self { n_children: 3 }
    }

    pub fn with_fanout(n_children: usize) -> Self {
        Self { n_children }
    }

    pub fn parent_lid(&self) -> usize {
        self.n_children
    }
}

impl MeshTopology for RefinedLineMesh {
    fn spatial_dim(&self) -> usize {
        1
    }

    fn num_cells(&self, dim: usize) -> usize {
        match dim {
            0 => self.n_children + 1,
            1 => self.n_children + 1, // children plus the parent
            _ => 0,
        }
    }

    fn num_facets(&self, cell_dim: usize, _cell_lid: usize, facet_dim: usize) -> usize {
        if cell_dim == 1 && facet_dim == 0 { 2 } else { 0 }
    }

    fn facet_lid(&self, _cell_dim: usize, cell_lid: usize, _facet_dim: usize, facet_index: usize) -> usize {
        if cell_lid == self.n_children {
            // Parent spans the whole segment.
            facet_index * self.n_children
        } else {
            cell_lid + facet_index
        }
    }

    fn num_max_cofacets(&self, dim: usize, lid: usize) -> usize {
        if dim != 0 {
            return 0;
        }
        usize::from(lid > 0) + usize::from(lid < self.n_children)
    }

    fn max_cofacet_lid(&self, _dim: usize, lid: usize, k: usize) -> (usize, usize) {
        let mut cofacets = Vec::new();
        if lid > 0 {
            cofacets.push((lid - 1, 1));
        }
        if lid < self.n_children {
            cofacets.push((lid, 0));
        }
        cofacets[k]
    }

    fn remote_owner(&self, _dim: usize, _lid: usize) -> Option<usize> {
        None
    }

    fn lid_to_gid(&self, _dim: usize, lid: usize) -> u64 {
        lid as u64
    }

    fn gid_to_lid(&self, _dim: usize, gid: u64) -> Option<usize> {
        Some(gid as usize)
    }

    fn has_hanging_nodes(&self) -> bool {
        true
    }

    fn is_hanging_node(&self, dim: usize, lid: usize) -> bool {
        dim == 0 && lid > 0 && lid < self.n_children
    }

    fn parent_cell(&self, cell_lid: usize) -> Option<usize> {
        (cell_lid < self.n_children).then_some(self.n_children)
    }

    fn index_in_parent(&self, cell_lid: usize) -> usize {
        cell_lid
    }

    fn num_children(&self, cell_lid: usize) -> usize {
        if cell_lid == self.n_children {
            self.n_children
        } else {
            0
        }
    }
}
