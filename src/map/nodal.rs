//! Homogeneous nodal DOF map: every function lives on every vertex.

use std::collections::BTreeSet;

use crate::comm::{CommTag, Communicator};
use crate::dof_error::DofSieveError;
use crate::filter::CellFilter;
use crate::map::assign::LocalDofAssigner;
use crate::map::offsets::{GlobalOffsets, apply_offset, resolve_offsets};
use crate::map::remote::{DofHost, RemoteDofResolver};
use crate::map::{BatchChunk, CellBatchDofs, FuncSet, UNASSIGNED_DOF};
use crate::mesh::MeshTopology;

/// DOF map with all functions attached uniformly to vertices.
///
/// Tables mirror the construction: `node_dofs[node * n_funcs + i]` is the
/// resolved index of function slot `i` at a vertex, and
/// `elem_dofs[(cell * n_funcs + i) * nodes_per_elem + f]` caches the same
/// per maximal cell for batched assembly lookups.
#[derive(Clone, Debug)]
pub struct NodalDofMap {
    dim: usize,
    funcs: Vec<usize>,
    nodes_per_elem: usize,
    node_dofs: Vec<i64>,
    elem_dofs: Vec<i64>,
    offsets: GlobalOffsets,
    ghosts: BTreeSet<u64>,
}

struct NodalHost<'a> {
    node_dofs: &'a mut [i64],
    n_funcs: usize,
    ghosts: &'a mut BTreeSet<u64>,
}

impl DofHost for NodalHost<'_> {
    fn owned_base_dof(&self, lid: usize) -> Option<u64> {
        let d = self.node_dofs[lid * self.n_funcs];
        (d != UNASSIGNED_DOF).then_some(d as u64)
    }

    fn install_remote(&mut self, lid: usize, base: u64) {
        for i in 0..self.n_funcs {
            let dof = base + i as u64;
            self.node_dofs[lid * self.n_funcs + i] = dof as i64;
            self.ghosts.insert(dof);
        }
    }
}

impl NodalDofMap {
    /// Build the map over the cells of `max_cells` (the maximal-cell
    /// region) for the given function IDs.
    pub fn new<M: MeshTopology, C: Communicator>(
        mesh: &M,
        funcs: &FuncSet,
        max_cells: &CellFilter,
        comm: &C,
        base_tag: CommTag,
    ) -> Result<Self, DofSieveError> {
        if funcs.is_empty() {
            return Err(DofSieveError::EmptyBasis);
        }
        let dim = mesh.spatial_dim();
        if max_cells.dim() != dim {
            return Err(DofSieveError::FilterDimMismatch(max_cells.dim(), dim));
        }
        let funcs: Vec<usize> = funcs.iter().copied().collect();
        let n_funcs = funcs.len();
        let n_nodes = mesh.num_cells(0);
        let n_elems = mesh.num_cells(dim);

        let elem_lids = max_cells.cells(mesh);
        let nodes_per_elem = elem_lids
            .first()
            .map_or(0, |&c| mesh.num_facets(dim, c, 0));

        let mut facet_table = Vec::with_capacity(elem_lids.len() * nodes_per_elem);
        mesh.facet_lids(dim, &elem_lids, 0, &mut facet_table);

        // Assign vertex DOFs for locally owned nodes, in element-walk order.
        let mut node_dofs = vec![UNASSIGNED_DOF; n_nodes * n_funcs];
        let mut has_processed = vec![false; n_nodes];
        let mut assigner = LocalDofAssigner::new(comm.size());
        for &node in &facet_table {
            if has_processed[node] {
                continue;
            }
            has_processed[node] = true;
            if let Some(base) = assigner.visit(mesh, 0, node, n_funcs) {
                for i in 0..n_funcs {
                    node_dofs[node * n_funcs + i] = (base + i as u64) as i64;
                }
            }
        }

        let offsets = resolve_offsets(comm, base_tag, assigner.local_count())?;
        apply_offset(&mut node_dofs, offsets.my_offset);

        let requests = assigner.into_requests();
        let mut ghosts = BTreeSet::new();
        let mut host = NodalHost {
            node_dofs: &mut node_dofs,
            n_funcs,
            ghosts: &mut ghosts,
        };
        RemoteDofResolver::new(comm, base_tag.offset(1)).resolve(mesh, 0, &requests, &mut host)?;

        // Element DOF table from the resolved vertex DOFs.
        let mut elem_dofs = vec![UNASSIGNED_DOF; n_elems * n_funcs * nodes_per_elem];
        for (pos, &cell) in elem_lids.iter().enumerate() {
            for f in 0..nodes_per_elem {
                let node = facet_table[pos * nodes_per_elem + f];
                for i in 0..n_funcs {
                    elem_dofs[(cell * n_funcs + i) * nodes_per_elem + f] =
                        node_dofs[node * n_funcs + i];
                }
            }
        }

        Ok(Self {
            dim,
            funcs,
            nodes_per_elem,
            node_dofs,
            elem_dofs,
            offsets,
            ghosts,
        })
    }

    /// Function IDs served by this map, ascending.
    pub fn funcs(&self) -> &[usize] {
        &self.funcs
    }

    /// Resolved numbering range of this rank.
    pub fn offsets(&self) -> GlobalOffsets {
        self.offsets
    }

    /// DOF indices owned by other ranks but referenced locally.
    pub fn ghost_indices(&self) -> &BTreeSet<u64> {
        &self.ghosts
    }

    /// Resolved DOF of one function at one vertex.
    pub fn node_dof(&self, node_lid: usize, func_slot: usize) -> i64 {
        self.node_dofs[node_lid * self.funcs.len() + func_slot]
    }

    fn require_known_funcs(&self, requested: &FuncSet) -> Result<(), DofSieveError> {
        for &f in requested {
            if !self.funcs.contains(&f) {
                return Err(DofSieveError::UnknownFunction { func: f });
            }
        }
        Ok(())
    }

    /// Batched DOF lookup; see the map-level documentation for the layout.
    pub fn dofs_for_cell_batch<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        cell_dim: usize,
        cell_lids: &[usize],
        requested: &FuncSet,
    ) -> Result<CellBatchDofs, DofSieveError> {
        self.require_known_funcs(requested)?;
        let n_funcs = self.funcs.len();
        let n_cells = cell_lids.len();

        let chunk = if cell_dim == self.dim {
            let dofs_per_elem = n_funcs * self.nodes_per_elem;
            let mut dofs = Vec::with_capacity(n_cells * dofs_per_elem);
            for &c in cell_lids {
                dofs.extend_from_slice(&self.elem_dofs[c * dofs_per_elem..(c + 1) * dofs_per_elem]);
            }
            BatchChunk {
                funcs: self.funcs.clone(),
                nodes_per_cell: self.nodes_per_elem,
                dofs,
            }
        } else if cell_dim == 0 {
            let mut dofs = Vec::with_capacity(n_cells * n_funcs);
            for &c in cell_lids {
                dofs.extend_from_slice(&self.node_dofs[c * n_funcs..(c + 1) * n_funcs]);
            }
            BatchChunk {
                funcs: self.funcs.clone(),
                nodes_per_cell: 1,
                dofs,
            }
        } else {
            // Intermediate dimension: gather the cells' vertices.
            let n_facets = cell_lids
                .first()
                .map_or(0, |&c| mesh.num_facets(cell_dim, c, 0));
            let mut facet_table = Vec::with_capacity(n_cells * n_facets);
            mesh.facet_lids(cell_dim, cell_lids, 0, &mut facet_table);
            let mut dofs = vec![UNASSIGNED_DOF; n_cells * n_funcs * n_facets];
            for c in 0..n_cells {
                for f in 0..n_facets {
                    let node = facet_table[c * n_facets + f];
                    for i in 0..n_funcs {
                        dofs[(c * n_funcs + i) * n_facets + f] = self.node_dofs[node * n_funcs + i];
                    }
                }
            }
            BatchChunk {
                funcs: self.funcs.clone(),
                nodes_per_cell: n_facets,
                dofs,
            }
        };

        Ok(CellBatchDofs {
            chunks: vec![chunk],
        })
    }

    /// Every function is available on every cell of a homogeneous map.
    pub fn allowed_funcs_on_cell_batch(&self, _cell_dim: usize, _cell_lids: &[usize]) -> FuncSet {
        self.funcs.iter().copied().collect()
    }

    /// Check the ghost-consistency invariant: every resolved index is
    /// either inside this rank's owned range or registered as a ghost.
    pub fn validate_invariants(&self) -> Result<(), DofSieveError> {
        let lo = self.offsets.my_offset;
        let hi = lo + self.offsets.num_local;
        for (slot, &d) in self.node_dofs.iter().enumerate() {
            if d == UNASSIGNED_DOF {
                return Err(DofSieveError::UnassignedDof {
                    dim: 0,
                    lid: slot / self.funcs.len().max(1),
                });
            }
            let d = d as u64;
            if !((lo..hi).contains(&d) || self.ghosts.contains(&d)) {
                return Err(DofSieveError::UnassignedDof {
                    dim: 0,
                    lid: slot / self.funcs.len().max(1),
                });
            }
        }
        Ok(())
    }
}
