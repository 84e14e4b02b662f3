//! Partial-element DOF map: DOFs attached per element on a subregion of
//! the mesh, with no sharing between elements.

use std::collections::BTreeSet;

use crate::comm::{CommTag, Communicator};
use crate::dof_error::DofSieveError;
use crate::filter::CellFilter;
use crate::map::assign::LocalDofAssigner;
use crate::map::offsets::{GlobalOffsets, apply_offset, resolve_offsets};
use crate::map::remote::{DofHost, RemoteDofResolver};
use crate::map::{BatchChunk, CellBatchDofs, FuncSet, UNASSIGNED_DOF};
use crate::mesh::MeshTopology;

/// DOF map for element-attached bases on a cell-filter subregion.
///
/// Cells outside the region keep [`UNASSIGNED_DOF`] entries;
/// [`PartialElementDofMap::allowed_funcs_on_cell_batch`] reports the empty
/// set for batches touching them, so callers can skip such cells without
/// tripping an error.
#[derive(Clone, Debug)]
pub struct PartialElementDofMap {
    dim: usize,
    funcs: Vec<usize>,
    dofs_per_func: usize,
    region: CellFilter,
    elem_dofs: Vec<i64>,
    offsets: GlobalOffsets,
    ghosts: BTreeSet<u64>,
}

struct ElemHost<'a> {
    elem_dofs: &'a mut [i64],
    stride: usize,
    ghosts: &'a mut BTreeSet<u64>,
}

impl DofHost for ElemHost<'_> {
    fn owned_base_dof(&self, lid: usize) -> Option<u64> {
        let d = self.elem_dofs[lid * self.stride];
        (d != UNASSIGNED_DOF).then_some(d as u64)
    }

    fn install_remote(&mut self, lid: usize, base: u64) {
        for j in 0..self.stride {
            let dof = base + j as u64;
            self.elem_dofs[lid * self.stride + j] = dof as i64;
            self.ghosts.insert(dof);
        }
    }
}

impl PartialElementDofMap {
    /// Build the map for `funcs` over `region`, with `dofs_per_func` DOFs
    /// per function on each cell (the basis's per-cell count).
    pub fn new<M: MeshTopology, C: Communicator>(
        mesh: &M,
        funcs: &FuncSet,
        dofs_per_func: usize,
        region: &CellFilter,
        comm: &C,
        base_tag: CommTag,
    ) -> Result<Self, DofSieveError> {
        if funcs.is_empty() || dofs_per_func == 0 {
            return Err(DofSieveError::EmptyBasis);
        }
        let dim = mesh.spatial_dim();
        if region.dim() != dim {
            return Err(DofSieveError::FilterDimMismatch(region.dim(), dim));
        }
        let funcs: Vec<usize> = funcs.iter().copied().collect();
        let stride = funcs.len() * dofs_per_func;
        let n_elems = mesh.num_cells(dim);

        let mut elem_dofs = vec![UNASSIGNED_DOF; n_elems * stride];
        let mut assigner = LocalDofAssigner::new(comm.size());
        for cell in region.cells(mesh) {
            if let Some(base) = assigner.visit(mesh, dim, cell, stride) {
                for j in 0..stride {
                    elem_dofs[cell * stride + j] = (base + j as u64) as i64;
                }
            }
        }

        let offsets = resolve_offsets(comm, base_tag, assigner.local_count())?;
        apply_offset(&mut elem_dofs, offsets.my_offset);

        let requests = assigner.into_requests();
        let mut ghosts = BTreeSet::new();
        let mut host = ElemHost {
            elem_dofs: &mut elem_dofs,
            stride,
            ghosts: &mut ghosts,
        };
        RemoteDofResolver::new(comm, base_tag.offset(1)).resolve(mesh, dim, &requests, &mut host)?;

        Ok(Self {
            dim,
            funcs,
            dofs_per_func,
            region: region.clone(),
            elem_dofs,
            offsets,
            ghosts,
        })
    }

    /// Function IDs served by this map, ascending.
    pub fn funcs(&self) -> &[usize] {
        &self.funcs
    }

    /// The subregion this map numbers.
    pub fn region(&self) -> &CellFilter {
        &self.region
    }

    /// Resolved numbering range of this rank.
    pub fn offsets(&self) -> GlobalOffsets {
        self.offsets
    }

    /// DOF indices owned by other ranks but referenced locally.
    pub fn ghost_indices(&self) -> &BTreeSet<u64> {
        &self.ghosts
    }

    /// Batched DOF lookup. Lower-dimensional cells trace through their
    /// unique maximal cofacet; a shared facet (two cofacets) cannot carry
    /// an element-attached trace and is rejected.
    pub fn dofs_for_cell_batch<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        cell_dim: usize,
        cell_lids: &[usize],
        requested: &FuncSet,
    ) -> Result<CellBatchDofs, DofSieveError> {
        for &f in requested {
            if !self.funcs.contains(&f) {
                return Err(DofSieveError::UnknownFunction { func: f });
            }
        }
        let stride = self.funcs.len() * self.dofs_per_func;

        if cell_dim == self.dim {
            let mut dofs = Vec::with_capacity(cell_lids.len() * stride);
            for &c in cell_lids {
                dofs.extend_from_slice(&self.elem_dofs[c * stride..(c + 1) * stride]);
            }
            return Ok(CellBatchDofs {
                chunks: vec![BatchChunk {
                    funcs: self.funcs.clone(),
                    nodes_per_cell: self.dofs_per_func,
                    dofs,
                }],
            });
        }

        let mut cofacets = Vec::with_capacity(cell_lids.len());
        for &c in cell_lids {
            let n = mesh.num_max_cofacets(cell_dim, c);
            if n != 1 {
                return Err(DofSieveError::AmbiguousCofacet {
                    dim: cell_dim,
                    lid: c,
                    count: n,
                });
            }
            let (cofacet, _facet_index) = mesh.max_cofacet_lid(cell_dim, c, 0);
            cofacets.push(cofacet);
        }
        self.dofs_for_cell_batch(mesh, self.dim, &cofacets, requested)
    }

    /// All functions, or the empty set when any batch cell lies outside
    /// the region (or the batch is lower-dimensional).
    pub fn allowed_funcs_on_cell_batch(&self, cell_dim: usize, cell_lids: &[usize]) -> FuncSet {
        if cell_dim != self.dim {
            return FuncSet::new();
        }
        let stride = self.funcs.len() * self.dofs_per_func;
        for &c in cell_lids {
            if self.elem_dofs[c * stride] == UNASSIGNED_DOF {
                return FuncSet::new();
            }
        }
        self.funcs.iter().copied().collect()
    }

    /// Ghost-consistency check over the element table; sentinels outside
    /// the region are legitimate.
    pub fn validate_invariants(&self) -> Result<(), DofSieveError> {
        let lo = self.offsets.my_offset;
        let hi = lo + self.offsets.num_local;
        let stride = self.funcs.len() * self.dofs_per_func;
        for (slot, &d) in self.elem_dofs.iter().enumerate() {
            if d == UNASSIGNED_DOF {
                continue;
            }
            let d = d as u64;
            if !((lo..hi).contains(&d) || self.ghosts.contains(&d)) {
                return Err(DofSieveError::UnassignedDof {
                    dim: self.dim,
                    lid: slot / stride.max(1),
                });
            }
        }
        Ok(())
    }
}
