//! Inhomogeneous nodal DOF map: nodal bases whose functions live on
//! different subregions.
//!
//! Every vertex is assigned to exactly one function-subset *bucket*: the
//! union of the function sets of all region pieces whose cells touch it.
//! Buckets with identical function sets share a bucket index, so the
//! per-node state is one bucket index plus one base DOF.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::comm::{CommTag, Communicator};
use crate::dof_error::DofSieveError;
use crate::filter::CellFilter;
use crate::map::assign::LocalDofAssigner;
use crate::map::offsets::{GlobalOffsets, apply_offset, resolve_offsets};
use crate::map::remote::{DofHost, RemoteDofResolver};
use crate::map::{BatchChunk, CellBatchDofs, FuncSet, UNASSIGNED_DOF};
use crate::mesh::MeshTopology;

/// Nodal DOF map with per-vertex function subsets.
#[derive(Clone, Debug)]
pub struct InhomogeneousNodalDofMap {
    dim: usize,
    buckets: Vec<Vec<usize>>,
    node_bucket: Vec<Option<usize>>,
    node_base_dof: Vec<i64>,
    offsets: GlobalOffsets,
    ghosts: BTreeSet<u64>,
}

struct BucketHost<'a> {
    node_base_dof: &'a mut [i64],
    bucket_len: &'a dyn Fn(usize) -> usize,
    ghosts: &'a mut BTreeSet<u64>,
}

impl DofHost for BucketHost<'_> {
    fn owned_base_dof(&self, lid: usize) -> Option<u64> {
        let d = self.node_base_dof[lid];
        (d != UNASSIGNED_DOF).then_some(d as u64)
    }

    fn install_remote(&mut self, lid: usize, base: u64) {
        self.node_base_dof[lid] = base as i64;
        for i in 0..(self.bucket_len)(lid) {
            self.ghosts.insert(base + i as u64);
        }
    }
}

impl InhomogeneousNodalDofMap {
    /// Build the map from disjoint region pieces, each carrying the
    /// function set active on it.
    ///
    /// Pieces come from the builder's cell-filter set algebra and must be
    /// pairwise disjoint; a vertex shared by several pieces lands in the
    /// bucket holding the union of their function sets.
    pub fn new<M: MeshTopology, C: Communicator>(
        mesh: &M,
        pieces: &[(CellFilter, FuncSet)],
        comm: &C,
        base_tag: CommTag,
    ) -> Result<Self, DofSieveError> {
        if pieces.is_empty() {
            return Err(DofSieveError::EmptyBasis);
        }
        let dim = mesh.spatial_dim();
        for (filter, _) in pieces {
            if filter.dim() != dim {
                return Err(DofSieveError::FilterDimMismatch(filter.dim(), dim));
            }
        }
        let n_nodes = mesh.num_cells(0);

        // Per-node function sets, unioned over touching pieces.
        let mut node_funcs: Vec<FuncSet> = vec![FuncSet::new(); n_nodes];
        for (filter, funcs) in pieces {
            for cell in filter.cells(mesh) {
                for f in 0..mesh.num_facets(dim, cell, 0) {
                    let node = mesh.facet_lid(dim, cell, 0, f);
                    node_funcs[node].extend(funcs.iter().copied());
                }
            }
        }

        // Deduplicate function sets into buckets, deterministically.
        let mut bucket_of: BTreeMap<Vec<usize>, usize> = BTreeMap::new();
        let mut buckets: Vec<Vec<usize>> = Vec::new();
        let mut node_bucket: Vec<Option<usize>> = vec![None; n_nodes];
        for (node, funcs) in node_funcs.iter().enumerate() {
            if funcs.is_empty() {
                continue;
            }
            let key: Vec<usize> = funcs.iter().copied().collect();
            let idx = *bucket_of.entry(key.clone()).or_insert_with(|| {
                buckets.push(key);
                buckets.len() - 1
            });
            node_bucket[node] = Some(idx);
        }

        // Local assignment in node order; zero-function nodes leave no trace.
        let mut node_base_dof = vec![UNASSIGNED_DOF; n_nodes];
        let mut assigner = LocalDofAssigner::new(comm.size());
        for node in 0..n_nodes {
            let n_dofs = node_bucket[node].map_or(0, |b| buckets[b].len());
            if let Some(base) = assigner.visit(mesh, 0, node, n_dofs) {
                node_base_dof[node] = base as i64;
            }
        }

        let offsets = resolve_offsets(comm, base_tag, assigner.local_count())?;
        apply_offset(&mut node_base_dof, offsets.my_offset);

        let requests = assigner.into_requests();
        let mut ghosts = BTreeSet::new();
        {
            let node_bucket_ref = &node_bucket;
            let buckets_ref = &buckets;
            let bucket_len = move |lid: usize| -> usize {
                node_bucket_ref[lid].map_or(0, |b| buckets_ref[b].len())
            };
            let mut host = BucketHost {
                node_base_dof: &mut node_base_dof,
                bucket_len: &bucket_len,
                ghosts: &mut ghosts,
            };
            RemoteDofResolver::new(comm, base_tag.offset(1))
                .resolve(mesh, 0, &requests, &mut host)?;
        }

        Ok(Self {
            dim,
            buckets,
            node_bucket,
            node_base_dof,
            offsets,
            ghosts,
        })
    }

    /// Spatial dimension of the cells the buckets were derived from.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of distinct function buckets.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Function IDs of one bucket, ascending.
    pub fn bucket_funcs(&self, bucket: usize) -> &[usize] {
        &self.buckets[bucket]
    }

    /// Bucket a vertex belongs to, if it hosts any DOFs.
    pub fn node_bucket(&self, node_lid: usize) -> Option<usize> {
        self.node_bucket[node_lid]
    }

    /// Resolved numbering range of this rank.
    pub fn offsets(&self) -> GlobalOffsets {
        self.offsets
    }

    /// DOF indices owned by other ranks but referenced locally.
    pub fn ghost_indices(&self) -> &BTreeSet<u64> {
        &self.ghosts
    }

    fn dof_of(&self, node: usize, func: usize) -> i64 {
        match self.node_bucket[node] {
            Some(b) => match self.buckets[b].iter().position(|&f| f == func) {
                Some(pos) => {
                    let base = self.node_base_dof[node];
                    if base == UNASSIGNED_DOF {
                        UNASSIGNED_DOF
                    } else {
                        base + pos as i64
                    }
                }
                None => UNASSIGNED_DOF,
            },
            None => UNASSIGNED_DOF,
        }
    }

    fn batch_nodes<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        cell_dim: usize,
        cell_lids: &[usize],
    ) -> (usize, Vec<usize>) {
        if cell_dim == 0 {
            (1, cell_lids.to_vec())
        } else {
            let per_cell = cell_lids
                .first()
                .map_or(0, |&c| mesh.num_facets(cell_dim, c, 0));
            let mut nodes = Vec::with_capacity(cell_lids.len() * per_cell);
            mesh.facet_lids(cell_dim, cell_lids, 0, &mut nodes);
            (per_cell, nodes)
        }
    }

    /// Batched DOF lookup for the requested functions. Nodes not hosting a
    /// requested function yield [`UNASSIGNED_DOF`] entries rather than an
    /// error, so callers can probe mixed batches.
    pub fn dofs_for_cell_batch<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        cell_dim: usize,
        cell_lids: &[usize],
        requested: &FuncSet,
    ) -> Result<CellBatchDofs, DofSieveError> {
        for &f in requested {
            if !self.buckets.iter().any(|b| b.contains(&f)) {
                return Err(DofSieveError::UnknownFunction { func: f });
            }
        }
        let req: Vec<usize> = requested.iter().copied().collect();
        let (nodes_per_cell, nodes) = self.batch_nodes(mesh, cell_dim, cell_lids);

        let mut dofs = vec![UNASSIGNED_DOF; cell_lids.len() * req.len() * nodes_per_cell];
        for c in 0..cell_lids.len() {
            for (i, &f) in req.iter().enumerate() {
                for v in 0..nodes_per_cell {
                    let node = nodes[c * nodes_per_cell + v];
                    dofs[(c * req.len() + i) * nodes_per_cell + v] = self.dof_of(node, f);
                }
            }
        }
        Ok(CellBatchDofs {
            chunks: vec![BatchChunk {
                funcs: req,
                nodes_per_cell,
                dofs,
            }],
        })
    }

    /// Functions available on *every* vertex of every batch cell; the empty
    /// set as soon as one vertex hosts nothing.
    pub fn allowed_funcs_on_cell_batch<M: MeshTopology + ?Sized>(
        &self,
        mesh: &M,
        cell_dim: usize,
        cell_lids: &[usize],
    ) -> FuncSet {
        let (_, nodes) = self.batch_nodes(mesh, cell_dim, cell_lids);
        let mut allowed: Option<FuncSet> = None;
        for &node in &nodes {
            let funcs: FuncSet = match self.node_bucket[node] {
                Some(b) => self.buckets[b].iter().copied().collect(),
                None => return FuncSet::new(),
            };
            allowed = Some(match allowed {
                Some(acc) => acc.intersection(&funcs).copied().collect(),
                None => funcs,
            });
        }
        allowed.unwrap_or_default()
    }

    /// Ghost-consistency check over per-node base DOFs.
    pub fn validate_invariants(&self) -> Result<(), DofSieveError> {
        let lo = self.offsets.my_offset;
        let hi = lo + self.offsets.num_local;
        for node in 0..self.node_base_dof.len() {
            let Some(bucket) = self.node_bucket[node] else {
                continue;
            };
            let base = self.node_base_dof[node];
            if base == UNASSIGNED_DOF {
                return Err(DofSieveError::UnassignedDof { dim: 0, lid: node });
            }
            for i in 0..self.buckets[bucket].len() {
                let d = base as u64 + i as u64;
                if !((lo..hi).contains(&d) || self.ghosts.contains(&d)) {
                    return Err(DofSieveError::UnassignedDof { dim: 0, lid: node });
                }
            }
        }
        Ok(())
    }
}
