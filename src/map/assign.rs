//! Local DOF assignment: sequential numbering of owned entities, request
//! queues for entities owned elsewhere.

use crate::mesh::MeshTopology;

/// Walks locally visible entities in iteration order, handing out
/// sequential local DOF indices starting at 0 to owned entities and
/// enqueueing the global IDs of remote ones by owning rank.
///
/// Entities with zero DOFs are skipped entirely — no index, no request, no
/// ghost bookkeeping — so later batch lookups can report "no DOFs
/// available" for them without error.
#[derive(Debug)]
pub struct LocalDofAssigner {
    next_dof: u64,
    requests: Vec<Vec<u64>>,
}

impl LocalDofAssigner {
    /// A fresh assigner for a communicator with `n_ranks` ranks.
    pub fn new(n_ranks: usize) -> Self {
        Self {
            next_dof: 0,
            requests: vec![Vec::new(); n_ranks],
        }
    }

    /// Visit one entity carrying `n_dofs` DOFs.
    ///
    /// Returns the base local index when this rank owns the entity, `None`
    /// when it was deferred (remote, request enqueued) or carries no DOFs.
    /// Deduplication of shared entities is the caller's job.
    pub fn visit<M: MeshTopology + ?Sized>(
        &mut self,
        mesh: &M,
        dim: usize,
        lid: usize,
        n_dofs: usize,
    ) -> Option<u64> {
        if n_dofs == 0 {
            return None;
        }
        match mesh.remote_owner(dim, lid) {
            Some(owner) => {
                assert!(
                    owner < self.requests.len(),
                    "ownership predicate reports rank {owner} for entity (dim={dim}, lid={lid}) \
                     but the communicator has {} ranks",
                    self.requests.len()
                );
                self.requests[owner].push(mesh.lid_to_gid(dim, lid));
                None
            }
            None => {
                let base = self.next_dof;
                self.next_dof += n_dofs as u64;
                Some(base)
            }
        }
    }

    /// Number of local DOFs handed out so far.
    pub fn local_count(&self) -> u64 {
        self.next_dof
    }

    /// Consume the assigner, yielding per-rank outgoing request lists.
    pub fn into_requests(self) -> Vec<Vec<u64>> {
        self.requests
    }
}
