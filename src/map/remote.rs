//! Remote DOF resolution: the two-phase request/response protocol that
//! fills in ghost entries after offsets are fixed.
//!
//! Each rank sends, to every other rank, the global IDs of entities it
//! needs DOFs for; owners reply with the offset-corrected base DOF of each
//! requested entity, in request order. Responses are matched back to
//! requests positionally, which is sound because payload order per
//! (sender, receiver) pair is preserved by the communicator.

use crate::comm::{CommTag, Communicator, ExchangeTags, all_to_all_u64};
use crate::dof_error::DofSieveError;
use crate::mesh::MeshTopology;

/// Protocol phase of a [`RemoteDofResolver`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolverState {
    /// Nothing exchanged yet.
    Idle,
    /// Outgoing request lists have been shipped.
    RequestsSent,
    /// Base-DOF responses have been shipped.
    ResponsesSent,
    /// All ghost entries are installed.
    Resolved,
}

/// Map-side seam of the protocol: look up owned base DOFs for responses,
/// install resolved bases (plus ghost registration) on the way back.
pub trait DofHost {
    /// Offset-corrected base DOF (first function slot) of an owned entity,
    /// or `None` if this rank never assigned it one.
    fn owned_base_dof(&self, lid: usize) -> Option<u64>;

    /// Install every per-function DOF of a formerly-remote entity from its
    /// base index, registering each as a ghost.
    fn install_remote(&mut self, lid: usize, base: u64);
}

/// Drives one run of the two-phase protocol for entities of one dimension.
pub struct RemoteDofResolver<'c, C: Communicator> {
    comm: &'c C,
    request_tags: ExchangeTags,
    response_tags: ExchangeTags,
    state: ResolverState,
}

impl<'c, C: Communicator> RemoteDofResolver<'c, C> {
    /// A resolver using four tags starting at `base_tag`.
    pub fn new(comm: &'c C, base_tag: CommTag) -> Self {
        Self {
            comm,
            request_tags: ExchangeTags::from_base(base_tag),
            response_tags: ExchangeTags::from_base(base_tag.offset(2)),
            state: ResolverState::Idle,
        }
    }

    /// Current protocol phase.
    pub fn state(&self) -> ResolverState {
        self.state
    }

    /// Run the whole protocol: exchange requests, answer them, exchange
    /// responses, install ghosts.
    ///
    /// `requests[p]` holds the GIDs of dimension-`dim` entities rank `p`
    /// owns and this rank needs. Single-rank execution skips everything —
    /// by construction there are no remote entities.
    ///
    /// # Panics
    /// When a peer requests a GID this rank cannot translate or never
    /// assigned — a stale ownership predicate. Continuing would silently
    /// produce an inconsistent global numbering, so the whole collective
    /// aborts with a diagnostic naming the GID and both ranks.
    pub fn resolve<M, H>(
        &mut self,
        mesh: &M,
        dim: usize,
        requests: &[Vec<u64>],
        host: &mut H,
    ) -> Result<(), DofSieveError>
    where
        M: MeshTopology + ?Sized,
        H: DofHost,
    {
        assert_eq!(
            self.state,
            ResolverState::Idle,
            "RemoteDofResolver cannot be reused"
        );
        let n = self.comm.size();
        let me = self.comm.rank();
        if n == 1 {
            debug_assert!(requests.iter().all(Vec::is_empty));
            self.state = ResolverState::Resolved;
            return Ok(());
        }

        {
            use itertools::Itertools;
            log::debug!(
                "rank {me}: requesting DOFs for {} remote entities of dim {dim} (per rank: {})",
                requests.iter().map(Vec::len).sum::<usize>(),
                requests.iter().map(Vec::len).join(",")
            );
        }

        let incoming_requests = all_to_all_u64(self.comm, self.request_tags, requests)?;
        self.state = ResolverState::RequestsSent;

        let mut outgoing_dofs: Vec<Vec<u64>> = vec![Vec::new(); n];
        for (p, wanted) in incoming_requests.iter().enumerate() {
            if p == me {
                continue;
            }
            log::trace!("rank {me}: answering {} DOF requests from rank {p}", wanted.len());
            let answers = &mut outgoing_dofs[p];
            answers.reserve(wanted.len());
            for &gid in wanted {
                let lid = mesh.gid_to_lid(dim, gid).unwrap_or_else(|| {
                    panic!(
                        "ownership inconsistency: rank {me} received a request from rank {p} \
                         for global ID {gid} (dim {dim}) it cannot translate"
                    )
                });
                let base = host.owned_base_dof(lid).unwrap_or_else(|| {
                    panic!(
                        "ownership inconsistency: rank {me} does not own a DOF for \
                         global ID {gid} (dim {dim}) requested by rank {p}"
                    )
                });
                answers.push(base);
            }
        }

        let incoming_dofs = all_to_all_u64(self.comm, self.response_tags, &outgoing_dofs)?;
        self.state = ResolverState::ResponsesSent;

        for (p, bases) in incoming_dofs.iter().enumerate() {
            if p == me {
                continue;
            }
            if bases.len() != requests[p].len() {
                return Err(DofSieveError::CommError {
                    neighbor: p,
                    detail: format!(
                        "{} DOF responses for {} requests",
                        bases.len(),
                        requests[p].len()
                    ),
                });
            }
            for (&gid, &base) in requests[p].iter().zip(bases) {
                let lid = mesh.gid_to_lid(dim, gid).unwrap_or_else(|| {
                    panic!(
                        "rank {me}: global ID {gid} (dim {dim}) vanished between request and response"
                    )
                });
                host.install_remote(lid, base);
            }
        }
        self.state = ResolverState::Resolved;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NoComm;
    use crate::mesh::MeshTopology;

    struct NoMesh;

    impl MeshTopology for NoMesh {
        fn spatial_dim(&self) -> usize {
            1
        }
        fn num_cells(&self, _dim: usize) -> usize {
            0
        }
        fn num_facets(&self, _cd: usize, _cl: usize, _fd: usize) -> usize {
            0
        }
        fn facet_lid(&self, _cd: usize, _cl: usize, _fd: usize, _fi: usize) -> usize {
            0
        }
        fn num_max_cofacets(&self, _d: usize, _l: usize) -> usize {
            0
        }
        fn max_cofacet_lid(&self, _d: usize, _l: usize, _k: usize) -> (usize, usize) {
            (0, 0)
        }
        fn remote_owner(&self, _d: usize, _l: usize) -> Option<usize> {
            None
        }
        fn lid_to_gid(&self, _d: usize, l: usize) -> u64 {
            l as u64
        }
        fn gid_to_lid(&self, _d: usize, g: u64) -> Option<usize> {
            Some(g as usize)
        }
    }

    struct NoHost;

    impl DofHost for NoHost {
        fn owned_base_dof(&self, _lid: usize) -> Option<u64> {
            None
        }
        fn install_remote(&mut self, _lid: usize, _base: u64) {
            unreachable!("single rank installs nothing");
        }
    }

    #[test]
    fn single_rank_skips_the_protocol() {
        let comm = NoComm;
        let mut resolver = RemoteDofResolver::new(&comm, CommTag(0x0400));
        assert_eq!(resolver.state(), ResolverState::Idle);
        resolver
            .resolve(&NoMesh, 0, &[Vec::new()], &mut NoHost)
            .unwrap();
        assert_eq!(resolver.state(), ResolverState::Resolved);
    }
}
