//! Offset resolution: from per-rank local DOF counts to a globally unique,
//! rank-contiguous numbering.

use crate::comm::{CommTag, Communicator, exclusive_scan_sum};
use crate::dof_error::DofSieveError;
use crate::map::UNASSIGNED_DOF;

/// Globally resolved numbering range of one rank.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalOffsets {
    /// First DOF index owned by this rank.
    pub my_offset: u64,
    /// Number of DOFs this rank owns.
    pub num_local: u64,
    /// Total DOF count across all ranks.
    pub total: u64,
}

/// Run the rank-ordered exclusive scan over local counts.
///
/// The scan reduces in fixed rank order on every rank, so repeated runs on
/// the same partition yield identical numbering. With one rank there is no
/// communication: offset 0, total = `local_count`.
pub fn resolve_offsets<C: Communicator>(
    comm: &C,
    tag: CommTag,
    local_count: u64,
) -> Result<GlobalOffsets, DofSieveError> {
    let scan = exclusive_scan_sum(comm, tag, local_count)?;
    log::debug!(
        "rank {}: DOF offset {} of {} total ({} local)",
        comm.rank(),
        scan.offset,
        scan.total,
        local_count
    );
    Ok(GlobalOffsets {
        my_offset: scan.offset,
        num_local: local_count,
        total: scan.total,
    })
}

/// Shift every assigned entry of a DOF table by `my_offset`, leaving
/// [`UNASSIGNED_DOF`] sentinels for remote resolution.
pub fn apply_offset(dofs: &mut [i64], my_offset: u64) {
    if my_offset == 0 {
        return;
    }
    let shift = my_offset as i64;
    for d in dofs.iter_mut() {
        if *d != UNASSIGNED_DOF {
            *d += shift;
        }
    }
}
