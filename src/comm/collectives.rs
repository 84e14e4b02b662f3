//! Collective operations built on [`Communicator`].
//!
//! Two collectives are all this crate needs: a rank-ordered exclusive prefix
//! sum of per-rank DOF counts, and a variable-length all-to-all of `u64`
//! payloads (global IDs on the way out, base DOF indices on the way back).
//! Both are synchronous: a rank blocks until every peer has contributed.
//!
//! Payloads are little-endian on the wire so heterogeneous transports agree.

use crate::comm::communicator::{CommTag, Communicator, Wait};
use crate::dof_error::DofSieveError;

static_assertions::assert_eq_size!(u64, [u8; 8]);

/// Tag pair for one staged exchange: a fixed-size count header, then the
/// payload sized by it.
#[derive(Copy, Clone, Debug)]
pub struct ExchangeTags {
    /// Tag for the count stage.
    pub count: CommTag,
    /// Tag for the payload stage.
    pub payload: CommTag,
}

impl ExchangeTags {
    /// Derive count/payload tags from a base tag.
    pub const fn from_base(base: CommTag) -> Self {
        Self {
            count: base,
            payload: base.offset(1),
        }
    }
}

/// Result of the exclusive prefix sum over per-rank counts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScanSum {
    /// Sum of counts on ranks strictly below this one.
    pub offset: u64,
    /// Sum of counts over all ranks.
    pub total: u64,
}

fn encode_u64s(values: &[u64]) -> Vec<u8> {
    let le: Vec<u64> = values.iter().map(|v| v.to_le()).collect();
    bytemuck::cast_slice(&le).to_vec()
}

fn decode_u64s(raw: &[u8], neighbor: usize) -> Result<Vec<u64>, DofSieveError> {
    if raw.len() % 8 != 0 {
        return Err(DofSieveError::CommError {
            neighbor,
            detail: format!("payload of {} bytes is not a whole number of u64s", raw.len()),
        });
    }
    let mut out = vec![0u64; raw.len() / 8];
    bytemuck::cast_slice_mut::<u64, u8>(&mut out).copy_from_slice(raw);
    for v in &mut out {
        *v = u64::from_le(*v);
    }
    Ok(out)
}

/// Gather every rank's `local` count, in rank order.
///
/// Implemented as a pairwise exchange with every peer; with one rank the
/// result is just `[local]` and no messages move. The returned vector is
/// identical on every rank, which makes downstream prefix sums
/// deterministic by construction.
pub fn gather_counts<C: Communicator>(
    comm: &C,
    tag: CommTag,
    local: u64,
) -> Result<Vec<u64>, DofSieveError> {
    let n = comm.size();
    let me = comm.rank();
    let mut counts = vec![0u64; n];
    counts[me] = local;
    if n == 1 {
        return Ok(counts);
    }

    let mut recvs = Vec::with_capacity(n - 1);
    let mut bufs: Vec<[u8; 8]> = vec![[0u8; 8]; n];
    for p in 0..n {
        if p == me {
            continue;
        }
        let h = comm.irecv(p, tag.base(), &mut bufs[p]);
        recvs.push((p, h));
    }
    let payload = local.to_le_bytes();
    for p in 0..n {
        if p == me {
            continue;
        }
        comm.isend(p, tag.base(), &payload);
    }
    for (p, h) in recvs {
        let data = h.wait().ok_or_else(|| DofSieveError::CommError {
            neighbor: p,
            detail: "count exchange returned no data".into(),
        })?;
        if data.len() != 8 {
            return Err(DofSieveError::CommError {
                neighbor: p,
                detail: format!("expected 8-byte count, got {} bytes", data.len()),
            });
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&data);
        counts[p] = u64::from_le_bytes(raw);
    }
    Ok(counts)
}

/// Exclusive prefix sum of per-rank counts, in fixed rank order.
///
/// With one rank: offset 0, total = `local`, no communication.
pub fn exclusive_scan_sum<C: Communicator>(
    comm: &C,
    tag: CommTag,
    local: u64,
) -> Result<ScanSum, DofSieveError> {
    if comm.size() == 1 {
        return Ok(ScanSum {
            offset: 0,
            total: local,
        });
    }
    let counts = gather_counts(comm, tag, local)?;
    let offset = counts[..comm.rank()].iter().sum();
    let total = counts.iter().sum();
    Ok(ScanSum { offset, total })
}

/// Variable-length all-to-all of `u64` lists.
///
/// `outgoing[p]` is the list destined for rank `p`; the self slot must be
/// empty. Returns `incoming` with `incoming[p]` holding rank `p`'s list in
/// its original order (the positional request/response matching in
/// [`crate::map::remote`] depends on this). Two stages per peer: an 8-byte
/// count, then the payload.
pub fn all_to_all_u64<C: Communicator>(
    comm: &C,
    tags: ExchangeTags,
    outgoing: &[Vec<u64>],
) -> Result<Vec<Vec<u64>>, DofSieveError> {
    let n = comm.size();
    let me = comm.rank();
    if outgoing.len() != n {
        return Err(DofSieveError::BadRequestTable {
            found: outgoing.len(),
            ranks: n,
        });
    }
    debug_assert!(outgoing[me].is_empty(), "self slot of an all-to-all must be empty");

    let mut incoming: Vec<Vec<u64>> = vec![Vec::new(); n];
    if n == 1 {
        return Ok(incoming);
    }

    // Stage 1: exchange payload lengths.
    let mut len_recvs = Vec::with_capacity(n - 1);
    let mut len_bufs: Vec<[u8; 8]> = vec![[0u8; 8]; n];
    for p in 0..n {
        if p == me {
            continue;
        }
        let h = comm.irecv(p, tags.count.base(), &mut len_bufs[p]);
        len_recvs.push((p, h));
    }
    for (p, list) in outgoing.iter().enumerate() {
        if p == me {
            continue;
        }
        comm.isend(p, tags.count.base(), &(list.len() as u64).to_le_bytes());
    }
    let mut incoming_lens = vec![0usize; n];
    for (p, h) in len_recvs {
        let data = h.wait().ok_or_else(|| DofSieveError::CommError {
            neighbor: p,
            detail: "length exchange returned no data".into(),
        })?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&data);
        incoming_lens[p] = u64::from_le_bytes(raw) as usize;
    }

    // Stage 2: exchange payloads.
    let mut data_recvs = Vec::with_capacity(n - 1);
    let mut data_bufs: Vec<Vec<u8>> = (0..n).map(|p| vec![0u8; incoming_lens[p] * 8]).collect();
    for p in 0..n {
        if p == me || incoming_lens[p] == 0 {
            continue;
        }
        let h = comm.irecv(p, tags.payload.base(), &mut data_bufs[p]);
        data_recvs.push((p, h));
    }
    for (p, list) in outgoing.iter().enumerate() {
        if p == me || list.is_empty() {
            continue;
        }
        comm.isend(p, tags.payload.base(), &encode_u64s(list));
    }
    for (p, h) in data_recvs {
        let raw = h.wait().ok_or_else(|| DofSieveError::CommError {
            neighbor: p,
            detail: "payload exchange returned no data".into(),
        })?;
        if raw.len() != incoming_lens[p] * 8 {
            return Err(DofSieveError::CommError {
                neighbor: p,
                detail: format!(
                    "expected {} payload bytes, got {}",
                    incoming_lens[p] * 8,
                    raw.len()
                ),
            });
        }
        incoming[p] = decode_u64s(&raw, p)?;
    }
    Ok(incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::communicator::{LocalComm, NoComm};
    use serial_test::serial;

    #[test]
    fn scan_single_rank_is_degenerate() {
        let s = exclusive_scan_sum(&NoComm, CommTag(0x0200), 11).unwrap();
        assert_eq!(s.offset, 0);
        assert_eq!(s.total, 11);
    }

    #[test]
    fn all_to_all_single_rank_moves_nothing() {
        let incoming = all_to_all_u64(
            &NoComm,
            ExchangeTags::from_base(CommTag(0x0201)),
            &[vec![]],
        )
        .unwrap();
        assert_eq!(incoming, vec![Vec::<u64>::new()]);
    }

    #[test]
    fn bad_request_table_is_rejected() {
        let err = all_to_all_u64(
            &NoComm,
            ExchangeTags::from_base(CommTag(0x0202)),
            &[vec![], vec![]],
        )
        .unwrap_err();
        assert!(matches!(err, DofSieveError::BadRequestTable { found: 2, ranks: 1 }));
    }

    #[test]
    #[serial]
    fn scan_three_ranks() {
        let counts = [6u64, 5, 9];
        let handles: Vec<_> = (0..3)
            .map(|r| {
                std::thread::spawn(move || {
                    let comm = LocalComm::new(r, 3);
                    exclusive_scan_sum(&comm, CommTag(0x0210), counts[r]).unwrap()
                })
            })
            .collect();
        let results: Vec<ScanSum> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], ScanSum { offset: 0, total: 20 });
        assert_eq!(results[1], ScanSum { offset: 6, total: 20 });
        assert_eq!(results[2], ScanSum { offset: 11, total: 20 });
    }

    #[test]
    #[serial]
    fn all_to_all_preserves_pairwise_order() {
        let handles: Vec<_> = (0..2)
            .map(|r| {
                std::thread::spawn(move || {
                    let comm = LocalComm::new(r, 2);
                    let outgoing = if r == 0 {
                        vec![vec![], vec![10, 20, 30]]
                    } else {
                        vec![vec![7], vec![]]
                    };
                    all_to_all_u64(
                        &comm,
                        ExchangeTags::from_base(CommTag(0x0220)),
                        &outgoing,
                    )
                    .unwrap()
                })
            })
            .collect();
        let results: Vec<Vec<Vec<u64>>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], vec![vec![], vec![7]]);
        assert_eq!(results[1], vec![vec![10, 20, 30], vec![]]);
    }
}
