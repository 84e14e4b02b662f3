//! Thin façade over in-process or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees). All
//! handles are **waitable** but non-blocking — the collectives in
//! [`crate::comm::collectives`] call `.wait()` before they trust a buffer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Message tag namespace. Each map-construction pass derives its phase tags
/// from one base so that concurrent passes never cross-talk.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    /// The raw tag value.
    #[inline]
    pub const fn base(self) -> u16 {
        self.0
    }

    /// A tag offset from this one.
    #[inline]
    pub const fn offset(self, n: u16) -> CommTag {
        CommTag(self.0.wrapping_add(n))
    }
}

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// This rank's index in `0..size()`.
    fn rank(&self) -> usize;
    /// Number of ranks participating.
    fn size(&self) -> usize;

    /// Post a send of `buf` to `peer` under `tag`.
    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive from `peer` under `tag`; `buf.len()` bounds the payload.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for single-rank use and pure serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- LocalComm: in-process ranks over a shared mailbox ---

type Key = (usize, usize, u16); // (src, dst, tag)

static MAILBOX: Lazy<DashMap<Key, Mutex<VecDeque<Bytes>>>> = Lazy::new(DashMap::new);

/// Receive handle for [`LocalComm`]; joins the polling thread on `wait`.
pub struct LocalHandle {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.slot.lock().take()
    }
}

/// In-process communicator: every "rank" is a thread sharing one global
/// FIFO mailbox. Message order per (sender, receiver, tag) triple is
/// preserved, which the request/response matching in
/// [`crate::map::remote`] relies on.
///
/// Tests that use `LocalComm` share the process-wide mailbox and must run
/// serialized (`#[serial]`) with per-test tag bases.
#[derive(Clone, Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
}

impl LocalComm {
    /// Create the endpoint for `rank` out of `size` in-process ranks.
    pub fn new(rank: usize, size: usize) -> Self {
        assert!(rank < size, "rank {rank} out of range for size {size}");
        Self { rank, size }
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        let key = (self.rank, peer, tag);
        MAILBOX
            .entry(key)
            .or_default()
            .lock()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> LocalHandle {
        let key = (peer, self.rank, tag);
        let slot = Arc::new(Mutex::new(None));
        let slot_clone = Arc::clone(&slot);
        let cap = buf.len();
        let handle = std::thread::spawn(move || {
            loop {
                let popped = MAILBOX.get(&key).and_then(|q| q.lock().pop_front());
                if let Some(bytes) = popped {
                    let n = bytes.len().min(cap);
                    *slot_clone.lock() = Some(bytes[..n].to_vec());
                    break;
                }
                std::thread::yield_now();
            }
        });
        LocalHandle {
            slot,
            handle: Some(handle),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, Wait};
    use mpi::point_to_point::{Destination, Source};
    use mpi::topology::Communicator as _;

    /// One-process-per-rank communicator over MPI_COMM_WORLD.
    pub struct MpiComm {
        _universe: mpi::environment::Universe,
        world: mpi::topology::SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialize MPI and bind to the world communicator.
        pub fn new() -> Self {
            let universe = mpi::initialize().expect("MPI already initialized");
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self {
                _universe: universe,
                world,
                rank,
                size,
            }
        }
    }

    /// Deferred receive: sends complete eagerly in `isend`, receives run in
    /// `wait`, so the post-receives-then-send ordering used by the
    /// collectives cannot deadlock.
    pub struct MpiRecv {
        peer: i32,
        tag: i32,
        cap: usize,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            let world = mpi::topology::SimpleCommunicator::world();
            let (mut data, _status) = world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            data.truncate(self.cap);
            Some(data)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
            MpiRecv {
                peer: peer as i32,
                tag: tag as i32,
                cap: buf.len(),
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
