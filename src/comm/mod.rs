//! Communication backends and the two collectives DOF resolution needs.

pub mod collectives;
pub mod communicator;

pub use collectives::{ExchangeTags, ScanSum, all_to_all_u64, exclusive_scan_sum, gather_counts};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
pub use communicator::{CommTag, Communicator, LocalComm, NoComm, Wait};
