//! Serde round-trips of the plain data records this crate exposes.

use dof_sieve::comm::ScanSum;
use dof_sieve::constraint::{ConstraintTerm, HangingDofConstraint};
use dof_sieve::map::offsets::GlobalOffsets;
use dof_sieve::map::{BatchChunk, CellBatchDofs};

#[test]
fn offsets_json_roundtrip() {
    let offsets = GlobalOffsets {
        my_offset: 6,
        num_local: 5,
        total: 11,
    };
    let s = serde_json::to_string(&offsets).unwrap();
    let back: GlobalOffsets = serde_json::from_str(&s).unwrap();
    assert_eq!(back, offsets);
}

#[test]
fn scan_sum_bincode_roundtrip() {
    let scan = ScanSum {
        offset: 42,
        total: 99,
    };
    let bytes = bincode::serialize(&scan).unwrap();
    let back: ScanSum = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, scan);
}

#[test]
fn constraint_record_roundtrip() {
    let record = HangingDofConstraint {
        parent_cell: 7,
        terms: vec![
            ConstraintTerm {
                parent_local_dof: 0,
                coefficient: 0.5,
            },
            ConstraintTerm {
                parent_local_dof: 1,
                coefficient: 0.5,
            },
        ],
    };
    let s = serde_json::to_string(&record).unwrap();
    let back: HangingDofConstraint = serde_json::from_str(&s).unwrap();
    assert_eq!(back, record);

    let bytes = bincode::serialize(&record).unwrap();
    let back: HangingDofConstraint = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, record);
}

#[test]
fn batch_dofs_roundtrip() {
    let batch = CellBatchDofs {
        chunks: vec![BatchChunk {
            funcs: vec![0, 1],
            nodes_per_cell: 2,
            dofs: vec![0, 1, 2, 3, -1, 4],
        }],
    };
    let s = serde_json::to_string(&batch).unwrap();
    let back: CellBatchDofs = serde_json::from_str(&s).unwrap();
    assert_eq!(back, batch);
}
