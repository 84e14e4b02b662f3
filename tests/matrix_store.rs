//! MatrixStore deduplication scenarios.

use dof_sieve::constraint::{DEDUP_TOL, MatrixStore};

#[test]
fn tolerance_separates_near_from_far() {
    let mut store = MatrixStore::new();
    let a = store.add_matrix(0, &[1.0, 0.0, 0.0, 1.0]);
    // Distance 1e-24 < 1e-10: same entry.
    let b = store.add_matrix(0, &[1.0, 1e-12, 0.0, 1.0]);
    assert_eq!(a, b);
    // Distance 2.0 > 1e-10: a new entry.
    let c = store.add_matrix(0, &[2.0, 0.0, 0.0, 2.0]);
    assert_ne!(a, c);
    assert_eq!(store.chunk_len(0), 2);
}

#[test]
fn repeated_insertion_is_idempotent() {
    let mut store = MatrixStore::new();
    let m = [0.5, 0.5, 0.25, 0.75];
    let first = store.add_matrix(1, &m);
    for _ in 0..10 {
        assert_eq!(store.add_matrix(1, &m), first);
    }
    assert_eq!(store.chunk_len(1), 1);
    assert_eq!(store.matrix(1, first), &m);
}

#[test]
fn nearest_candidate_wins() {
    let mut store = MatrixStore::new();
    let far = store.add_matrix(0, &[0.0, 0.0]);
    let near = store.add_matrix(0, &[1.0, 1.0]);
    // Closer to the second entry than the first, within tolerance of it.
    let probe = store.add_matrix(0, &[1.0 + 1e-7 * DEDUP_TOL.sqrt(), 1.0]);
    assert_eq!(probe, near);
    assert_ne!(probe, far);
}
