//! Content-addressed cache of dense interpolation matrices.
//!
//! Adaptive refinement produces many geometrically identical interpolation
//! matrices (every midpoint bisection of a given order yields the same
//! coefficients). The store deduplicates them by numeric distance: within a
//! chunk, an insertion scans stored candidates and reuses the first whose
//! squared L2 distance stays under [`DEDUP_TOL`]. The scan is linear on
//! purpose — chunk sizes stay small (bounded by basis order and refinement
//! depth), and a cheap scan per insertion buys a large memory reduction
//! during assembly of large nonconforming meshes.
//!
//! One store belongs to one rank for one mesh-assembly session. Entries are
//! never evicted; indices stay valid for the store's lifetime.

/// Squared-L2 tolerance under which two matrices are considered identical.
pub const DEDUP_TOL: f64 = 1.0e-10;

/// Rank-owned cache of flattened dense matrices, grouped into chunks of
/// identical dimension/role.
#[derive(Clone, Debug, Default)]
pub struct MatrixStore {
    chunks: Vec<Vec<Vec<f64>>>,
}

impl MatrixStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks seen so far.
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Number of distinct matrices stored in a chunk.
    ///
    /// # Panics
    /// On an out-of-range chunk; see [`MatrixStore::matrix`].
    pub fn chunk_len(&self, chunk: usize) -> usize {
        assert!(
            chunk < self.chunks.len(),
            "MatrixStore: chunk {chunk} out of range ({} chunks)",
            self.chunks.len()
        );
        self.chunks[chunk].len()
    }

    /// Insert `m` into `chunk`, returning the index of the stored matrix
    /// it deduplicates to (its own, if no near-duplicate exists).
    ///
    /// Candidates of length at least `m.len()` are compared by squared L2
    /// distance over `m`'s length; the nearest one under [`DEDUP_TOL`] wins.
    /// A not-yet-seen chunk index grows the chunk list.
    pub fn add_matrix(&mut self, chunk: usize, m: &[f64]) -> usize {
        if chunk >= self.chunks.len() {
            self.chunks.resize_with(chunk + 1, Vec::new);
        }
        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in self.chunks[chunk].iter().enumerate() {
            if candidate.len() < m.len() {
                continue;
            }
            let d2: f64 = m
                .iter()
                .zip(candidate.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            if best.is_none_or(|(_, bd)| d2 < bd) {
                best = Some((i, d2));
            }
        }
        if let Some((i, d2)) = best {
            if d2 < DEDUP_TOL {
                return i;
            }
        }
        self.chunks[chunk].push(m.to_vec());
        self.chunks[chunk].len() - 1
    }

    /// Retrieve a stored matrix.
    ///
    /// # Panics
    /// On an out-of-range chunk or index. A bad reference here means a
    /// corrupted constraint record, and continuing would assemble against
    /// the wrong interpolation — there is no local recovery.
    pub fn matrix(&self, chunk: usize, index: usize) -> &[f64] {
        assert!(
            chunk < self.chunks.len(),
            "MatrixStore: chunk {chunk} out of range ({} chunks)",
            self.chunks.len()
        );
        let entries = &self.chunks[chunk];
        assert!(
            index < entries.len(),
            "MatrixStore: index {index} out of range in chunk {chunk} ({} entries)",
            entries.len()
        );
        &entries[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_duplicates_share_an_index() {
        let mut store = MatrixStore::new();
        let first = store.add_matrix(0, &[1.0, 0.0, 0.0, 1.0]);
        let second = store.add_matrix(0, &[1.0, 1e-12, 0.0, 1.0]);
        assert_eq!(first, second);
        assert_eq!(store.chunk_len(0), 1);

        let third = store.add_matrix(0, &[2.0, 0.0, 0.0, 2.0]);
        assert_ne!(first, third);
        assert_eq!(store.chunk_len(0), 2);
    }

    #[test]
    fn idempotent_insertion() {
        let mut store = MatrixStore::new();
        let m = [0.5, 0.5, 0.0, 1.0];
        let a = store.add_matrix(3, &m);
        let b = store.add_matrix(3, &m);
        assert_eq!(a, b);
        assert_eq!(store.num_chunks(), 4);
        assert_eq!(store.matrix(3, a), &m);
    }

    #[test]
    fn chunks_scope_deduplication() {
        let mut store = MatrixStore::new();
        let m = [1.0, 0.0];
        assert_eq!(store.add_matrix(0, &m), 0);
        // Same matrix, different chunk: stored again.
        assert_eq!(store.add_matrix(1, &m), 0);
        assert_eq!(store.chunk_len(0), 1);
        assert_eq!(store.chunk_len(1), 1);
    }

    #[test]
    fn shorter_candidates_are_skipped() {
        let mut store = MatrixStore::new();
        store.add_matrix(0, &[1.0]);
        let idx = store.add_matrix(0, &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(idx, 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_lookup_aborts() {
        let store = MatrixStore::new();
        let _ = store.matrix(0, 0);
    }
}
