use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sentinel distance for "no path".
pub const UNREACHABLE: u8 = u8::MAX;

/// Row-major square matrix of jump counts packed into single bytes.
///
/// No route in the cluster is longer than ~100 jumps, so a byte per cell with
/// [`UNREACHABLE`] as the sentinel is enough, and it keeps the full ~8k²
/// matrix around 64 MiB, small enough to stay cache-resident through the
/// Floyd–Warshall sweep. Widening the cell type forfeits that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    #[serde(rename = "RowSize")]
    row_size: usize,
    #[serde(rename = "Arr")]
    arr: Vec<u8>,
}

impl DistanceMatrix {
    /// Create an `n`×`n` matrix with every cell set to `value`.
    pub fn filled(n: usize, value: u8) -> Self {
        Self {
            row_size: n,
            arr: vec![value; n * n],
        }
    }

    /// Create an `n`×`n` matrix with every cell unreachable.
    pub fn unreachable(n: usize) -> Self {
        Self::filled(n, UNREACHABLE)
    }

    /// Number of rows (and columns).
    pub fn len(&self) -> usize {
        self.row_size
    }

    pub fn is_empty(&self) -> bool {
        self.row_size == 0
    }

    #[inline]
    pub fn at(&self, i: usize, j: usize) -> u8 {
        debug_assert!(i < self.row_size && j < self.row_size);
        self.arr[i * self.row_size + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: u8) {
        debug_assert!(i < self.row_size && j < self.row_size);
        self.arr[i * self.row_size + j] = value;
    }

    /// Borrow row `i` as a slice.
    pub fn row(&self, i: usize) -> &[u8] {
        let start = i * self.row_size;
        &self.arr[start..start + self.row_size]
    }
}

/// Join two path legs, saturating at the sentinel.
///
/// Returns `None` when the sum reaches [`UNREACHABLE`]. The single check
/// covers both byte overflow and "no path through this pivot": the sentinel
/// plus anything is always at or above the sentinel.
#[inline]
pub fn join_legs(a: u8, b: u8) -> Option<u8> {
    let sum = u16::from(a) + u16::from(b);
    if sum >= u16::from(UNREACHABLE) {
        None
    } else {
        Some(sum as u8)
    }
}

/// Relax a seeded adjacency matrix into all-pairs shortest paths.
///
/// Classical Floyd–Warshall; the pivot loop must stay outermost. Expects the
/// diagonal at 0, direct edges at 1, and everything else at [`UNREACHABLE`].
pub fn shortest_paths(matrix: &mut DistanceMatrix) {
    let n = matrix.len();
    for k in 0..n {
        if k % 1024 == 0 {
            debug!(pivot = k, total = n, "relaxing all-pairs distances");
        }
        for i in 0..n {
            let through_k = matrix.at(i, k);
            if through_k == UNREACHABLE {
                continue;
            }
            for j in 0..n {
                if let Some(candidate) = join_legs(through_k, matrix.at(k, j)) {
                    if candidate < matrix.at(i, j) {
                        matrix.set(i, j, candidate);
                    }
                }
            }
        }
    }
}
