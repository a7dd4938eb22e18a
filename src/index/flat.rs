//! Exhaustive squared-Euclidean nearest-neighbor search.
//!
//! Every query is compared against every stored vector; there is no
//! approximation and no partial index — accuracy over the full corpus is
//! the point.

use crate::embedding::Matrix;
use crate::types::FatwaError;

/// Exact-search structure over all rows of the vector matrix.
#[derive(Clone, Debug)]
pub struct FlatIndex {
    matrix: Matrix,
}

impl FlatIndex {
    /// Indexes every row of the matrix.
    pub fn new(matrix: Matrix) -> Self {
        Self { matrix }
    }

    pub fn len(&self) -> usize {
        self.matrix.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.rows() == 0
    }

    pub fn dimensions(&self) -> usize {
        self.matrix.dims()
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Returns the `k` nearest positions by squared Euclidean distance,
    /// ascending, with ties broken by position so repeated calls are
    /// deterministic.  `k` is clamped to `[1, len]`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, FatwaError> {
        if query.len() != self.matrix.dims() {
            return Err(FatwaError::Dimension {
                expected: self.matrix.dims(),
                actual: query.len(),
            });
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let k = k.clamp(1, self.len());

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|position| (position, squared_l2(query, self.matrix.row(position))))
            .collect();
        scored.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}
