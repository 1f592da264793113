//! Injected numeric capabilities.
//!
//! The partitioner never hard-wires a clustering or eigen routine; it calls
//! through these traits so tests can substitute fakes and callers can swap in
//! another library.

use ndarray::{Array2, ArrayView2};
use rand::RngCore;

use crate::error::Result;

/// Assigns each row of `data` to one of (at most) `k` clusters.
pub trait ClusterFit: Send + Sync {
    /// Returns one label per row of `data`.
    ///
    /// # Errors
    /// Implementations return [`crate::SelectionError`] when the input cannot be clustered.
    fn fit(&self, data: ArrayView2<'_, f64>, k: usize, rng: &mut dyn RngCore) -> Result<Vec<usize>>;

    fn name(&self) -> &'static str;
}

/// Eigenpairs of a symmetric matrix. Column `j` of `vectors` belongs to `values[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    pub values: Vec<f64>,
    pub vectors: Array2<f64>,
}

impl EigenDecomposition {
    /// Reorder the eigenpairs by ascending eigenvalue.
    #[must_use]
    pub fn sorted_ascending(self) -> Self {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| self.values[a].total_cmp(&self.values[b]));

        let values = order.iter().map(|&j| self.values[j]).collect();
        let vectors = Array2::from_shape_fn((self.vectors.nrows(), order.len()), |(i, j)| {
            self.vectors[[i, order[j]]]
        });
        Self { values, vectors }
    }
}

pub trait EigenSolver: Send + Sync {
    /// Decompose a symmetric matrix. The eigenpairs may come back in any order.
    ///
    /// # Errors
    /// Implementations return [`crate::SelectionError::Clustering`] when the solver fails.
    fn eigen_decompose(&self, matrix: ArrayView2<'_, f64>) -> Result<EigenDecomposition>;
}
