//! Spectral clustering over a precomputed affinity.

use std::sync::Arc;

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2};
use rand::RngCore;

use super::kmeans::KMeans;
use super::traits::{ClusterFit, EigenDecomposition, EigenSolver};
use crate::error::{Result, SelectionError};

/// Symmetric normalized Laplacian `I - D^-1/2 A D^-1/2`.
///
/// The diagonal of `affinity` is ignored. Isolated vertices (zero degree) get a
/// zero row and a zero diagonal entry.
#[must_use]
pub fn normalized_laplacian(affinity: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = affinity.nrows();
    let degrees: Vec<f64> = (0..n)
        .map(|j| (0..n).filter(|&i| i != j).map(|i| affinity[[i, j]]).sum())
        .collect();
    let scale: Vec<f64> = degrees
        .iter()
        .map(|&d| if d == 0.0 { 1.0 } else { d.sqrt() })
        .collect();

    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            if degrees[i] == 0.0 { 0.0 } else { 1.0 }
        } else {
            -affinity[[i, j]] / (scale[i] * scale[j])
        }
    })
}

/// Eigen solver backed by `nalgebra`'s symmetric decomposition.
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraEigenSolver;

impl EigenSolver for NalgebraEigenSolver {
    fn eigen_decompose(&self, matrix: ArrayView2<'_, f64>) -> Result<EigenDecomposition> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(SelectionError::Clustering(format!(
                "eigen decomposition needs a square matrix, got {rows}x{cols}"
            )));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(SelectionError::Clustering(
                "eigen decomposition input contains non-finite values".to_string(),
            ));
        }
        if rows == 0 {
            return Ok(EigenDecomposition {
                values: vec![],
                vectors: Array2::zeros((0, 0)),
            });
        }

        let eigen = DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]).symmetric_eigen();
        Ok(EigenDecomposition {
            values: eigen.eigenvalues.iter().copied().collect(),
            vectors: Array2::from_shape_fn((rows, rows), |(i, j)| eigen.eigenvectors[(i, j)]),
        })
    }
}

/// Normalized spectral clustering (Ng, Jordan & Weiss).
///
/// Embeds each vertex into the eigenvectors of the `k` smallest Laplacian
/// eigenvalues, normalizes the embedded rows and clusters them with k-means.
pub struct SpectralClustering {
    solver: Arc<dyn EigenSolver>,
    kmeans: KMeans,
}

impl SpectralClustering {
    #[must_use]
    pub fn new(solver: Arc<dyn EigenSolver>, kmeans: KMeans) -> Self {
        Self { solver, kmeans }
    }

    /// Row-normalized spectral embedding of `affinity` into `k` dimensions.
    ///
    /// # Errors
    /// Propagates solver failures.
    pub fn embed(&self, affinity: ArrayView2<'_, f64>, k: usize) -> Result<Array2<f64>> {
        let laplacian = normalized_laplacian(affinity);
        let decomposition = self.solver.eigen_decompose(laplacian.view())?.sorted_ascending();

        let n = affinity.nrows();
        let k = k.min(decomposition.values.len());
        let mut embedding =
            Array2::from_shape_fn((n, k), |(i, j)| decomposition.vectors[[i, j]]);
        for mut row in embedding.rows_mut() {
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            }
        }
        Ok(embedding)
    }
}

impl ClusterFit for SpectralClustering {
    fn fit(
        &self,
        affinity: ArrayView2<'_, f64>,
        k: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<usize>> {
        if k == 0 {
            return Err(SelectionError::InvalidParameter(
                "spectral clustering needs at least one cluster".to_string(),
            ));
        }
        if affinity.nrows() != affinity.ncols() {
            return Err(SelectionError::Clustering(
                "spectral clustering expects a square affinity matrix".to_string(),
            ));
        }
        let embedding = self.embed(affinity, k)?;
        self.kmeans.fit(embedding.view(), k, rng)
    }

    fn name(&self) -> &'static str {
        "spectral"
    }
}
