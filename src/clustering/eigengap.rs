//! Eigengap heuristic for suggesting a spectral cluster count.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::spectral::normalized_laplacian;
use super::traits::EigenSolver;
use crate::error::Result;

/// Suggested cluster counts, best first, with the Laplacian spectrum they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigengapReport {
    pub suggested_cluster_counts: Vec<usize>,
    /// Eigenvalues of the normalized Laplacian, ascending.
    pub eigenvalues: Vec<f64>,
}

/// Rank cluster counts by the gap that follows them in an ascending spectrum.
///
/// A gap between eigenvalue `i` and `i + 1` suggests `i + 1` clusters. Equal
/// gaps keep the smaller count first. At most `top_k` counts are returned.
#[must_use]
pub fn suggest_cluster_counts(sorted_eigenvalues: &[f64], top_k: usize) -> Vec<usize> {
    let gaps: Vec<f64> = sorted_eigenvalues.windows(2).map(|w| w[1] - w[0]).collect();
    let mut positions: Vec<usize> = (0..gaps.len()).collect();
    positions.sort_by(|&a, &b| gaps[b].total_cmp(&gaps[a]));
    positions.into_iter().take(top_k).map(|i| i + 1).collect()
}

/// Run the heuristic on an affinity matrix.
///
/// # Errors
/// Propagates solver failures.
pub fn eigengap_report(
    affinity: ArrayView2<'_, f64>,
    solver: &dyn EigenSolver,
    top_k: usize,
) -> Result<EigengapReport> {
    let laplacian = normalized_laplacian(affinity);
    let decomposition = solver.eigen_decompose(laplacian.view())?.sorted_ascending();
    Ok(EigengapReport {
        suggested_cluster_counts: suggest_cluster_counts(&decomposition.values, top_k),
        eigenvalues: decomposition.values,
    })
}
