//! Locally scaled affinity for spectral clustering.
//!
//! Self-tuning scaling (Zelnik-Manor & Perona): every point gets its own scale
//! σ_i, the distance to its k-th nearest neighbour, and
//! `A_ij = exp(-d_ij² / (σ_i σ_j))`.

use ndarray::{Array2, ArrayView2};

/// Build the affinity between the rows of `coordinates`.
///
/// `neighbors` is clamped to `n - 1`. A `0 / 0` exponent (coincident points
/// whose scale is zero) counts as `0`, so such pairs get affinity 1. The
/// diagonal is zero.
#[must_use]
pub fn local_scaling_affinity(coordinates: ArrayView2<'_, f64>, neighbors: usize) -> Array2<f64> {
    let n = coordinates.nrows();
    if n == 0 {
        return Array2::zeros((0, 0));
    }

    let distances = Array2::from_shape_fn((n, n), |(i, j)| {
        coordinates
            .row(i)
            .iter()
            .zip(coordinates.row(j).iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    });

    // position 0 of each sorted column is the point itself
    let k = neighbors.min(n - 1);
    let scales: Vec<f64> = distances
        .columns()
        .into_iter()
        .map(|column| {
            let mut sorted = column.to_vec();
            sorted.sort_by(f64::total_cmp);
            sorted[k]
        })
        .collect();

    let mut affinity = Array2::from_shape_fn((n, n), |(i, j)| {
        let d = distances[[i, j]];
        let exponent = -(d * d) / (scales[i] * scales[j]);
        if exponent.is_nan() { 1.0 } else { exponent.exp() }
    });
    affinity.diag_mut().fill(0.0);
    affinity
}
