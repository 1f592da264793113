use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, RngCore, seq::index};

use super::traits::ClusterFit;
use crate::error::{Result, SelectionError};

/// Lloyd's k-means over the rows of a dense grid.
///
/// Each restart seeds its centroids with `k` distinct random rows; the run with
/// the lowest inertia wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    max_iterations: usize,
    restarts: usize,
}

/// Outcome of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    /// Sum of squared distances from each row to its centroid.
    pub inertia: f64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(300, 10)
    }
}

impl KMeans {
    #[must_use]
    pub fn new(max_iterations: usize, restarts: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            restarts: restarts.max(1),
        }
    }

    /// Runs K-Means clustering.
    ///
    /// # Arguments
    /// * `data` - One point per row.
    /// * `k` - Number of clusters, clamped to the row count.
    /// * `rng` - Source for centroid seeding and empty-cluster reseeding.
    pub fn run(&self, data: ArrayView2<'_, f64>, k: usize, rng: &mut dyn RngCore) -> KMeansFit {
        if data.nrows() == 0 || k == 0 {
            return KMeansFit {
                centroids: vec![],
                assignments: vec![],
                inertia: 0.0,
            };
        }

        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.restarts {
            let fit = self.run_once(data, k, rng);
            if best.as_ref().is_none_or(|current| fit.inertia < current.inertia) {
                best = Some(fit);
            }
        }
        best.unwrap_or_else(|| self.run_once(data, k, rng))
    }

    fn run_once(&self, data: ArrayView2<'_, f64>, k: usize, rng: &mut dyn RngCore) -> KMeansFit {
        let n = data.nrows();
        let k = k.min(n);
        let dim = data.ncols();

        // Initialize centroids with distinct random rows
        let mut centroids: Vec<Vec<f64>> = index::sample(rng, n, k)
            .into_iter()
            .map(|i| data.row(i).to_vec())
            .collect();

        let mut assignments = vec![usize::MAX; n];
        let mut iterations = 0;

        loop {
            iterations += 1;

            // E-step: assign points to the nearest centroid
            let new_assignments: Vec<usize> = data
                .rows()
                .into_iter()
                .map(|point| nearest(point, &centroids).0)
                .collect();

            let changed = new_assignments != assignments;
            assignments = new_assignments;
            if !changed || iterations >= self.max_iterations {
                break;
            }

            // M-step: move centroids to the mean of their members
            let mut sums = vec![vec![0.0; dim]; k];
            let mut counts = vec![0_usize; k];
            for (point, &cluster) in data.rows().into_iter().zip(&assignments) {
                for (sum, value) in sums[cluster].iter_mut().zip(point.iter()) {
                    *sum += value;
                }
                counts[cluster] += 1;
            }

            for (j, centroid) in centroids.iter_mut().enumerate() {
                if counts[j] > 0 {
                    for (value, sum) in centroid.iter_mut().zip(&sums[j]) {
                        *value = sum / counts[j] as f64;
                    }
                } else {
                    // reseed an empty cluster with a random point
                    let i = rng.random_range(0..n);
                    *centroid = data.row(i).to_vec();
                }
            }
        }

        let inertia = data
            .rows()
            .into_iter()
            .zip(&assignments)
            .map(|(point, &cluster)| distance_sq(point, &centroids[cluster]))
            .sum();

        KMeansFit {
            centroids,
            assignments,
            inertia,
        }
    }
}

impl ClusterFit for KMeans {
    fn fit(
        &self,
        data: ArrayView2<'_, f64>,
        k: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<usize>> {
        if k == 0 {
            return Err(SelectionError::InvalidParameter(
                "k-means needs at least one cluster".to_string(),
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(SelectionError::Clustering(
                "k-means input contains non-finite values".to_string(),
            ));
        }
        Ok(self.run(data, k, rng).assignments)
    }

    fn name(&self) -> &'static str {
        "kmeans"
    }
}

fn nearest(point: ArrayView1<'_, f64>, centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best_cluster = 0;
    let mut min_dist_sq = f64::MAX;
    for (j, centroid) in centroids.iter().enumerate() {
        let dist_sq = distance_sq(point, centroid);
        if dist_sq < min_dist_sq {
            min_dist_sq = dist_sq;
            best_cluster = j;
        }
    }
    (best_cluster, min_dist_sq)
}

fn distance_sq(a: ArrayView1<'_, f64>, b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    fn two_blobs() -> ndarray::Array2<f64> {
        array![
            [0.0, 0.1],
            [0.1, 0.0],
            [0.05, 0.05],
            [5.0, 5.1],
            [5.1, 5.0],
            [5.05, 5.05],
        ]
    }

    #[test]
    fn separates_two_blobs() {
        let data = two_blobs();
        let mut rng = StdRng::seed_from_u64(42);
        let labels = KMeans::default().fit(data.view(), 2, &mut rng).unwrap();

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn inertia_drops_with_more_clusters() {
        let data = two_blobs();
        let kmeans = KMeans::default();
        let one = kmeans.run(data.view(), 1, &mut StdRng::seed_from_u64(1));
        let two = kmeans.run(data.view(), 2, &mut StdRng::seed_from_u64(1));
        assert!(two.inertia < one.inertia);
    }

    #[test]
    fn k_is_clamped_to_row_count() {
        let data = array![[1.0], [2.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let fit = KMeans::default().run(data.view(), 9, &mut rng);
        assert_eq!(fit.centroids.len(), 2);
        assert_eq!(fit.assignments.len(), 2);
        assert!(fit.inertia.abs() < f64::EPSILON);
    }

    #[test]
    fn zero_clusters_is_rejected() {
        let data = two_blobs();
        let mut rng = StdRng::seed_from_u64(0);
        let error = KMeans::default().fit(data.view(), 0, &mut rng).unwrap_err();
        assert!(matches!(error, SelectionError::InvalidParameter(_)));
    }
}
