//! Partitioning items into clusters from their similarity rows.

pub mod affinity;
pub mod eigengap;
pub mod kmeans;
mod partition;
pub mod spectral;
pub mod traits;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use self::eigengap::EigengapReport;
pub use self::kmeans::KMeans;
pub use self::partition::ClusterPartition;
pub use self::spectral::{NalgebraEigenSolver, SpectralClustering};
pub use self::traits::{ClusterFit, EigenDecomposition, EigenSolver};

use crate::error::{Result, SelectionError};
use crate::matrix::{ItemId, SimilarityMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringMethod {
    KMeans,
    Spectral,
}

impl ClusteringMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KMeans => "kmeans",
            Self::Spectral => "spectral",
        }
    }
}

impl fmt::Display for ClusteringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusteringMethod {
    type Err = SelectionError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kmeans" | "k-means" => Ok(Self::KMeans),
            "spectral" | "spectralclustering" => Ok(Self::Spectral),
            _ => Err(SelectionError::InvalidMethod(format!(
                "unknown clustering method {value:?}"
            ))),
        }
    }
}

/// Tunables for the clustering backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSettings {
    /// Neighbour rank used for the local affinity scale.
    pub affinity_neighbors: usize,
    /// How many eigengap suggestions to report.
    pub eigengap_top_k: usize,
    /// Whether the spectral path computes the eigengap report.
    pub report_eigengap: bool,
    pub kmeans_max_iterations: usize,
    pub kmeans_restarts: usize,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            affinity_neighbors: 10,
            eigengap_top_k: 5,
            report_eigengap: true,
            kmeans_max_iterations: 300,
            kmeans_restarts: 10,
        }
    }
}

impl ClusteringSettings {
    #[must_use]
    pub fn kmeans(&self) -> KMeans {
        KMeans::new(self.kmeans_max_iterations, self.kmeans_restarts)
    }
}

/// A partition plus, for the spectral path, the eigengap suggestion.
///
/// The suggestion is informational; the requested cluster count is what the
/// partition was built with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionReport<K> {
    pub partition: ClusterPartition<K>,
    pub eigengap: Option<EigengapReport>,
}

/// Partitions a similarity matrix with injected clustering and eigen backends.
#[derive(Clone)]
pub struct ClusterPartitioner {
    settings: ClusteringSettings,
    kmeans: Arc<dyn ClusterFit>,
    spectral: Arc<dyn ClusterFit>,
    solver: Arc<dyn EigenSolver>,
}

impl fmt::Debug for ClusterPartitioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterPartitioner")
            .field("settings", &self.settings)
            .field("kmeans", &self.kmeans.name())
            .field("spectral", &self.spectral.name())
            .finish_non_exhaustive()
    }
}

impl Default for ClusterPartitioner {
    fn default() -> Self {
        Self::new(ClusteringSettings::default())
    }
}

impl ClusterPartitioner {
    /// Default backends: Lloyd k-means and nalgebra-backed spectral clustering.
    #[must_use]
    pub fn new(settings: ClusteringSettings) -> Self {
        let kmeans = settings.kmeans();
        let solver: Arc<dyn EigenSolver> = Arc::new(NalgebraEigenSolver);
        Self {
            kmeans: Arc::new(kmeans),
            spectral: Arc::new(SpectralClustering::new(Arc::clone(&solver), kmeans)),
            solver,
            settings,
        }
    }

    #[must_use]
    pub fn with_backends(
        settings: ClusteringSettings,
        kmeans: Arc<dyn ClusterFit>,
        spectral: Arc<dyn ClusterFit>,
        solver: Arc<dyn EigenSolver>,
    ) -> Self {
        Self {
            settings,
            kmeans,
            spectral,
            solver,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ClusteringSettings {
        &self.settings
    }

    /// Partition every item of `matrix` into at most `nb_clusters` groups.
    ///
    /// Missing similarities become `0.0` before clustering. A cluster count
    /// above the item count is clamped.
    ///
    /// # Errors
    /// [`SelectionError::InvalidParameter`] for `nb_clusters == 0`,
    /// [`SelectionError::Clustering`] when a backend fails or returns the wrong
    /// number of labels.
    pub fn partition<K: ItemId>(
        &self,
        matrix: &SimilarityMatrix<K>,
        method: ClusteringMethod,
        nb_clusters: usize,
        rng: &mut dyn RngCore,
    ) -> Result<PartitionReport<K>> {
        if nb_clusters == 0 {
            return Err(SelectionError::InvalidParameter(
                "nb_clusters must be at least 1".to_string(),
            ));
        }
        if matrix.is_empty() {
            return Ok(PartitionReport {
                partition: ClusterPartition::default(),
                eigengap: None,
            });
        }

        let n = matrix.len();
        let k = if nb_clusters > n {
            tracing::warn!(
                nb_clusters,
                item_count = n,
                "more clusters requested than items, clamping"
            );
            n
        } else {
            nb_clusters
        };

        let grid = matrix.to_dense_grid();
        let (labels, eigengap) = match method {
            ClusteringMethod::KMeans => (self.kmeans.fit(grid.view(), k, rng)?, None),
            ClusteringMethod::Spectral => {
                let affinity =
                    affinity::local_scaling_affinity(grid.view(), self.settings.affinity_neighbors);
                let eigengap = if self.settings.report_eigengap {
                    let report = eigengap::eigengap_report(
                        affinity.view(),
                        self.solver.as_ref(),
                        self.settings.eigengap_top_k,
                    )?;
                    tracing::info!(
                        suggested = ?report.suggested_cluster_counts,
                        nb_clusters = k,
                        "eigengap suggestion for spectral clustering"
                    );
                    Some(report)
                } else {
                    None
                };
                (self.spectral.fit(affinity.view(), k, rng)?, eigengap)
            }
        };

        let partition = ClusterPartition::from_labels(matrix.items(), &labels)?;
        tracing::info!(
            %method,
            nb_clusters = k,
            cluster_count = partition.cluster_count(),
            item_count = n,
            "partitioned similarity matrix"
        );

        Ok(PartitionReport {
            partition,
            eigengap,
        })
    }

    /// K-means inertia for every cluster count from 1 to `max_k` (elbow method).
    ///
    /// Counts above the item count are skipped.
    #[must_use]
    pub fn distortion_curve<K: ItemId>(
        &self,
        matrix: &SimilarityMatrix<K>,
        max_k: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<(usize, f64)> {
        let grid = matrix.to_dense_grid();
        let kmeans = self.settings.kmeans();
        (1..=max_k.min(matrix.len()))
            .map(|k| (k, kmeans.run(grid.view(), k, rng).inertia))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use ndarray::ArrayView2;
    use rand::{SeedableRng, rngs::StdRng};
    use rstest::rstest;

    /// Labels rows by parity of their index.
    struct ParityFit;

    impl ClusterFit for ParityFit {
        fn fit(
            &self,
            data: ArrayView2<'_, f64>,
            _k: usize,
            _rng: &mut dyn RngCore,
        ) -> Result<Vec<usize>> {
            Ok((0..data.nrows()).map(|i| i % 2).collect())
        }

        fn name(&self) -> &'static str {
            "parity"
        }
    }

    struct ShortFit;

    impl ClusterFit for ShortFit {
        fn fit(
            &self,
            _data: ArrayView2<'_, f64>,
            _k: usize,
            _rng: &mut dyn RngCore,
        ) -> Result<Vec<usize>> {
            Ok(vec![0])
        }

        fn name(&self) -> &'static str {
            "short"
        }
    }

    fn blocks() -> SimilarityMatrix<String> {
        let items: Vec<String> = (0..8).map(|i| format!("m{i}")).collect();
        let mut pairs = Vec::new();
        for i in 0..8 {
            for j in (i + 1)..8 {
                let same = (i < 4) == (j < 4);
                pairs.push((items[i].clone(), items[j].clone(), if same { 0.9 } else { 0.05 }));
            }
        }
        SimilarityMatrix::from_pairs(items, pairs).unwrap()
    }

    fn assert_covers(partition: &ClusterPartition<String>, matrix: &SimilarityMatrix<String>) {
        let mut seen = HashSet::new();
        for (_, members) in partition.iter() {
            for member in members {
                assert!(seen.insert(member.clone()), "{member} appears twice");
            }
        }
        let expected: HashSet<String> = matrix.items().iter().cloned().collect();
        assert_eq!(seen, expected);
    }

    #[rstest]
    #[case("kmeans", ClusteringMethod::KMeans)]
    #[case("Kmeans", ClusteringMethod::KMeans)]
    #[case("spectral", ClusteringMethod::Spectral)]
    #[case("SpectralClustering", ClusteringMethod::Spectral)]
    fn parses_method_names(#[case] name: &str, #[case] expected: ClusteringMethod) {
        assert_eq!(name.parse::<ClusteringMethod>().unwrap(), expected);
    }

    #[test]
    fn unknown_method_is_invalid() {
        let error = "dbscan".parse::<ClusteringMethod>().unwrap_err();
        assert!(matches!(error, SelectionError::InvalidMethod(_)));
    }

    #[rstest]
    #[case(ClusteringMethod::KMeans)]
    #[case(ClusteringMethod::Spectral)]
    fn partition_covers_every_item_once(#[case] method: ClusteringMethod) {
        let matrix = blocks();
        let partitioner = ClusterPartitioner::default();
        let report = partitioner
            .partition(&matrix, method, 2, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_covers(&report.partition, &matrix);
        assert_eq!(report.partition.cluster_count(), 2);
        assert_eq!(report.eigengap.is_some(), method == ClusteringMethod::Spectral);
    }

    #[test]
    fn same_seed_same_partition() {
        let matrix = blocks();
        let partitioner = ClusterPartitioner::default();
        let first = partitioner
            .partition(&matrix, ClusteringMethod::Spectral, 3, &mut StdRng::seed_from_u64(21))
            .unwrap();
        let second = partitioner
            .partition(&matrix, ClusteringMethod::Spectral, 3, &mut StdRng::seed_from_u64(21))
            .unwrap();
        assert_eq!(first.partition, second.partition);
    }

    #[test]
    fn kmeans_recovers_the_blocks() {
        let matrix = blocks();
        let report = ClusterPartitioner::default()
            .partition(&matrix, ClusteringMethod::KMeans, 2, &mut StdRng::seed_from_u64(5))
            .unwrap();
        for (_, members) in report.partition.iter() {
            let low = members.iter().filter(|m| m[1..].parse::<usize>().unwrap() < 4).count();
            assert!(low == 0 || low == members.len());
        }
    }

    #[test]
    fn injected_backend_labels_are_used() {
        let matrix = blocks();
        let partitioner = ClusterPartitioner::with_backends(
            ClusteringSettings::default(),
            Arc::new(ParityFit),
            Arc::new(ParityFit),
            Arc::new(NalgebraEigenSolver),
        );
        let report = partitioner
            .partition(&matrix, ClusteringMethod::KMeans, 2, &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(
            report.partition.members(0).unwrap(),
            &["m0", "m2", "m4", "m6"].map(String::from)
        );
    }

    #[test]
    fn eigengap_report_accompanies_spectral_partition() {
        let matrix = blocks();
        let report = ClusterPartitioner::default()
            .partition(&matrix, ClusteringMethod::Spectral, 3, &mut StdRng::seed_from_u64(1))
            .unwrap();
        let eigengap = report.eigengap.unwrap();
        assert_eq!(eigengap.eigenvalues.len(), 8);
        assert_eq!(eigengap.suggested_cluster_counts.len(), 5);
        assert!(eigengap.eigenvalues[0].abs() < 1e-9);
        assert!(report.partition.cluster_count() <= 3);
        assert_covers(&report.partition, &matrix);
    }

    #[test]
    fn eigengap_can_be_switched_off() {
        let settings = ClusteringSettings {
            report_eigengap: false,
            ..ClusteringSettings::default()
        };
        let report = ClusterPartitioner::new(settings)
            .partition(&blocks(), ClusteringMethod::Spectral, 2, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(report.eigengap.is_none());
    }

    #[test]
    fn wrong_label_count_is_a_clustering_error() {
        let matrix = blocks();
        let partitioner = ClusterPartitioner::with_backends(
            ClusteringSettings::default(),
            Arc::new(ShortFit),
            Arc::new(ShortFit),
            Arc::new(NalgebraEigenSolver),
        );
        let error = partitioner
            .partition(&matrix, ClusteringMethod::KMeans, 2, &mut StdRng::seed_from_u64(0))
            .unwrap_err();
        assert!(matches!(error, SelectionError::Clustering(_)));
    }

    #[test]
    fn zero_clusters_is_rejected_and_excess_is_clamped() {
        let matrix = blocks();
        let partitioner = ClusterPartitioner::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            partitioner.partition(&matrix, ClusteringMethod::KMeans, 0, &mut rng),
            Err(SelectionError::InvalidParameter(_))
        ));
        let report = partitioner
            .partition(&matrix, ClusteringMethod::KMeans, 50, &mut rng)
            .unwrap();
        assert!(report.partition.cluster_count() <= 8);
        assert_covers(&report.partition, &matrix);
    }

    #[test]
    fn distortion_curve_is_non_increasing_for_blocks() {
        let matrix = blocks();
        let mut rng = StdRng::seed_from_u64(2);
        let curve = ClusterPartitioner::default().distortion_curve(&matrix, 4, &mut rng);
        assert_eq!(curve.len(), 4);
        assert_eq!(curve[0].0, 1);
        assert!(curve[1].1 < curve[0].1);
    }
}
