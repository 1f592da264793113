//! Selection strategies and the single entry point that dispatches between them.

pub mod aggregate;
pub mod greedy;
pub mod normalize;
pub mod round_robin;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use self::aggregate::{AggregateOutcome, Direction, aggregate};
pub use self::greedy::{greedy_max_elimination, greedy_min_diverse};
pub use self::normalize::rank_normalize_row;
pub use self::round_robin::{SampleOutcome, sample_round_robin};

use crate::clustering::{ClusterPartitioner, ClusteringMethod, EigengapReport};
use crate::error::{Result, SelectionError};
use crate::matrix::{ItemId, SimilarityMatrix};

pub const GREEDY_MAX_ELIMINATION: &str = "greedy-max-elimination";
pub const GREEDY_MIN_DIVERSE: &str = "greedy-min-diverse";
pub const CLUSTER_SAMPLE: &str = "cluster-sample";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum SelectionMethod {
    GreedyMaxElimination {
        rank_normalize: bool,
    },
    GreedyMinDiverse {
        nb_items: Option<usize>,
    },
    ClusterSample {
        clustering: ClusteringMethod,
        nb_clusters: usize,
        nb_items: Option<usize>,
    },
}

/// Loose parameters as they arrive from a CLI or a config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    pub nb_items: Option<usize>,
    pub clustering: Option<ClusteringMethod>,
    pub nb_clusters: Option<usize>,
    pub rank_normalize: bool,
}

impl SelectionMethod {
    /// Resolve a method name plus loose parameters into a concrete method.
    ///
    /// # Errors
    /// [`SelectionError::InvalidMethod`] for an unknown name,
    /// [`SelectionError::InvalidParameter`] when `cluster-sample` lacks its
    /// clustering method or cluster count.
    pub fn from_name(name: &str, params: &SelectionParams) -> Result<Self> {
        match name.trim() {
            GREEDY_MAX_ELIMINATION => Ok(Self::GreedyMaxElimination {
                rank_normalize: params.rank_normalize,
            }),
            GREEDY_MIN_DIVERSE => Ok(Self::GreedyMinDiverse {
                nb_items: params.nb_items,
            }),
            CLUSTER_SAMPLE => {
                let clustering = params.clustering.ok_or_else(|| {
                    SelectionError::InvalidParameter(
                        "cluster-sample needs a clustering method".to_string(),
                    )
                })?;
                let nb_clusters = params.nb_clusters.ok_or_else(|| {
                    SelectionError::InvalidParameter(
                        "cluster-sample needs a cluster count".to_string(),
                    )
                })?;
                Ok(Self::ClusterSample {
                    clustering,
                    nb_clusters,
                    nb_items: params.nb_items,
                })
            }
            other => Err(SelectionError::InvalidMethod(format!(
                "unknown selection method {other:?}, expected one of \
                 {GREEDY_MAX_ELIMINATION}, {GREEDY_MIN_DIVERSE}, {CLUSTER_SAMPLE}"
            ))),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GreedyMaxElimination { .. } => GREEDY_MAX_ELIMINATION,
            Self::GreedyMinDiverse { .. } => GREEDY_MIN_DIVERSE,
            Self::ClusterSample { .. } => CLUSTER_SAMPLE,
        }
    }
}

/// An ordered selection and the method that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection<K> {
    pub method: SelectionMethod,
    pub order: Vec<K>,
    /// Present for cluster sampling over a spectral partition.
    pub eigengap: Option<EigengapReport>,
}

#[derive(Debug, Clone, Default)]
pub struct Selector {
    partitioner: ClusterPartitioner,
}

impl Selector {
    #[must_use]
    pub fn new(partitioner: ClusterPartitioner) -> Self {
        Self { partitioner }
    }

    #[must_use]
    pub fn partitioner(&self) -> &ClusterPartitioner {
        &self.partitioner
    }

    /// Run `method` over `matrix`.
    ///
    /// # Errors
    /// Propagates scoring and clustering errors.
    pub fn select<K: ItemId>(
        &self,
        matrix: &SimilarityMatrix<K>,
        method: &SelectionMethod,
        rng: &mut dyn RngCore,
    ) -> Result<Selection<K>> {
        let (order, eigengap) = match *method {
            SelectionMethod::GreedyMaxElimination { rank_normalize } => {
                (greedy_max_elimination(matrix, rank_normalize, rng)?, None)
            }
            SelectionMethod::GreedyMinDiverse { nb_items } => {
                (greedy_min_diverse(matrix, nb_items, rng)?, None)
            }
            SelectionMethod::ClusterSample {
                clustering,
                nb_clusters,
                nb_items,
            } => {
                let report = self
                    .partitioner
                    .partition(matrix, clustering, nb_clusters, rng)?;
                // the drained partition is not needed past sampling
                let sampled = sample_round_robin(report.partition, nb_items, rng);
                (sampled.order, report.eigengap)
            }
        };

        tracing::info!(
            method = method.name(),
            item_count = matrix.len(),
            selected = order.len(),
            "selection finished"
        );

        Ok(Selection {
            method: *method,
            order,
            eigengap,
        })
    }
}
