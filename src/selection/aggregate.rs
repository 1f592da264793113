//! Aggregate similarity scoring.
//!
//! Every selector reduces to "score each candidate row by the sum of its
//! similarities to a column set, then take the extreme". The column set depends
//! on the direction when a candidate pool is given:
//!
//! - [`Direction::Max`]: columns are the pool itself (similarity to the other pool members).
//! - [`Direction::Min`]: columns are the complement of the pool (cross-similarity).
//!
//! Self-similarity and missing cells never contribute to a sum.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use super::normalize::rank_normalize_row;
use crate::error::{Result, SelectionError};
use crate::matrix::{ItemId, SimilarityMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Max,
    Min,
}

/// Winner of an aggregate pass plus the score of every candidate, in matrix order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome<K> {
    pub best: K,
    pub scores: Vec<(K, f64)>,
    /// True when every sum was zero and `best` was drawn at random.
    pub degenerate: bool,
}

/// Index-level result shared by the selectors.
#[derive(Debug, Clone)]
pub(crate) struct IndexedAggregate {
    pub(crate) best: usize,
    pub(crate) candidates: Vec<usize>,
    pub(crate) scores: Vec<f64>,
    pub(crate) degenerate: bool,
}

/// Score `target_pool` (or every item) and return the extreme candidate.
///
/// # Errors
/// [`SelectionError::UnknownItem`] when the pool names an id outside the matrix,
/// [`SelectionError::InvalidParameter`] when the candidate set is empty.
pub fn aggregate<K: ItemId>(
    matrix: &SimilarityMatrix<K>,
    target_pool: Option<&[K]>,
    direction: Direction,
    rank_normalize: bool,
    rng: &mut dyn RngCore,
) -> Result<AggregateOutcome<K>> {
    let pool = target_pool.map(|items| matrix.indices_of(items)).transpose()?;
    let outcome = aggregate_indices(matrix, pool.as_deref(), direction, rank_normalize, rng)?;

    Ok(AggregateOutcome {
        best: matrix.item(outcome.best).clone(),
        scores: outcome
            .candidates
            .iter()
            .zip(&outcome.scores)
            .map(|(&i, &score)| (matrix.item(i).clone(), score))
            .collect(),
        degenerate: outcome.degenerate,
    })
}

pub(crate) fn aggregate_indices<K: ItemId>(
    matrix: &SimilarityMatrix<K>,
    pool: Option<&[usize]>,
    direction: Direction,
    rank_normalize: bool,
    rng: &mut dyn RngCore,
) -> Result<IndexedAggregate> {
    let n = matrix.len();
    let (candidates, columns) = match pool {
        None => ((0..n).collect::<Vec<_>>(), vec![true; n]),
        Some(pool) => {
            let mut in_pool = vec![false; n];
            for &i in pool {
                in_pool[i] = true;
            }
            let candidates: Vec<usize> = (0..n).filter(|&i| in_pool[i]).collect();
            let columns = match direction {
                Direction::Max => in_pool,
                Direction::Min => in_pool.iter().map(|member| !member).collect(),
            };
            (candidates, columns)
        }
    };

    if candidates.is_empty() {
        return Err(SelectionError::InvalidParameter(
            "aggregate scoring needs at least one candidate".to_string(),
        ));
    }

    let scores: Vec<f64> = candidates
        .iter()
        .map(|&i| {
            let row: Vec<f64> = (0..n)
                .filter(|&j| columns[j])
                .map(|j| matrix.get(i, j).unwrap_or(f64::NAN))
                .collect();
            let row = if rank_normalize {
                rank_normalize_row(&row)
            } else {
                row
            };
            row.iter().filter(|v| !v.is_nan()).sum()
        })
        .collect();

    let degenerate = scores.iter().all(|&score| score == 0.0);
    let position = if degenerate {
        let pick = rng.random_range(0..candidates.len());
        tracing::debug!(
            candidate_count = candidates.len(),
            ?direction,
            "all aggregate sums are zero, picking a random candidate"
        );
        pick
    } else {
        extreme_position(&scores, direction)
    };

    Ok(IndexedAggregate {
        best: candidates[position],
        candidates,
        scores,
        degenerate,
    })
}

/// First position holding the largest (Max) or smallest (Min) score.
fn extreme_position(scores: &[f64], direction: Direction) -> usize {
    let mut best = 0;
    for (position, &score) in scores.iter().enumerate().skip(1) {
        let better = match direction {
            Direction::Max => score > scores[best],
            Direction::Min => score < scores[best],
        };
        if better {
            best = position;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn five_items() -> SimilarityMatrix<&'static str> {
        SimilarityMatrix::from_pairs(
            vec!["a", "b", "c", "d", "e"],
            [
                ("a", "b", 100.0),
                ("a", "c", 0.1),
                ("a", "d", 0.2),
                ("a", "e", 0.3),
                ("b", "c", 0.4),
                ("b", "d", 0.5),
                ("b", "e", 0.6),
                ("c", "d", 0.7),
                ("c", "e", 0.8),
                ("d", "e", 0.9),
            ],
        )
        .unwrap()
    }

    fn score_of(outcome: &AggregateOutcome<&'static str>, item: &str) -> f64 {
        outcome
            .scores
            .iter()
            .find(|(k, _)| *k == item)
            .map(|(_, s)| *s)
            .unwrap()
    }

    #[test]
    fn min_with_pool_sums_only_against_the_complement() {
        let matrix = five_items();
        let mut rng = StdRng::seed_from_u64(7);
        let outcome =
            aggregate(&matrix, Some(&["a", "b"]), Direction::Min, false, &mut rng).unwrap();

        // the a-b similarity of 100 never enters either sum
        assert!((score_of(&outcome, "a") - 0.6).abs() < 1e-12);
        assert!((score_of(&outcome, "b") - 1.5).abs() < 1e-12);
        assert_eq!(outcome.scores.len(), 2);
        assert_eq!(outcome.best, "a");
        assert!(!outcome.degenerate);
    }

    #[test]
    fn max_with_pool_sums_only_inside_the_pool() {
        let matrix = five_items();
        let mut rng = StdRng::seed_from_u64(7);
        let outcome = aggregate(
            &matrix,
            Some(&["c", "d", "e"]),
            Direction::Max,
            false,
            &mut rng,
        )
        .unwrap();

        assert!((score_of(&outcome, "c") - 1.5).abs() < 1e-12);
        assert!((score_of(&outcome, "d") - 1.6).abs() < 1e-12);
        assert!((score_of(&outcome, "e") - 1.7).abs() < 1e-12);
        assert_eq!(outcome.best, "e");
    }

    #[test]
    fn without_pool_every_row_is_scored_against_everything_but_itself() {
        let matrix = five_items();
        let mut rng = StdRng::seed_from_u64(7);
        let outcome = aggregate(&matrix, None, Direction::Min, false, &mut rng).unwrap();

        assert_eq!(outcome.scores.len(), 5);
        assert!((score_of(&outcome, "c") - 2.0).abs() < 1e-12);
        assert_eq!(outcome.best, "c");
    }

    #[test]
    fn ties_go_to_the_earliest_candidate() {
        let matrix = SimilarityMatrix::from_pairs(
            vec!["x", "y", "z"],
            [("x", "y", 0.5), ("y", "z", 0.5), ("x", "z", 0.5)],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let max = aggregate(&matrix, None, Direction::Max, false, &mut rng).unwrap();
        let min = aggregate(&matrix, None, Direction::Min, false, &mut rng).unwrap();
        assert_eq!(max.best, "x");
        assert_eq!(min.best, "x");
    }

    #[test]
    fn all_zero_sums_fall_back_to_a_pool_member() {
        let matrix = SimilarityMatrix::from_pairs(
            vec!["a", "b", "c", "d"],
            [("a", "b", 0.0), ("c", "d", 0.8)],
        )
        .unwrap();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let outcome =
                aggregate(&matrix, Some(&["a", "b"]), Direction::Max, false, &mut rng).unwrap();
            assert!(outcome.degenerate);
            assert!(["a", "b"].contains(&outcome.best));
        }
    }

    #[test]
    fn degenerate_pick_is_reproducible_for_a_seed() {
        let matrix = SimilarityMatrix::from_pairs(vec![1, 2, 3, 4, 5, 6], Vec::new()).unwrap();
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            aggregate(&matrix, None, Direction::Max, false, &mut rng)
                .unwrap()
                .best
        };
        assert_eq!(pick(42), pick(42));
    }

    #[test]
    fn rank_normalization_damps_many_moderate_neighbours() {
        // "hub" has one standout neighbour, "crowd" has many moderate ones
        let matrix = SimilarityMatrix::from_pairs(
            vec!["hub", "crowd", "p", "q", "r"],
            [
                ("hub", "p", 0.9),
                ("crowd", "p", 0.4),
                ("crowd", "q", 0.4),
                ("crowd", "r", 0.4),
            ],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let raw = aggregate(&matrix, None, Direction::Max, false, &mut rng).unwrap();
        assert!(score_of(&raw, "crowd") > score_of(&raw, "hub"));

        let ranked = aggregate(&matrix, None, Direction::Max, true, &mut rng).unwrap();
        assert!((score_of(&ranked, "hub") - 0.9).abs() < 1e-12);
        assert!((score_of(&ranked, "crowd") - (0.4 + 0.2 + 0.4 / 3.0)).abs() < 1e-12);
        assert!(score_of(&ranked, "hub") > score_of(&ranked, "crowd"));
    }

    #[test]
    fn unknown_pool_member_is_rejected() {
        let matrix = five_items();
        let mut rng = StdRng::seed_from_u64(7);
        let error =
            aggregate(&matrix, Some(&["zz"]), Direction::Max, false, &mut rng).unwrap_err();
        assert!(matches!(error, SelectionError::UnknownItem(_)));
    }

    #[test]
    fn empty_pool_is_rejected() {
        let matrix = five_items();
        let mut rng = StdRng::seed_from_u64(7);
        let error = aggregate(&matrix, Some(&[]), Direction::Min, false, &mut rng).unwrap_err();
        assert!(matches!(error, SelectionError::InvalidParameter(_)));
    }
}
