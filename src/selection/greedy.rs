//! Greedy orderings built on repeated aggregate scoring.
//!
//! The two selectors restrict the candidate pool in opposite ways. Elimination
//! scores the unselected items against each other (`Max`, pool columns), while
//! the diverse construction scores the unselected items against the selected
//! ones (`Min`, complement columns). Both conventions are kept as they are.

use std::collections::VecDeque;

use rand::RngCore;

use super::aggregate::{Direction, aggregate_indices};
use crate::error::Result;
use crate::matrix::{ItemId, SimilarityMatrix};

/// Order every item by repeatedly eliminating the most aggregate-similar one.
///
/// Each winner is prepended, so the first eliminated (most central) item ends
/// last and the last survivor (least mutually similar) ends first.
///
/// # Errors
/// Propagates scoring errors; an empty matrix yields an empty order.
pub fn greedy_max_elimination<K: ItemId>(
    matrix: &SimilarityMatrix<K>,
    rank_normalize: bool,
    rng: &mut dyn RngCore,
) -> Result<Vec<K>> {
    let n = matrix.len();
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut order = VecDeque::with_capacity(n);

    while !remaining.is_empty() {
        let outcome = aggregate_indices(
            matrix,
            Some(&remaining),
            Direction::Max,
            rank_normalize,
            rng,
        )?;
        tracing::debug!(
            item = ?matrix.item(outcome.best),
            remaining = remaining.len(),
            degenerate = outcome.degenerate,
            "eliminated most similar item"
        );
        remaining.retain(|&i| i != outcome.best);
        order.push_front(matrix.item(outcome.best).clone());
    }

    Ok(order.into())
}

/// Build an order of up to `nb_items` items, each the least similar to the
/// items already chosen.
///
/// The first pick is the global minimum over the whole matrix. `nb_items`
/// defaults to every item and is capped at the item count.
///
/// # Errors
/// Propagates scoring errors; an empty matrix yields an empty order.
pub fn greedy_min_diverse<K: ItemId>(
    matrix: &SimilarityMatrix<K>,
    nb_items: Option<usize>,
    rng: &mut dyn RngCore,
) -> Result<Vec<K>> {
    let n = matrix.len();
    let target = nb_items.map_or(n, |k| k.min(n));
    let mut selected = vec![false; n];
    let mut order = Vec::with_capacity(target);

    for step in 0..target {
        let outcome = if step == 0 {
            aggregate_indices(matrix, None, Direction::Min, false, rng)?
        } else {
            let unselected: Vec<usize> = (0..n).filter(|&i| !selected[i]).collect();
            aggregate_indices(matrix, Some(&unselected), Direction::Min, false, rng)?
        };
        tracing::debug!(
            item = ?matrix.item(outcome.best),
            step,
            degenerate = outcome.degenerate,
            "selected least similar item"
        );
        selected[outcome.best] = true;
        order.push(matrix.item(outcome.best).clone());
    }

    Ok(order)
}
