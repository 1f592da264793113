//! Proximity evaluation of a selection order and its stability across runs.
//!
//! An observer's proximity is its distance (in hops) to the closest selected
//! item. Walking the order one item at a time gives a curve of the summed
//! proximity over all observers, which only ever goes down.

use std::collections::{BTreeSet, HashMap};

use rand::RngCore;
use serde::Serialize;

use crate::error::{Result, SelectionError};
use crate::matrix::{ItemId, SimilarityMatrix};
use crate::selection::{SelectionMethod, Selector};

/// Observer → item → distance. Pairs absent from the table are never closer
/// than the configured maximum.
pub type DistanceTable<K> = HashMap<K, HashMap<K, f64>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityCurve {
    /// Summed observer proximity after each selected item.
    pub totals: Vec<f64>,
    /// `totals` divided by the starting total (observers × max distance).
    pub normalized: Vec<f64>,
}

/// Build the proximity curve of `order` against `distances`.
#[must_use]
pub fn proximity_curve<K: ItemId>(
    order: &[K],
    distances: &DistanceTable<K>,
    max_distance: f64,
) -> ProximityCurve {
    let observers: Vec<&HashMap<K, f64>> = distances.values().collect();
    let mut best = vec![max_distance; observers.len()];
    let initial = max_distance * observers.len() as f64;

    let mut totals = Vec::with_capacity(order.len());
    for item in order {
        for (proximity, reachable) in best.iter_mut().zip(&observers) {
            if let Some(&distance) = reachable.get(item) {
                if distance < *proximity {
                    *proximity = distance;
                }
            }
        }
        totals.push(best.iter().sum::<f64>());
    }

    let normalized = if initial > 0.0 {
        totals.iter().map(|total| total / initial).collect()
    } else {
        vec![0.0; totals.len()]
    };

    ProximityCurve { totals, normalized }
}

/// One length picked out of a set of runs, with the first run that has it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunPick {
    pub run: usize,
    pub length: usize,
}

/// Shortest, longest and median-nearest order lengths over repeated runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunLengthSummary {
    pub shortest: RunPick,
    pub longest: RunPick,
    pub median: RunPick,
}

/// Summarize run lengths by their distinct values.
///
/// The median is taken over the distinct lengths (truncated for an even count)
/// and then snapped to the nearest length that actually occurred, preferring
/// the shorter one on a tie. Returns `None` for no runs.
#[must_use]
pub fn summarize_lengths(lengths: &[usize]) -> Option<RunLengthSummary> {
    let distinct: Vec<usize> = lengths
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let (&shortest, &longest) = (distinct.first()?, distinct.last()?);

    let middle = distinct.len() / 2;
    let median = if distinct.len() % 2 == 1 {
        distinct[middle]
    } else {
        (distinct[middle - 1] + distinct[middle]) / 2
    };
    let median = distinct
        .iter()
        .copied()
        .min_by_key(|length| length.abs_diff(median))
        .unwrap_or(median);

    let pick = |length: usize| RunPick {
        run: lengths.iter().position(|&l| l == length).unwrap_or_default(),
        length,
    };
    Some(RunLengthSummary {
        shortest: pick(shortest),
        longest: pick(longest),
        median: pick(median),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobustnessRun<K> {
    pub order: Vec<K>,
    pub proximity: ProximityCurve,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobustnessReport<K> {
    pub method: SelectionMethod,
    pub runs: Vec<RobustnessRun<K>>,
    pub summary: Option<RunLengthSummary>,
}

/// Repeat a selection `runs` times with successive draws from `rng` and score
/// each order by its proximity curve.
///
/// # Errors
/// [`SelectionError::InvalidParameter`] for zero runs; otherwise propagates
/// selection errors.
pub fn evaluate_robustness<K: ItemId>(
    selector: &Selector,
    matrix: &SimilarityMatrix<K>,
    method: &SelectionMethod,
    distances: &DistanceTable<K>,
    max_distance: f64,
    runs: usize,
    rng: &mut dyn RngCore,
) -> Result<RobustnessReport<K>> {
    if runs == 0 {
        return Err(SelectionError::InvalidParameter(
            "robustness evaluation needs at least one run".to_string(),
        ));
    }

    let mut results = Vec::with_capacity(runs);
    for run in 0..runs {
        let selection = selector.select(matrix, method, rng)?;
        let proximity = proximity_curve(&selection.order, distances, max_distance);
        tracing::debug!(
            run,
            selected = selection.order.len(),
            final_proximity = proximity.normalized.last().copied(),
            "robustness run finished"
        );
        results.push(RobustnessRun {
            order: selection.order,
            proximity,
        });
    }

    let lengths: Vec<usize> = results.iter().map(|run| run.order.len()).collect();
    let summary = summarize_lengths(&lengths);
    tracing::info!(
        method = method.name(),
        runs,
        observer_count = distances.len(),
        ?summary,
        "robustness evaluation finished"
    );

    Ok(RobustnessReport {
        method: *method,
        runs: results,
        summary,
    })
}
