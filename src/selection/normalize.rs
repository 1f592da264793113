//! Inverse-rank row weighting.

/// Rewrite a row so that its r-th largest value (1-based) is divided by r.
///
/// Values keep their original positions. Missing values (NaN) sort last and
/// stay missing; equal values keep their left-to-right order when ranked.
///
/// `[0.5, 0.3, 0.4]` becomes `[0.5, 0.1, 0.2]`.
#[must_use]
pub fn rank_normalize_row(row: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..row.len()).collect();
    order.sort_by(|&a, &b| match (row[a].is_nan(), row[b].is_nan()) {
        (false, false) => row[b].total_cmp(&row[a]),
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (true, true) => std::cmp::Ordering::Equal,
    });

    let mut normalized = vec![f64::NAN; row.len()];
    for (rank, &position) in order.iter().enumerate() {
        normalized[position] = row[position] / (rank + 1) as f64;
    }
    normalized
}
