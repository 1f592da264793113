//! File-in, JSON-out batch driver behind the `select-monitors` binary.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::clustering::ClusterPartitioner;
use crate::config::SelectionConfig;
use crate::matrix::SimilarityMatrix;
use crate::robustness::{
    DistanceTable, ProximityCurve, RobustnessReport, evaluate_robustness, proximity_curve,
};
use crate::selection::{SelectionMethod, SelectionParams, Selector};

/// On-disk similarity matrix. `null` marks a missing value.
#[derive(Debug, Clone, Deserialize)]
struct SimilarityFile {
    items: Vec<Value>,
    #[serde(default)]
    columns: Option<Vec<Value>>,
    values: Vec<Vec<Option<f64>>>,
}

/// What to run and where the inputs live.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub similarity: PathBuf,
    pub method: String,
    pub params: SelectionParams,
    /// Observer → item distance table used for proximity scoring.
    pub distances: Option<PathBuf>,
    /// Repeat the selection this many times and report each run.
    pub runs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionReport {
    pub method: SelectionMethod,
    pub order: Vec<String>,
    pub suggested_cluster_counts: Option<Vec<usize>>,
    pub proximity: Option<ProximityCurve>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DriverOutput {
    Selection(SelectionReport),
    Robustness(RobustnessReport<String>),
}

/// Load a similarity matrix from its JSON file.
///
/// Numeric item ids are kept as their decimal text.
///
/// # Errors
/// Fails when the file cannot be read or parsed, or the matrix is malformed.
pub fn load_similarity_matrix(path: &Path) -> Result<SimilarityMatrix<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read similarity file {}", path.display()))?;
    let file: SimilarityFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse similarity file {}", path.display()))?;

    let items = item_keys(&file.items)?;
    let matrix = match file.columns {
        Some(columns) => {
            let columns = item_keys(&columns)?;
            let grid = dense_grid(&file.values, columns.len())?;
            SimilarityMatrix::from_labeled(items, columns, grid)?
        }
        None => SimilarityMatrix::from_rows(items, &file.values)?,
    };

    info!(
        path = %path.display(),
        item_count = matrix.len(),
        "loaded similarity matrix"
    );
    Ok(matrix)
}

/// Load an observer → item distance table from a nested JSON object.
///
/// # Errors
/// Fails when the file cannot be read or parsed.
pub fn load_distance_table(path: &Path) -> Result<DistanceTable<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read distance table {}", path.display()))?;
    let table: DistanceTable<String> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse distance table {}", path.display()))?;
    info!(
        path = %path.display(),
        observer_count = table.len(),
        "loaded distance table"
    );
    Ok(table)
}

/// Run one request end to end.
///
/// # Errors
/// Fails on unreadable inputs, an unknown method, missing parameters or a
/// selection error.
pub fn run(request: &RunRequest, config: &SelectionConfig) -> Result<DriverOutput> {
    let method = SelectionMethod::from_name(&request.method, &request.params)?;
    let matrix = load_similarity_matrix(&request.similarity)?;
    let distances = request
        .distances
        .as_deref()
        .map(load_distance_table)
        .transpose()?;

    let selector = Selector::new(ClusterPartitioner::new(config.clustering.clone()));
    let mut rng = config.rng();

    if let Some(runs) = request.runs {
        let Some(distances) = distances else {
            bail!("repeated runs need a distance table (--distances)");
        };
        let report = evaluate_robustness(
            &selector,
            &matrix,
            &method,
            &distances,
            config.proximity_max_distance,
            runs,
            &mut rng,
        )
        .context("robustness evaluation failed")?;
        return Ok(DriverOutput::Robustness(report));
    }

    let selection = selector
        .select(&matrix, &method, &mut rng)
        .with_context(|| format!("{} selection failed", method.name()))?;
    let proximity = distances
        .as_ref()
        .map(|table| proximity_curve(&selection.order, table, config.proximity_max_distance));

    Ok(DriverOutput::Selection(SelectionReport {
        method: selection.method,
        order: selection.order,
        suggested_cluster_counts: selection
            .eigengap
            .map(|report| report.suggested_cluster_counts),
        proximity,
    }))
}

/// Write `output` as pretty JSON to `path`, or to stdout when absent.
///
/// # Errors
/// Fails when serialization or the write fails.
pub fn write_output(output: &DriverOutput, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(output).context("failed to serialize output")?;
    match path {
        Some(path) => fs::write(path, json + "\n")
            .with_context(|| format!("failed to write output to {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("failed to write output to stdout")?;
        }
    }
    Ok(())
}

fn item_keys(values: &[Value]) -> Result<Vec<String>> {
    values
        .iter()
        .map(|value| match value {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            other => bail!("item ids must be strings or numbers, got {other}"),
        })
        .collect()
}

fn dense_grid(rows: &[Vec<Option<f64>>], width: usize) -> Result<Array2<f64>> {
    if let Some(position) = rows.iter().position(|row| row.len() != width) {
        bail!(
            "row {position} has {} values, expected {width}",
            rows[position].len()
        );
    }
    Ok(Array2::from_shape_fn((rows.len(), width), |(i, j)| {
        rows[i][j].unwrap_or(f64::NAN)
    }))
}
