//! Square similarity matrix keyed by item identifier.
//!
//! Missing entries are stored as NaN and surface as `None`; the diagonal is
//! always missing so self-similarity never leaks into an aggregate.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use ndarray::{Array2, ArrayView2};

use crate::error::{Result, SelectionError};

/// Identifier of a selectable item (a vantage point, an ASN, a monitor id).
pub trait ItemId: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> ItemId for T {}

#[derive(Debug, Clone)]
pub struct SimilarityMatrix<K> {
    items: Vec<K>,
    index: HashMap<K, usize>,
    values: Array2<f64>,
}

impl<K: ItemId> SimilarityMatrix<K> {
    /// Build a matrix whose rows and columns both follow `items`.
    ///
    /// NaN cells are kept as missing. The diagonal is overwritten with missing.
    ///
    /// # Errors
    /// [`SelectionError::MalformedMatrix`] when the grid is not square, does not
    /// match the item count, repeats an id or holds an infinite value.
    pub fn new(items: Vec<K>, mut values: Array2<f64>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows != cols {
            return Err(SelectionError::MalformedMatrix(format!(
                "grid is {rows}x{cols}, expected a square grid"
            )));
        }
        if rows != items.len() {
            return Err(SelectionError::MalformedMatrix(format!(
                "grid has {rows} rows but {} item ids were given",
                items.len()
            )));
        }
        if let Some(((i, j), value)) = values.indexed_iter().find(|(_, v)| v.is_infinite()) {
            return Err(SelectionError::MalformedMatrix(format!(
                "non-finite similarity {value} at ({i}, {j})"
            )));
        }

        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if index.insert(item.clone(), position).is_some() {
                return Err(SelectionError::MalformedMatrix(format!(
                    "duplicate item id {item:?}"
                )));
            }
        }

        values.diag_mut().fill(f64::NAN);

        let matrix = Self {
            items,
            index,
            values,
        };
        if !matrix.is_symmetric(1e-9) {
            tracing::warn!(
                item_count = matrix.len(),
                "similarity matrix is not symmetric; rows are scored as given"
            );
        }
        Ok(matrix)
    }

    /// Build a matrix from separately labelled rows and columns, reordering the
    /// columns to follow the row order.
    ///
    /// # Errors
    /// [`SelectionError::MalformedMatrix`] when the label sets differ or the
    /// labels do not match the grid shape.
    pub fn from_labeled(rows: Vec<K>, columns: Vec<K>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != rows.len() || values.ncols() != columns.len() {
            return Err(SelectionError::MalformedMatrix(format!(
                "grid is {}x{} but {} row and {} column labels were given",
                values.nrows(),
                values.ncols(),
                rows.len(),
                columns.len()
            )));
        }

        let row_set: HashSet<&K> = rows.iter().collect();
        let column_set: HashSet<&K> = columns.iter().collect();
        if row_set != column_set || row_set.len() != rows.len() || column_set.len() != columns.len()
        {
            return Err(SelectionError::MalformedMatrix(
                "row and column labels are not the same set of unique ids".to_string(),
            ));
        }

        let column_position: HashMap<&K, usize> =
            columns.iter().enumerate().map(|(j, k)| (k, j)).collect();
        let order: Vec<usize> = rows.iter().map(|k| column_position[k]).collect();
        let reordered = Array2::from_shape_fn((rows.len(), rows.len()), |(i, j)| {
            values[[i, order[j]]]
        });

        Self::new(rows, reordered)
    }

    /// Build a matrix from nested rows where `None` marks a missing value.
    ///
    /// # Errors
    /// [`SelectionError::MalformedMatrix`] on ragged rows or a shape mismatch.
    pub fn from_rows(items: Vec<K>, rows: &[Vec<Option<f64>>]) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some(position) = rows.iter().position(|row| row.len() != width) {
            return Err(SelectionError::MalformedMatrix(format!(
                "row {position} has {} values, expected {width}",
                rows[position].len()
            )));
        }
        let grid = Array2::from_shape_fn((rows.len(), width), |(i, j)| {
            rows[i][j].unwrap_or(f64::NAN)
        });
        Self::new(items, grid)
    }

    /// Build a symmetric matrix from unordered pairs; unlisted pairs stay missing.
    ///
    /// # Errors
    /// [`SelectionError::UnknownItem`] when a pair names an id outside `items`.
    pub fn from_pairs<I>(items: Vec<K>, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, K, f64)>,
    {
        let n = items.len();
        let position: HashMap<&K, usize> = items.iter().enumerate().map(|(i, k)| (k, i)).collect();
        let mut grid = Array2::from_elem((n, n), f64::NAN);
        for (a, b, value) in pairs {
            let i = *position
                .get(&a)
                .ok_or_else(|| SelectionError::UnknownItem(format!("{a:?}")))?;
            let j = *position
                .get(&b)
                .ok_or_else(|| SelectionError::UnknownItem(format!("{b:?}")))?;
            grid[[i, j]] = value;
            grid[[j, i]] = value;
        }
        Self::new(items, grid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[K] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, index: usize) -> &K {
        &self.items[index]
    }

    #[must_use]
    pub fn index_of(&self, item: &K) -> Option<usize> {
        self.index.get(item).copied()
    }

    /// Resolve ids to row indices.
    ///
    /// # Errors
    /// [`SelectionError::UnknownItem`] for the first id not in the matrix.
    pub fn indices_of(&self, items: &[K]) -> Result<Vec<usize>> {
        items
            .iter()
            .map(|item| {
                self.index_of(item)
                    .ok_or_else(|| SelectionError::UnknownItem(format!("{item:?}")))
            })
            .collect()
    }

    /// Similarity between rows `i` and `j`; `None` when missing (always on the diagonal).
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let value = self.values[[i, j]];
        (!value.is_nan()).then_some(value)
    }

    #[must_use]
    pub fn similarity(&self, a: &K, b: &K) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        self.get(i, j)
    }

    /// Raw grid with NaN for missing cells.
    #[must_use]
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Dense copy with missing cells replaced by `0.0`.
    ///
    /// This is lossy: an unknown similarity and an explicit zero become the same
    /// value. Clustering works on this grid.
    #[must_use]
    pub fn to_dense_grid(&self) -> Array2<f64> {
        self.values.mapv(|v| if v.is_nan() { 0.0 } else { v })
    }

    /// Whether `value(a, b)` and `value(b, a)` agree within `tolerance`,
    /// treating two missing cells as equal.
    #[must_use]
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.len();
        (0..n).all(|i| {
            ((i + 1)..n).all(|j| match (self.get(i, j), self.get(j, i)) {
                (Some(a), Some(b)) => (a - b).abs() <= tolerance,
                (None, None) => true,
                _ => false,
            })
        })
    }
}
