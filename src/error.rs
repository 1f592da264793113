//! Error taxonomy for the selection layer.

use thiserror::Error;

/// Errors surfaced by matrix construction, scoring, clustering and selection.
///
/// An all-zero aggregate is not represented here: it resolves to a random pick
/// from the candidate pool instead of failing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    #[error("invalid method: {0}")]
    InvalidMethod(String),
    #[error("malformed similarity matrix: {0}")]
    MalformedMatrix(String),
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("clustering failed: {0}")]
    Clustering(String),
}

pub type Result<T> = std::result::Result<T, SelectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let error = SelectionError::InvalidMethod("dbscan".into());
        assert_eq!(error.to_string(), "invalid method: dbscan");

        let error = SelectionError::MalformedMatrix("3 rows, 2 columns".into());
        assert!(error.to_string().contains("3 rows, 2 columns"));
    }
}
