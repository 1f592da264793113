#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::missing_panics_doc
)]

//! Vantage-point selection over pairwise similarity matrices.
//!
//! Three strategies produce an ordered subset of items: greedy elimination of
//! the most central item, greedy construction of a diverse set, and
//! round-robin sampling over a k-means or spectral partition. See
//! [`selection::Selector`] for the entry point.

pub mod clustering;
pub mod config;
pub mod driver;
pub mod error;
pub mod matrix;
pub mod observability;
pub mod robustness;
pub mod selection;

pub use crate::error::{Result, SelectionError};
pub use crate::matrix::{ItemId, SimilarityMatrix};
pub use crate::selection::{Selection, SelectionMethod, SelectionParams, Selector};
