//! Error types for cholstack-linalg.

use thiserror::Error;

/// Reason a slice was rejected before any factorization was attempted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixDefect {
    #[error("not square ({rows}x{cols})")]
    NotSquare { rows: usize, cols: usize },

    #[error("non-finite entry at ({row}, {col})")]
    NonFinite { row: usize, col: usize },

    #[error("not symmetric at ({row}, {col}): |a_ij - a_ji| = {deviation:e}")]
    NotSymmetric {
        row: usize,
        col: usize,
        deviation: f64,
    },

    #[error("non-positive diagonal entry {value} at index {index}")]
    NonPositiveDiagonal { index: usize, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid dimensions [{rows}, {cols}, {slices}]: every dimension must be at least 1")]
    InvalidDimension {
        rows: usize,
        cols: usize,
        slices: usize,
    },

    #[error("invalid matrix at slice {slice}: {defect}")]
    InvalidMatrix { slice: usize, defect: MatrixDefect },

    #[error("matrix at slice {slice} is not positive definite{}", describe_pivot(.pivot))]
    NotPositiveDefinite { slice: usize, pivot: Option<usize> },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl Error {
    /// Re-tag a per-matrix error with the slice it came from.
    ///
    /// The single-matrix engines report slice 0; the batch layer knows the
    /// real index.
    pub fn at_slice(self, index: usize) -> Self {
        match self {
            Error::InvalidMatrix { defect, .. } => Error::InvalidMatrix {
                slice: index,
                defect,
            },
            Error::NotPositiveDefinite { pivot, .. } => Error::NotPositiveDefinite {
                slice: index,
                pivot,
            },
            other => other,
        }
    }

    /// Slice index carried by the error, if any.
    pub fn slice(&self) -> Option<usize> {
        match self {
            Error::InvalidMatrix { slice, .. } | Error::NotPositiveDefinite { slice, .. } => {
                Some(*slice)
            }
            _ => None,
        }
    }
}

fn describe_pivot(pivot: &Option<usize>) -> String {
    match pivot {
        Some(p) => format!(" (pivot {} is not positive)", p),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
