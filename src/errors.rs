// std imports
use std::path::PathBuf;

// 3rd party imports
use polars::error::PolarsError;
use thiserror::Error;

/// Errors raised by the q-value estimators
///
#[derive(Error, Debug)]
pub enum QvalueError {
    #[error("Scores and labels have different lengths: {0} vs. {1}")]
    LengthMismatch(usize, usize),
    #[error("Found {0} NaN values in scores")]
    NanScores(usize),
    #[error("No observations given")]
    Empty,
    #[error("Cross-link labels must be 0, 1 or 2, found `{0}`")]
    InvalidLabel(u32),
}

/// Errors raised when fitting or evaluating the PEP estimator
///
#[derive(Error, Debug)]
pub enum PepError {
    #[error("No target scores given, cannot fit the score distributions")]
    NoTargets,
    #[error("No decoy scores given, cannot fit the score distributions")]
    NoDecoys,
    #[error("Found NaN values in scores")]
    NanScores,
    #[error("Scores have no spread, kernel bandwidth is undefined")]
    ZeroBandwidth,
}

/// Errors raised by the confidence pipelines and their accessors
///
#[derive(Error, Debug)]
pub enum ConfidenceError {
    #[error("Unknown confidence level `{0}`")]
    UnknownLevel(String),
    #[error("Column `{0}` not found in the candidate table")]
    MissingColumn(String),
    #[error("Column `{0}` already exists in the candidate table")]
    ColumnCollision(String),
    #[error("Expected one label/score per candidate row, got {got} for {rows} rows")]
    LengthMismatch { rows: usize, got: usize },
    #[error("Cross-link labels must be 0, 1 or 2, found `{0}`")]
    InvalidLabel(u32),
    #[error("Destination directory `{}` does not exist", .0.display())]
    DestinationNotFound(PathBuf),
    #[error("Q-value threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
    #[error("Error in DataFrame operation:\n\t{0}")]
    Polars(#[from] PolarsError),
    #[error("Error writing confidence estimates:\n\t{0}")]
    Io(#[from] std::io::Error),
}
