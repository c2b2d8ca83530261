//! Error types for the scoring engine

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Required column '{column}' not found in input")]
    MissingColumn { column: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Row {row}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Model file {path:?} could not be loaded: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Input batch contains no rows")]
    EmptyBatch,
}

pub type Result<T> = std::result::Result<T, EngineError>;
