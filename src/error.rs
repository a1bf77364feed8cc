use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FichaFinanceiraError {
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Unrecognized document layout: {0}")]
    ParseError(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Column '{name}' (occurrence {occurrence}) not found in header")]
    MissingColumn { name: String, occurrence: usize },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Text extraction failed: {0}")]
    ExtractionError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FichaFinanceiraError>;
