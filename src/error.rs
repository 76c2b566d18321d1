use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid export format: {0}")]
    InvalidFormat(String),

    #[error("Export file is truncated: expected at least {expected} lines, found {found}")]
    TruncatedFile { expected: usize, found: usize },

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Column index {0} out of range (row has {1} columns)")]
    ColumnOutOfRange(usize, usize),

    #[error("Sample range {start}..{end} out of bounds (file holds {available} samples)")]
    SampleRangeOutOfBounds {
        start: usize,
        end: usize,
        available: usize,
    },

    #[error("Invalid numeric value {value:?} in data row {row}")]
    InvalidNumber { row: usize, value: String },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
