//! Error types for exprimo-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in exprimo-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Column not present in the table
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Column name already present in the table
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(usize, usize),
}
