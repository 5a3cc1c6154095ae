//! Error types for the exprimo facade

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from either the table model or the language
#[derive(Debug, Error)]
pub enum Error {
    /// Address or table failure
    #[error(transparent)]
    Table(#[from] exprimo_core::Error),

    /// Tokenizing, parsing or evaluation failure
    #[error(transparent)]
    Formula(#[from] exprimo_formula::FormulaError),
}
