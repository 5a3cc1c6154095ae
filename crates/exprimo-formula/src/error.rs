//! Formula error types

use crate::source::SourceError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Coarse classification of a [`FormulaError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unrecognized character or unterminated literal
    Lex,
    /// Malformed structure, including unknown operator symbols
    Parse,
    /// A name with no binding in the active context
    UnboundName,
    /// Wrong operand or argument count
    Arity,
    /// Operand types an operator or function cannot handle
    TypeMismatch,
    /// The data source failed to resolve an address
    DataSource,
    /// Any other evaluation failure (recursion limit, host function errors)
    Evaluation,
}

/// Errors that can occur during formula tokenizing, parsing or evaluation
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Tokenizer error
    #[error("Lex error at offset {offset}: {message}")]
    Lex { offset: usize, message: String },

    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Name not bound in the context
    #[error("Unbound name: {0}")]
    UnboundName(String),

    /// Operator symbol not registered in the context
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// Wrong number of arguments or operands
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Operand types not supported by an operator or function
    #[error("Type mismatch in {operation}: {message}")]
    TypeMismatch { operation: String, message: String },

    /// Member access on a list or map that has no such member
    #[error("No member '{member}'")]
    MissingMember { member: String },

    /// The data source could not resolve an address
    #[error("Data source error for '{address}': {source}")]
    DataSource {
        address: String,
        #[source]
        source: SourceError,
    },

    /// Too many nested function calls or address lookups
    #[error("Recursion limit of {0} exceeded")]
    RecursionLimit(usize),

    /// Host function failure
    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

impl FormulaError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Lex { .. } => ErrorKind::Lex,
            FormulaError::Parse(_) | FormulaError::UnknownOperator(_) => ErrorKind::Parse,
            FormulaError::UnboundName(_) => ErrorKind::UnboundName,
            FormulaError::ArgumentCount { .. } => ErrorKind::Arity,
            FormulaError::TypeMismatch { .. } | FormulaError::MissingMember { .. } => {
                ErrorKind::TypeMismatch
            }
            FormulaError::DataSource { .. } => ErrorKind::DataSource,
            FormulaError::RecursionLimit(_) | FormulaError::Evaluation(_) => ErrorKind::Evaluation,
        }
    }

    pub(crate) fn type_mismatch(operation: &str, message: impl Into<String>) -> Self {
        FormulaError::TypeMismatch {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn argument_count(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        FormulaError::ArgumentCount {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }
}
