//! Prelude module - common imports for exprimo users
//!
//! ```rust
//! use exprimo::prelude::*;
//! ```

pub use crate::{
    // Table types
    Address,
    CellData,
    // Language types
    Context,
    DataSource,
    // Error types
    Error,
    EvaluationOptions,
    FormulaError,
    FormulaResult,
    Function,
    Operator,
    Result,
    Table,
    // Data sources
    TableSource,
    Value,
};
