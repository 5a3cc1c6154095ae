//! # exprimo
//!
//! A small embeddable expression language. Formulas reference external tabular data
//! through `column:row` addresses, resolved by a pluggable [`DataSource`].
//!
//! ## Features
//!
//! - Numbers, strings, booleans, `nothing`, lists and maps
//! - Runtime-extensible operators with their own precedence
//! - First-class host and formula-defined functions
//! - In-place (`push_*`) and derived (`with_*`) context bindings
//! - A ready-made [`TableSource`] over [`Table`]
//!
//! ## Example
//!
//! ```rust
//! use exprimo::prelude::*;
//!
//! let mut table = Table::new(["item", "price"]);
//! table.push_row([CellData::from("tea"), 3.5.into()]).unwrap();
//! table.push_row([CellData::from("cake"), CellData::formula("price:0 * 2")]).unwrap();
//!
//! let mut cx = Context::new(TableSource::new(table));
//! cx.push_global("tax", 0.5);
//! cx.define_function("gross", &["net"], "net + tax").unwrap();
//!
//! assert_eq!(cx.evaluate_str("gross(price:1)").unwrap(), 7.5);
//! assert_eq!(cx.evaluate_str("item:1 + ': ' + price:1").unwrap(), "cake: 7");
//! ```

pub mod error;
pub mod prelude;
pub mod source;

pub use error::{Error, Result};
pub use source::TableSource;

// Re-export table types
pub use exprimo_core::{Address, CellData, Table, MAX_ROWS};

// Re-export language types
pub use exprimo_formula::{
    evaluate, evaluate_str, parse_str, tokenize, Arity, Associativity, Context, DataSource,
    EmptySource, ErrorKind, EvaluationOptions, Expr, FormulaError, FormulaResult, Function,
    Operator, OperatorBuilder, Row, SourceError, Token, TokenType, Value, DEFAULT_PRECEDENCE,
};
