//! # exprimo-formula
//!
//! Tokenizer, parser and evaluator for the exprimo expression language.
//!
//! This crate provides:
//! - Tokenizing (text → [`Token`]s), with longest-match operator symbols
//! - Parsing (tokens → [`Expr`]) by precedence climbing over a runtime operator table
//! - Evaluation (expression → [`Value`]) against a [`Context`]
//! - Address lookups (`column:row`) dispatched to a pluggable [`DataSource`]
//! - Standard constants and functions
//!
//! ## Example
//!
//! ```rust
//! use exprimo_formula::{Context, SourceError, Value};
//!
//! let provider = |_: &Context, address: &str| -> Result<Value, SourceError> {
//!     match address {
//!         "a:0" => Ok(Value::Number(5.0)),
//!         _ => Err(format!("no cell {}", address).into()),
//!     }
//! };
//!
//! let mut cx = Context::new(provider);
//! assert_eq!(cx.evaluate_str("a:0 + 1").unwrap(), 6.0);
//!
//! cx.define_function("hyp", &["a", "b"], "sqrt(a^2 + b^2)").unwrap();
//! assert_eq!(cx.evaluate_str("hyp(3, 4)").unwrap(), 5.0);
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod operator;
pub mod parser;
pub mod source;
pub mod token;
pub mod tokenizer;
pub mod value;

pub use ast::Expr;
pub use context::{Context, EvaluationOptions, Globals};
pub use error::{ErrorKind, FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_expr, evaluate_str};
pub use functions::{standard_globals, FunctionDef, FunctionRegistry};
pub use operator::{
    standard_operators, Arity, Associativity, Operator, OperatorBuilder, OperatorMap,
    DEFAULT_PRECEDENCE, PREFIX_PRECEDENCE,
};
pub use parser::{parse, MAX_NESTING};
pub use source::{DataSource, EmptySource, Row, SourceError};
pub use token::{Token, TokenType};
pub use tokenizer::{parse_str, tokenize, Tokenizer};
pub use value::{Function, Value};
