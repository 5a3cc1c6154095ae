//! # exprimo-core
//!
//! Core data structures for the exprimo expression language.
//!
//! This crate provides the host-side types that formulas reach through addresses:
//! - [`Address`] - `column:row` references
//! - [`Table`] and [`CellData`] - Named-column tabular storage
//!
//! ## Example
//!
//! ```rust
//! use exprimo_core::{Address, CellData, Table};
//!
//! let mut table = Table::new(["name", "price"]);
//! table.set(&Address::parse("price:0").unwrap(), 4.5).unwrap();
//! table.set(&Address::new("price", 1), CellData::formula("price:0 * 2")).unwrap();
//!
//! assert_eq!(table.row_count(), 2);
//! ```

pub mod address;
pub mod error;
pub mod table;

pub use address::Address;
pub use error::{Error, Result};
pub use table::{CellData, Table};

/// Maximum number of rows in a table
pub const MAX_ROWS: usize = 1_048_576;
