//! Address type
//!
//! An address names one cell of tabular data as `<column>:<row>`, e.g. `price:3`.
//! Rows are 0-based. The column part is everything before the *last* `:`, so hosts
//! may use columns that themselves contain a colon; only identifier-shaped columns
//! can be written as a bare address inside a formula.

use crate::error::{Error, Result};
use lazy_regex::regex_captures;
use std::fmt;
use std::str::FromStr;

/// A `column:row` reference into tabular data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address {
    /// Column name
    pub column: String,
    /// Row index (0-based)
    pub row: usize,
}

impl Address {
    /// Create a new address
    pub fn new(column: impl Into<String>, row: usize) -> Self {
        Self {
            column: column.into(),
            row,
        }
    }

    /// Parse an address from `column:row` notation
    ///
    /// # Examples
    /// ```
    /// use exprimo_core::Address;
    ///
    /// let addr = Address::parse("price:3").unwrap();
    /// assert_eq!(addr.column, "price");
    /// assert_eq!(addr.row, 3);
    ///
    /// let addr = Address::parse("a:b:0").unwrap();
    /// assert_eq!(addr.column, "a:b");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let (_, column, row) = regex_captures!(r"^(.+):([0-9]+)$", s)
            .ok_or_else(|| Error::InvalidAddress(format!("expected column:row, got '{}'", s)))?;

        let row = row
            .parse::<usize>()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        Ok(Self::new(column, row))
    }

    /// Whether this address can be written as a single address token in a formula
    /// (identifier-shaped column, no embedded `:`)
    pub fn is_bare(&self) -> bool {
        let mut chars = self.column.chars();
        match chars.next() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_alphanumeric() || c == '_')
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.column, self.row)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
