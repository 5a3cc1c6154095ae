//! Tabular storage
//!
//! A [`Table`] is a set of named columns and row-major cells. It is plain host-side
//! data: it knows nothing about evaluation. Formula cells keep their source text and
//! are evaluated by whichever data source exposes the table to the language.

use crate::address::Address;
use crate::error::{Error, Result};
use crate::MAX_ROWS;
use std::fmt;

/// Raw content of one cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellData {
    /// No value
    #[default]
    Empty,
    /// Numeric value
    Number(f64),
    /// Text value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Formula source, evaluated on lookup
    Formula(String),
}

impl CellData {
    /// Create a formula cell
    pub fn formula<S: Into<String>>(source: S) -> Self {
        CellData::Formula(source.into())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellData::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellData::Formula(_))
    }
}

impl fmt::Display for CellData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellData::Empty => Ok(()),
            CellData::Number(n) => write!(f, "{}", n),
            CellData::Text(s) => write!(f, "{}", s),
            CellData::Bool(b) => write!(f, "{}", b),
            CellData::Formula(src) => write!(f, "={}", src),
        }
    }
}

impl From<f64> for CellData {
    fn from(value: f64) -> Self {
        CellData::Number(value)
    }
}

impl From<bool> for CellData {
    fn from(value: bool) -> Self {
        CellData::Bool(value)
    }
}

impl From<&str> for CellData {
    fn from(value: &str) -> Self {
        CellData::Text(value.to_string())
    }
}

impl From<String> for CellData {
    fn from(value: String) -> Self {
        CellData::Text(value)
    }
}

static EMPTY: CellData = CellData::Empty;

/// Named columns with row-major cell storage
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellData>>,
}

impl Table {
    /// Create an empty table with the given columns
    ///
    /// Duplicate column names are collapsed to their first occurrence.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for column in columns {
            let _ = table.add_column(column);
        }
        table
    }

    /// Column names in declaration order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Index of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a new column; existing rows get an empty cell
    pub fn add_column(&mut self, name: impl Into<String>) -> Result<usize> {
        let name = name.into();
        if self.column_index(&name).is_some() {
            return Err(Error::DuplicateColumn(name));
        }
        self.columns.push(name);
        for row in &mut self.rows {
            row.push(CellData::Empty);
        }
        Ok(self.columns.len() - 1)
    }

    /// Number of rows (including trailing rows that only hold empty cells)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cells of one row, in column order
    pub fn row(&self, index: usize) -> Option<&[CellData]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Iterate over all rows
    pub fn rows(&self) -> impl Iterator<Item = &[CellData]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Get a cell. Rows past the end read as empty; unknown columns are an error.
    pub fn get(&self, addr: &Address) -> Result<&CellData> {
        let col = self
            .column_index(&addr.column)
            .ok_or_else(|| Error::UnknownColumn(addr.column.clone()))?;

        Ok(self
            .rows
            .get(addr.row)
            .and_then(|row| row.get(col))
            .unwrap_or(&EMPTY))
    }

    /// Set a cell, growing the table as needed. Returns the previous content.
    pub fn set(&mut self, addr: &Address, value: impl Into<CellData>) -> Result<CellData> {
        let col = self
            .column_index(&addr.column)
            .ok_or_else(|| Error::UnknownColumn(addr.column.clone()))?;
        self.set_at(addr.row, col, value)
    }

    /// Set a cell by row/column indices
    pub fn set_at(&mut self, row: usize, col: usize, value: impl Into<CellData>) -> Result<CellData> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        let width = self.columns.len();
        if col >= width {
            return Err(Error::UnknownColumn(format!("#{}", col)));
        }

        if row >= self.rows.len() {
            self.rows.resize_with(row + 1, || vec![CellData::Empty; width]);
        }

        Ok(std::mem::replace(&mut self.rows[row][col], value.into()))
    }

    /// Append a row. Missing trailing cells are filled with empty cells; extra cells are dropped.
    pub fn push_row<I, V>(&mut self, cells: I) -> Result<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellData>,
    {
        let index = self.rows.len();
        if index >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(index, MAX_ROWS - 1));
        }

        let width = self.columns.len();
        let mut row: Vec<CellData> = cells.into_iter().take(width).map(Into::into).collect();
        row.resize(width, CellData::Empty);
        self.rows.push(row);

        Ok(index)
    }
}
