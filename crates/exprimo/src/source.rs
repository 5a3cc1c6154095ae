//! Table-backed data source
//!
//! [`TableSource`] exposes an [`exprimo_core::Table`] to formulas. Addresses resolve to
//! cells; formula cells are evaluated on lookup with the querying context, so a cell
//! may reference other cells (nesting is bounded by the context's depth limit).
//!
//! # Example
//!
//! ```rust
//! use exprimo::prelude::*;
//!
//! let mut table = Table::new(["price", "qty", "total"]);
//! table.push_row([CellData::from(2.5), 4.0.into(), CellData::formula("price:0 * qty:0")]).unwrap();
//!
//! let cx = Context::new(TableSource::new(table));
//! assert_eq!(cx.evaluate_str("total:0 + 1").unwrap(), 11.0);
//! ```

use crate::error::Result;
use exprimo_core::{Address, CellData, Table};
use exprimo_formula::{Context, DataSource, Row, SourceError, Value};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A [`DataSource`] over a [`Table`]
///
/// The table sits behind a lock so one source can be shared by many contexts
/// (including clones evaluating on other threads) and still be updated.
#[derive(Debug, Default)]
pub struct TableSource {
    table: RwLock<Table>,
}

impl TableSource {
    /// Wrap a table
    pub fn new(table: Table) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    /// Shared access to the table
    pub fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the table
    pub fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set one cell by address text, e.g. `"price:0"`. Returns the previous content.
    pub fn set(&self, address: &str, value: impl Into<CellData>) -> Result<CellData> {
        let address = Address::parse(address)?;
        Ok(self.write().set(&address, value)?)
    }

    /// Unwrap the table
    pub fn into_inner(self) -> Table {
        self.table
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of one row's cells, taken without holding the lock during evaluation
    fn snapshot_row(&self, index: usize) -> Option<(Vec<String>, Vec<CellData>)> {
        let table = self.read();
        let cells = table.row(index)?.to_vec();
        Some((table.columns().to_vec(), cells))
    }

    fn resolve_row(
        cx: &Context,
        columns: Vec<String>,
        cells: Vec<CellData>,
    ) -> std::result::Result<Row, SourceError> {
        columns
            .into_iter()
            .zip(cells)
            .map(|(column, cell)| resolve(cx, cell).map(|value| (column, value)))
            .collect()
    }
}

impl From<Table> for TableSource {
    fn from(table: Table) -> Self {
        Self::new(table)
    }
}

/// Convert a cell to a value, evaluating formula cells with `cx`
fn resolve(cx: &Context, cell: CellData) -> std::result::Result<Value, SourceError> {
    Ok(match cell {
        CellData::Empty => Value::Nothing,
        CellData::Number(n) => Value::Number(n),
        CellData::Text(s) => Value::String(s),
        CellData::Bool(b) => Value::Bool(b),
        CellData::Formula(source) => {
            log::debug!("evaluating formula cell at depth {}: {}", cx.depth(), source);
            cx.evaluate_str(&source)?
        }
    })
}

impl DataSource for TableSource {
    fn query(&self, cx: &Context, address: &str) -> std::result::Result<Value, SourceError> {
        let address = Address::parse(address)?;
        // Clone the cell so the lock is released before a formula re-enters this source
        let cell = self.read().get(&address)?.clone();
        resolve(cx, cell)
    }

    fn list_columns(&self) -> Option<Vec<String>> {
        Some(self.read().columns().to_vec())
    }

    fn count_rows(&self) -> Option<usize> {
        Some(self.read().row_count())
    }

    fn get_row(&self, cx: &Context, index: usize) -> std::result::Result<Option<Row>, SourceError> {
        match self.snapshot_row(index) {
            Some((columns, cells)) => Ok(Some(Self::resolve_row(cx, columns, cells)?)),
            None => Ok(None),
        }
    }

    fn list_rows(&self, cx: &Context) -> std::result::Result<Option<Vec<Row>>, SourceError> {
        let (columns, rows) = {
            let table = self.read();
            let rows: Vec<Vec<CellData>> = table.rows().map(<[CellData]>::to_vec).collect();
            (table.columns().to_vec(), rows)
        };

        rows.into_iter()
            .map(|cells| Self::resolve_row(cx, columns.clone(), cells))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Some)
    }
}
