//! Table introspection
//!
//! These functions expose the shape of the bound data source to formulas. Providers
//! that do not implement the optional [`DataSource`](crate::DataSource) methods make
//! them return `nothing`.

use super::expect_number;
use crate::context::Context;
use crate::error::{FormulaError, FormulaResult};
use crate::source::{Row, SourceError};
use crate::value::Value;

fn row_value(row: Row) -> Value {
    Value::Map(row)
}

fn source_error(what: String, source: SourceError) -> FormulaError {
    FormulaError::DataSource {
        address: what,
        source,
    }
}

/// columns(): column names as a list of strings
pub fn fn_columns(_args: &[Value], cx: &Context) -> FormulaResult<Value> {
    Ok(match cx.provider().list_columns() {
        Some(columns) => Value::List(columns.into_iter().map(Value::String).collect()),
        None => Value::Nothing,
    })
}

/// rowCount()
pub fn fn_row_count(_args: &[Value], cx: &Context) -> FormulaResult<Value> {
    Ok(cx
        .provider()
        .count_rows()
        .map_or(Value::Nothing, Value::from))
}

/// row(index): one row as a map from column name to value
pub fn fn_row(args: &[Value], cx: &Context) -> FormulaResult<Value> {
    if args[0].is_error() {
        return Ok(args[0].clone());
    }
    let index = expect_number("row", &args[0])?;
    if index < 0.0 || index.fract() != 0.0 {
        return Err(FormulaError::type_mismatch(
            "row",
            format!("expected a non-negative whole number, got {}", index),
        ));
    }

    let nested = cx.descend()?;
    let row = cx
        .provider()
        .get_row(&nested, index as usize)
        .map_err(|source| source_error(format!("row({})", index), source))?;

    Ok(row.map_or(Value::Nothing, row_value))
}

/// rows(): every row as a list of maps
pub fn fn_rows(_args: &[Value], cx: &Context) -> FormulaResult<Value> {
    let nested = cx.descend()?;
    let rows = cx
        .provider()
        .list_rows(&nested)
        .map_err(|source| source_error("rows()".to_string(), source))?;

    Ok(match rows {
        Some(rows) => Value::List(rows.into_iter().map(row_value).collect()),
        None => Value::Nothing,
    })
}
