//! Data source capability
//!
//! Addresses (`column:row`) are never interpreted by the language itself. They are
//! handed verbatim to the [`DataSource`] bound to the active [`Context`], which may
//! look them up in a table, compute them, or evaluate another formula re-entrantly.

use crate::context::Context;
use crate::value::Value;
use std::collections::BTreeMap;

/// Error type returned by data sources
///
/// Boxed so providers can surface their own error types; the evaluator wraps it in
/// [`FormulaError::DataSource`](crate::FormulaError::DataSource).
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// One row of tabular data, keyed by column name
pub type Row = BTreeMap<String, Value>;

/// Resolves addresses for the evaluator
///
/// Only [`query`](DataSource::query) is required. The introspection methods let
/// table-like providers expose their shape to formulas (`columns()`, `rows()`, ...)
/// and tooling; the defaults report "not supported".
///
/// Providers are shared by every clone of a context and may be called from several
/// threads at once, so implementations guard their own state.
pub trait DataSource: Send + Sync {
    /// Resolve `address`, the exact text of an address token
    fn query(&self, cx: &Context, address: &str) -> Result<Value, SourceError>;

    /// Column names, if this provider is tabular
    fn list_columns(&self) -> Option<Vec<String>> {
        None
    }

    /// Number of rows, if known
    fn count_rows(&self) -> Option<usize> {
        None
    }

    /// One row by index. `Ok(None)` means unsupported or out of range.
    fn get_row(&self, _cx: &Context, _index: usize) -> Result<Option<Row>, SourceError> {
        Ok(None)
    }

    /// All rows. The default walks [`count_rows`](DataSource::count_rows) and
    /// [`get_row`](DataSource::get_row).
    fn list_rows(&self, cx: &Context) -> Result<Option<Vec<Row>>, SourceError> {
        let Some(count) = self.count_rows() else {
            return Ok(None);
        };

        let mut rows = Vec::with_capacity(count);
        for index in 0..count {
            match self.get_row(cx, index)? {
                Some(row) => rows.push(row),
                None => return Ok(None),
            }
        }
        Ok(Some(rows))
    }
}

/// A provider with no data: every address fails to resolve
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl DataSource for EmptySource {
    fn query(&self, _cx: &Context, address: &str) -> Result<Value, SourceError> {
        Err(format!("no data source bound; cannot resolve '{}'", address).into())
    }
}

impl<F> DataSource for F
where
    F: Fn(&Context, &str) -> Result<Value, SourceError> + Send + Sync,
{
    fn query(&self, cx: &Context, address: &str) -> Result<Value, SourceError> {
        self(cx, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Squares(usize);

    impl DataSource for Squares {
        fn query(&self, _cx: &Context, address: &str) -> Result<Value, SourceError> {
            Err(format!("unsupported: {}", address).into())
        }

        fn count_rows(&self) -> Option<usize> {
            Some(self.0)
        }

        fn get_row(&self, _cx: &Context, index: usize) -> Result<Option<Row>, SourceError> {
            let mut row = Row::new();
            row.insert("n".to_string(), Value::Number((index * index) as f64));
            Ok(Some(row))
        }
    }

    #[test]
    fn test_empty_source_fails() {
        let cx = Context::default();
        let err = EmptySource.query(&cx, "a:0").unwrap_err();
        assert!(err.to_string().contains("a:0"));
        assert_eq!(EmptySource.list_columns(), None);
        assert!(EmptySource.list_rows(&cx).unwrap().is_none());
    }

    #[test]
    fn test_closure_source() {
        let source = |_: &Context, address: &str| -> Result<Value, SourceError> {
            Ok(Value::String(address.to_uppercase()))
        };
        let cx = Context::default();
        assert_eq!(source.query(&cx, "a:1").unwrap(), Value::from("A:1"));
    }

    #[test]
    fn test_default_list_rows() {
        let cx = Context::default();
        let rows = Squares(3).list_rows(&cx).unwrap().unwrap();
        let values: Vec<_> = rows.iter().map(|r| r["n"].clone()).collect();
        assert_eq!(values, [Value::Number(0.0), Value::Number(1.0), Value::Number(4.0)]);
    }
}
