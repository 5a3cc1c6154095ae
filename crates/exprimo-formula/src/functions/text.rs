//! Text and general-purpose functions

use crate::context::Context;
use crate::error::{FormulaError, FormulaResult};
use crate::value::Value;

/// toString(value): the display form of any value
pub fn fn_to_string(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    Ok(Value::String(args[0].to_string()))
}

/// identity(value)
pub fn fn_identity(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    Ok(args[0].clone())
}

/// len(value): characters of a string, items of a list, entries of a map
pub fn fn_len(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    match &args[0] {
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::List(items) => Ok(Value::from(items.len())),
        Value::Map(entries) => Ok(Value::from(entries.len())),
        Value::Error(_) => Ok(args[0].clone()),
        other => Err(FormulaError::type_mismatch(
            "len",
            format!("{} has no length", other.type_name()),
        )),
    }
}

fn map_string(name: &str, args: &[Value], f: fn(&str) -> String) -> FormulaResult<Value> {
    match &args[0] {
        Value::String(s) => Ok(Value::String(f(s))),
        Value::Error(_) => Ok(args[0].clone()),
        other => Err(FormulaError::type_mismatch(
            name,
            format!("expected a string, got {}", other.type_name()),
        )),
    }
}

/// upper(text)
pub fn fn_upper(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    map_string("upper", args, str::to_uppercase)
}

/// lower(text)
pub fn fn_lower(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    map_string("lower", args, str::to_lowercase)
}

/// typeOf(value): the variant name, e.g. `"number"`
pub fn fn_type_of(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    Ok(Value::from(args[0].type_name()))
}
