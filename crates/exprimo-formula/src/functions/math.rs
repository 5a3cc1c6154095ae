//! Math constants and functions

use super::{expect_number, first_error};
use crate::context::Context;
use crate::error::{FormulaError, FormulaResult};
use crate::value::Value;
use std::f64::consts;

/// Numeric constants bound as globals
pub const CONSTANTS: &[(&str, f64)] = &[
    ("PI", consts::PI),
    ("π", consts::PI),
    ("e", consts::E),
    ("E", consts::E),
    ("LOG2_E", consts::LOG2_E),
    ("LOG2_10", consts::LOG2_10),
    ("LOG10_2", consts::LOG10_2),
];

fn unary(name: &str, args: &[Value], f: fn(f64) -> f64) -> FormulaResult<Value> {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    Ok(Value::Number(f(expect_number(name, &args[0])?)))
}

/// SIN function
pub fn fn_sin(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("sin", args, f64::sin)
}

/// COS function
pub fn fn_cos(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("cos", args, f64::cos)
}

/// TAN function
pub fn fn_tan(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("tan", args, f64::tan)
}

pub fn fn_sinh(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("sinh", args, f64::sinh)
}

pub fn fn_cosh(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("cosh", args, f64::cosh)
}

pub fn fn_tanh(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("tanh", args, f64::tanh)
}

pub fn fn_asin(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("asin", args, f64::asin)
}

pub fn fn_acos(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("acos", args, f64::acos)
}

pub fn fn_atan(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("atan", args, f64::atan)
}

pub fn fn_asinh(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("asinh", args, f64::asinh)
}

pub fn fn_acosh(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("acosh", args, f64::acosh)
}

pub fn fn_atanh(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("atanh", args, f64::atanh)
}

/// ABS function
pub fn fn_abs(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("abs", args, f64::abs)
}

/// SQRT function. Negative input yields NaN.
pub fn fn_sqrt(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("sqrt", args, f64::sqrt)
}

/// FLOOR function
pub fn fn_floor(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("floor", args, f64::floor)
}

/// CEIL function
pub fn fn_ceil(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("ceil", args, f64::ceil)
}

/// Natural logarithm
pub fn fn_ln(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    unary("ln", args, f64::ln)
}

/// ATAN2(y, x)
pub fn fn_atan2(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let y = expect_number("atan2", &args[0])?;
    let x = expect_number("atan2", &args[1])?;
    Ok(Value::Number(y.atan2(x)))
}

/// ROUND(number, [digits]). Halves round away from zero.
pub fn fn_round(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let number = expect_number("round", &args[0])?;
    let digits = match args.get(1) {
        Some(value) => expect_number("round", value)?.trunc() as i32,
        None => 0,
    };

    let factor = 10f64.powi(digits);
    if factor == 0.0 {
        return Ok(Value::Number(0.0));
    }
    let scaled = number * factor;
    // More digits than f64 can hold: nothing to round
    if !scaled.is_finite() {
        return Ok(Value::Number(number));
    }
    Ok(Value::Number(scaled.round() / factor))
}

/// Numbers from the arguments, descending into lists
fn flatten_numbers(name: &str, args: &[Value], out: &mut Vec<f64>) -> FormulaResult<()> {
    for arg in args {
        match arg {
            Value::List(items) => flatten_numbers(name, items, out)?,
            other => out.push(expect_number(name, other)?),
        }
    }
    Ok(())
}

fn extremum(name: &str, args: &[Value], pick: fn(f64, f64) -> f64) -> FormulaResult<Value> {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let mut numbers = Vec::new();
    flatten_numbers(name, args, &mut numbers)?;

    numbers
        .into_iter()
        .reduce(pick)
        .map(Value::Number)
        .ok_or_else(|| FormulaError::Evaluation(format!("{} of an empty list", name)))
}

/// MIN function
pub fn fn_min(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    extremum("min", args, f64::min)
}

/// MAX function
pub fn fn_max(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    extremum("max", args, f64::max)
}

/// SUM function
pub fn fn_sum(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
    if let Some(err) = first_error(args) {
        return Ok(err);
    }
    let mut numbers = Vec::new();
    flatten_numbers("sum", args, &mut numbers)?;
    Ok(Value::Number(numbers.iter().sum()))
}
