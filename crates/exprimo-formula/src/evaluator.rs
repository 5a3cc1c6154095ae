//! Formula evaluator
//!
//! Walks an expression tree against a [`Context`]. Evaluation is eager and strictly
//! left to right: operands, callee and arguments are all evaluated before an operator
//! handler or function runs, and the first failure aborts the whole evaluation.

use crate::ast::Expr;
use crate::context::Context;
use crate::error::{FormulaError, FormulaResult};
use crate::parser;
use crate::token::Token;
use crate::value::Value;
use std::collections::BTreeMap;

/// Evaluate a token sequence
///
/// # Example
/// ```rust
/// use exprimo_formula::{evaluate, tokenize, Context};
///
/// let cx = Context::default();
/// let tokens = tokenize("10 - 2 - 3").unwrap();
/// assert_eq!(evaluate(&tokens, &cx).unwrap(), 5.0);
/// ```
pub fn evaluate(tokens: &[Token], cx: &Context) -> FormulaResult<Value> {
    let expr = parser::parse(tokens, cx.operator_map())?;
    evaluate_expr(&expr, cx)
}

/// Tokenize (with the context's operator symbols) and evaluate a formula
pub fn evaluate_str(source: &str, cx: &Context) -> FormulaResult<Value> {
    let tokens = cx.tokenize(source)?;
    evaluate(&tokens, cx)
}

/// Evaluate a parsed expression
pub fn evaluate_expr(expr: &Expr, cx: &Context) -> FormulaResult<Value> {
    match expr {
        // === Literals ===
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::String(s) => Ok(Value::String(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Nothing => Ok(Value::Nothing),

        // === References ===
        Expr::Name(name) => cx
            .global(name)
            .cloned()
            .ok_or_else(|| FormulaError::UnboundName(name.clone())),
        Expr::Address(address) => query(address, cx),

        // === Operators ===
        Expr::Operation { operator, operands } => {
            let op = cx
                .operator(operator)
                .ok_or_else(|| FormulaError::UnknownOperator(operator.clone()))?;
            let values = evaluate_all(operands, cx)?;
            op.apply(&values)
        }

        // === Postfix ===
        Expr::Call { callee, args } => {
            let callee = evaluate_expr(callee, cx)?;
            let args = evaluate_all(args, cx)?;
            if let Value::Function(function) = &callee {
                log::debug!("calling {}({} argument(s))", function.name(), args.len());
            }
            cx.call(&callee, &args)
        }
        Expr::Member { target, member } => member_of(evaluate_expr(target, cx)?, member),

        // === Collections ===
        Expr::List(items) => Ok(Value::List(evaluate_all(items, cx)?)),
        Expr::Map(entries) => {
            let mut map = BTreeMap::new();
            for (key, value) in entries {
                map.insert(key.clone(), evaluate_expr(value, cx)?);
            }
            Ok(Value::Map(map))
        }
    }
}

fn evaluate_all(exprs: &[Expr], cx: &Context) -> FormulaResult<Vec<Value>> {
    exprs.iter().map(|e| evaluate_expr(e, cx)).collect()
}

/// Resolve an address through the provider, one level deeper
fn query(address: &str, cx: &Context) -> FormulaResult<Value> {
    let nested = cx.descend()?;
    log::debug!("querying '{}' at depth {}", address, nested.depth());

    cx.provider()
        .query(&nested, address)
        .map_err(|source| match source.downcast::<FormulaError>() {
            // A nested evaluation hit the limit; report that, not a chain of lookups
            Ok(err) if matches!(*err, FormulaError::RecursionLimit(_)) => *err,
            Ok(err) => FormulaError::DataSource {
                address: address.to_string(),
                source: err,
            },
            Err(source) => FormulaError::DataSource {
                address: address.to_string(),
                source,
            },
        })
}

fn member_of(target: Value, member: &str) -> FormulaResult<Value> {
    let missing = || FormulaError::MissingMember {
        member: member.to_string(),
    };

    match target {
        Value::Map(mut entries) => entries.remove(member).ok_or_else(missing),
        Value::List(mut items) => {
            let index: usize = member.parse().map_err(|_| missing())?;
            if index < items.len() {
                Ok(items.swap_remove(index))
            } else {
                Err(missing())
            }
        }
        Value::Error(_) => Ok(target),
        other => Err(FormulaError::type_mismatch(
            ".",
            format!("{} has no member '{}'", other.type_name(), member),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationOptions;
    use crate::error::ErrorKind;
    use crate::source::SourceError;
    use pretty_assertions::assert_eq;

    fn eval(source: &str) -> FormulaResult<Value> {
        evaluate_str(source, &Context::default())
    }

    fn cells(cx: &Context, address: &str) -> Result<Value, SourceError> {
        match address {
            "a:0" => Ok(Value::Number(5.0)),
            "name:0" => Ok(Value::from("Ada")),
            "twice:0" => Ok(cx.evaluate_str("a:0 * 2")?),
            "loop:0" => Ok(cx.evaluate_str("loop:0")?),
            _ => Err(format!("no cell at {}", address).into()),
        }
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1+2*3").unwrap(), 7.0);
        assert_eq!(eval("10-2-3").unwrap(), 5.0);
        assert_eq!(eval("2^3^2").unwrap(), 512.0);
        assert_eq!(eval("-2^2").unwrap(), -4.0);
        assert_eq!(eval("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval("7 % 4 + 0.5").unwrap(), 3.5);
    }

    #[test]
    fn test_evaluate_logic() {
        assert_eq!(eval("1 < 2 && 2 <= 2").unwrap(), true);
        assert_eq!(eval("!(1 == 1) || 'a' != 'b'").unwrap(), true);
        assert_eq!(eval("nothing == nothing").unwrap(), true);
    }

    #[test]
    fn test_evaluate_strings() {
        assert_eq!(eval(r#""Hello"+"Hello""#).unwrap(), "HelloHello");
        assert_eq!(eval("'total: ' + 3").unwrap(), "total: 3");
        assert_eq!(eval("1 + 2 + 'x'").unwrap(), "3x");
        assert_eq!(eval("'x' + 1 + 2").unwrap(), "x12");
    }

    #[test]
    fn test_unbound_name() {
        let err = eval("undefinedVar").unwrap_err();
        assert!(matches!(err, FormulaError::UnboundName(ref name) if name == "undefinedVar"));
        assert_eq!(err.kind(), ErrorKind::UnboundName);
    }

    #[test]
    fn test_address_dispatch() {
        let cx = Context::new(cells);
        assert_eq!(cx.evaluate_str("a:0+1").unwrap(), 6.0);
        assert_eq!(cx.evaluate_str("'Hi ' + name:0").unwrap(), "Hi Ada");
    }

    #[test]
    fn test_address_reentrant() {
        let cx = Context::new(cells);
        assert_eq!(cx.evaluate_str("twice:0 + a:0").unwrap(), 15.0);
        assert_eq!(cx.depth(), 0);
    }

    #[test]
    fn test_address_failure() {
        let cx = Context::new(cells);
        let err = cx.evaluate_str("1 + missing:3").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataSource);
        match err {
            FormulaError::DataSource { address, source } => {
                assert_eq!(address, "missing:3");
                assert_eq!(source.to_string(), "no cell at missing:3");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        // the default context has no data
        assert_eq!(eval("a:0").unwrap_err().kind(), ErrorKind::DataSource);
    }

    #[test]
    fn test_address_recursion_limit() {
        let cx = Context::new(cells).with_options(EvaluationOptions { max_depth: 10 });
        let err = cx.evaluate_str("loop:0").unwrap_err();
        assert!(matches!(err, FormulaError::RecursionLimit(10)));
    }

    #[test]
    fn test_collections() {
        assert_eq!(
            eval("[1, 'a', [true]]").unwrap(),
            Value::List(vec![1.into(), "a".into(), Value::List(vec![true.into()])])
        );

        let value = eval("{x: 1 + 1, 'y z': nothing}").unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["x"], Value::Number(2.0));
        assert_eq!(map["y z"], Value::Nothing);
    }

    #[test]
    fn test_member_access() {
        assert_eq!(eval("{a: {b: 3}}.a.b").unwrap(), 3.0);
        assert_eq!(eval("[10, 20, 30].1").unwrap(), 20.0);
        assert_eq!(eval("[[1, 2], [3, 4]].1.0").unwrap(), 3.0);
        assert_eq!(eval("{'k v': 1}.'k v'").unwrap(), 1.0);

        let err = eval("{a: 1}.b").unwrap_err();
        assert!(matches!(err, FormulaError::MissingMember { ref member } if member == "b"));
        assert!(matches!(eval("[1].5"), Err(FormulaError::MissingMember { .. })));
        assert!(matches!(eval("[1].x"), Err(FormulaError::MissingMember { .. })));
        assert!(matches!(eval("(3).x"), Err(FormulaError::TypeMismatch { .. })));
    }

    #[test]
    fn test_call_non_callable() {
        let err = eval("(1)(2)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_argument_order() {
        let mut cx = Context::default();
        cx.push_fn("args", |_, args| Ok(Value::List(args.to_vec())));
        assert_eq!(
            cx.evaluate_str("args(1, 'two', 1 + 2)").unwrap(),
            Value::List(vec![1.into(), "two".into(), 3.into()])
        );
    }

    #[test]
    fn test_in_band_errors() {
        assert_eq!(eval("1 / 0").unwrap(), Value::Error("division by zero".into()));
        assert_eq!(eval("1 / 0 + 5").unwrap(), Value::Error("division by zero".into()));
        assert!(eval("1 / 0").unwrap().is_error());
    }

    #[test]
    fn test_type_mismatch_fails_fast() {
        let err = eval("1 + true").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(eval("-'a'").is_err());
    }

    #[test]
    fn test_idempotent() {
        let cx = Context::new(cells).with_global("x", 3.0);
        let first = cx.evaluate_str("x * a:0 + len([1, 2])").unwrap();
        let second = cx.evaluate_str("x * a:0 + len([1, 2])").unwrap();
        assert_eq!(first, second);
    }
}
