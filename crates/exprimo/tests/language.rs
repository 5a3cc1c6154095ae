//! End-to-end behaviour of the language: evaluation order, scoping and extensibility

use exprimo::prelude::*;
use exprimo::{parse_str, Arity, Associativity, ErrorKind, SourceError};
use pretty_assertions::assert_eq;

fn eval(source: &str) -> FormulaResult<Value> {
    Context::default().evaluate_str(source)
}

#[test]
fn test_precedence() {
    assert_eq!(eval("1+2*3").unwrap(), 7.0);
    assert_eq!(eval("2*3+1").unwrap(), 7.0);
    assert_eq!(eval("1 + 2 < 4 && !false").unwrap(), true);
}

#[test]
fn test_left_associativity() {
    assert_eq!(eval("10-2-3").unwrap(), 5.0);
    assert_eq!(eval("64/4/2").unwrap(), 8.0);
}

#[test]
fn test_address_dispatch() {
    let provider = |_: &Context, address: &str| -> std::result::Result<Value, SourceError> {
        if address == "a:0" {
            Ok(Value::Number(5.0))
        } else {
            Err(format!("unknown address {}", address).into())
        }
    };
    let cx = Context::new(provider);

    assert_eq!(cx.evaluate_str("a:0+1").unwrap(), 6.0);
    assert_eq!(
        cx.evaluate_str("b:0+1").unwrap_err().kind(),
        ErrorKind::DataSource
    );
}

#[test]
fn test_provider_receives_exact_address_text() {
    let provider = |_: &Context, address: &str| -> std::result::Result<Value, SourceError> {
        Ok(Value::from(address))
    };
    let cx = Context::new(provider);
    assert_eq!(cx.evaluate_str("col_2:007").unwrap(), "col_2:007");
}

#[test]
fn test_scoping_isolation() {
    let mut cx = Context::default();
    cx.push_global("n", 100.0);
    cx.define_function("twice", &["n"], "n * 2").unwrap();

    assert_eq!(cx.evaluate_str("twice(4)").unwrap(), 8.0);
    assert_eq!(cx.evaluate_str("n").unwrap(), 100.0);
    assert_eq!(cx.global("n"), Some(&Value::Number(100.0)));
}

#[test]
fn test_unbound_name() {
    let err = eval("undefinedVar").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnboundName);
    assert!(err.to_string().contains("undefinedVar"));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval(r#""Hello"+"Hello""#).unwrap(), "HelloHello");

    let mut cx = Context::default();
    cx.push_global("x", "Hello");
    assert_eq!(cx.evaluate_str("x+x").unwrap(), "HelloHello");
}

#[test]
fn test_mixed_concatenation() {
    assert_eq!(eval("'n=' + 1.5").unwrap(), "n=1.5");
    assert_eq!(eval("2 + ' apples'").unwrap(), "2 apples");
    assert_eq!(eval("'flag: ' + true").unwrap(), "flag: true");
    assert_eq!(eval("'x' + nothing").unwrap(), "xnothing");
    assert_eq!(eval("true + 1").unwrap_err().kind(), ErrorKind::TypeMismatch);
}

#[test]
fn test_operator_override_does_not_leak_into_clone() {
    let mut cx = Context::default();
    let before = cx.clone();

    let minus_as_plus = Operator::builder()
        .symbol("+")
        .precedence(10)
        .handler(|operands| match operands {
            [Value::Number(a), Value::Number(b)] => Ok(Value::Number(a - b)),
            _ => Ok(Value::Nothing),
        })
        .build()
        .unwrap();
    cx.push_operator(minus_as_plus);

    assert_eq!(cx.evaluate_str("5 + 3").unwrap(), 2.0);
    assert_eq!(before.evaluate_str("5 + 3").unwrap(), 8.0);
}

#[test]
fn test_custom_operator_precedence() {
    // `<>` as "average", binding looser than `+`
    let average = Operator::builder()
        .symbol("<>")
        .precedence(7)
        .arity(Arity::Variadic)
        .handler(|operands| {
            let mut total = 0.0;
            for operand in operands {
                total += operand.as_number().unwrap_or(0.0);
            }
            Ok(Value::Number(total / operands.len() as f64))
        })
        .build()
        .unwrap();
    let cx = Context::default().with_operator(average);

    assert_eq!(cx.evaluate_str("2 <> 2 + 3 <> 5").unwrap(), 4.0);

    // registered without a precedence: binds tighter than everything standard
    let tight = Operator::builder()
        .symbol("@")
        .handler(|operands| match operands {
            [Value::Number(a), Value::Number(b)] => Ok(Value::Number(a * 10.0 + b)),
            _ => Ok(Value::Nothing),
        })
        .build()
        .unwrap();
    let cx = cx.with_operator(tight);
    assert_eq!(cx.evaluate_str("2 * 1 @ 2").unwrap(), 24.0);
}

#[test]
fn test_right_associative_operator() {
    let pair = Operator::builder()
        .symbol("::")
        .precedence(8)
        .associativity(Associativity::Right)
        .handler(|operands| Ok(Value::List(operands.to_vec())))
        .build()
        .unwrap();
    let cx = Context::default().with_operator(pair);

    assert_eq!(cx.evaluate_str("toString(1 :: 2 :: 3)").unwrap(), "[1, [2, 3]]");
}

#[test]
fn test_idempotence() {
    let mut cx = Context::default();
    cx.push_global("xs", Value::List(vec![1.into(), 2.into(), 3.into()]));
    let source = "sum(xs) * len(xs) + max(xs)";

    let first = cx.evaluate_str(source).unwrap();
    let second = cx.evaluate_str(source).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, 21.0);
}

#[test]
fn test_token_round_trip() {
    let source = "  f(a:0, 'it''s') + [1.5, {k: true}].1.k  ";
    let tokens = parse_str(source).unwrap();

    let mut rebuilt = String::new();
    let mut cursor = 0;
    for token in &tokens {
        rebuilt.push_str(&source[cursor..token.offset()]);
        rebuilt.push_str(token.text());
        cursor = token.end();
    }
    rebuilt.push_str(&source[cursor..]);
    assert_eq!(rebuilt, source);

    let squeezed: String = tokens.iter().map(|t| t.text()).collect();
    assert_eq!(squeezed, "f(a:0,'it''s')+[1.5,{k:true}].1.k");
}

#[test]
fn test_recursive_function() {
    let mut cx = Context::default();
    cx.push_fn("if", |_, args| match args {
        [Value::Bool(cond), then, otherwise] => Ok(if *cond { then.clone() } else { otherwise.clone() }),
        _ => Err(FormulaError::Evaluation("if expects (bool, a, b)".into())),
    });
    // arguments are evaluated eagerly, so recursion goes through a function-valued branch
    cx.define_function(
        "fact",
        &["n"],
        "if(n <= 1, identity, fact)(if(n <= 1, 1, n - 1)) * if(n <= 1, 1, n)",
    )
    .unwrap();

    assert_eq!(cx.evaluate_str("fact(5)").unwrap(), 120.0);
}

#[test]
fn test_recursion_limit() {
    let mut cx = Context::default().with_options(EvaluationOptions { max_depth: 16 });
    cx.define_function("down", &["n"], "down(n - 1)").unwrap();

    let err = cx.evaluate_str("down(3)").unwrap_err();
    assert!(matches!(err, FormulaError::RecursionLimit(16)));
    assert_eq!(err.kind(), ErrorKind::Evaluation);
}

#[test]
fn test_errors_leave_context_usable() {
    let mut cx = Context::default();
    cx.push_global("x", 2.0);

    assert!(cx.evaluate_str("x +").is_err());
    assert!(cx.evaluate_str("\"open").is_err());
    assert!(cx.evaluate_str("nope(1)").is_err());
    assert_eq!(cx.evaluate_str("x * x").unwrap(), 4.0);
}

#[test]
fn test_deep_nesting_is_a_parse_error() {
    let cx = Context::default();
    let deep = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
    assert_eq!(cx.evaluate_str(&deep).unwrap_err().kind(), ErrorKind::Parse);

    let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
    assert_eq!(cx.evaluate_str(&shallow).unwrap(), 1.0);
}
