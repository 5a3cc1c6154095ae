//! Operator registry
//!
//! An [`Operator`] pairs a symbol with a handler over already-evaluated operands plus
//! the parsing metadata (precedence, fixity, associativity) the parser needs. The
//! symbol-to-operator table lives in each [`Context`](crate::Context), so operators
//! can be added or overridden per context.

use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::is_operator_char;
use crate::value::{describe_arity, Value};
use ahash::AHashMap;
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Signature of operator handlers
pub type OperatorHandler = dyn Fn(&[Value]) -> FormulaResult<Value> + Send + Sync;

/// Symbol-to-operator table
pub type OperatorMap = AHashMap<String, Operator>;

/// Precedence of operators registered without one; binds tighter than every default
pub const DEFAULT_PRECEDENCE: u8 = 30;

/// Precedence of prefix forms (`-x`, `!x`) unless an operator sets its own
pub const PREFIX_PRECEDENCE: u8 = 17;

/// Message of the in-band error produced by `/` and `%` with a zero divisor
pub const DIVISION_BY_ZERO: &str = "division by zero";

/// Where an operator may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Before its single operand: `!x`
    Prefix,
    /// Between two operands: `a + b`
    Infix,
    /// Either form, like `-`
    PrefixOrInfix,
    /// Infix, but a chain `a ~ b ~ c` is one call with every operand
    Variadic,
}

impl Arity {
    /// Whether the operator can start an operand
    pub fn is_prefix(self) -> bool {
        matches!(self, Arity::Prefix | Arity::PrefixOrInfix)
    }

    /// Whether the operator can follow an operand
    pub fn is_infix(self) -> bool {
        matches!(self, Arity::Infix | Arity::PrefixOrInfix | Arity::Variadic)
    }

    fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Prefix => count == 1,
            Arity::Infix => count == 2,
            Arity::PrefixOrInfix => count == 1 || count == 2,
            Arity::Variadic => count >= 2,
        }
    }

    fn describe(self) -> String {
        match self {
            Arity::Prefix => describe_arity(1, Some(1)),
            Arity::Infix => describe_arity(2, Some(2)),
            Arity::PrefixOrInfix => describe_arity(1, Some(2)),
            Arity::Variadic => describe_arity(2, None),
        }
    }
}

/// How a run of same-precedence infix operators groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Associativity {
    /// `a - b - c` is `(a - b) - c`
    #[default]
    Left,
    /// `a ^ b ^ c` is `a ^ (b ^ c)`
    Right,
}

/// A registered operator
#[derive(Clone)]
pub struct Operator {
    symbol: String,
    precedence: u8,
    prefix_precedence: u8,
    arity: Arity,
    associativity: Associativity,
    handler: Arc<OperatorHandler>,
}

impl Operator {
    /// Start building an operator
    pub fn builder() -> OperatorBuilder {
        OperatorBuilder::new()
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Infix binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        self.precedence
    }

    /// Binding strength of the prefix form
    pub fn prefix_precedence(&self) -> u8 {
        self.prefix_precedence
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn associativity(&self) -> Associativity {
        self.associativity
    }

    /// Run the handler after checking the operand count
    pub fn apply(&self, operands: &[Value]) -> FormulaResult<Value> {
        if !self.arity.accepts(operands.len()) {
            return Err(FormulaError::argument_count(
                &self.symbol,
                self.arity.describe(),
                operands.len(),
            ));
        }
        log::trace!("applying '{}' to {} operand(s)", self.symbol, operands.len());
        (self.handler)(operands)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("symbol", &self.symbol)
            .field("precedence", &self.precedence)
            .field("prefix_precedence", &self.prefix_precedence)
            .field("arity", &self.arity)
            .field("associativity", &self.associativity)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Operator`]
///
/// # Example
/// ```rust
/// use exprimo_formula::{Arity, Operator, Value};
///
/// let concat = Operator::builder()
///     .symbol("++")
///     .precedence(10)
///     .arity(Arity::Variadic)
///     .handler(|operands| {
///         Ok(Value::String(operands.iter().map(|v| v.to_string()).collect()))
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(concat.apply(&[1.into(), "a".into(), true.into()]).unwrap(), "1atrue");
/// ```
#[derive(Default)]
pub struct OperatorBuilder {
    symbol: Option<String>,
    precedence: Option<u8>,
    prefix_precedence: Option<u8>,
    arity: Option<Arity>,
    associativity: Associativity,
    handler: Option<Arc<OperatorHandler>>,
}

impl OperatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Defaults to [`DEFAULT_PRECEDENCE`]
    pub fn precedence(mut self, precedence: u8) -> Self {
        self.precedence = Some(precedence);
        self
    }

    /// Defaults to the infix precedence for [`Arity::Prefix`], otherwise
    /// [`PREFIX_PRECEDENCE`]
    pub fn prefix_precedence(mut self, precedence: u8) -> Self {
        self.prefix_precedence = Some(precedence);
        self
    }

    /// Defaults to [`Arity::Infix`]
    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn associativity(mut self, associativity: Associativity) -> Self {
        self.associativity = associativity;
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[Value]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> FormulaResult<Operator> {
        let symbol = self
            .symbol
            .ok_or_else(|| FormulaError::Parse("operator has no symbol".into()))?;
        if symbol.is_empty() || !symbol.chars().all(is_operator_char) {
            return Err(FormulaError::Parse(format!(
                "'{}' is not a valid operator symbol",
                symbol
            )));
        }
        let handler = self
            .handler
            .ok_or_else(|| FormulaError::Parse(format!("operator '{}' has no handler", symbol)))?;

        let arity = self.arity.unwrap_or(Arity::Infix);
        let precedence = self.precedence.unwrap_or(DEFAULT_PRECEDENCE);
        let prefix_precedence = self.prefix_precedence.unwrap_or(match arity {
            Arity::Prefix => precedence,
            _ => PREFIX_PRECEDENCE,
        });

        Ok(Operator {
            symbol,
            precedence,
            prefix_precedence,
            arity,
            associativity: self.associativity,
            handler,
        })
    }
}

// ============================================================================
// Standard operators
// ============================================================================

static STANDARD_OPERATORS: OnceLock<Arc<OperatorMap>> = OnceLock::new();

/// The default operator table, shared by every context created with it
pub fn standard_operators() -> &'static Arc<OperatorMap> {
    STANDARD_OPERATORS.get_or_init(|| {
        let operators = [
            standard("||", 2, Arity::Infix, Associativity::Left, op_or),
            standard("&&", 3, Arity::Infix, Associativity::Left, op_and),
            standard("==", 4, Arity::Infix, Associativity::Left, op_eq),
            standard("!=", 4, Arity::Infix, Associativity::Left, op_ne),
            standard("<", 5, Arity::Infix, Associativity::Left, op_lt),
            standard("<=", 5, Arity::Infix, Associativity::Left, op_le),
            standard(">", 5, Arity::Infix, Associativity::Left, op_gt),
            standard(">=", 5, Arity::Infix, Associativity::Left, op_ge),
            standard("+", 10, Arity::Infix, Associativity::Left, op_add),
            standard("-", 10, Arity::PrefixOrInfix, Associativity::Left, op_sub),
            standard("*", 15, Arity::Infix, Associativity::Left, op_mul),
            standard("/", 15, Arity::Infix, Associativity::Left, op_div),
            standard("%", 15, Arity::Infix, Associativity::Left, op_rem),
            standard("^", 20, Arity::Infix, Associativity::Right, op_pow),
            standard("!", PREFIX_PRECEDENCE, Arity::Prefix, Associativity::Left, op_not),
        ];

        Arc::new(
            operators
                .into_iter()
                .map(|op| (op.symbol.clone(), op))
                .collect(),
        )
    })
}

fn standard(
    symbol: &str,
    precedence: u8,
    arity: Arity,
    associativity: Associativity,
    handler: fn(&[Value]) -> FormulaResult<Value>,
) -> Operator {
    Operator {
        symbol: symbol.to_string(),
        precedence,
        prefix_precedence: PREFIX_PRECEDENCE,
        arity,
        associativity,
        handler: Arc::new(handler),
    }
}

fn first_error(operands: &[Value]) -> Option<Value> {
    operands.iter().find(|v| v.is_error()).cloned()
}

fn mismatch(symbol: &str, operands: &[Value]) -> FormulaError {
    let types: Vec<_> = operands.iter().map(Value::type_name).collect();
    FormulaError::type_mismatch(symbol, format!("cannot apply to {}", types.join(" and ")))
}

fn arithmetic(symbol: &str, operands: &[Value], op: fn(f64, f64) -> Value) -> FormulaResult<Value> {
    if let Some(err) = first_error(operands) {
        return Ok(err);
    }
    match operands {
        [Value::Number(a), Value::Number(b)] => Ok(op(*a, *b)),
        _ => Err(mismatch(symbol, operands)),
    }
}

fn op_add(operands: &[Value]) -> FormulaResult<Value> {
    if let Some(err) = first_error(operands) {
        return Ok(err);
    }
    match operands {
        [Value::Number(a), Value::Number(b)] => Ok(Value::Number(a + b)),
        [Value::String(a), Value::String(b)] => Ok(Value::String(format!("{}{}", a, b))),
        [Value::String(a), b @ (Value::Number(_) | Value::Bool(_) | Value::Nothing)] => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        [a @ (Value::Number(_) | Value::Bool(_) | Value::Nothing), Value::String(b)] => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        [Value::List(a), Value::List(b)] => Ok(Value::List(a.iter().chain(b).cloned().collect())),
        _ => Err(mismatch("+", operands)),
    }
}

fn op_sub(operands: &[Value]) -> FormulaResult<Value> {
    match operands {
        [Value::Error(_)] => Ok(operands[0].clone()),
        [Value::Number(n)] => Ok(Value::Number(-n)),
        [_] => Err(mismatch("-", operands)),
        _ => arithmetic("-", operands, |a, b| Value::Number(a - b)),
    }
}

fn op_mul(operands: &[Value]) -> FormulaResult<Value> {
    arithmetic("*", operands, |a, b| Value::Number(a * b))
}

fn op_div(operands: &[Value]) -> FormulaResult<Value> {
    arithmetic("/", operands, |a, b| {
        if b == 0.0 {
            Value::Error(DIVISION_BY_ZERO.to_string())
        } else {
            Value::Number(a / b)
        }
    })
}

fn op_rem(operands: &[Value]) -> FormulaResult<Value> {
    arithmetic("%", operands, |a, b| {
        if b == 0.0 {
            Value::Error(DIVISION_BY_ZERO.to_string())
        } else {
            Value::Number(a % b)
        }
    })
}

fn op_pow(operands: &[Value]) -> FormulaResult<Value> {
    arithmetic("^", operands, |a, b| Value::Number(a.powf(b)))
}

fn compare(symbol: &str, operands: &[Value], test: fn(Ordering) -> bool) -> FormulaResult<Value> {
    if let Some(err) = first_error(operands) {
        return Ok(err);
    }
    let ordering = match operands {
        [Value::Number(a), Value::Number(b)] => a.partial_cmp(b),
        [Value::String(a), Value::String(b)] => Some(a.cmp(b)),
        _ => return Err(mismatch(symbol, operands)),
    };
    // NaN compares false both ways
    Ok(Value::Bool(ordering.map_or(false, test)))
}

fn op_lt(operands: &[Value]) -> FormulaResult<Value> {
    compare("<", operands, Ordering::is_lt)
}

fn op_le(operands: &[Value]) -> FormulaResult<Value> {
    compare("<=", operands, Ordering::is_le)
}

fn op_gt(operands: &[Value]) -> FormulaResult<Value> {
    compare(">", operands, Ordering::is_gt)
}

fn op_ge(operands: &[Value]) -> FormulaResult<Value> {
    compare(">=", operands, Ordering::is_ge)
}

fn op_eq(operands: &[Value]) -> FormulaResult<Value> {
    if let Some(err) = first_error(operands) {
        return Ok(err);
    }
    Ok(Value::Bool(operands[0] == operands[1]))
}

fn op_ne(operands: &[Value]) -> FormulaResult<Value> {
    if let Some(err) = first_error(operands) {
        return Ok(err);
    }
    Ok(Value::Bool(operands[0] != operands[1]))
}

fn logic(symbol: &str, operands: &[Value], op: fn(bool, bool) -> bool) -> FormulaResult<Value> {
    if let Some(err) = first_error(operands) {
        return Ok(err);
    }
    match operands {
        [Value::Bool(a), Value::Bool(b)] => Ok(Value::Bool(op(*a, *b))),
        _ => Err(mismatch(symbol, operands)),
    }
}

fn op_and(operands: &[Value]) -> FormulaResult<Value> {
    logic("&&", operands, |a, b| a && b)
}

fn op_or(operands: &[Value]) -> FormulaResult<Value> {
    logic("||", operands, |a, b| a || b)
}

fn op_not(operands: &[Value]) -> FormulaResult<Value> {
    match operands {
        [Value::Error(_)] => Ok(operands[0].clone()),
        [Value::Bool(b)] => Ok(Value::Bool(!b)),
        _ => Err(mismatch("!", operands)),
    }
}
