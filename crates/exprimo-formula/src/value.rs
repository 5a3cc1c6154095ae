//! Runtime values and callables

use crate::ast::Expr;
use crate::context::Context;
use crate::error::{FormulaError, FormulaResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Result of evaluating an expression
#[derive(Debug, Clone)]
pub enum Value {
    /// Numeric value
    Number(f64),
    /// String value
    String(String),
    /// Boolean value
    Bool(bool),
    /// The null-like `nothing`
    Nothing,
    /// Ordered sequence
    List(Vec<Value>),
    /// Key/value structure
    Map(BTreeMap<String, Value>),
    /// Host or formula-defined function
    Function(Function),
    /// In-band error, such as division by zero. Propagates through operators.
    Error(String),
}

impl Value {
    /// Short name of the variant, as reported by `typeOf`
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Nothing => "nothing",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
            Value::Error(_) => "error",
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as map
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Get as callable
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Wrap a host function as a value
    pub fn native<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Context, &[Value]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Value::Function(Function::native(name, handler))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nothing, Value::Nothing) => true,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq<f64> for Value {
    fn eq(&self, other: &f64) -> bool {
        self.as_number() == Some(*other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

/// Strings print raw at the top level and quoted inside collections
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write_nested(other, f),
        }
    }
}

fn write_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Number(n) => write!(f, "{}", n),
        Value::String(s) => write!(f, "{:?}", s),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Nothing => f.write_str("nothing"),
        Value::List(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_nested(item, f)?;
            }
            f.write_str("]")
        }
        Value::Map(entries) => {
            f.write_str("{")?;
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: ", key)?;
                write_nested(item, f)?;
            }
            f.write_str("}")
        }
        Value::Function(function) => write!(f, "<function {}>", function.name()),
        Value::Error(message) => write!(f, "#ERROR({})", message),
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Signature of host functions
pub type NativeHandler = dyn Fn(&Context, &[Value]) -> FormulaResult<Value> + Send + Sync;

/// A host function with an argument-count range
pub struct NativeFunction {
    name: String,
    min_args: usize,
    max_args: Option<usize>,
    handler: Box<NativeHandler>,
}

/// A formula-defined function: parameters, body and the context it was defined in
pub struct Lambda {
    name: String,
    params: Vec<String>,
    body: Expr,
    scope: Context,
}

/// A callable value
///
/// Cloning is cheap; clones compare equal to each other and to nothing else.
#[derive(Clone)]
pub enum Function {
    Native(Arc<NativeFunction>),
    Formula(Arc<Lambda>),
}

impl Function {
    /// Host function accepting any number of arguments
    pub fn native<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Context, &[Value]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Self::native_with_arity(name, 0, None, handler)
    }

    /// Host function with an argument-count range, checked before dispatch
    pub fn native_with_arity<F>(
        name: impl Into<String>,
        min_args: usize,
        max_args: Option<usize>,
        handler: F,
    ) -> Self
    where
        F: Fn(&Context, &[Value]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        Function::Native(Arc::new(NativeFunction {
            name: name.into(),
            min_args,
            max_args,
            handler: Box::new(handler),
        }))
    }

    /// Formula function capturing `scope`
    pub fn lambda(name: impl Into<String>, params: Vec<String>, body: Expr, scope: Context) -> Self {
        Function::Formula(Arc::new(Lambda {
            name: name.into(),
            params,
            body,
            scope,
        }))
    }

    /// Name the function was created with
    pub fn name(&self) -> &str {
        match self {
            Function::Native(native) => &native.name,
            Function::Formula(lambda) => &lambda.name,
        }
    }

    /// Parameter names of a formula function; empty for host functions
    pub fn params(&self) -> &[String] {
        match self {
            Function::Native(_) => &[],
            Function::Formula(lambda) => &lambda.params,
        }
    }

    /// Whether both handles refer to the same function
    pub fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Native(a), Function::Native(b)) => Arc::ptr_eq(a, b),
            (Function::Formula(a), Function::Formula(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Invoke with already-evaluated arguments
    ///
    /// Host functions receive the calling context. Formula functions run in a child
    /// of the context they were defined in, with the function bound under its own
    /// name (so it can recurse) and each parameter bound in declared order. The
    /// caller's context is never modified.
    pub fn call(&self, cx: &Context, args: &[Value]) -> FormulaResult<Value> {
        match self {
            Function::Native(native) => {
                let count = args.len();
                let too_many = native.max_args.map_or(false, |max| count > max);
                if count < native.min_args || too_many {
                    return Err(FormulaError::argument_count(
                        &native.name,
                        describe_arity(native.min_args, native.max_args),
                        count,
                    ));
                }
                (native.handler)(cx, args)
            }
            Function::Formula(lambda) => {
                if args.len() != lambda.params.len() {
                    return Err(FormulaError::argument_count(
                        &lambda.name,
                        lambda.params.len().to_string(),
                        args.len(),
                    ));
                }

                let depth = cx.next_depth()?;
                log::debug!("calling {} at depth {}", lambda.name, depth);

                let bindings = std::iter::once((lambda.name.clone(), Value::Function(self.clone())))
                    .chain(lambda.params.iter().cloned().zip(args.iter().cloned()));
                let child = lambda
                    .scope
                    .with_globals(bindings)
                    .with_options(cx.options().clone())
                    .at_depth(depth);

                crate::evaluator::evaluate_expr(&lambda.body, &child)
            }
        }
    }
}

pub(crate) fn describe_arity(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{} to {}", min, max),
        None => format!("at least {}", min),
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native(native) => f
                .debug_struct("Native")
                .field("name", &native.name)
                .field("min_args", &native.min_args)
                .field("max_args", &native.max_args)
                .finish_non_exhaustive(),
            Function::Formula(lambda) => f
                .debug_struct("Formula")
                .field("name", &lambda.name)
                .field("params", &lambda.params)
                .field("body", &lambda.body)
                .finish_non_exhaustive(),
        }
    }
}
