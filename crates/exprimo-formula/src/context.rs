//! Evaluation context
//!
//! A [`Context`] bundles the global bindings, the operator table and the bound
//! [`DataSource`]. Both binding maps sit behind `Arc`s and are copied on first write,
//! so the two ways of changing a context are cheap:
//!
//! - `push_*` methods mutate the context in place (a session adding definitions)
//! - `with_*` methods return a derived context and leave `self` untouched (scoping)
//!
//! Cloning yields a context whose bindings are independent of the original; only the
//! provider is shared.

use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator;
use crate::functions::{standard_globals, FunctionRegistry};
use crate::operator::{standard_operators, Operator, OperatorMap};
use crate::parser;
use crate::source::{DataSource, EmptySource};
use crate::token::Token;
use crate::tokenizer::Tokenizer;
use crate::value::{Function, Value};
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

/// Name-to-value bindings
pub type Globals = AHashMap<String, Value>;

/// Evaluation limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Maximum nesting of formula function calls and data source queries
    pub max_depth: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Evaluation environment
///
/// # Example
/// ```rust
/// use exprimo_formula::{Context, Value};
///
/// let mut cx = Context::default();
/// cx.push_global("x", "Hello");
/// assert_eq!(cx.evaluate_str("x + x").unwrap(), "HelloHello");
///
/// let scoped = cx.with_global("x", 2.0);
/// assert_eq!(scoped.evaluate_str("x * 3").unwrap(), 6.0);
/// assert_eq!(cx.global("x"), Some(&Value::from("Hello")));
/// ```
#[derive(Clone)]
pub struct Context {
    globals: Arc<Globals>,
    operators: Arc<OperatorMap>,
    provider: Arc<dyn DataSource>,
    options: EvaluationOptions,
    depth: usize,
}

impl Context {
    /// Context with the standard globals and operators
    pub fn new<P: DataSource + 'static>(provider: P) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    /// Like [`Context::new`], for a provider that is already shared
    pub fn from_shared(provider: Arc<dyn DataSource>) -> Self {
        Self {
            globals: Arc::clone(standard_globals()),
            operators: Arc::clone(standard_operators()),
            provider,
            options: EvaluationOptions::default(),
            depth: 0,
        }
    }

    /// Context with the standard operators but no globals
    pub fn empty<P: DataSource + 'static>(provider: P) -> Self {
        Self {
            globals: Arc::new(Globals::new()),
            ..Self::new(provider)
        }
    }

    // === Globals ===

    /// Bind `name` in place, replacing any previous binding
    pub fn push_global(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        Arc::make_mut(&mut self.globals).insert(name.into(), value.into());
    }

    /// Derive a context with `name` bound
    pub fn with_global(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut derived = self.clone();
        derived.push_global(name, value);
        derived
    }

    /// Derive a context with several bindings, applied in order
    pub(crate) fn with_globals<I>(&self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut derived = self.clone();
        Arc::make_mut(&mut derived.globals).extend(bindings);
        derived
    }

    /// Look up a global
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// All global bindings, in no particular order
    pub fn globals(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.globals.iter().map(|(k, v)| (k.as_str(), v))
    }

    // === Operators ===

    /// Register an operator in place, replacing any operator with the same symbol
    pub fn push_operator(&mut self, operator: Operator) {
        let symbol = operator.symbol().to_string();
        if let Some(previous) = Arc::make_mut(&mut self.operators).insert(symbol, operator) {
            log::debug!("replaced operator '{}'", previous.symbol());
        }
    }

    /// Derive a context with `operator` registered
    pub fn with_operator(&self, operator: Operator) -> Self {
        let mut derived = self.clone();
        derived.push_operator(operator);
        derived
    }

    /// Look up an operator by symbol
    pub fn operator(&self, symbol: &str) -> Option<&Operator> {
        self.operators.get(symbol)
    }

    /// All registered operators, in no particular order
    pub fn operators(&self) -> impl Iterator<Item = &Operator> + '_ {
        self.operators.values()
    }

    pub(crate) fn operator_map(&self) -> &OperatorMap {
        &self.operators
    }

    /// Tokenizer that knows this context's operator symbols
    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(self.operators.keys())
    }

    // === Functions ===

    /// Bind a host function in place
    pub fn push_fn<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&Context, &[Value]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let function = Function::native(name.clone(), handler);
        self.push_global(name, function);
    }

    /// Derive a context with a host function bound
    pub fn with_fn<F>(&self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Context, &[Value]) -> FormulaResult<Value> + Send + Sync + 'static,
    {
        let mut derived = self.clone();
        derived.push_fn(name, handler);
        derived
    }

    /// Bind every function of `registry` in place
    pub fn push_registry(&mut self, registry: &FunctionRegistry) {
        registry.bind_into(Arc::make_mut(&mut self.globals));
    }

    /// Derive a context with every function of `registry` bound
    ///
    /// # Example
    /// ```rust
    /// use exprimo_formula::{Context, EmptySource, FunctionRegistry};
    ///
    /// let cx = Context::empty(EmptySource).with_registry(&FunctionRegistry::new());
    /// assert_eq!(cx.evaluate_str("max(2, 7)").unwrap(), 7.0);
    /// ```
    pub fn with_registry(&self, registry: &FunctionRegistry) -> Self {
        let mut derived = self.clone();
        derived.push_registry(registry);
        derived
    }

    /// Build a formula function that captures this context
    ///
    /// `body` is parsed now, with this context's operators.
    pub fn function(&self, name: &str, params: &[&str], body: &str) -> FormulaResult<Value> {
        let body = self.parse(body)?;
        let params = params.iter().map(|p| p.to_string()).collect();
        Ok(Value::Function(Function::lambda(name, params, body, self.clone())))
    }

    /// Define a formula function as a global, in place
    ///
    /// # Example
    /// ```rust
    /// use exprimo_formula::Context;
    ///
    /// let mut cx = Context::default();
    /// cx.define_function("square", &["n"], "n * n").unwrap();
    /// assert_eq!(cx.evaluate_str("square(7)").unwrap(), 49.0);
    /// ```
    pub fn define_function(&mut self, name: &str, params: &[&str], body: &str) -> FormulaResult<()> {
        let function = self.function(name, params, body)?;
        log::debug!("defined {}({})", name, params.join(", "));
        self.push_global(name, function);
        Ok(())
    }

    /// Derive a context with a formula function bound
    pub fn with_function(&self, name: &str, params: &[&str], body: &str) -> FormulaResult<Self> {
        let function = self.function(name, params, body)?;
        Ok(self.with_global(name, function))
    }

    /// Invoke a callable value
    pub fn call(&self, callee: &Value, args: &[Value]) -> FormulaResult<Value> {
        match callee {
            Value::Function(function) => function.call(self, args),
            other => Err(FormulaError::type_mismatch(
                "call",
                format!("{} is not callable", other.type_name()),
            )),
        }
    }

    // === Provider and options ===

    /// The bound data source
    pub fn provider(&self) -> &Arc<dyn DataSource> {
        &self.provider
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EvaluationOptions) {
        self.options = options;
    }

    /// Replace the options, builder style
    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    /// Current nesting depth: 0 at the top, +1 per function call or provider query
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Depth for the next nested evaluation, or [`FormulaError::RecursionLimit`]
    pub(crate) fn next_depth(&self) -> FormulaResult<usize> {
        let max = self.options.max_depth;
        if self.depth >= max {
            log::warn!("recursion limit of {} exceeded", max);
            return Err(FormulaError::RecursionLimit(max));
        }
        Ok(self.depth + 1)
    }

    /// This context one level deeper
    pub(crate) fn descend(&self) -> FormulaResult<Self> {
        let depth = self.next_depth()?;
        Ok(self.clone().at_depth(depth))
    }

    // === Evaluation ===

    /// Tokenize with this context's operator symbols
    pub fn tokenize(&self, source: &str) -> FormulaResult<Vec<Token>> {
        self.tokenizer().tokenize(source)
    }

    /// Parse a formula into an expression tree
    pub fn parse(&self, source: &str) -> FormulaResult<Expr> {
        let tokens = self.tokenize(source)?;
        parser::parse(&tokens, &self.operators)
    }

    /// Evaluate a token sequence
    pub fn evaluate(&self, tokens: &[Token]) -> FormulaResult<Value> {
        evaluator::evaluate(tokens, self)
    }

    /// Tokenize and evaluate a formula
    pub fn evaluate_str(&self, source: &str) -> FormulaResult<Value> {
        evaluator::evaluate_str(source, self)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(EmptySource)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut symbols: Vec<_> = self.operators.keys().collect();
        symbols.sort();
        f.debug_struct("Context")
            .field("globals", &self.globals.len())
            .field("operators", &symbols)
            .field("options", &self.options)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Arity;
    use pretty_assertions::assert_eq;

    fn double_plus() -> Operator {
        Operator::builder()
            .symbol("+")
            .precedence(10)
            .handler(|operands| match operands {
                [Value::Number(a), Value::Number(b)] => Ok(Value::Number(2.0 * (a + b))),
                _ => Ok(Value::Nothing),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_context_is_send_sync() {
        fn check<T: Send + Sync>() {}
        check::<Context>();
        check::<Value>();
    }

    #[test]
    fn test_push_global_mutates() {
        let mut cx = Context::default();
        cx.push_global("x", 1.0);
        cx.push_global("x", 2.0);
        assert_eq!(cx.global("x"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_with_global_leaves_original() {
        let cx = Context::default().with_global("x", 1.0);
        let derived = cx.with_global("x", 5.0).with_global("y", 2.0);

        assert_eq!(cx.global("x"), Some(&Value::Number(1.0)));
        assert_eq!(cx.global("y"), None);
        assert_eq!(derived.global("x"), Some(&Value::Number(5.0)));
        assert_eq!(derived.global("y"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut cx = Context::default();
        cx.push_global("x", 1.0);
        let snapshot = cx.clone();

        cx.push_global("x", 9.0);
        cx.push_operator(double_plus());

        assert_eq!(snapshot.global("x"), Some(&Value::Number(1.0)));
        assert_eq!(snapshot.evaluate_str("1 + 2").unwrap(), 3.0);
        assert_eq!(cx.evaluate_str("1 + 2").unwrap(), 6.0);
        assert!(Arc::ptr_eq(snapshot.provider(), cx.provider()));
    }

    #[test]
    fn test_with_operator() {
        let cx = Context::default();
        let derived = cx.with_operator(double_plus());
        assert_eq!(derived.evaluate_str("1 + 2").unwrap(), 6.0);
        assert_eq!(cx.evaluate_str("1 + 2").unwrap(), 3.0);
    }

    #[test]
    fn test_new_operator_symbol_is_tokenized() {
        let arrow = Operator::builder()
            .symbol("->")
            .precedence(1)
            .arity(Arity::Infix)
            .handler(|operands| Ok(Value::List(operands.to_vec())))
            .build()
            .unwrap();
        let cx = Context::default().with_operator(arrow);

        assert_eq!(
            cx.evaluate_str("1 -> 2").unwrap(),
            Value::List(vec![1.into(), 2.into()])
        );
        // without the registration `->` is two operators
        assert!(Context::default().evaluate_str("1 -> 2").is_err());
    }

    #[test]
    fn test_empty_has_operators_only() {
        let cx = Context::empty(EmptySource);
        assert_eq!(cx.globals().count(), 0);
        assert_eq!(cx.evaluate_str("2 ^ 3").unwrap(), 8.0);
        assert!(Context::default().global("PI").is_some());
    }

    #[test]
    fn test_push_fn_receives_context() {
        let mut cx = Context::default();
        cx.push_global("base", 100.0);
        cx.push_fn("offset", |cx, args| {
            let base = cx.global("base").and_then(Value::as_number).unwrap_or(0.0);
            let n = args.first().and_then(Value::as_number).unwrap_or(0.0);
            Ok(Value::Number(base + n))
        });

        assert_eq!(cx.evaluate_str("offset(5)").unwrap(), 105.0);
        assert_eq!(cx.with_global("base", 1.0).evaluate_str("offset(5)").unwrap(), 6.0);
    }

    #[test]
    fn test_with_fn() {
        let cx = Context::default();
        let derived = cx.with_fn("answer", |_, _| Ok(Value::Number(42.0)));
        assert_eq!(derived.evaluate_str("answer()").unwrap(), 42.0);
        assert!(cx.global("answer").is_none());
    }

    #[test]
    fn test_function_scoping() {
        let mut cx = Context::default();
        cx.push_global("x", 1.0);
        cx.define_function("double", &["x"], "x * 2").unwrap();

        assert_eq!(cx.evaluate_str("double(21)").unwrap(), 42.0);
        assert_eq!(cx.global("x"), Some(&Value::Number(1.0)));
        assert_eq!(cx.evaluate_str("x").unwrap(), 1.0);
    }

    #[test]
    fn test_function_sees_definition_scope() {
        let mut cx = Context::default();
        cx.push_global("rate", 2.0);
        cx.define_function("scale", &["n"], "n * rate").unwrap();
        // later rebinding does not change the captured scope
        cx.push_global("rate", 10.0);

        assert_eq!(cx.evaluate_str("scale(3)").unwrap(), 6.0);
    }

    #[test]
    fn test_with_function() {
        let cx = Context::default();
        let derived = cx.with_function("inc", &["n"], "n + 1").unwrap();
        assert_eq!(derived.evaluate_str("inc(inc(1))").unwrap(), 3.0);
        assert!(cx.global("inc").is_none());
    }

    #[test]
    fn test_call() {
        let cx = Context::default();
        let inc = cx.function("inc", &["n"], "n + 1").unwrap();
        assert_eq!(cx.call(&inc, &[Value::Number(1.0)]).unwrap(), 2.0);

        let err = cx.call(&inc, &[]).unwrap_err();
        assert!(matches!(err, FormulaError::ArgumentCount { actual: 0, .. }));

        let err = cx.call(&Value::Number(1.0), &[]).unwrap_err();
        assert!(matches!(err, FormulaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_recursion_limit() {
        let mut cx = Context::default().with_options(EvaluationOptions { max_depth: 8 });
        cx.define_function("forever", &["n"], "forever(n + 1)").unwrap();

        let err = cx.evaluate_str("forever(0)").unwrap_err();
        assert!(matches!(err, FormulaError::RecursionLimit(8)));
        assert_eq!(cx.depth(), 0);
    }

    #[test]
    fn test_set_options() {
        let mut cx = Context::default();
        assert_eq!(cx.options().max_depth, 64);
        cx.set_options(EvaluationOptions { max_depth: 3 });
        assert_eq!(cx.options(), &EvaluationOptions { max_depth: 3 });
    }
}
