//! Standard globals
//!
//! Every [`Context::new`](crate::Context::new) starts with these bindings: math
//! constants, math and text functions, and table introspection over the bound data
//! source. They are ordinary globals and can be shadowed or replaced like any other.

pub mod math;
pub mod table;
pub mod text;

use crate::context::{Context, Globals};
use crate::error::{FormulaError, FormulaResult};
use crate::value::{Function, Value};
use ahash::AHashMap;
use std::sync::{Arc, OnceLock};

/// Function implementation signature
///
/// Functions receive the calling context, which table functions use to reach the
/// data source.
pub type FunctionImpl = fn(&[Value], &Context) -> FormulaResult<Value>;

/// Function definition
#[derive(Debug, Clone, Copy)]
pub struct FunctionDef {
    /// Global name
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Wrap as a callable value; the argument count is checked before dispatch
    pub fn to_value(&self) -> Value {
        let implementation = self.implementation;
        Value::Function(Function::native_with_arity(
            self.name,
            self.min_args,
            self.max_args,
            move |cx, args| implementation(args, cx),
        ))
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_text_functions();
        registry.register_table_functions();

        registry
    }

    /// Look up a function by name (case-sensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Register a function, replacing any with the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    /// All registered functions, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &FunctionDef> + '_ {
        self.functions.values()
    }

    /// Bind every function as a global, replacing bindings with the same name
    pub(crate) fn bind_into(&self, globals: &mut Globals) {
        for def in self.iter() {
            globals.insert(def.name.to_string(), def.to_value());
        }
    }

    fn register_math_functions(&mut self) {
        let unary: [(&'static str, FunctionImpl); 17] = [
            ("sin", math::fn_sin),
            ("cos", math::fn_cos),
            ("tan", math::fn_tan),
            ("sinh", math::fn_sinh),
            ("cosh", math::fn_cosh),
            ("tanh", math::fn_tanh),
            ("asin", math::fn_asin),
            ("acos", math::fn_acos),
            ("atan", math::fn_atan),
            ("asinh", math::fn_asinh),
            ("acosh", math::fn_acosh),
            ("atanh", math::fn_atanh),
            ("abs", math::fn_abs),
            ("sqrt", math::fn_sqrt),
            ("floor", math::fn_floor),
            ("ceil", math::fn_ceil),
            ("ln", math::fn_ln),
        ];
        for (name, implementation) in unary {
            self.register(FunctionDef {
                name,
                min_args: 1,
                max_args: Some(1),
                implementation,
            });
        }

        // ATAN2
        self.register(FunctionDef {
            name: "atan2",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_atan2,
        });

        // ROUND
        self.register(FunctionDef {
            name: "round",
            min_args: 1,
            max_args: Some(2),
            implementation: math::fn_round,
        });

        // MIN / MAX / SUM
        self.register(FunctionDef {
            name: "min",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
        });
        self.register(FunctionDef {
            name: "max",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
        });
        self.register(FunctionDef {
            name: "sum",
            min_args: 0,
            max_args: None,
            implementation: math::fn_sum,
        });
    }

    fn register_text_functions(&mut self) {
        let single: [(&'static str, FunctionImpl); 6] = [
            ("toString", text::fn_to_string),
            ("identity", text::fn_identity),
            ("len", text::fn_len),
            ("upper", text::fn_upper),
            ("lower", text::fn_lower),
            ("typeOf", text::fn_type_of),
        ];
        for (name, implementation) in single {
            self.register(FunctionDef {
                name,
                min_args: 1,
                max_args: Some(1),
                implementation,
            });
        }
    }

    fn register_table_functions(&mut self) {
        self.register(FunctionDef {
            name: "columns",
            min_args: 0,
            max_args: Some(0),
            implementation: table::fn_columns,
        });
        self.register(FunctionDef {
            name: "rowCount",
            min_args: 0,
            max_args: Some(0),
            implementation: table::fn_row_count,
        });
        self.register(FunctionDef {
            name: "row",
            min_args: 1,
            max_args: Some(1),
            implementation: table::fn_row,
        });
        self.register(FunctionDef {
            name: "rows",
            min_args: 0,
            max_args: Some(0),
            implementation: table::fn_rows,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static STANDARD_GLOBALS: OnceLock<Arc<Globals>> = OnceLock::new();

/// Constants plus every registered function, built once and shared
pub fn standard_globals() -> &'static Arc<Globals> {
    STANDARD_GLOBALS.get_or_init(|| {
        let mut globals = Globals::new();
        for (name, value) in math::CONSTANTS {
            globals.insert(name.to_string(), Value::Number(*value));
        }
        FunctionRegistry::new().bind_into(&mut globals);
        Arc::new(globals)
    })
}

// === Argument helpers ===

/// First in-band error among the arguments, returned as the result unchanged
pub(crate) fn first_error(args: &[Value]) -> Option<Value> {
    args.iter().find(|v| v.is_error()).cloned()
}

pub(crate) fn expect_number(function: &str, value: &Value) -> FormulaResult<f64> {
    value.as_number().ok_or_else(|| {
        FormulaError::type_mismatch(
            function,
            format!("expected a number, got {}", value.type_name()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_lookup() {
        let registry = FunctionRegistry::new();
        let round = registry.get("round").unwrap();
        assert_eq!((round.min_args, round.max_args), (1, Some(2)));
        assert!(registry.get("ROUND").is_none());
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_standard_globals() {
        let globals = standard_globals();
        for name in ["PI", "π", "e", "E", "LOG2_E", "LOG2_10", "LOG10_2"] {
            assert!(globals[name].as_number().is_some(), "{} should be a number", name);
        }
        for name in ["sin", "atan2", "toString", "identity", "len", "columns", "rows"] {
            assert!(globals[name].as_function().is_some(), "{} should be callable", name);
        }
    }

    #[test]
    fn test_arity_checked_before_dispatch() {
        let cx = Context::default();
        let err = cx.evaluate_str("atan2(1)").unwrap_err();
        assert!(matches!(
            err,
            FormulaError::ArgumentCount { ref function, actual: 1, .. } if function == "atan2"
        ));
        assert!(cx.evaluate_str("min()").is_err());
        assert!(cx.evaluate_str("rowCount(1)").is_err());
    }

    fn fn_double(args: &[Value], _cx: &Context) -> FormulaResult<Value> {
        Ok(Value::Number(2.0 * expect_number("double", &args[0])?))
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = FunctionRegistry::new();
        registry.register(FunctionDef {
            name: "double",
            min_args: 1,
            max_args: Some(1),
            implementation: fn_double,
        });

        let cx = Context::empty(crate::source::EmptySource).with_registry(&registry);
        assert_eq!(cx.evaluate_str("double(sqrt(16))").unwrap(), 8.0);
        assert!(matches!(
            cx.evaluate_str("double(1, 2)").unwrap_err(),
            FormulaError::ArgumentCount { actual: 2, .. }
        ));
        // constants are not part of a registry
        assert!(cx.global("PI").is_none());

        let mut cx = Context::default();
        assert!(cx.global("double").is_none());
        cx.push_registry(&registry);
        assert_eq!(cx.evaluate_str("double(PI) / PI").unwrap(), 2.0);
    }

    #[test]
    fn test_globals_can_be_shadowed() {
        let cx = Context::default().with_global("PI", 3.0);
        assert_eq!(cx.evaluate_str("PI").unwrap(), 3.0);
        assert_eq!(
            Context::default().evaluate_str("PI").unwrap(),
            std::f64::consts::PI
        );
    }
}
