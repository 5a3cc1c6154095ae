//! Expression tree types

use std::fmt;

/// Parsed formula expression
///
/// Operators are kept by symbol rather than resolved to handlers so that one tree
/// can be evaluated under contexts with different operator bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal, escapes decoded
    String(String),
    /// Boolean literal
    Bool(bool),
    /// The `nothing` literal
    Nothing,

    // === References ===
    /// Global lookup
    Name(String),
    /// Data source lookup, raw `column:row` text
    Address(String),

    // === Operators ===
    /// Prefix (one operand), infix (two) or variadic chain (two or more)
    Operation {
        operator: String,
        operands: Vec<Expr>,
    },

    // === Postfix ===
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        target: Box<Expr>,
        member: String,
    },

    // === Collections ===
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
}

impl Expr {
    pub(crate) fn operation(operator: &str, operands: Vec<Expr>) -> Self {
        Expr::Operation {
            operator: operator.to_string(),
            operands,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Fully parenthesized rendering, mainly for tests and debugging
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::String(s) => write!(f, "{:?}", s),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Nothing => f.write_str("nothing"),
            Expr::Name(name) => f.write_str(name),
            Expr::Address(address) => f.write_str(address),
            Expr::Operation { operator, operands } => match operands.as_slice() {
                [operand] => write!(f, "({}{})", operator, operand),
                _ => {
                    f.write_str("(")?;
                    for (i, operand) in operands.iter().enumerate() {
                        if i > 0 {
                            write!(f, " {} ", operator)?;
                        }
                        write!(f, "{}", operand)?;
                    }
                    f.write_str(")")
                }
            },
            Expr::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Member { target, member } => write!(f, "{}.{}", target, member),
            Expr::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}
