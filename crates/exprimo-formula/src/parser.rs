//! Formula parser
//!
//! Precedence climbing over the token stream. Operator precedence, fixity and
//! associativity come from the operator table passed in, so the grammar grows with
//! the operators registered in a context:
//!
//! ```text
//! expression := prefix (infix-op expression)*
//! prefix     := prefix-op prefix | postfix
//! postfix    := primary ( "(" args ")" | "." member )*
//! primary    := literal | name | address | "(" expression ")" | list | map
//! list       := "[" (expression ("," expression)*)? "]"
//! map        := "{" (key ":" expression ("," key ":" expression)*)? "}"
//! ```

use crate::ast::Expr;
use crate::error::{FormulaError, FormulaResult};
use crate::operator::{Arity, Associativity, Operator, OperatorMap};
use crate::token::{Token, TokenType};
use crate::tokenizer::decode_string;

/// Maximum height of a parsed expression tree
///
/// Every bracket, prefix operator, call, member access and binary operation adds a
/// level. Deeper formulas fail with a parse error instead of exhausting the stack
/// while parsing or evaluating.
pub const MAX_NESTING: usize = 256;

/// Parse a token sequence into an expression tree
///
/// # Example
/// ```rust
/// use exprimo_formula::{parse, standard_operators, tokenize};
///
/// let tokens = tokenize("1 + 2 * 3").unwrap();
/// let expr = parse(&tokens, standard_operators()).unwrap();
/// assert_eq!(expr.to_string(), "(1 + (2 * 3))");
/// ```
pub fn parse(tokens: &[Token], operators: &OperatorMap) -> FormulaResult<Expr> {
    if tokens.is_empty() {
        return Err(FormulaError::Parse("empty formula".into()));
    }

    let mut parser = Parser::new(tokens, operators);
    let expr = parser.parse_expression(0)?;

    // Make sure we consumed all tokens
    if let Some(token) = parser.current() {
        return Err(unexpected(token));
    }

    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    operators: &'a OperatorMap,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], operators: &'a OperatorMap) -> Self {
        Self {
            tokens,
            pos: 0,
            operators,
            depth: 0,
        }
    }

    // === Expression parsing with precedence ===

    fn parse_expression(&mut self, min_precedence: u16) -> FormulaResult<Expr> {
        self.nest()?;
        let base = self.depth - 1;
        let mut left = self.parse_prefix()?;
        // Symbol of the variadic operation `left` was built by in this loop, if any
        let mut chain: Option<&str> = None;

        while let Some(token) = self.current() {
            if !token.is(TokenType::Operator) {
                break;
            }

            let operator = self.lookup(token)?;
            if !operator.arity().is_infix() {
                return Err(FormulaError::Parse(format!(
                    "'{}' at offset {} is not an infix operator",
                    token.text(),
                    token.offset()
                )));
            }

            let precedence = u16::from(operator.precedence());
            if precedence < min_precedence {
                break;
            }
            self.consume();

            let next_min = match operator.associativity() {
                Associativity::Left => precedence + 1,
                Associativity::Right => precedence,
            };
            let right = self.parse_expression(next_min)?;

            let symbol = operator.symbol();
            let variadic = operator.arity() == Arity::Variadic;
            left = match left {
                Expr::Operation {
                    operator: current,
                    mut operands,
                } if variadic && chain == Some(symbol) => {
                    operands.push(right);
                    Expr::Operation {
                        operator: current,
                        operands,
                    }
                }
                left => {
                    self.nest()?;
                    Expr::operation(symbol, vec![left, right])
                }
            };
            chain = variadic.then_some(symbol);
        }

        self.depth = base;
        Ok(left)
    }

    fn parse_prefix(&mut self) -> FormulaResult<Expr> {
        let Some(token) = self.current() else {
            return Err(FormulaError::Parse("unexpected end of formula".into()));
        };
        if !token.is(TokenType::Operator) {
            return self.parse_postfix();
        }

        let operator = self.lookup(token)?;
        if !operator.arity().is_prefix() {
            return Err(FormulaError::Parse(format!(
                "'{}' at offset {} is not a prefix operator",
                token.text(),
                token.offset()
            )));
        }
        self.consume();

        let operand = self.parse_expression(u16::from(operator.prefix_precedence()))?;
        Ok(Expr::operation(operator.symbol(), vec![operand]))
    }

    fn parse_postfix(&mut self) -> FormulaResult<Expr> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;

        loop {
            match self.current_type() {
                Some(TokenType::LParen) => {
                    self.nest()?;
                    let open = self.consume();
                    let args = self.parse_sequence(open, TokenType::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Some(TokenType::Dot) => {
                    self.nest()?;
                    self.consume();
                    let member = self.parse_member()?;
                    expr = Expr::Member {
                        target: Box::new(expr),
                        member,
                    };
                }
                _ => break,
            }
        }

        self.depth = base;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        let Some(token) = self.current() else {
            return Err(FormulaError::Parse("unexpected end of formula".into()));
        };

        let expr = match token.token_type() {
            TokenType::Num => Expr::Number(parse_number(token)?),
            TokenType::String => Expr::String(decode_string(token.text(), token.offset())?),
            TokenType::Bool => Expr::Bool(token.text() == "true"),
            TokenType::Nothing => Expr::Nothing,
            TokenType::Name => Expr::Name(token.text().to_string()),
            TokenType::Address => Expr::Address(token.text().to_string()),
            TokenType::LParen => {
                let open = self.consume();
                let expr = self.parse_expression(0)?;
                self.expect_close(open, TokenType::RParen)?;
                return Ok(expr);
            }
            TokenType::LBracket => {
                let open = self.consume();
                return Ok(Expr::List(self.parse_sequence(open, TokenType::RBracket)?));
            }
            TokenType::LBrace => return self.parse_map(),
            _ => return Err(unexpected(token)),
        };

        self.consume();
        Ok(expr)
    }

    /// Comma-separated expressions up to `close`; the opening token is already consumed
    fn parse_sequence(&mut self, open: &Token, close: TokenType) -> FormulaResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.current_type() == Some(close) {
            self.consume();
            return Ok(items);
        }

        loop {
            items.push(self.parse_expression(0)?);
            if self.current_type() == Some(TokenType::Comma) {
                self.consume();
                continue;
            }
            self.expect_close(open, close)?;
            return Ok(items);
        }
    }

    fn parse_map(&mut self) -> FormulaResult<Expr> {
        let open = self.consume();
        let mut entries = Vec::new();
        if self.current_type() == Some(TokenType::RBrace) {
            self.consume();
            return Ok(Expr::Map(entries));
        }

        loop {
            let key = self.parse_key()?;

            match self.current() {
                Some(token) if token.is(TokenType::Operator) && token.text() == ":" => {
                    self.consume();
                }
                Some(token) => {
                    return Err(FormulaError::Parse(format!(
                        "expected ':' after map key, got '{}' at offset {}",
                        token.text(),
                        token.offset()
                    )))
                }
                None => return Err(FormulaError::Parse("unexpected end of formula".into())),
            }

            let value = self.parse_expression(0)?;
            entries.push((key, value));

            if self.current_type() == Some(TokenType::Comma) {
                self.consume();
                continue;
            }
            self.expect_close(open, TokenType::RBrace)?;
            return Ok(Expr::Map(entries));
        }
    }

    fn parse_key(&mut self) -> FormulaResult<String> {
        let key = match self.current() {
            Some(token) => match token.token_type() {
                TokenType::Name | TokenType::Num => token.text().to_string(),
                TokenType::String => decode_string(token.text(), token.offset())?,
                _ => {
                    return Err(FormulaError::Parse(format!(
                        "expected map key, got '{}' at offset {}",
                        token.text(),
                        token.offset()
                    )))
                }
            },
            None => return Err(FormulaError::Parse("unexpected end of formula".into())),
        };
        self.consume();
        Ok(key)
    }

    fn parse_member(&mut self) -> FormulaResult<String> {
        let member = match self.current() {
            Some(token) => match token.token_type() {
                TokenType::Name | TokenType::Num => token.text().to_string(),
                TokenType::String => decode_string(token.text(), token.offset())?,
                _ => {
                    return Err(FormulaError::Parse(format!(
                        "expected member name after '.', got '{}' at offset {}",
                        token.text(),
                        token.offset()
                    )))
                }
            },
            None => {
                return Err(FormulaError::Parse(
                    "expected member name after '.'".into(),
                ))
            }
        };
        self.consume();
        Ok(member)
    }

    // === Helper methods ===

    /// One level deeper in the tree being built
    fn nest(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(FormulaError::Parse("formula nested too deeply".into()));
        }
        Ok(())
    }

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn current_type(&self) -> Option<TokenType> {
        self.current().map(Token::token_type)
    }

    /// Advance past the current token and return it. Only called after a peek.
    fn consume(&mut self) -> &'a Token {
        let token = &self.tokens[self.pos];
        self.pos += 1;
        token
    }

    fn expect_close(&mut self, open: &Token, close: TokenType) -> FormulaResult<()> {
        match self.current() {
            Some(token) if token.is(close) => {
                self.consume();
                Ok(())
            }
            Some(token) => Err(FormulaError::Parse(format!(
                "expected ',' or closing bracket for '{}' at offset {}, got '{}' at offset {}",
                open.text(),
                open.offset(),
                token.text(),
                token.offset()
            ))),
            None => Err(FormulaError::Parse(format!(
                "unclosed '{}' at offset {}",
                open.text(),
                open.offset()
            ))),
        }
    }

    fn lookup(&self, token: &Token) -> FormulaResult<&'a Operator> {
        self.operators
            .get(token.text())
            .ok_or_else(|| FormulaError::UnknownOperator(token.text().to_string()))
    }
}

fn parse_number(token: &Token) -> FormulaResult<f64> {
    token
        .text()
        .parse()
        .map_err(|_| FormulaError::Parse(format!("invalid number '{}'", token.text())))
}

fn unexpected(token: &Token) -> FormulaError {
    FormulaError::Parse(format!(
        "unexpected '{}' at offset {}",
        token.text(),
        token.offset()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::operator::standard_operators;
    use crate::tokenizer::{tokenize, Tokenizer};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn parse_str(source: &str) -> FormulaResult<Expr> {
        parse(&tokenize(source)?, standard_operators())
    }

    fn render(source: &str) -> String {
        parse_str(source).unwrap().to_string()
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_str("42").unwrap(), Expr::Number(42.0));
        assert_eq!(parse_str("3.25").unwrap(), Expr::Number(3.25));
        assert_eq!(parse_str("'a''b'").unwrap(), Expr::String("a'b".into()));
        assert_eq!(parse_str("false").unwrap(), Expr::Bool(false));
        assert_eq!(parse_str("nothing").unwrap(), Expr::Nothing);
        assert_eq!(parse_str("price:3").unwrap(), Expr::Address("price:3".into()));
    }

    #[test]
    fn test_parse_precedence() {
        assert_eq!(render("1+2*3"), "(1 + (2 * 3))");
        assert_eq!(render("(1+2)*3"), "((1 + 2) * 3)");
        assert_eq!(render("a < b && c || d"), "(((a < b) && c) || d)");
        assert_eq!(render("a == b < c"), "(a == (b < c))");
        assert_eq!(render("1 + 2 % 3"), "(1 + (2 % 3))");
    }

    #[test]
    fn test_parse_associativity() {
        assert_eq!(render("10-2-3"), "((10 - 2) - 3)");
        assert_eq!(render("8/4/2"), "((8 / 4) / 2)");
        assert_eq!(render("2^3^2"), "(2 ^ (3 ^ 2))");
    }

    #[test]
    fn test_parse_prefix() {
        assert_eq!(render("-2^2"), "(-(2 ^ 2))");
        assert_eq!(render("-a*b"), "((-a) * b)");
        assert_eq!(render("2 * -3"), "(2 * (-3))");
        assert_eq!(render("--1"), "(-(-1))");
        assert_eq!(render("!a && b"), "((!a) && b)");
    }

    #[test]
    fn test_parse_postfix() {
        assert_eq!(render("f(1, x)(2)"), "f(1, x)(2)");
        assert_eq!(render("f()"), "f()");
        assert_eq!(render("xs.0.name"), "xs.0.name");
        assert_eq!(render("m.'a b'"), "m.a b");
        assert_eq!(render("-xs.0"), "(-xs.0)");
    }

    #[test]
    fn test_parse_collections() {
        assert_eq!(render("[1, [2], []]"), "[1, [2], []]");
        assert_eq!(render("{}"), "{}");
        assert_eq!(render("{a: 1, 'b c': x:2, 3: [4]}"), "{a: 1, b c: x:2, 3: [4]}");
        assert_eq!(render("{a:-1}"), "{a: (-1)}");
    }

    #[test]
    fn test_parse_errors() {
        for source in ["1 +", "(1", "1)", "[1,", "[1,]", "f(1 2)", "{a 1}", "{a: }", "{+: 1}", "x.", "x.(", "()"] {
            let err = parse_str(source).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse, "{:?} -> {}", source, err);
        }
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse(&[], standard_operators()), Err(FormulaError::Parse(_))));
        assert!(matches!(parse_str("   "), Err(FormulaError::Parse(_))));
    }

    #[test]
    fn test_parse_fixity_errors() {
        let err = parse_str("* 2").unwrap_err();
        assert!(err.to_string().contains("not a prefix operator"));

        let err = parse_str("1 ! 2").unwrap_err();
        assert!(err.to_string().contains("not an infix operator"));
    }

    #[test]
    fn test_unknown_operator() {
        let err = parse_str("1 ~ 2").unwrap_err();
        assert!(matches!(err, FormulaError::UnknownOperator(ref s) if s == "~"));
    }

    #[test]
    fn test_variadic_chain() {
        let mut operators = (**standard_operators()).clone();
        let concat = Operator::builder()
            .symbol("~")
            .precedence(8)
            .arity(Arity::Variadic)
            .handler(|operands| Ok(Value::from(operands.len())))
            .build()
            .unwrap();
        operators.insert("~".to_string(), concat);

        let tokens = Tokenizer::new(operators.keys()).tokenize("a ~ b ~ c + 1").unwrap();
        let expr = parse(&tokens, &operators).unwrap();
        assert_eq!(expr.to_string(), "(a ~ b ~ (c + 1))");

        // a parenthesized chain is its own operation
        let tokens = Tokenizer::new(operators.keys()).tokenize("(a ~ b) ~ c").unwrap();
        let expr = parse(&tokens, &operators).unwrap();
        assert_eq!(expr.to_string(), "((a ~ b) ~ c)");
    }

    fn assert_too_deep(source: &str) {
        match parse_str(source) {
            Err(FormulaError::Parse(message)) => assert_eq!(message, "formula nested too deeply"),
            other => panic!("expected a nesting error, got {:?}", other.map(|e| e.to_string())),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = 20_000;
        assert_too_deep(&format!("{}1{}", "(".repeat(deep), ")".repeat(deep)));
        assert_too_deep(&format!("{}1{}", "[".repeat(deep), "]".repeat(deep)));
        assert_too_deep(&format!("{}1", "-".repeat(deep)));
        assert_too_deep(&format!("{}true", "!".repeat(deep)));
        assert_too_deep(&format!("{}1{}", "f(".repeat(deep), ")".repeat(deep)));
        assert_too_deep(&format!("{}1", "{a: ".repeat(deep)));
        assert_too_deep(&format!("2{}", "^2".repeat(deep)));
        assert_too_deep(&format!("1{}", "+1".repeat(deep)));
        assert_too_deep(&format!("f{}", "()".repeat(deep)));
        assert_too_deep(&format!("m{}", ".a".repeat(deep)));
    }

    #[test]
    fn test_nesting_within_limit() {
        let depth = 60;
        let source = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse_str(&source).unwrap(), Expr::Number(1.0));

        let source = format!("{}x{}", "f([".repeat(depth / 2), "])".repeat(depth / 2));
        assert!(parse_str(&source).is_ok());

        let source = format!("1{}", "+1".repeat(100));
        assert!(parse_str(&source).is_ok());
    }

    #[test]
    fn test_nesting_resets_between_siblings() {
        // siblings do not add up; only the height of the tree counts
        let group = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        let source = vec![group; 40].join(", ");
        assert!(parse_str(&format!("[{}]", source)).is_ok());
    }
}
