//! Formula tokenizer
//!
//! A single pass over the source that produces a flat [`Token`] sequence. Every
//! character ends up in exactly one token or is skipped as whitespace; anything the
//! tokenizer cannot classify is a [`FormulaError::Lex`] carrying its byte offset.
//!
//! Operator characters are matched greedily against the operator symbols known when
//! the [`Tokenizer`] was built (longest symbol first). A run that starts with no known
//! multi-character symbol is split into single-character operators, so `a<-b` reads as
//! `a`, `<`, `-`, `b` unless `<-` is registered.

use crate::error::{FormulaError, FormulaResult};
use crate::operator::standard_operators;
use crate::token::{Token, TokenType};
use std::iter::Peekable;
use std::str::CharIndices;

/// Tokenize a formula using the standard operator symbols
///
/// # Example
/// ```rust
/// use exprimo_formula::{tokenize, TokenType};
///
/// let tokens = tokenize("price:0 <= 10").unwrap();
/// let types: Vec<_> = tokens.iter().map(|t| t.token_type()).collect();
/// assert_eq!(types, [TokenType::Address, TokenType::Operator, TokenType::Num]);
/// assert_eq!(tokens[1].text(), "<=");
/// ```
pub fn tokenize(source: &str) -> FormulaResult<Vec<Token>> {
    Tokenizer::standard().tokenize(source)
}

/// Tokenize a formula for tooling (syntax highlighting, inspection)
///
/// Identical to [`tokenize`]; no context is consulted.
pub fn parse_str(source: &str) -> FormulaResult<Vec<Token>> {
    tokenize(source)
}

/// Tokenizer configured with a set of operator symbols
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    /// Multi-character symbols, longest first
    symbols: Vec<String>,
}

impl Tokenizer {
    /// Create a tokenizer that recognizes the given operator symbols
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols: Vec<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| s.chars().count() > 1)
            .collect();
        symbols.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        symbols.dedup();

        Self { symbols }
    }

    /// Tokenizer for the standard operator set
    pub fn standard() -> Self {
        Self::new(standard_operators().keys())
    }

    /// Tokenize a formula
    pub fn tokenize(&self, source: &str) -> FormulaResult<Vec<Token>> {
        let tokens = Lexer::new(source, &self.symbols).run()?;
        log::trace!(
            "tokenized {} token(s) from {} byte(s)",
            tokens.len(),
            source.len()
        );
        Ok(tokens)
    }
}

/// Whether `c` may appear in an operator symbol
pub fn is_operator_char(c: char) -> bool {
    !c.is_alphanumeric()
        && !c.is_whitespace()
        && !c.is_control()
        && !matches!(
            c,
            '(' | ')' | '[' | ']' | '{' | '}' | '.' | ',' | '"' | '\'' | '_'
        )
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Digits inside names are ASCII only, the same digits a number is made of
fn is_name_continue(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit() || c == '_'
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    symbols: &'a [String],
    tokens: Vec<Token>,
    /// Currently open groups, innermost last
    groups: Vec<TokenType>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, symbols: &'a [String]) -> Self {
        Self {
            input,
            pos: 0,
            symbols,
            tokens: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn run(mut self) -> FormulaResult<Vec<Token>> {
        loop {
            self.skip_whitespace();

            let Some(c) = self.peek_char() else {
                break;
            };
            let start = self.pos;

            let token_type = match c {
                '(' => self.single(TokenType::LParen),
                ')' => self.single(TokenType::RParen),
                '[' => self.single(TokenType::LBracket),
                ']' => self.single(TokenType::RBracket),
                '{' => self.single(TokenType::LBrace),
                '}' => self.single(TokenType::RBrace),
                '.' => self.single(TokenType::Dot),
                ',' => self.single(TokenType::Comma),
                '"' | '\'' => self.scan_string(c)?,
                c if c.is_ascii_digit() => self.scan_number(),
                c if is_name_start(c) => self.scan_name(),
                c if is_operator_char(c) => self.scan_operator(),
                c => {
                    return Err(FormulaError::Lex {
                        offset: start,
                        message: format!("unrecognized character {:?}", c),
                    })
                }
            };

            self.push(token_type, start);
        }

        Ok(self.tokens)
    }

    fn push(&mut self, token_type: TokenType, start: usize) {
        if token_type.is_open() {
            self.groups.push(token_type);
        } else if token_type.is_close() {
            self.groups.pop();
        }
        self.tokens
            .push(Token::new(token_type, &self.input[start..self.pos], start));
    }

    fn single(&mut self, token_type: TokenType) -> TokenType {
        self.advance();
        token_type
    }

    fn last_type(&self) -> Option<TokenType> {
        self.tokens.last().map(Token::token_type)
    }

    /// Directly inside `{ }`, right after the brace or a comma: the key of an entry
    fn at_map_key(&self) -> bool {
        self.groups.last() == Some(&TokenType::LBrace)
            && matches!(
                self.last_type(),
                Some(TokenType::LBrace | TokenType::Comma)
            )
    }

    fn scan_number(&mut self) -> TokenType {
        self.eat_digits();

        // After a member-access dot only an integer index is taken, so `xs.0.1` is two accesses
        if self.last_type() != Some(TokenType::Dot)
            && self.peek_char() == Some('.')
            && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            self.advance();
            self.eat_digits();
        }

        TokenType::Num
    }

    fn scan_name(&mut self) -> TokenType {
        let start = self.pos;
        self.advance();
        while self.peek_char().map_or(false, is_name_continue) {
            self.advance();
        }

        match &self.input[start..self.pos] {
            "true" | "false" => return TokenType::Bool,
            "nothing" => return TokenType::Nothing,
            _ => {}
        }

        if !self.at_map_key()
            && self.peek_char() == Some(':')
            && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            self.advance();
            self.eat_digits();
            return TokenType::Address;
        }

        TokenType::Name
    }

    fn scan_operator(&mut self) -> TokenType {
        let rest = &self.input[self.pos..];
        let run_len = rest
            .char_indices()
            .find(|(_, c)| !is_operator_char(*c))
            .map_or(rest.len(), |(i, _)| i);
        let run = &rest[..run_len];

        match self.symbols.iter().find(|s| run.starts_with(s.as_str())) {
            Some(symbol) => self.pos += symbol.len(),
            None => self.advance(),
        }

        TokenType::Operator
    }

    fn scan_string(&mut self, delimiter: char) -> FormulaResult<TokenType> {
        let start = self.pos;
        self.advance();

        loop {
            match self.peek_char() {
                None => return Err(unterminated(start)),
                Some('\\') => {
                    self.advance();
                    if self.peek_char().is_none() {
                        return Err(unterminated(start));
                    }
                    self.advance();
                }
                Some(c) if c == delimiter => {
                    self.advance();
                    if self.peek_char() == Some(delimiter) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(_) => self.advance(),
            }
        }

        // Reject bad escapes here so the parser only ever sees well-formed literals
        decode_string(&self.input[start..self.pos], start)?;
        Ok(TokenType::String)
    }

    // === Helper methods ===

    fn eat_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }
}

fn lex_error(offset: usize, message: impl Into<String>) -> FormulaError {
    FormulaError::Lex {
        offset,
        message: message.into(),
    }
}

fn unterminated(offset: usize) -> FormulaError {
    lex_error(offset, "unterminated string literal")
}

/// Decode the raw text of a string token (quotes included) into its value
///
/// `offset` is the position of the opening quote, used for error reporting.
pub(crate) fn decode_string(raw: &str, offset: usize) -> FormulaResult<String> {
    let delimiter = match raw.chars().next() {
        Some(c @ ('"' | '\'')) => c,
        _ => return Err(lex_error(offset, "string literal must start with a quote")),
    };
    if raw.len() < 2 || !raw.ends_with(delimiter) {
        return Err(unterminated(offset));
    }

    let body = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let at = offset + 1 + i;
        match c {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    return Err(unterminated(offset));
                };
                match escaped {
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'b' => out.push('\u{08}'),
                    'f' => out.push('\u{0C}'),
                    '\\' | '/' | '"' | '\'' => out.push(escaped),
                    'u' => out.push(decode_unicode(&mut chars, at)?),
                    other => return Err(lex_error(at, format!("unknown escape '\\{}'", other))),
                }
            }
            c if c == delimiter => {
                if matches!(chars.peek(), Some((_, next)) if *next == delimiter) {
                    chars.next();
                    out.push(delimiter);
                } else {
                    return Err(lex_error(at, "unescaped quote inside string literal"));
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

/// `\u{XXXX}` with 1 to 6 hex digits; the `\u` is already consumed
fn decode_unicode(chars: &mut Peekable<CharIndices<'_>>, at: usize) -> FormulaResult<char> {
    if !matches!(chars.next(), Some((_, '{'))) {
        return Err(lex_error(at, "expected '{' after '\\u'"));
    }

    let mut hex = String::new();
    loop {
        match chars.next() {
            Some((_, '}')) => break,
            Some((_, c)) if c.is_ascii_hexdigit() && hex.len() < 6 => hex.push(c),
            _ => return Err(lex_error(at, "invalid unicode escape")),
        }
    }

    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| lex_error(at, "invalid unicode escape"))
}
