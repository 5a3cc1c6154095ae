//! Token types

use std::fmt;

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Identifiers and references
    Name,
    Address,

    // Operators
    Operator,

    // Delimiters
    LParen,
    LBracket,
    LBrace,
    RParen,
    RBracket,
    RBrace,
    Dot,
    Comma,

    // Literals
    Nothing,
    Num,
    String,
    Bool,
}

impl TokenType {
    /// Whether this token opens a group
    pub fn is_open(self) -> bool {
        matches!(self, TokenType::LParen | TokenType::LBracket | TokenType::LBrace)
    }

    /// Whether this token closes a group
    pub fn is_close(self) -> bool {
        matches!(self, TokenType::RParen | TokenType::RBracket | TokenType::RBrace)
    }
}

/// A lexical unit of a formula
///
/// `text` is the exact source slice the token was made from, so string literals keep
/// their quotes and escapes and numbers keep their original spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    token_type: TokenType,
    text: String,
    offset: usize,
}

impl Token {
    /// Create a token
    pub fn new(token_type: TokenType, text: impl Into<String>, offset: usize) -> Self {
        Self {
            token_type,
            text: text.into(),
            offset,
        }
    }

    /// Token classification
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// Source text consumed by this token
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Byte offset of the token in the source
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset one past the end of the token
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    pub(crate) fn is(&self, token_type: TokenType) -> bool {
        self.token_type == token_type
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
