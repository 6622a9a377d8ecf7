//! Token types for the pagecraft lexer.

use std::ops::Range;

use crate::Location;

/// Token types produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Raw text content outside tags.
    Text,
    /// `{{` - opens an escaped tag
    Open,
    /// `{{{` - opens a raw tag
    OpenRaw,
    /// `}}` - closes an escaped tag
    Close,
    /// `}}}` - closes a raw tag
    CloseRaw,
    /// `>` - include marker
    Gt,
    /// `!` - comment marker
    Bang,
    /// Everything between `{{!` and the closing delimiter
    CommentBody,
    /// `.` - path separator
    Dot,
    /// Whitespace (spaces, tabs, newlines) inside tags
    Whitespace,
    /// Identifier or key segment: [A-Za-z0-9_-]+
    Ident,
    /// Any other character inside a tag
    Unknown,
    /// End of input
    Eof,
}

impl TokenType {
    /// Fixed literal text for delimiter and operator tokens.
    pub fn literal(self) -> Option<&'static str> {
        match self {
            TokenType::Open => Some("{{"),
            TokenType::OpenRaw => Some("{{{"),
            TokenType::Close => Some("}}"),
            TokenType::CloseRaw => Some("}}}"),
            TokenType::Gt => Some(">"),
            TokenType::Bang => Some("!"),
            TokenType::Dot => Some("."),
            _ => None,
        }
    }

    pub fn is_close(self) -> bool {
        matches!(self, TokenType::Close | TokenType::CloseRaw)
    }
}

/// A token with its type, value, and location.
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub location: Location,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, location: Location) -> Self {
        Self {
            token_type,
            value: value.into(),
            location,
        }
    }

    /// Byte range of the token in the source.
    pub fn span(&self) -> Range<usize> {
        self.location.byte_offset..self.location.byte_offset + self.value.len()
    }
}
