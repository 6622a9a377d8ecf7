//! Hand-written lexer for pagecraft templates.
//!
//! Two-mode state machine:
//! - Text mode: accumulates raw text until a `{{` delimiter
//! - Tag mode: tokenizes operators and identifiers up to `}}` (or `}}}` for
//!   a tag opened with `{{{`)
//!
//! The lexer never fails. A `{{` seen inside a tag ends the tag without a
//! close token so the parser can recover the unclosed part as text.

use crate::token::{Token, TokenType};
use crate::Location;

/// Tokenize a source string into a sequence of tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    lexer.tokenize()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Text,
    Tag,
    RawTag,
    Comment,
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    mode: Mode,
}

impl<'a> Lexer<'a> {
    const OPEN: &'static str = "{{";
    const OPEN_RAW: &'static str = "{{{";
    const CLOSE: &'static str = "}}";
    const CLOSE_RAW: &'static str = "}}}";

    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            col: 1,
            mode: Mode::Text,
        }
    }

    fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while self.pos < self.source.len() {
            match self.mode {
                Mode::Text => self.tokenize_text(&mut tokens),
                Mode::Tag | Mode::RawTag => self.tokenize_tag(&mut tokens),
                Mode::Comment => self.tokenize_comment(&mut tokens),
            }
        }

        tokens.push(Token::new(TokenType::Eof, "", self.location()));
        tokens
    }

    /// Text mode: everything up to the next `{{`.
    fn tokenize_text(&mut self, tokens: &mut Vec<Token>) {
        let rest = &self.source[self.pos..];
        let text_len = rest.find(Self::OPEN).unwrap_or(rest.len());

        if text_len > 0 {
            let loc = self.location();
            let text = &rest[..text_len];
            tokens.push(Token::new(TokenType::Text, text, loc));
            self.advance_over(text_len);
        }

        if self.looking_at(Self::OPEN_RAW) {
            self.emit_fixed(tokens, TokenType::OpenRaw);
            self.mode = Mode::RawTag;
        } else if self.looking_at(Self::OPEN) {
            self.emit_fixed(tokens, TokenType::Open);
            self.mode = if self.looking_at("!") {
                self.emit_fixed(tokens, TokenType::Bang);
                Mode::Comment
            } else {
                Mode::Tag
            };
        }
    }

    /// Comment mode: the body is opaque up to the closing `}}`.
    fn tokenize_comment(&mut self, tokens: &mut Vec<Token>) {
        let rest = &self.source[self.pos..];
        let body_len = rest.find(Self::CLOSE).unwrap_or(rest.len());

        let loc = self.location();
        tokens.push(Token::new(TokenType::CommentBody, &rest[..body_len], loc));
        self.advance_over(body_len);

        if self.looking_at(Self::CLOSE) {
            self.emit_fixed(tokens, TokenType::Close);
        }
        self.mode = Mode::Text;
    }

    /// Tag mode: one token per call.
    fn tokenize_tag(&mut self, tokens: &mut Vec<Token>) {
        if self.mode == Mode::RawTag && self.looking_at(Self::CLOSE_RAW) {
            self.emit_fixed(tokens, TokenType::CloseRaw);
            self.mode = Mode::Text;
            return;
        }
        if self.mode == Mode::Tag && self.looking_at(Self::CLOSE) {
            self.emit_fixed(tokens, TokenType::Close);
            self.mode = Mode::Text;
            return;
        }
        if self.looking_at(Self::OPEN) {
            // Unclosed tag; hand the new delimiter back to text mode.
            self.mode = Mode::Text;
            return;
        }

        let Some(ch) = self.source[self.pos..].chars().next() else {
            return;
        };

        match ch {
            '>' => self.emit_fixed(tokens, TokenType::Gt),
            '.' => self.emit_fixed(tokens, TokenType::Dot),
            c if c.is_ascii_whitespace() => {
                self.emit_while(tokens, TokenType::Whitespace, |c| c.is_ascii_whitespace())
            }
            c if is_ident_char(c) => self.emit_while(tokens, TokenType::Ident, is_ident_char),
            c => {
                let loc = self.location();
                tokens.push(Token::new(TokenType::Unknown, c.to_string(), loc));
                self.advance_over(c.len_utf8());
            }
        }
    }

    fn looking_at(&self, pattern: &str) -> bool {
        self.source[self.pos..].starts_with(pattern)
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.col, self.pos)
    }

    /// Emit a token with fixed literal text and advance past it.
    fn emit_fixed(&mut self, tokens: &mut Vec<Token>, token_type: TokenType) {
        let literal = token_type.literal().unwrap_or_default();
        tokens.push(Token::new(token_type, literal, self.location()));
        self.advance_over(literal.len());
    }

    /// Emit one token covering the longest run of characters matching `pred`.
    fn emit_while(
        &mut self,
        tokens: &mut Vec<Token>,
        token_type: TokenType,
        pred: fn(char) -> bool,
    ) {
        let rest = &self.source[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        tokens.push(Token::new(token_type, &rest[..len], self.location()));
        self.advance_over(len);
    }

    /// Advance by `len` bytes, updating line/column tracking.
    fn advance_over(&mut self, len: usize) {
        for c in self.source[self.pos..self.pos + len].chars() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.pos += len;
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
