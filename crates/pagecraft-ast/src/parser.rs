//! Lenient parser for pagecraft templates.
//!
//! Consumes the lexer's token stream and produces a flat list of nodes. A tag
//! that is unclosed or malformed is copied to the output as literal text and
//! recorded as a diagnostic, so authoring mistakes never fail a render.

use crate::token::{Token, TokenType};
use crate::{
    is_valid_identifier, is_valid_key, AstNode, CommentNode, Diagnostic, DiagnosticKind,
    IncludeNode, Location, Path, Template, TextNode, VariableNode,
};

/// Parse a token stream into an AST Template.
pub fn parse(source: &str, tokens: Vec<Token>) -> Template {
    let mut parser = Parser::new(source, tokens);
    parser.parse();
    Template::new(parser.nodes, parser.diagnostics)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    nodes: Vec<AstNode>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            nodes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn parse(&mut self) {
        while self.current_type() != TokenType::Eof {
            match self.current_type() {
                TokenType::Open | TokenType::OpenRaw => self.parse_tag(),
                _ => {
                    let token = self.advance();
                    self.push_text(token.value, token.location);
                }
            }
        }
    }

    fn parse_tag(&mut self) {
        let open = self.advance();
        let start = open.location.byte_offset;

        let body_start = self.pos;
        while !matches!(
            self.current_type(),
            TokenType::Close
                | TokenType::CloseRaw
                | TokenType::Open
                | TokenType::OpenRaw
                | TokenType::Eof
        ) {
            self.pos += 1;
        }
        let body_end = self.pos;

        let closing = &self.tokens[self.pos];
        if !closing.token_type.is_close() {
            let end = closing.location.byte_offset;
            self.recover(start, end, DiagnosticKind::UnclosedTag, open.location);
            return;
        }
        let end = closing.span().end;
        self.pos += 1;

        let body = &self.tokens[body_start..body_end];
        match interpret(open.token_type, body, open.location) {
            Ok(node) => self.nodes.push(node),
            Err(kind) => self.recover(start, end, kind, open.location),
        }
    }

    fn recover(&mut self, start: usize, end: usize, kind: DiagnosticKind, location: Location) {
        let literal = self.source[start..end].to_string();
        self.push_text(literal, location);
        self.diagnostics.push(Diagnostic { kind, location });
    }

    fn push_text(&mut self, content: String, location: Location) {
        let node = AstNode::Text(TextNode { content, location });
        self.nodes.push(node);
    }

    fn current_type(&self) -> TokenType {
        self.tokens
            .get(self.pos)
            .map(|t| t.token_type)
            .unwrap_or(TokenType::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        token
    }
}

/// Turn the tokens between the delimiters into a node.
fn interpret(
    open: TokenType,
    body: &[Token],
    location: Location,
) -> Result<AstNode, DiagnosticKind> {
    let body = trim_whitespace(body);

    match body.first().map(|t| t.token_type) {
        Some(TokenType::Bang) if open == TokenType::Open => {
            Ok(AstNode::Comment(CommentNode { location }))
        }
        Some(TokenType::Gt) if open == TokenType::Open => {
            let key = contiguous(trim_whitespace(&body[1..]))?;
            if !is_valid_key(&key) {
                return Err(DiagnosticKind::InvalidIncludeKey(key));
            }
            Ok(AstNode::Include(IncludeNode { key, location }))
        }
        Some(TokenType::Ident) => {
            let name = contiguous(body)?;
            let segments: Vec<String> = name.split('.').map(str::to_string).collect();
            if !segments.iter().all(|s| is_valid_identifier(s)) {
                return Err(DiagnosticKind::InvalidIdentifier(name));
            }
            Ok(AstNode::Variable(VariableNode {
                path: Path::new(segments),
                escape: open == TokenType::Open,
                location,
            }))
        }
        Some(_) => Err(DiagnosticKind::UnexpectedToken(body[0].value.clone())),
        None => Err(DiagnosticKind::EmptyTag),
    }
}

fn trim_whitespace(tokens: &[Token]) -> &[Token] {
    let is_ws = |t: &Token| t.token_type == TokenType::Whitespace;
    let start = tokens
        .iter()
        .position(|t| !is_ws(t))
        .unwrap_or(tokens.len());
    let end = tokens
        .iter()
        .rposition(|t| !is_ws(t))
        .map_or(start, |i| i + 1);
    &tokens[start..end]
}

/// Join an unbroken run of identifier and dot tokens.
fn contiguous(tokens: &[Token]) -> Result<String, DiagnosticKind> {
    if tokens.is_empty() {
        return Err(DiagnosticKind::EmptyTag);
    }
    let mut joined = String::new();
    for token in tokens {
        match token.token_type {
            TokenType::Ident | TokenType::Dot => joined.push_str(&token.value),
            _ => return Err(DiagnosticKind::UnexpectedToken(token.value.clone())),
        }
    }
    Ok(joined)
}
