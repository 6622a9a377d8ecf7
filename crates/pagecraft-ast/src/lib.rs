//! AST for pagecraft template bodies.
//!
//! The syntax is deliberately small:
//!
//! - `{{ user.name }}` - escaped variable output
//! - `{{{ banner }}}` - raw variable output
//! - `{{> classroom.popup.footer }}` - include another template
//! - `{{! note }}` - comment
//!
//! Parsing never fails. A tag that cannot be understood is kept as literal
//! text and reported as a [`Diagnostic`] on the returned [`Template`].

use thiserror::Error;

mod lexer;
mod parser;
mod token;

pub use lexer::tokenize;
pub use token::{Token, TokenType};

// ============================================================================
// Location
// ============================================================================

/// Location in source code (1-indexed line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

// ============================================================================
// AST Nodes
// ============================================================================

/// A parsed template body.
#[derive(Debug, Clone, Default)]
pub struct Template {
    nodes: Vec<AstNode>,
    diagnostics: Vec<Diagnostic>,
}

impl Template {
    pub fn new(nodes: Vec<AstNode>, diagnostics: Vec<Diagnostic>) -> Self {
        Self { nodes, diagnostics }
    }

    pub fn nodes(&self) -> &[AstNode] {
        &self.nodes
    }

    /// Problems found while parsing. Each one was recovered as literal text.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Keys of every include directive, in document order.
    pub fn include_keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|node| match node {
            AstNode::Include(n) => Some(n.key.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Text(TextNode),
    Variable(VariableNode),
    Include(IncludeNode),
    Comment(CommentNode),
}

/// Literal markup copied to the output unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub content: String,
    pub location: Location,
}

/// Variable output: `{{ path }}` (escaped) or `{{{ path }}}` (raw).
#[derive(Debug, Clone, PartialEq)]
pub struct VariableNode {
    pub path: Path,
    pub escape: bool,
    pub location: Location,
}

/// Include directive: `{{> key }}`.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeNode {
    pub key: String,
    pub location: Location,
}

/// Comment: `{{! ... }}`. Renders to nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub location: Location,
}

/// A dot-separated path (e.g., user.profile.name).
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First segment; the name looked up in the render scope.
    pub fn root(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    /// Returns the path as a dot-separated string.
    pub fn as_str(&self) -> String {
        self.segments.join(".")
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("tag is never closed")]
    UnclosedTag,

    #[error("empty tag")]
    EmptyTag,

    #[error("invalid variable name '{0}'")]
    InvalidIdentifier(String),

    #[error("invalid include key '{0}'")]
    InvalidIncludeKey(String),

    #[error("unexpected '{0}' in tag")]
    UnexpectedToken(String),
}

/// A recovered syntax problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {}, column {}", .location.line, .location.column)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Location,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a template body into an AST.
pub fn parse(source: &str) -> Template {
    let tokens = lexer::tokenize(source);
    parser::parse(source, tokens)
}

/// Variable names start with an ASCII letter and continue with letters,
/// digits or `_`.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Include keys are one or more dot-separated segments of ASCII
/// alphanumerics, `_` and `-`.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}
