//! Renderer for stored templates.
//!
//! Substitutes scope variables and expands `{{> key }}` includes in document
//! order. Problems an author can cause (unknown variables, includes of
//! missing or disallowed templates, running out of include depth, syntax
//! slips) never fail a render; they are collected as [`RenderWarning`]s next
//! to the markup. Only the top-level key resolution and lookup, and store
//! failures, are errors.

use std::fmt;

use pagecraft_ast::{AstNode, Diagnostic, IncludeNode, Location, VariableNode};
use tracing::{debug, warn};

use crate::error::{BuilderError, Result};
use crate::html_escape;
use crate::key::{KeyLookup, KeyResolver};
use crate::scope::Scope;
use crate::store::{TemplateStore, Tenant};
use crate::template::{TemplateRecord, Version};

/// A degradation that happened while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderWarning {
    /// Placeholder name not in scope; rendered as empty.
    MissingVariable {
        template: String,
        name: String,
        location: Location,
    },
    /// Array or object value; rendered as empty.
    NonScalarValue {
        template: String,
        name: String,
        type_name: &'static str,
    },
    /// Include skipped because the depth budget was used up.
    DepthExhausted { template: String, include: String },
    /// Include key rejected by the key resolver.
    IncludeNotAllowed { template: String, include: String },
    /// Include key allowed but no template stored under it.
    IncludeNotFound { template: String, include: String },
    /// The requested version has no body.
    Unpublished { template: String },
    /// Recovered syntax problem in a template body.
    Syntax {
        template: String,
        diagnostic: Diagnostic,
    },
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderWarning::MissingVariable {
                template,
                name,
                location,
            } => write!(
                f,
                "{template}: unknown variable '{name}' at line {}, column {}",
                location.line, location.column
            ),
            RenderWarning::NonScalarValue {
                template,
                name,
                type_name,
            } => write!(
                f,
                "{template}: '{name}' is an {type_name} and cannot be printed"
            ),
            RenderWarning::DepthExhausted { template, include } => {
                write!(f, "{template}: include '{include}' skipped at depth limit")
            }
            RenderWarning::IncludeNotAllowed { template, include } => {
                write!(f, "{template}: include '{include}' is not allowed")
            }
            RenderWarning::IncludeNotFound { template, include } => {
                write!(f, "{template}: include '{include}' does not exist")
            }
            RenderWarning::Unpublished { template } => {
                write!(f, "{template}: requested version has no content")
            }
            RenderWarning::Syntax {
                template,
                diagnostic,
            } => write!(f, "{template}: {diagnostic}"),
        }
    }
}

/// Rendered markup and whatever degraded along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    pub markup: String,
    pub warnings: Vec<RenderWarning>,
}

impl Rendered {
    /// True when nothing was skipped or blanked.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_markup(self) -> String {
        self.markup
    }
}

/// Renders templates from one tenant's store.
pub struct Renderer<'a> {
    resolver: &'a KeyResolver,
    store: &'a dyn TemplateStore,
    tenant: &'a Tenant,
}

impl<'a> Renderer<'a> {
    pub fn new(
        resolver: &'a KeyResolver,
        store: &'a dyn TemplateStore,
        tenant: &'a Tenant,
    ) -> Self {
        Self {
            resolver,
            store,
            tenant,
        }
    }

    /// Resolve, fetch and render a template.
    ///
    /// `depth` is the include budget: each nested include spends one, and
    /// includes met with a budget of zero expand to nothing.
    pub fn render(
        &self,
        raw_key: &str,
        lookup: KeyLookup,
        version: Version,
        scope: &Scope,
        depth: usize,
    ) -> Result<Rendered> {
        let key = self.resolver.resolve(raw_key, lookup)?;
        let record = self
            .store
            .fetch(self.tenant, &key)?
            .ok_or_else(|| BuilderError::NotFound {
                key: key.to_string(),
            })?;
        self.render_record(&record, version, scope, depth)
    }

    /// Render an already fetched template.
    pub fn render_record(
        &self,
        record: &TemplateRecord,
        version: Version,
        scope: &Scope,
        depth: usize,
    ) -> Result<Rendered> {
        debug!(
            key = %record.key,
            %version,
            tenant = %self.tenant,
            depth,
            "rendering template"
        );
        let mut output = Rendered::default();
        self.expand(record, version, scope, depth, &mut output)?;
        Ok(output)
    }

    fn expand(
        &self,
        record: &TemplateRecord,
        version: Version,
        scope: &Scope,
        depth: usize,
        output: &mut Rendered,
    ) -> Result<()> {
        let Some(body) = record.body(version) else {
            output.warnings.push(RenderWarning::Unpublished {
                template: record.key.clone(),
            });
            return Ok(());
        };

        let template = pagecraft_ast::parse(body);
        for diagnostic in template.diagnostics() {
            output.warnings.push(RenderWarning::Syntax {
                template: record.key.clone(),
                diagnostic: diagnostic.clone(),
            });
        }

        for node in template.nodes() {
            match node {
                AstNode::Text(n) => output.markup.push_str(&n.content),
                AstNode::Comment(_) => {}
                AstNode::Variable(n) => self.render_variable(&record.key, n, scope, output),
                AstNode::Include(n) => {
                    self.render_include(&record.key, n, version, scope, depth, output)?
                }
            }
        }
        Ok(())
    }

    fn render_variable(
        &self,
        template: &str,
        node: &VariableNode,
        scope: &Scope,
        output: &mut Rendered,
    ) {
        let Some(value) = scope.resolve(node.path.segments()) else {
            output.warnings.push(RenderWarning::MissingVariable {
                template: template.to_string(),
                name: node.path.as_str(),
                location: node.location,
            });
            return;
        };

        match value.stringify() {
            Some(text) if node.escape => output.markup.push_str(&html_escape::escape(&text)),
            Some(text) => output.markup.push_str(&text),
            None => output.warnings.push(RenderWarning::NonScalarValue {
                template: template.to_string(),
                name: node.path.as_str(),
                type_name: value.type_name(),
            }),
        }
    }

    fn render_include(
        &self,
        template: &str,
        node: &IncludeNode,
        version: Version,
        scope: &Scope,
        depth: usize,
        output: &mut Rendered,
    ) -> Result<()> {
        if depth == 0 {
            warn!(template, include = %node.key, "include depth exhausted");
            output.warnings.push(RenderWarning::DepthExhausted {
                template: template.to_string(),
                include: node.key.clone(),
            });
            return Ok(());
        }

        let Ok(key) = self.resolver.resolve(&node.key, KeyLookup::Auto) else {
            warn!(template, include = %node.key, "include key not allowed");
            output.warnings.push(RenderWarning::IncludeNotAllowed {
                template: template.to_string(),
                include: node.key.clone(),
            });
            return Ok(());
        };

        match self.store.fetch(self.tenant, &key)? {
            Some(included) => self.expand(&included, version, scope, depth - 1, output),
            None => {
                warn!(template, include = %key, "included template not found");
                output.warnings.push(RenderWarning::IncludeNotFound {
                    template: template.to_string(),
                    include: key.to_string(),
                });
                Ok(())
            }
        }
    }
}
