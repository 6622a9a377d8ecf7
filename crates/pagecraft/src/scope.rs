//! Variable scope assembly for a single render.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::BuilderConfig;
use crate::value::Value;

/// Request context supplied by the host application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderContext {
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub classroom: Option<Value>,
    /// Tenant identity for classroom-scoped templates.
    #[serde(default)]
    pub classroom_id: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub page: Option<Value>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<Value>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_classroom(mut self, id: impl Into<String>, classroom: impl Into<Value>) -> Self {
        self.classroom_id = Some(id.into());
        self.classroom = Some(classroom.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_page(mut self, page: impl Into<Value>) -> Self {
        self.page = Some(page.into());
        self
    }

    fn entries(&self) -> impl Iterator<Item = (&'static str, Value)> + '_ {
        [
            ("user", self.user.clone()),
            ("classroom", self.classroom.clone()),
            ("locale", self.locale.clone().map(Value::String)),
            ("page", self.page.clone()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

/// The filtered variables visible during one render.
///
/// Only [`ScopeBuilder`] creates scopes, so every name in one is allow-listed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    vars: BTreeMap<String, Value>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Resolve `root.a.b` style paths.
    pub fn resolve(&self, path: &[String]) -> Option<&Value> {
        let (root, rest) = path.split_first()?;
        self.vars.get(root)?.get_path(rest)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Builds scopes restricted to the configured variable allow-list.
#[derive(Debug, Clone)]
pub struct ScopeBuilder {
    allowed: Vec<String>,
}

impl ScopeBuilder {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn from_config(config: &BuilderConfig) -> Self {
        Self::new(config.allowed_template_variables.clone())
    }

    /// Scope for a live render: caller data, then request context.
    pub fn build<I>(&self, context: &RenderContext, extra: I) -> Scope
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.build_preview(context, extra, None)
    }

    /// Scope for a preview. Mock data only fills names that neither the
    /// caller data nor the request context supply.
    pub fn build_preview<I>(&self, context: &RenderContext, extra: I, mock: Option<&Value>) -> Scope
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut scope = Scope::default();

        if let Some(mock) = mock.and_then(Value::as_object) {
            for (name, value) in mock {
                self.insert(&mut scope, name, value.clone());
            }
        }
        for (name, value) in extra {
            self.insert(&mut scope, &name, value);
        }
        for (name, value) in context.entries() {
            self.insert(&mut scope, name, value);
        }

        scope
    }

    fn insert(&self, scope: &mut Scope, name: &str, value: Value) {
        if self.allowed.iter().any(|a| a == name) {
            scope.vars.insert(name.to_string(), value);
        }
    }
}
