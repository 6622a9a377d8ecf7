//! Template key resolution.
//!
//! Every key that reaches the store passes through [`KeyResolver`]. The
//! resolver is the only place a [`TemplateKey`] can be built, so code
//! holding one knows it matched the allow-list or the popup pattern.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::BuilderConfig;
use crate::error::{BuilderError, Result};

/// Category of a resolved key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// An exact, allow-listed key such as `classroom.page`.
    Page,
    /// A key under the configured popup prefix.
    Popup,
}

/// A validated template key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey(KeyRepr);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyRepr {
    Page(String),
    Popup(String),
}

impl TemplateKey {
    /// The full key as stored.
    pub fn as_str(&self) -> &str {
        match &self.0 {
            KeyRepr::Page(key) | KeyRepr::Popup(key) => key,
        }
    }

    pub fn kind(&self) -> KeyKind {
        match self.0 {
            KeyRepr::Page(_) => KeyKind::Page,
            KeyRepr::Popup(_) => KeyKind::Popup,
        }
    }

    pub fn is_popup(&self) -> bool {
        self.kind() == KeyKind::Popup
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a raw key is interpreted before the allow-list check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLookup {
    /// Use the key unmodified.
    Page,
    /// Prepend the popup prefix unless the key already carries it.
    Popup,
    /// Already prefixed keys are popups and allow-listed keys are pages. A
    /// single-segment name is read as a popup short name. Any other dotted
    /// key is rejected. Used by previews, include directives and the manager.
    Auto,
}

#[derive(Debug, Clone)]
pub struct KeyResolver {
    popup_prefix: String,
    allowed_keys: Vec<String>,
}

impl KeyResolver {
    pub fn new(popup_prefix: impl Into<String>, allowed_keys: Vec<String>) -> Self {
        Self {
            popup_prefix: popup_prefix.into(),
            allowed_keys,
        }
    }

    pub fn from_config(config: &BuilderConfig) -> Self {
        Self::new(config.popup_prefix.clone(), config.allowed_keys.clone())
    }

    /// Resolve a caller-supplied key against the allow-list and popup pattern.
    pub fn resolve(&self, raw: &str, lookup: KeyLookup) -> Result<TemplateKey> {
        let raw = raw.trim();
        let candidate = match lookup {
            KeyLookup::Page => raw.to_string(),
            KeyLookup::Popup => self.with_prefix(raw),
            KeyLookup::Auto if self.is_short_name(raw) => self.with_prefix(raw),
            KeyLookup::Auto => raw.to_string(),
        };

        if self.is_allowed_page(&candidate) {
            return Ok(TemplateKey(KeyRepr::Page(candidate)));
        }
        if self.is_popup_key(&candidate) {
            return Ok(TemplateKey(KeyRepr::Popup(candidate)));
        }
        Err(BuilderError::KeyNotAllowed {
            key: raw.to_string(),
        })
    }

    /// Derive the popup key for an operator-supplied display name.
    ///
    /// `"Back to School"` becomes `<prefix>back_to_school`.
    pub fn popup_key_for_name(&self, name: &str) -> Result<TemplateKey> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(BuilderError::InvalidName {
                name: name.to_string(),
            });
        }
        self.resolve(&slug, KeyLookup::Popup)
    }

    fn with_prefix(&self, raw: &str) -> String {
        if raw.starts_with(&self.popup_prefix) {
            raw.to_string()
        } else {
            format!("{}{raw}", self.popup_prefix)
        }
    }

    /// A single-segment name that is not itself an allowed page.
    fn is_short_name(&self, raw: &str) -> bool {
        !raw.contains('.') && !self.is_allowed_page(raw)
    }

    fn is_allowed_page(&self, key: &str) -> bool {
        !key.is_empty() && self.allowed_keys.iter().any(|k| k == key)
    }

    fn is_popup_key(&self, key: &str) -> bool {
        key.strip_prefix(&self.popup_prefix)
            .is_some_and(pagecraft_ast::is_valid_key)
    }
}

/// Lowercase ASCII alphanumerics are kept; every other run becomes one `_`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    slug
}
