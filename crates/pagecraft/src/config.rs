//! Builder configuration, read from TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BuilderError, Result};
use crate::key::{KeyLookup, KeyResolver};

/// Where templates live.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TenantScope {
    /// One namespace shared by every classroom.
    #[default]
    Global,
    /// Templates are stored per classroom.
    Classroom,
}

/// Engine configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub scope: TenantScope,
    #[serde(default = "default_popup_prefix")]
    pub popup_prefix: String,
    #[serde(default = "default_allowed_keys")]
    pub allowed_keys: Vec<String>,
    #[serde(default = "default_allowed_variables")]
    pub allowed_template_variables: Vec<String>,
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,
    /// Draft body given to popups created from the admin panel.
    #[serde(default)]
    pub popup_default_content: String,
    #[serde(default = "default_templates")]
    pub defaults: Vec<DefaultTemplate>,
    #[serde(default)]
    pub css: CssConfig,
}

/// A template seeded by `ensure_default_templates`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultTemplate {
    pub key: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub mock_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CssConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_public_url_prefix")]
    pub public_url_prefix: String,
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
    #[serde(default = "default_true")]
    pub minify: bool,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: default_output_dir(),
            public_url_prefix: default_public_url_prefix(),
            file_stem: default_file_stem(),
            minify: true,
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            scope: TenantScope::default(),
            popup_prefix: default_popup_prefix(),
            allowed_keys: default_allowed_keys(),
            allowed_template_variables: default_allowed_variables(),
            max_include_depth: default_max_include_depth(),
            popup_default_content: String::new(),
            defaults: default_templates(),
            css: CssConfig::default(),
        }
    }
}

pub const PAGE_KEY: &str = "classroom.page";

const DEFAULT_PAGE_CONTENT: &str = r#"<section class="classroom-page">
  <h1>{{ classroom.name }}</h1>
  <p class="greeting">{{ user.name }}</p>
  {{{ page.body }}}
</section>
"#;

fn default_popup_prefix() -> String {
    "classroom.popup.".to_string()
}

fn default_allowed_keys() -> Vec<String> {
    vec![PAGE_KEY.to_string()]
}

fn default_allowed_variables() -> Vec<String> {
    ["user", "classroom", "locale", "page"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_include_depth() -> usize {
    3
}

fn default_templates() -> Vec<DefaultTemplate> {
    vec![DefaultTemplate {
        key: PAGE_KEY.to_string(),
        name: "Classroom page".to_string(),
        content: DEFAULT_PAGE_CONTENT.to_string(),
        mock_data: Some(serde_json::json!({
            "user": { "name": "Preview user" },
            "classroom": { "name": "Demo classroom" },
            "page": { "body": "<p>Page content</p>" }
        })),
    }]
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/builder")
}

fn default_public_url_prefix() -> String {
    "/builder".to_string()
}

fn default_file_stem() -> String {
    "theme".to_string()
}

impl BuilderConfig {
    /// Read and validate a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| BuilderError::Config {
            message: format!("cannot read {}: {e}", path.as_ref().display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| BuilderError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.popup_prefix.trim().is_empty() {
            return Err(BuilderError::Config {
                message: "popup_prefix must not be empty".to_string(),
            });
        }
        if self.css.file_stem.is_empty() || self.css.file_stem.contains(['/', '\\']) {
            return Err(BuilderError::Config {
                message: format!("invalid css.file_stem '{}'", self.css.file_stem),
            });
        }

        let resolver = KeyResolver::from_config(self);
        for default in &self.defaults {
            resolver
                .resolve(&default.key, KeyLookup::Page)
                .map_err(|_| BuilderError::Config {
                    message: format!("default template key '{}' is not allowed", default.key),
                })?;
        }
        Ok(())
    }

    /// Variables that may reach a template
    pub fn allows_variable(&self, name: &str) -> bool {
        self.allowed_template_variables.iter().any(|v| v == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = BuilderConfig::from_toml_str("").unwrap();
        assert_eq!(config.scope, TenantScope::Global);
        assert_eq!(config.popup_prefix, "classroom.popup.");
        assert_eq!(config.allowed_keys, vec![PAGE_KEY.to_string()]);
        assert_eq!(config.max_include_depth, 3);
        assert_eq!(config.defaults.len(), 1);
        assert!(config.css.enabled);
        assert!(config.allows_variable("locale"));
        assert!(!config.allows_variable("secret"));
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
scope = "classroom"
popup_prefix = "tenant.popup."
allowed_keys = ["tenant.page", "tenant.footer"]
allowed_template_variables = ["user", "locale"]
max_include_depth = 0

[[defaults]]
key = "tenant.footer"
name = "Footer"
content = "<footer>{{ locale }}</footer>"
mock_data = { locale = "he" }

[css]
enabled = false
output_dir = "/var/www/theme"
public_url_prefix = "https://cdn.example.com/theme"
"#;
        let config = BuilderConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.scope, TenantScope::Classroom);
        assert_eq!(config.max_include_depth, 0);
        assert_eq!(config.defaults[0].key, "tenant.footer");
        assert_eq!(
            config.defaults[0].mock_data,
            Some(serde_json::json!({ "locale": "he" }))
        );
        assert!(!config.css.enabled);
        assert_eq!(config.css.file_stem, "theme");
    }

    #[test]
    fn test_rejects_empty_prefix() {
        let result = BuilderConfig::from_toml_str("popup_prefix = \"  \"");
        assert!(matches!(result, Err(BuilderError::Config { .. })));
    }

    #[test]
    fn test_rejects_disallowed_default_key() {
        let toml = r#"
[[defaults]]
key = "admin.secret"
name = "Nope"
content = ""
"#;
        assert!(matches!(
            BuilderConfig::from_toml_str(toml),
            Err(BuilderError::Config { .. })
        ));
    }

    #[test]
    fn test_accepts_prefixed_popup_default() {
        let toml = r#"
[[defaults]]
key = "classroom.popup.welcome"
name = "Welcome"
content = "Hi {{ user }}"
"#;
        let config = BuilderConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.defaults[0].name, "Welcome");
    }

    #[test]
    fn test_rejects_bad_toml() {
        assert!(matches!(
            BuilderConfig::from_toml_str("max_include_depth = \"deep\""),
            Err(BuilderError::Config { .. })
        ));
    }
}
