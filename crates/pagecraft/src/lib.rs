//! Pagecraft - page and popup templates for a classroom site builder
//!
//! Operators edit templates with a draft and a published body. The engine
//! renders them with:
//! - Keys checked against an allow-list and a popup prefix
//! - Variables restricted to an allow-listed scope, HTML-escaped by default
//! - Nested includes bounded by a depth budget
//! - Warnings instead of errors for anything an author can get wrong
//!
//! A theme stylesheet compiled from global style settings is published
//! next to the templates under a content-addressed file name.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pagecraft::{BuilderConfig, Engine, MemorySettingsStore, MemoryStore, RenderContext, Tenant};
//!
//! let engine = Engine::new(
//!     BuilderConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemorySettingsStore::new()),
//! );
//! let manager = engine.manager_for(Tenant::Global);
//! manager.create_popup_template("Welcome")?;
//! manager.update_draft("welcome", "Hi {{ user }}")?;
//!
//! let ctx = RenderContext::new().with_user("Dana");
//! assert_eq!(engine.popup("welcome", &ctx, Vec::new()), "");
//!
//! manager.publish("welcome")?;
//! assert_eq!(engine.popup("welcome", &ctx, Vec::new()), "Hi Dana");
//! # Ok::<(), pagecraft::BuilderError>(())
//! ```

pub mod config;
pub mod css;
pub mod engine;
pub mod error;
pub mod html_escape;
pub mod key;
pub mod manager;
pub mod renderer;
pub mod scope;
pub mod store;
pub mod template;
pub mod value;

pub use config::{BuilderConfig, CssConfig, DefaultTemplate, TenantScope};
pub use css::{
    CssPublisher, GlobalStyles, MemorySettingsStore, PublishedCss, SettingsStore,
    StyleSettings,
};
pub use engine::Engine;
pub use error::{BuilderError, Result};
pub use key::{KeyKind, KeyLookup, KeyResolver, TemplateKey};
pub use manager::{RefreshReport, TemplateManager};
pub use pagecraft_ast::{Diagnostic, DiagnosticKind, Location};
pub use renderer::{RenderWarning, Rendered, Renderer};
pub use scope::{RenderContext, Scope, ScopeBuilder};
pub use store::{MemoryStore, StoreError, StoredTemplate, TemplateStore, Tenant};
pub use template::{NewTemplate, Stamp, TemplateRecord, Version};
pub use value::Value;
