//! Entry points used by the host application's views.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{BuilderConfig, TenantScope};
use crate::css::{CssPublisher, GlobalStyles, PublishedCss, SettingsStore};
use crate::error::{BuilderError, Result};
use crate::key::{KeyLookup, KeyResolver};
use crate::manager::TemplateManager;
use crate::renderer::{Rendered, Renderer};
use crate::scope::{RenderContext, ScopeBuilder};
use crate::store::{TemplateStore, Tenant};
use crate::template::Version;
use crate::value::Value;

/// Template engine bound to a configuration and its stores.
///
/// Cheap to share behind an `Arc`; every call is independent and the
/// engine holds no per-request state.
pub struct Engine {
    config: BuilderConfig,
    resolver: KeyResolver,
    scope_builder: ScopeBuilder,
    store: Arc<dyn TemplateStore>,
    settings: Arc<dyn SettingsStore>,
    css: CssPublisher,
}

impl Engine {
    pub fn new(
        config: BuilderConfig,
        store: Arc<dyn TemplateStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            resolver: KeyResolver::from_config(&config),
            scope_builder: ScopeBuilder::from_config(&config),
            css: CssPublisher::new(config.css.clone()),
            config,
            store,
            settings,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }

    /// Namespace that requests with `context` read and write.
    pub fn tenant_for(&self, context: &RenderContext) -> Result<Tenant> {
        match self.config.scope {
            TenantScope::Global => Ok(Tenant::Global),
            TenantScope::Classroom => context
                .classroom_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| Tenant::Classroom(id.to_string()))
                .ok_or(BuilderError::MissingTenant),
        }
    }

    /// Manager for the tenant of `context`.
    pub fn manager(&self, context: &RenderContext) -> Result<TemplateManager<'_>> {
        Ok(self.manager_for(self.tenant_for(context)?))
    }

    pub fn manager_for(&self, tenant: Tenant) -> TemplateManager<'_> {
        TemplateManager::new(
            &self.config,
            &self.resolver,
            self.store.as_ref(),
            tenant,
        )
    }

    /// Render a template for the editor preview.
    ///
    /// `version` defaults to the draft. The template's mock data fills scope
    /// names the request does not provide.
    pub fn preview<I>(
        &self,
        identifier: &str,
        version: Option<&str>,
        context: &RenderContext,
        extra: I,
    ) -> Result<Rendered>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let version = Version::parse_or(version, Version::Draft)?;
        let tenant = self.tenant_for(context)?;
        let key = self.resolver.resolve(identifier, KeyLookup::Auto)?;
        let record = self
            .store
            .fetch(&tenant, &key)?
            .ok_or_else(|| BuilderError::NotFound {
                key: key.to_string(),
            })?;

        let scope = self
            .scope_builder
            .build_preview(context, extra, record.mock_data.as_ref());
        let renderer = Renderer::new(&self.resolver, self.store.as_ref(), &tenant);
        renderer.render_record(&record, version, &scope, self.config.max_include_depth)
    }

    /// Published version of a popup, with every failure reported.
    pub fn render_popup<I>(
        &self,
        short_key: &str,
        context: &RenderContext,
        data: I,
    ) -> Result<Rendered>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.render_published(short_key, KeyLookup::Popup, context, data)
    }

    /// Published version of a page template, with every failure reported.
    pub fn render_page<I>(&self, key: &str, context: &RenderContext, data: I) -> Result<Rendered>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.render_published(key, KeyLookup::Page, context, data)
    }

    /// Markup of a published popup, or `""` when it cannot be rendered.
    pub fn popup<I>(&self, short_key: &str, context: &RenderContext, data: I) -> String
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.silent(short_key, self.render_popup(short_key, context, data))
    }

    /// Markup of a published page template, or `""` when it cannot be
    /// rendered.
    pub fn page<I>(&self, key: &str, context: &RenderContext, data: I) -> String
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.silent(key, self.render_page(key, context, data))
    }

    /// URL of the current theme stylesheet, publishing it when needed.
    pub fn theme_css_url(&self) -> Option<String> {
        self.css.published_css_url(self.settings.as_ref())
    }

    /// Publish the stylesheet for the stored settings, reporting failures.
    pub fn publish_css(&self) -> Result<PublishedCss> {
        self.css.publish_current(self.settings.as_ref())
    }

    pub fn styles(&self) -> GlobalStyles<'_> {
        GlobalStyles::new(self.settings.as_ref())
    }

    pub fn css(&self) -> &CssPublisher {
        &self.css
    }

    fn render_published<I>(
        &self,
        raw_key: &str,
        lookup: KeyLookup,
        context: &RenderContext,
        data: I,
    ) -> Result<Rendered>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let tenant = self.tenant_for(context)?;
        let scope = self.scope_builder.build(context, data);
        let renderer = Renderer::new(&self.resolver, self.store.as_ref(), &tenant);
        renderer.render(
            raw_key,
            lookup,
            Version::Published,
            &scope,
            self.config.max_include_depth,
        )
    }

    fn silent(&self, key: &str, rendered: Result<Rendered>) -> String {
        match rendered {
            Ok(rendered) => {
                for warning in &rendered.warnings {
                    debug!(key, %warning, "render warning");
                }
                rendered.into_markup()
            }
            Err(BuilderError::NotFound { .. }) => {
                debug!(key, "template not found, rendering nothing");
                String::new()
            }
            Err(e) => {
                warn!(key, error = %e, "template render failed, rendering nothing");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::MemorySettingsStore;
    use crate::store::MemoryStore;

    fn engine(config: BuilderConfig) -> Engine {
        Engine::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemorySettingsStore::new()),
        )
    }

    #[test]
    fn test_global_scope_ignores_classroom() {
        let engine = engine(BuilderConfig::default());
        let ctx = RenderContext::new().with_classroom("c1", "Room 1");
        assert_eq!(engine.tenant_for(&ctx).unwrap(), Tenant::Global);
    }

    #[test]
    fn test_classroom_scope_needs_classroom_id() {
        let engine = engine(BuilderConfig {
            scope: TenantScope::Classroom,
            ..BuilderConfig::default()
        });
        assert!(matches!(
            engine.tenant_for(&RenderContext::new()),
            Err(BuilderError::MissingTenant)
        ));
        let ctx = RenderContext::new().with_classroom("c1", "Room 1");
        assert_eq!(
            engine.tenant_for(&ctx).unwrap(),
            Tenant::Classroom("c1".to_string())
        );
        assert_eq!(
            engine.popup("welcome", &RenderContext::new(), Vec::new()),
            ""
        );
    }

    #[test]
    fn test_preview_rejects_unknown_version() {
        let engine = engine(BuilderConfig::default());
        let result = engine.preview(
            "classroom.page",
            Some("latest"),
            &RenderContext::new(),
            Vec::new(),
        );
        assert!(matches!(result, Err(BuilderError::InvalidVersion { .. })));
    }
}
