//! Template lifecycle: seeding, refresh, popup creation, editing and
//! publishing.

use tracing::{debug, info};

use crate::config::{BuilderConfig, DefaultTemplate};
use crate::error::{BuilderError, Result};
use crate::key::{KeyLookup, KeyResolver, TemplateKey};
use crate::store::{StoreError, TemplateStore, Tenant};
use crate::template::{NewTemplate, Stamp, TemplateRecord};
use crate::value::Value;

/// Outcome of [`TemplateManager::refresh_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Unpublished defaults whose draft was replaced.
    pub refreshed: Vec<String>,
    /// Unpublished defaults already holding the built-in content.
    pub unchanged: Vec<String>,
    /// Defaults left alone because they were published at least once.
    pub skipped_published: Vec<String>,
    /// Configured defaults with no stored template.
    pub missing: Vec<String>,
}

/// Mutating operations on one tenant's templates.
pub struct TemplateManager<'a> {
    config: &'a BuilderConfig,
    resolver: &'a KeyResolver,
    store: &'a dyn TemplateStore,
    tenant: Tenant,
    actor: Option<String>,
}

impl<'a> TemplateManager<'a> {
    pub fn new(
        config: &'a BuilderConfig,
        resolver: &'a KeyResolver,
        store: &'a dyn TemplateStore,
        tenant: Tenant,
    ) -> Self {
        Self {
            config,
            resolver,
            store,
            tenant,
            actor: None,
        }
    }

    /// Record `actor` as the author of every change made through this manager.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Create every configured default that does not exist yet.
    ///
    /// Existing templates are never touched, so calling this repeatedly is
    /// harmless. Returns the keys that were created.
    pub fn ensure_default_templates(&self) -> Result<Vec<TemplateKey>> {
        let mut created = Vec::new();

        for default in &self.config.defaults {
            let key = self.resolver.resolve(&default.key, KeyLookup::Page)?;
            if self.store.exists(&self.tenant, &key)? {
                debug!(%key, tenant = %self.tenant, "default template already present");
                continue;
            }

            let seed = self.seed(default, key.clone());
            match self.store.create(&self.tenant, seed) {
                Ok(_) => {
                    info!(%key, tenant = %self.tenant, "seeded default template");
                    created.push(key);
                }
                // Lost a race with another seeder; the template exists now.
                Err(StoreError::AlreadyExists(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(created)
    }

    /// Reset unpublished defaults to the built-in content.
    ///
    /// Decided per template: anything published at least once keeps its
    /// draft.
    pub fn refresh_defaults(&self) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();
        let stamp = self.stamp();

        for default in &self.config.defaults {
            let key = self.resolver.resolve(&default.key, KeyLookup::Page)?;
            let Some(record) = self.store.fetch(&self.tenant, &key)? else {
                report.missing.push(key.to_string());
                continue;
            };

            if record.is_published() {
                report.skipped_published.push(key.to_string());
            } else if record.draft == default.content {
                report.unchanged.push(key.to_string());
            } else {
                self.store
                    .update_draft(&self.tenant, &key, &default.content, &stamp)
                    .map_err(not_found)?;
                info!(%key, tenant = %self.tenant, "refreshed default template");
                report.refreshed.push(key.to_string());
            }
        }

        Ok(report)
    }

    /// Create an unpublished popup whose key is derived from `name`.
    pub fn create_popup_template(&self, name: &str) -> Result<TemplateRecord> {
        let key = self.resolver.popup_key_for_name(name)?;
        if self.store.exists(&self.tenant, &key)? {
            return Err(BuilderError::DuplicateKey {
                key: key.to_string(),
            });
        }

        let record = self
            .store
            .create(
                &self.tenant,
                NewTemplate {
                    key,
                    name: name.trim().to_string(),
                    draft: self.config.popup_default_content.clone(),
                    mock_data: None,
                    stamp: self.stamp(),
                },
            )
            .map_err(|e| match e {
                StoreError::AlreadyExists(key) => BuilderError::DuplicateKey { key },
                other => other.into(),
            })?;

        info!(key = %record.key, tenant = %self.tenant, "created popup template");
        Ok(record)
    }

    /// Save editor changes to a draft. The published body is unaffected.
    pub fn update_draft(&self, raw_key: &str, content: &str) -> Result<TemplateRecord> {
        let key = self.resolver.resolve(raw_key, KeyLookup::Auto)?;
        let record = self
            .store
            .update_draft(&self.tenant, &key, content, &self.stamp())
            .map_err(not_found)?;
        debug!(%key, tenant = %self.tenant, "draft updated");
        Ok(record)
    }

    /// Copy the current draft into the published slot.
    pub fn publish(&self, raw_key: &str) -> Result<TemplateRecord> {
        let key = self.resolver.resolve(raw_key, KeyLookup::Auto)?;
        let record = self
            .store
            .publish(&self.tenant, &key, &self.stamp())
            .map_err(not_found)?;
        info!(%key, tenant = %self.tenant, "published template");
        Ok(record)
    }

    pub fn get(&self, raw_key: &str) -> Result<TemplateRecord> {
        let key = self.resolver.resolve(raw_key, KeyLookup::Auto)?;
        self.store
            .fetch(&self.tenant, &key)?
            .ok_or_else(|| BuilderError::NotFound {
                key: key.to_string(),
            })
    }

    pub fn list(&self) -> Result<Vec<TemplateRecord>> {
        Ok(self.store.list(&self.tenant)?)
    }

    fn seed(&self, default: &DefaultTemplate, key: TemplateKey) -> NewTemplate {
        NewTemplate {
            key,
            name: default.name.clone(),
            draft: default.content.clone(),
            mock_data: default.mock_data.clone().map(Value::from_json),
            stamp: self.stamp(),
        }
    }

    fn stamp(&self) -> Stamp {
        Stamp::now(self.actor.as_deref())
    }
}

fn not_found(err: StoreError) -> BuilderError {
    match err {
        StoreError::Missing(key) => BuilderError::NotFound { key },
        other => other.into(),
    }
}
