//! Template store adapter.
//!
//! Persistence belongs to the host application; the engine only talks to a
//! [`TemplateStore`]. [`MemoryStore`] backs tests and the command line.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::key::TemplateKey;
use crate::template::{NewTemplate, Stamp, TemplateRecord};

/// Errors reported by a store adapter
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Template already stored: '{0}'")]
    AlreadyExists(String),

    #[error("Template not stored: '{0}'")]
    Missing(String),

    #[error("Template store failure: {0}")]
    Backend(String),
}

/// Namespace a template lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tenant {
    Global,
    Classroom(String),
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tenant::Global => f.write_str("global"),
            Tenant::Classroom(id) => write!(f, "classroom:{id}"),
        }
    }
}

/// External persistence for templates.
pub trait TemplateStore: Send + Sync {
    fn fetch(
        &self,
        tenant: &Tenant,
        key: &TemplateKey,
    ) -> Result<Option<TemplateRecord>, StoreError>;

    /// Insert a new template. Fails with `AlreadyExists` on a key collision.
    fn create(&self, tenant: &Tenant, template: NewTemplate) -> Result<TemplateRecord, StoreError>;

    fn update_draft(
        &self,
        tenant: &Tenant,
        key: &TemplateKey,
        content: &str,
        stamp: &Stamp,
    ) -> Result<TemplateRecord, StoreError>;

    /// Copy the current draft into the published slot.
    fn publish(
        &self,
        tenant: &Tenant,
        key: &TemplateKey,
        stamp: &Stamp,
    ) -> Result<TemplateRecord, StoreError>;

    fn list(&self, tenant: &Tenant) -> Result<Vec<TemplateRecord>, StoreError>;

    fn exists(&self, tenant: &Tenant, key: &TemplateKey) -> Result<bool, StoreError> {
        Ok(self.fetch(tenant, key)?.is_some())
    }
}

/// One entry of a [`MemoryStore`] snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTemplate {
    pub tenant: Tenant,
    pub record: TemplateRecord,
}

type Records = BTreeMap<(Tenant, String), TemplateRecord>;

/// In-memory store, safe to share across threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(entries: Vec<StoredTemplate>) -> Self {
        let records = entries
            .into_iter()
            .map(|e| ((e.tenant, e.record.key.clone()), e.record))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn snapshot(&self) -> Result<Vec<StoredTemplate>, StoreError> {
        let records = self.read()?;
        Ok(records
            .iter()
            .map(|((tenant, _), record)| StoredTemplate {
                tenant: tenant.clone(),
                record: record.clone(),
            })
            .collect())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Records>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Records>, StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn modify<F>(
        &self,
        tenant: &Tenant,
        key: &TemplateKey,
        f: F,
    ) -> Result<TemplateRecord, StoreError>
    where
        F: FnOnce(&mut TemplateRecord),
    {
        let mut records = self.write()?;
        let record = records
            .get_mut(&(tenant.clone(), key.as_str().to_string()))
            .ok_or_else(|| StoreError::Missing(key.to_string()))?;
        f(record);
        Ok(record.clone())
    }
}

impl TemplateStore for MemoryStore {
    fn fetch(
        &self,
        tenant: &Tenant,
        key: &TemplateKey,
    ) -> Result<Option<TemplateRecord>, StoreError> {
        let records = self.read()?;
        Ok(records
            .get(&(tenant.clone(), key.as_str().to_string()))
            .cloned())
    }

    fn create(&self, tenant: &Tenant, template: NewTemplate) -> Result<TemplateRecord, StoreError> {
        let mut records = self.write()?;
        let id = (tenant.clone(), template.key.as_str().to_string());
        if records.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id.1));
        }
        let record = template.into_record();
        records.insert(id, record.clone());
        Ok(record)
    }

    fn update_draft(
        &self,
        tenant: &Tenant,
        key: &TemplateKey,
        content: &str,
        stamp: &Stamp,
    ) -> Result<TemplateRecord, StoreError> {
        self.modify(tenant, key, |record| {
            record.draft = content.to_string();
            record.updated_at = stamp.at;
            record.updated_by = stamp.actor.clone();
        })
    }

    fn publish(
        &self,
        tenant: &Tenant,
        key: &TemplateKey,
        stamp: &Stamp,
    ) -> Result<TemplateRecord, StoreError> {
        self.modify(tenant, key, |record| {
            record.published = Some(record.draft.clone());
            record.published_at = Some(stamp.at);
            record.updated_at = stamp.at;
            record.updated_by = stamp.actor.clone();
        })
    }

    fn list(&self, tenant: &Tenant) -> Result<Vec<TemplateRecord>, StoreError> {
        let records = self.read()?;
        Ok(records
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
