//! JSON file holding the templates and style settings between runs.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use pagecraft::css::SETTINGS_ID;
use pagecraft::{MemorySettingsStore, MemoryStore, SettingsStore, StoredTemplate, StyleSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub templates: Vec<StoredTemplate>,
    #[serde(default)]
    pub styles: Option<StyleSettings>,
}

impl Snapshot {
    /// Read a snapshot; a missing file is an empty one.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot yet, starting empty");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    pub fn into_stores(self) -> (MemoryStore, MemorySettingsStore) {
        let settings = match self.styles {
            Some(styles) => MemorySettingsStore::with_global(styles),
            None => MemorySettingsStore::new(),
        };
        (MemoryStore::from_snapshot(self.templates), settings)
    }

    pub fn capture(store: &MemoryStore, settings: &MemorySettingsStore) -> Result<Self> {
        Ok(Self {
            templates: store.snapshot()?,
            styles: settings.load(SETTINGS_ID)?,
        })
    }

    /// Write to a temporary file beside `path`, then rename it into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        let json = serde_json::to_string_pretty(self)?;
        let mut file = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), templates = self.templates.len(), "snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecraft::{BuilderConfig, KeyResolver, TemplateManager, Tenant};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::load(&dir.path().join("store.json")).unwrap();
        assert!(snapshot.templates.is_empty());
        assert!(snapshot.styles.is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("store.json");

        let (store, settings) = Snapshot::default().into_stores();
        let config = BuilderConfig::default();
        let resolver = KeyResolver::from_config(&config);
        TemplateManager::new(&config, &resolver, &store, Tenant::Global)
            .ensure_default_templates()
            .unwrap();
        settings
            .save(
                SETTINGS_ID,
                &StyleSettings {
                    base_font_size: 20,
                    ..StyleSettings::default()
                },
            )
            .unwrap();
        Snapshot::capture(&store, &settings)
            .unwrap()
            .save(&path)
            .unwrap();

        let reloaded = Snapshot::load(&path).unwrap();
        assert_eq!(reloaded.templates.len(), 1);
        assert_eq!(reloaded.templates[0].record.key, "classroom.page");
        assert_eq!(reloaded.styles.map(|s| s.base_font_size), Some(20));
    }

    #[test]
    fn test_save_replaces_existing_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "old contents").unwrap();

        let snapshot = Snapshot {
            templates: Vec::new(),
            styles: Some(StyleSettings::default()),
        };
        snapshot.save(&path).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["store.json".to_string()]);
        let reloaded = Snapshot::load(&path).unwrap();
        assert_eq!(reloaded.styles, Some(StyleSettings::default()));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Snapshot::load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid snapshot"));
    }
}
