//! Theme stylesheet publishing.
//!
//! Global style settings are rendered into SCSS, compiled with `grass`, and
//! written to a public directory under a name that embeds a fingerprint of
//! the settings. The file name changes exactly when the settings change, so
//! browsers never serve a stale theme and unchanged settings never trigger a
//! recompile.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use grass::{Options, OutputStyle};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::CssConfig;
use crate::error::{BuilderError, Result};
use crate::store::StoreError;

/// Identity of the singleton settings record.
pub const SETTINGS_ID: &str = "global";

const FINGERPRINT_LEN: usize = 12;

/// Raw inputs of the theme stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    pub primary_color: String,
    pub secondary_color: String,
    pub background_color: String,
    pub text_color: String,
    pub body_font: String,
    pub heading_font: String,
    /// Root font size in pixels.
    pub base_font_size: u16,
    /// Extra SCSS appended after the generated rules.
    pub custom_scss: String,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            primary_color: "#2563eb".to_string(),
            secondary_color: "#64748b".to_string(),
            background_color: "#ffffff".to_string(),
            text_color: "#1f2937".to_string(),
            body_font: "system-ui, sans-serif".to_string(),
            heading_font: "system-ui, sans-serif".to_string(),
            base_font_size: 16,
            custom_scss: String::new(),
        }
    }
}

/// External persistence for style settings.
pub trait SettingsStore: Send + Sync {
    fn load(&self, id: &str) -> std::result::Result<Option<StyleSettings>, StoreError>;
    fn save(&self, id: &str, settings: &StyleSettings) -> std::result::Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    records: RwLock<BTreeMap<String, StyleSettings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose singleton record is already `settings`.
    pub fn with_global(settings: StyleSettings) -> Self {
        let store = Self::default();
        if let Ok(mut records) = store.records.write() {
            records.insert(SETTINGS_ID.to_string(), settings);
        }
        store
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, id: &str) -> std::result::Result<Option<StyleSettings>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Backend("settings lock poisoned".to_string()))?;
        Ok(records.get(id).cloned())
    }

    fn save(&self, id: &str, settings: &StyleSettings) -> std::result::Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Backend("settings lock poisoned".to_string()))?;
        records.insert(id.to_string(), settings.clone());
        Ok(())
    }
}

/// Accessor for the singleton settings record.
pub struct GlobalStyles<'a> {
    store: &'a dyn SettingsStore,
}

impl<'a> GlobalStyles<'a> {
    pub fn new(store: &'a dyn SettingsStore) -> Self {
        Self { store }
    }

    /// The current settings, creating the default record on first access.
    pub fn instance(&self) -> Result<StyleSettings> {
        if let Some(settings) = self.store.load(SETTINGS_ID)? {
            return Ok(settings);
        }
        let settings = StyleSettings::default();
        self.store.save(SETTINGS_ID, &settings)?;
        debug!("created default style settings");
        Ok(settings)
    }

    pub fn update<F>(&self, change: F) -> Result<StyleSettings>
    where
        F: FnOnce(&mut StyleSettings),
    {
        let mut settings = self.instance()?;
        change(&mut settings);
        self.store.save(SETTINGS_ID, &settings)?;
        Ok(settings)
    }
}

/// A stylesheet on disk and where it is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedCss {
    pub url: String,
    pub path: PathBuf,
    pub fingerprint: String,
    /// False when an artifact for these settings already existed.
    pub regenerated: bool,
}

pub struct CssPublisher {
    config: CssConfig,
}

impl CssPublisher {
    pub fn new(config: CssConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Public URL of the stylesheet for the stored settings.
    ///
    /// `None` when publishing is disabled or fails; failures are logged so a
    /// broken theme never breaks the page that links it.
    pub fn published_css_url(&self, store: &dyn SettingsStore) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        match self.publish_current(store) {
            Ok(css) => Some(css.url),
            Err(e) => {
                warn!(error = %e, "theme stylesheet unavailable");
                None
            }
        }
    }

    /// Publish the stylesheet for the settings held by `store`.
    ///
    /// Older artifacts are pruned only while the stored settings still match
    /// the ones just written.
    pub fn publish_current(&self, store: &dyn SettingsStore) -> Result<PublishedCss> {
        let styles = GlobalStyles::new(store);
        let published = self.write(&styles.instance()?)?;
        if published.regenerated {
            if self.fingerprint(&styles.instance()?)? == published.fingerprint {
                self.prune(&published.path);
            } else {
                debug!(
                    path = %published.path.display(),
                    "style settings changed during publish, keeping other stylesheets"
                );
            }
        }
        Ok(published)
    }

    /// Make sure the artifact for `settings` exists and return its location.
    pub fn publish(&self, settings: &StyleSettings) -> Result<PublishedCss> {
        let published = self.write(settings)?;
        if published.regenerated {
            self.prune(&published.path);
        }
        Ok(published)
    }

    fn write(&self, settings: &StyleSettings) -> Result<PublishedCss> {
        let fingerprint = self.fingerprint(settings)?;
        let file_name = self.file_name(&fingerprint);
        let path = self.config.output_dir.join(&file_name);
        let url = format!(
            "{}/{file_name}",
            self.config.public_url_prefix.trim_end_matches('/')
        );

        if path.is_file() {
            debug!(path = %path.display(), "theme stylesheet up to date");
            return Ok(PublishedCss {
                url,
                path,
                fingerprint,
                regenerated: false,
            });
        }

        let css = self.compile(settings)?;
        write_atomic(&self.config.output_dir, &path, &css)?;
        info!(path = %path.display(), %url, "published theme stylesheet");

        Ok(PublishedCss {
            url,
            path,
            fingerprint,
            regenerated: true,
        })
    }

    /// Compile `settings` to CSS.
    pub fn compile(&self, settings: &StyleSettings) -> Result<String> {
        let style = if self.config.minify {
            OutputStyle::Compressed
        } else {
            OutputStyle::Expanded
        };
        let options = Options::default().style(style);
        grass::from_string(scss_source(settings), &options).map_err(|e| BuilderError::Css {
            message: e.to_string(),
        })
    }

    /// Version marker for `settings`, stable across runs.
    pub fn fingerprint(&self, settings: &StyleSettings) -> Result<String> {
        let serialized = serde_json::to_vec(settings).map_err(|e| BuilderError::Css {
            message: format!("cannot serialize style settings: {e}"),
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&serialized);
        hasher.update([u8::from(self.config.minify)]);
        let mut hex = format!("{:x}", hasher.finalize());
        hex.truncate(FINGERPRINT_LEN);
        Ok(hex)
    }

    fn file_name(&self, fingerprint: &str) -> String {
        format!("{}-{fingerprint}.css", self.config.file_stem)
    }

    /// Remove artifacts not newer than `current`. Failures are only logged.
    fn prune(&self, current: &Path) {
        let written_at = match fs::metadata(current).and_then(|m| m.modified()) {
            Ok(time) => time,
            Err(e) => {
                warn!(path = %current.display(), error = %e, "cannot read stylesheet timestamp");
                return;
            }
        };
        let entries = match fs::read_dir(&self.config.output_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cannot list stylesheet directory");
                return;
            }
        };
        let prefix = format!("{}-", self.config.file_stem);

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let is_artifact = name.starts_with(&prefix) && name.ends_with(".css");
            if entry.path() == current || !is_artifact {
                continue;
            }
            let stale = entry
                .metadata()
                .and_then(|m| m.modified())
                .is_ok_and(|modified| modified <= written_at);
            if !stale {
                debug!(file = name, "keeping newer stylesheet");
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => debug!(file = name, "removed stale stylesheet"),
                Err(e) => warn!(file = name, error = %e, "cannot remove stale stylesheet"),
            }
        }
    }
}

/// Replace `path` in one step so readers never see a partial file.
fn write_atomic(dir: &Path, path: &Path, contents: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// SCSS for `settings`: variables, custom properties, base rules, then the
/// custom rules.
pub fn scss_source(settings: &StyleSettings) -> String {
    let mut scss = String::new();
    let _ = writeln!(scss, "$primary: {};", settings.primary_color);
    let _ = writeln!(scss, "$secondary: {};", settings.secondary_color);
    let _ = writeln!(scss, "$background: {};", settings.background_color);
    let _ = writeln!(scss, "$text: {};", settings.text_color);
    let _ = writeln!(scss, "$body-font: {};", settings.body_font);
    let _ = writeln!(scss, "$heading-font: {};", settings.heading_font);
    let _ = writeln!(scss, "$base-font-size: {}px;", settings.base_font_size);
    scss.push_str(BASE_RULES);
    if !settings.custom_scss.trim().is_empty() {
        scss.push('\n');
        scss.push_str(&settings.custom_scss);
        scss.push('\n');
    }
    scss
}

const BASE_RULES: &str = r#"
:root {
  --pc-primary: #{$primary};
  --pc-secondary: #{$secondary};
  --pc-background: #{$background};
  --pc-text: #{$text};
}

body {
  margin: 0;
  font-family: $body-font;
  font-size: $base-font-size;
  color: $text;
  background-color: $background;
}

h1, h2, h3, h4, h5, h6 {
  font-family: $heading-font;
}

a {
  color: $primary;
}

.pc-button {
  color: $background;
  background-color: $primary;

  &.pc-button--secondary {
    background-color: $secondary;
  }
}
"#;
