//! Theme stylesheet publishing against a temporary output directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pagecraft::{
    BuilderConfig, CssConfig, CssPublisher, Engine, GlobalStyles, MemorySettingsStore, MemoryStore,
    StyleSettings,
};
use pretty_assertions::assert_eq;

fn css_config(dir: &Path) -> CssConfig {
    CssConfig {
        output_dir: dir.join("public").join("builder"),
        public_url_prefix: "/builder/".to_string(),
        ..CssConfig::default()
    }
}

fn engine(dir: &Path) -> Engine {
    Engine::new(
        BuilderConfig {
            css: css_config(dir),
            ..BuilderConfig::default()
        },
        Arc::new(MemoryStore::new()),
        Arc::new(MemorySettingsStore::new()),
    )
}

fn stylesheets(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn url_is_stable_without_changes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let first = engine.theme_css_url().unwrap();
    let second = engine.theme_css_url().unwrap();
    assert_eq!(first, second);
    assert!(first.starts_with("/builder/theme-"));
    assert!(first.ends_with(".css"));
    assert_eq!(stylesheets(&dir.path().join("public/builder")).len(), 1);
}

#[test]
fn url_changes_with_settings() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let before = engine.theme_css_url().unwrap();
    engine
        .styles()
        .update(|s| s.primary_color = "#dc2626".to_string())
        .unwrap();
    let after = engine.theme_css_url().unwrap();

    assert_ne!(before, after);
    let output = dir.path().join("public/builder");
    let files = stylesheets(&output);
    assert_eq!(files.len(), 1, "stale stylesheet should be pruned");
    assert!(after.ends_with(&files[0]));

    let css = fs::read_to_string(output.join(&files[0])).unwrap();
    assert!(css.contains("#dc2626"));
}

#[test]
fn existing_artifact_is_not_regenerated() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = CssPublisher::new(css_config(dir.path()));
    let settings = StyleSettings::default();

    let first = publisher.publish(&settings).unwrap();
    assert!(first.regenerated);
    let second = publisher.publish(&settings).unwrap();
    assert!(!second.regenerated);
    assert_eq!(first.path, second.path);
    assert_eq!(
        first.url,
        format!("/builder/theme-{}.css", first.fingerprint)
    );
}

#[test]
fn unrelated_files_survive_pruning() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = CssPublisher::new(css_config(dir.path()));
    let output = dir.path().join("public/builder");
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("logo.png"), b"png").unwrap();
    fs::write(output.join("theme-old.css"), "body{}").unwrap();

    publisher.publish(&StyleSettings::default()).unwrap();

    let files = stylesheets(&output);
    assert_eq!(files.len(), 2);
    assert!(files.contains(&"logo.png".to_string()));
    assert!(!files.contains(&"theme-old.css".to_string()));
}

#[test]
fn concurrent_publishers_agree_on_one_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = CssPublisher::new(css_config(dir.path()));
    let settings = StyleSettings::default();

    let urls: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| publisher.publish(&settings).unwrap().url))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(urls.iter().all(|url| url == &urls[0]));
    let output = dir.path().join("public/builder");
    let files = stylesheets(&output);
    assert_eq!(files.len(), 1);
    assert!(urls[0].ends_with(&files[0]));

    let css = fs::read_to_string(output.join(&files[0])).unwrap();
    assert_eq!(css, publisher.compile(&settings).unwrap());
}

#[test]
fn missing_artifact_is_regenerated_under_same_url() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let url = engine.theme_css_url().unwrap();
    let published = engine.publish_css().unwrap();
    assert!(!published.regenerated);
    fs::remove_file(&published.path).unwrap();

    assert_eq!(engine.theme_css_url(), Some(url));
    assert!(published.path.is_file());
    let css = fs::read_to_string(&published.path).unwrap();
    assert!(css.contains("#2563eb"));
}

#[test]
fn broken_custom_rules_do_not_break_the_accessor() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    engine
        .styles()
        .update(|s| s.custom_scss = ".oops { color: ".to_string())
        .unwrap();

    assert_eq!(engine.theme_css_url(), None);
    assert!(engine.publish_css().is_err());
}

#[test]
fn settings_singleton_is_created_on_first_access() {
    let store = MemorySettingsStore::new();
    let styles = GlobalStyles::new(&store);
    let settings = styles.instance().unwrap();
    assert_eq!(settings, StyleSettings::default());

    styles.update(|s| s.base_font_size = 18).unwrap();
    assert_eq!(styles.instance().unwrap().base_font_size, 18);
}

#[test]
fn disabled_publishing_has_no_url() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(
        BuilderConfig {
            css: CssConfig {
                enabled: false,
                ..css_config(dir.path())
            },
            ..BuilderConfig::default()
        },
        Arc::new(MemoryStore::new()),
        Arc::new(MemorySettingsStore::new()),
    );
    assert_eq!(engine.theme_css_url(), None);
    assert!(!dir.path().join("public").exists());
}
