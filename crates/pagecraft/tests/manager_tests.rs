//! Template lifecycle through the manager: seeding, refresh, popup creation
//! and publishing.

use pagecraft::{
    BuilderConfig, BuilderError, DefaultTemplate, KeyKind, KeyResolver, MemoryStore, RefreshReport,
    TemplateManager, TemplateRecord, Tenant,
};
use pretty_assertions::assert_eq;

fn config_with_defaults(defaults: &[(&str, &str)]) -> BuilderConfig {
    BuilderConfig {
        allowed_keys: vec!["classroom.page".to_string(), "classroom.footer".to_string()],
        defaults: defaults
            .iter()
            .map(|(key, content)| DefaultTemplate {
                key: key.to_string(),
                name: key.to_string(),
                content: content.to_string(),
                mock_data: None,
            })
            .collect(),
        ..BuilderConfig::default()
    }
}

fn contents(records: &[TemplateRecord]) -> Vec<(String, String, Option<String>)> {
    records
        .iter()
        .map(|r| (r.key.clone(), r.draft.clone(), r.published.clone()))
        .collect()
}

// ============================================================================
// Seeding
// ============================================================================

#[test]
fn seeding_twice_equals_seeding_once() {
    let defaults = [
        ("classroom.page", "page v1"),
        ("classroom.footer", "foot v1"),
    ];
    let config = config_with_defaults(&defaults);
    let resolver = KeyResolver::from_config(&config);
    let store = MemoryStore::new();
    let manager = TemplateManager::new(&config, &resolver, &store, Tenant::Global);

    let created = manager.ensure_default_templates().unwrap();
    assert_eq!(created.len(), 2);
    let after_first = manager.list().unwrap();

    let created = manager.ensure_default_templates().unwrap();
    assert!(created.is_empty());
    assert_eq!(manager.list().unwrap(), after_first);
}

#[test]
fn seeding_keeps_edited_drafts() {
    let config = config_with_defaults(&[("classroom.page", "page v1")]);
    let resolver = KeyResolver::from_config(&config);
    let store = MemoryStore::new();
    let manager = TemplateManager::new(&config, &resolver, &store, Tenant::Global);

    manager.ensure_default_templates().unwrap();
    manager.update_draft("classroom.page", "edited").unwrap();
    manager.ensure_default_templates().unwrap();

    assert_eq!(manager.get("classroom.page").unwrap().draft, "edited");
}

#[test]
fn seeded_defaults_are_pages_without_published_body() {
    let config = BuilderConfig::default();
    let resolver = KeyResolver::from_config(&config);
    let store = MemoryStore::new();
    let manager = TemplateManager::new(&config, &resolver, &store, Tenant::Global);

    manager.ensure_default_templates().unwrap();
    let page = manager.get("classroom.page").unwrap();
    assert_eq!(page.kind, KeyKind::Page);
    assert_eq!(page.published, None);
    assert_eq!(page.published_at, None);
}

// ============================================================================
// Refresh
// ============================================================================

#[test]
fn refresh_overwrites_only_unpublished_defaults() {
    let defaults = [
        ("classroom.page", "page v1"),
        ("classroom.footer", "foot v1"),
    ];
    let old = config_with_defaults(&defaults);
    let resolver = KeyResolver::from_config(&old);
    let store = MemoryStore::new();

    let manager = TemplateManager::new(&old, &resolver, &store, Tenant::Global);
    manager.ensure_default_templates().unwrap();
    manager
        .update_draft("classroom.page", "customized")
        .unwrap();
    manager.publish("classroom.page").unwrap();
    manager
        .update_draft("classroom.page", "customized again")
        .unwrap();
    manager.update_draft("classroom.footer", "scratch").unwrap();

    let defaults = [
        ("classroom.page", "page v2"),
        ("classroom.footer", "foot v2"),
    ];
    let new = config_with_defaults(&defaults);
    let manager =
        TemplateManager::new(&new, &resolver, &store, Tenant::Global).with_actor("deploy");
    let report = manager.refresh_defaults().unwrap();

    assert_eq!(
        report,
        RefreshReport {
            refreshed: vec!["classroom.footer".to_string()],
            skipped_published: vec!["classroom.page".to_string()],
            ..RefreshReport::default()
        }
    );

    let page = manager.get("classroom.page").unwrap();
    assert_eq!(page.draft, "customized again");
    assert_eq!(page.published.as_deref(), Some("customized"));

    let footer = manager.get("classroom.footer").unwrap();
    assert_eq!(footer.draft, "foot v2");
    assert_eq!(footer.updated_by.as_deref(), Some("deploy"));
}

#[test]
fn refresh_is_idempotent() {
    let config = config_with_defaults(&[("classroom.page", "page v1")]);
    let resolver = KeyResolver::from_config(&config);
    let store = MemoryStore::new();
    let manager = TemplateManager::new(&config, &resolver, &store, Tenant::Global);

    manager.ensure_default_templates().unwrap();
    let before = contents(&manager.list().unwrap());
    let report = manager.refresh_defaults().unwrap();

    assert_eq!(report.unchanged, vec!["classroom.page".to_string()]);
    assert!(report.refreshed.is_empty());
    assert_eq!(contents(&manager.list().unwrap()), before);
}

// ============================================================================
// Popups
// ============================================================================

#[test]
fn back_to_school_popup_is_created_once() {
    let config = BuilderConfig::default();
    let resolver = KeyResolver::from_config(&config);
    let store = MemoryStore::new();
    let manager =
        TemplateManager::new(&config, &resolver, &store, Tenant::Global).with_actor("ops");

    let record = manager.create_popup_template("Back to School").unwrap();
    assert_eq!(record.key, "classroom.popup.back_to_school");
    assert_eq!(record.kind, KeyKind::Popup);
    assert_eq!(record.draft, "");
    assert_eq!(record.published, None);
    assert_eq!(record.created_by.as_deref(), Some("ops"));

    let second = manager.create_popup_template("Back to School");
    assert!(matches!(
        second,
        Err(BuilderError::DuplicateKey { key }) if key == "classroom.popup.back_to_school"
    ));
    // Names that slug to the same key collide too.
    assert!(matches!(
        manager.create_popup_template("back-to  school!"),
        Err(BuilderError::DuplicateKey { .. })
    ));
}

#[test]
fn popup_names_without_alphanumerics_are_rejected() {
    let config = BuilderConfig::default();
    let resolver = KeyResolver::from_config(&config);
    let store = MemoryStore::new();
    let manager = TemplateManager::new(&config, &resolver, &store, Tenant::Global);

    assert!(matches!(
        manager.create_popup_template(" !!! "),
        Err(BuilderError::InvalidName { .. })
    ));
    assert!(manager.list().unwrap().is_empty());
}

#[test]
fn same_popup_name_in_different_tenants() {
    let config = BuilderConfig::default();
    let resolver = KeyResolver::from_config(&config);
    let store = MemoryStore::new();

    for id in ["a", "b"] {
        let tenant = Tenant::Classroom(id.to_string());
        let manager = TemplateManager::new(&config, &resolver, &store, tenant);
        manager.create_popup_template("Welcome").unwrap();
    }
    assert_eq!(store.snapshot().unwrap().len(), 2);
}

// ============================================================================
// Publishing
// ============================================================================

#[test]
fn publish_freezes_body_until_next_publish() {
    let config = BuilderConfig::default();
    let resolver = KeyResolver::from_config(&config);
    let store = MemoryStore::new();
    let manager = TemplateManager::new(&config, &resolver, &store, Tenant::Global);

    manager.create_popup_template("promo").unwrap();
    manager.update_draft("promo", "first").unwrap();
    let published = manager.publish("promo").unwrap();
    assert_eq!(published.published.as_deref(), Some("first"));
    assert!(published.published_at.is_some());

    manager.update_draft("promo", "second").unwrap();
    let record = manager.get("promo").unwrap();
    assert_eq!(record.published.as_deref(), Some("first"));

    manager.publish("promo").unwrap();
    let record = manager.get("promo").unwrap();
    assert_eq!(record.published.as_deref(), Some("second"));
}
