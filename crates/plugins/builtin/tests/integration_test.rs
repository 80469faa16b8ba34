//! Built-in plugins running together on a simulated host page.

use std::sync::Arc;
use std::time::Duration;

use domgraft_config::{EngineConfig, MemorySettingsStore};
use domgraft_core::{PatchEngine, PluginRegistry};
use domgraft_dom::MemoryDocument;
use domgraft_plugins::toolbar_shortcut::PANEL_ATTR;
use domgraft_plugins::{builtin_plugins, SELECTED_ATTR, STYLE_ID, THEME_ATTR};
use domgraft_protocols::storage::keys;
use domgraft_protocols::{Document, MutationNotifier, NodeId, SettingsStore, UiEvent};

// ============================================================================
// Test Helpers
// ============================================================================

struct Page {
    doc: Arc<MemoryDocument>,
    toolbar: NodeId,
}

/// A host page with an icon button, a plain button and one asset list.
fn page() -> Page {
    let doc = Arc::new(MemoryDocument::new());
    let toolbar = doc.element("nav").class("toolbar").append_to(doc.body()).unwrap();
    let icon = doc.element("button").append_to(toolbar).unwrap();
    doc.element("svg").append_to(icon).unwrap();
    doc.element("button").text("Upload").append_to(toolbar).unwrap();
    render_assets(&doc, &["a", "b"]);
    Page { doc, toolbar }
}

fn render_assets(doc: &MemoryDocument, ids: &[&str]) {
    if let Some(old) = doc.query_selector(doc.body(), "ul.assets").unwrap() {
        doc.remove(old).unwrap();
    }
    let list = doc.element("ul").class("assets").append_to(doc.body()).unwrap();
    for id in ids {
        doc.element("li")
            .class("card")
            .attr("data-asset-id", id)
            .text(id)
            .append_to(list)
            .unwrap();
    }
}

fn registry(page: &Page, store: Arc<MemorySettingsStore>) -> PluginRegistry {
    let engine = PatchEngine::new(page.doc.clone(), page.doc.clone());
    let registry = PluginRegistry::new(engine, store);
    let errors = registry.register_all(builtin_plugins(&EngineConfig::default()));
    assert!(errors.is_empty(), "registration failed: {:?}", errors);
    registry
}

fn enable_all(store: &MemorySettingsStore) {
    for name in ["asset-badges", "toolbar-shortcut"] {
        store.set_bool(&keys::plugin_enabled(name), true).unwrap();
    }
}

fn card(doc: &MemoryDocument, id: &str) -> NodeId {
    doc.query_selector(doc.body(), &format!("[data-asset-id={}]", id))
        .unwrap()
        .unwrap()
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_appearance_plugins_enabled_by_default() {
    let page = page();
    let store = Arc::new(MemorySettingsStore::with_values([
        (keys::CUSTOM_CSS, ".card { outline: 1px solid; }"),
        (keys::THEME, "dark"),
    ]));
    let registry = registry(&page, store);

    assert_eq!(registry.start(), 2);
    assert!(registry.is_enabled("custom-css"));
    assert!(registry.is_enabled("theme"));
    assert!(!registry.is_enabled("asset-badges"));
    assert!(!registry.is_enabled("toolbar-shortcut"));

    let doc = &page.doc;
    assert!(doc.query_selector(doc.head(), &format!("#{}", STYLE_ID)).unwrap().is_some());
    assert_eq!(doc.attribute(doc.root(), THEME_ATTR).as_deref(), Some("dark"));
    assert_eq!(registry.engine().total_mounts(), 0);
}

// ============================================================================
// All plugins
// ============================================================================

#[test]
fn test_all_plugins_mount_and_interact() {
    let page = page();
    let store = Arc::new(MemorySettingsStore::new());
    enable_all(&store);
    let registry = registry(&page, store);
    assert_eq!(registry.start(), 4);

    let doc = &page.doc;
    let engine = registry.engine();
    assert_eq!(engine.mount_count("asset-badges"), 2);
    assert_eq!(engine.mount_count("toolbar-shortcut"), 1);

    // The shortcut sits right after the plain toolbar button.
    let anchor = engine.mounted_anchors("toolbar-shortcut")[0];
    assert_eq!(doc.text_content(anchor), "Upload");
    let container = engine.container_of("toolbar-shortcut", anchor).unwrap();
    assert_eq!(doc.parent(container), Some(page.toolbar));

    // Badge clicks toggle the card's selection.
    let a = card(doc, "a");
    let badge = doc.query_selector(a, "button.domgraft-badge").unwrap().unwrap();
    assert!(engine.dispatch_event(&UiEvent::click(badge)));
    assert_eq!(doc.attribute(a, SELECTED_ATTR).as_deref(), Some("true"));
    assert_eq!(doc.attribute(badge, "aria-pressed").as_deref(), Some("true"));
    assert!(engine.dispatch_event(&UiEvent::click(badge)));
    assert_eq!(doc.attribute(a, SELECTED_ATTR), None);

    // The shortcut opens the panel.
    let shortcut = doc
        .query_selector(container, "button.domgraft-shortcut")
        .unwrap()
        .unwrap();
    assert!(engine.dispatch_event(&UiEvent::click(shortcut)));
    assert_eq!(doc.attribute(doc.root(), PANEL_ATTR).as_deref(), Some("open"));
}

#[test]
fn test_shutdown_restores_host_page() {
    let page = page();
    let doc = &page.doc;
    let before = doc.to_html(doc.root());

    let store = Arc::new(MemorySettingsStore::with_values([
        (keys::CUSTOM_CSS, "body {}"),
        (keys::THEME, "light"),
    ]));
    enable_all(&store);
    let registry = registry(&page, store.clone());
    registry.start();

    let badge = doc
        .query_selector(card(doc, "b"), "button.domgraft-badge")
        .unwrap()
        .unwrap();
    registry.engine().dispatch_event(&UiEvent::click(badge));

    registry.shutdown();
    doc.flush();
    assert_eq!(doc.to_html(doc.root()), before);
    assert_eq!(doc.active_observers(), 0);

    // Shutdown is not a user choice; flags stay enabled.
    assert_eq!(store.get_bool(&keys::plugin_enabled("asset-badges")).unwrap(), Some(true));
}

#[test]
fn test_disabling_custom_css_removes_style() {
    let page = page();
    let store = Arc::new(MemorySettingsStore::with_values([(keys::CUSTOM_CSS, "a {}")]));
    let registry = registry(&page, store.clone());
    registry.start();

    registry.set_enabled("custom-css", false).unwrap();
    let doc = &page.doc;
    assert!(doc.query_selector(doc.root(), "style").unwrap().is_none());
    assert_eq!(store.get(&keys::plugin_enabled("custom-css")).unwrap().as_deref(), Some("false"));
}

// ============================================================================
// Host re-renders
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_badges_follow_rerenders() {
    let page = page();
    let store = Arc::new(MemorySettingsStore::new());
    enable_all(&store);
    let registry = registry(&page, store);
    registry.start();

    let doc = &page.doc;
    render_assets(doc, &["a", "b", "c"]);
    doc.flush();
    assert_eq!(registry.engine().mount_count("asset-badges"), 3);

    // The toolbar is rebuilt; the debounced shortcut follows once it settles.
    doc.remove(page.toolbar).unwrap();
    let toolbar = doc.element("nav").append_to(doc.body()).unwrap();
    let action = doc
        .element("button")
        .attr("data-testid", "toolbar-primary-action")
        .append_to(toolbar)
        .unwrap();
    doc.flush();
    tokio::time::sleep(EngineConfig::default().default_debounce() + Duration::from_millis(50)).await;

    assert_eq!(registry.engine().mounted_anchors("toolbar-shortcut"), vec![action]);
}
