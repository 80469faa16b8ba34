//! Offline demo: the built-in plugins on a simulated, re-rendering host page.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use domgraft_config::{Config, MemorySettingsStore};
use domgraft_core::{PatchEngine, PluginRegistry};
use domgraft_dom::MemoryDocument;
use domgraft_plugins::builtin_plugins;
use domgraft_protocols::storage::keys;
use domgraft_protocols::{Document, DomError, SettingsStore, UiEvent};

pub(crate) async fn run_demo(config: &Config) -> Result<()> {
    let doc = Arc::new(MemoryDocument::new().with_max_flush_rounds(config.engine.max_flush_rounds));
    render_toolbar(&doc)?;
    render_assets(&doc, &["logo", "banner"])?;

    let store = Arc::new(MemorySettingsStore::with_values([
        (keys::CUSTOM_CSS, "[data-domgraft-selected] { outline: 2px solid; }"),
        (keys::THEME, "dark"),
    ]));
    for name in ["asset-badges", "toolbar-shortcut"] {
        store.set_bool(&keys::plugin_enabled(name), true)?;
    }

    let registry = PluginRegistry::new(PatchEngine::new(doc.clone(), doc.clone()), store);
    if let Some(err) = registry.register_all(builtin_plugins(&config.engine)).into_iter().next() {
        bail!("failed to register plugin: {}", err);
    }
    let started = registry.start();
    info!(plugins = started, "Demo plugins started");

    // The host re-renders its list with a new card.
    render_assets(&doc, &["logo", "banner", "icon"])?;
    doc.flush();
    tokio::time::sleep(config.engine.default_debounce() + Duration::from_millis(50)).await;

    let card = doc
        .query_selector(doc.body(), "[data-asset-id=banner]")?
        .context("banner card missing")?;
    let badge = doc
        .query_selector(card, "button.domgraft-badge")?
        .context("badge was not mounted")?;
    registry.engine().dispatch_event(&UiEvent::click(badge));

    println!("{}", doc.to_html(doc.root()));
    println!();
    for plugin in registry.list() {
        println!("{:<20} mounts={}", plugin.name, plugin.mounts);
    }

    registry.shutdown();
    doc.flush();
    println!();
    println!("{}", doc.to_html(doc.root()));
    Ok(())
}

fn render_toolbar(doc: &MemoryDocument) -> Result<(), DomError> {
    let toolbar = doc.element("nav").class("toolbar").append_to(doc.body())?;
    let icon = doc.element("button").attr("aria-label", "Menu").append_to(toolbar)?;
    doc.element("svg").append_to(icon)?;
    doc.element("button").text("Upload").append_to(toolbar)?;
    Ok(())
}

/// Replace the asset list the way the host app does.
fn render_assets(doc: &MemoryDocument, ids: &[&str]) -> Result<(), DomError> {
    if let Some(old) = doc.query_selector(doc.body(), "ul.assets")? {
        doc.remove(old)?;
    }
    let list = doc.element("ul").class("assets").append_to(doc.body())?;
    for id in ids {
        doc.element("li")
            .class("card")
            .attr("data-asset-id", id)
            .text(id)
            .append_to(list)?;
    }
    Ok(())
}
