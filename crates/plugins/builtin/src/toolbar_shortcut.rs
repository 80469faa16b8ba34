//! Shortcut button next to the host toolbar.
//!
//! The host does not label its toolbar reliably, so the anchor is located
//! through a [`MatcherChain`]: the tagged action first, then the first plain
//! (icon-less) button.

use std::time::Duration;

use domgraft_core::{define_plugin, MatcherChain, Patch, PluginDescriptor};
use domgraft_protocols::{
    Component, ComponentError, Document, InsertPosition, MountContext, MountedComponent, NodeId,
    PluginCategory, PluginError, UiEvent,
};

/// Primary anchor: the host's tagged toolbar action.
pub const SHORTCUT_SELECTOR: &str = "[data-testid=toolbar-primary-action]";

/// Root attribute set while the shortcut panel is open.
pub const PANEL_ATTR: &str = "data-domgraft-panel";

pub fn toolbar_shortcut(debounce: Duration) -> Result<PluginDescriptor, PluginError> {
    let mut patch = Patch::matcher(anchor_chain())
        .first()
        .position(InsertPosition::After)
        .component(ShortcutButton);
    if !debounce.is_zero() {
        patch = patch.debounce(debounce);
    }

    define_plugin("toolbar-shortcut")
        .description("Shortcut button next to the toolbar")
        .author(crate::author())
        .category(PluginCategory::Utility)
        .tag("toolbar")
        .patch(patch)
        .build()
}

fn anchor_chain() -> MatcherChain {
    MatcherChain::new()
        .then_selector(SHORTCUT_SELECTOR)
        .then_predicate("first button without an svg", is_plain_button)
}

fn is_plain_button(doc: &dyn Document, node: NodeId) -> bool {
    doc.tag_name(node).as_deref() == Some("button")
        && matches!(doc.query_selector(node, "svg"), Ok(None))
}

pub struct ShortcutButton;

impl Component for ShortcutButton {
    fn name(&self) -> &str {
        "shortcut-button"
    }

    fn render(&self, ctx: &MountContext<'_>) -> Result<Box<dyn MountedComponent>, ComponentError> {
        let doc = ctx.document();
        let button = doc.create_element("button");
        doc.set_attribute(button, "class", "domgraft-shortcut")?;
        doc.set_attribute(button, "title", "Open domgraft")?;
        doc.set_text(button, "domgraft")?;
        doc.insert(ctx.container(), button, InsertPosition::Append)?;
        Ok(Box::new(MountedShortcut { open: false }))
    }
}

struct MountedShortcut {
    open: bool,
}

impl MountedComponent for MountedShortcut {
    fn handle_event(&mut self, document: &dyn Document, event: &UiEvent) -> Result<(), ComponentError> {
        if event.name != "click" {
            return Ok(());
        }
        self.open = !self.open;
        if self.open {
            document.set_attribute(document.root(), PANEL_ATTR, "open")?;
        } else {
            document.remove_attribute(document.root(), PANEL_ATTR)?;
        }
        Ok(())
    }

    fn unmount(&mut self, document: &dyn Document) -> Result<(), ComponentError> {
        if self.open {
            document.remove_attribute(document.root(), PANEL_ATTR)?;
        }
        Ok(())
    }
}
