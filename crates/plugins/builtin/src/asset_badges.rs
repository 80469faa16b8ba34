//! Selection badges on asset cards.
//!
//! Every element carrying `data-asset-id` gets a small toggle button. The
//! selection lives on the card as [`SELECTED_ATTR`] so other plugins and
//! host styles can read it; it is cleared again when the badge unmounts.

use tracing::debug;

use domgraft_core::{define_plugin, Patch, PluginDescriptor};
use domgraft_protocols::{
    Component, ComponentError, Document, InsertPosition, MountContext, MountedComponent, NodeId,
    PluginCategory, PluginError, UiEvent,
};

/// Card attribute set while the card is selected.
pub const SELECTED_ATTR: &str = "data-domgraft-selected";

const CARD_SELECTOR: &str = "[data-asset-id]";

pub fn asset_badges() -> Result<PluginDescriptor, PluginError> {
    define_plugin("asset-badges")
        .description("Selection badges on asset cards")
        .author(crate::author())
        .category(PluginCategory::Productivity)
        .tag("assets")
        .patch(Patch::selector(CARD_SELECTOR).for_each().component(AssetBadge))
        .build()
}

pub struct AssetBadge;

impl Component for AssetBadge {
    fn name(&self) -> &str {
        "asset-badge"
    }

    fn render(&self, ctx: &MountContext<'_>) -> Result<Box<dyn MountedComponent>, ComponentError> {
        let doc = ctx.document();
        let card = ctx.matched();
        let asset_id = doc
            .attribute(card, "data-asset-id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ComponentError::Render("card has no asset id".to_string()))?;

        let button = doc.create_element("button");
        doc.set_attribute(button, "class", "domgraft-badge")?;
        doc.set_attribute(button, "data-asset", &asset_id)?;
        doc.insert(ctx.container(), button, InsertPosition::Append)?;

        let mut badge = MountedBadge {
            card,
            button,
            selected: doc.attribute(card, SELECTED_ATTR).is_some(),
        };
        badge.sync(doc)?;
        Ok(Box::new(badge))
    }
}

struct MountedBadge {
    card: NodeId,
    button: NodeId,
    selected: bool,
}

impl MountedBadge {
    fn sync(&mut self, doc: &dyn Document) -> Result<(), ComponentError> {
        let (label, pressed) = if self.selected {
            ("Selected", "true")
        } else {
            ("Select", "false")
        };
        doc.set_text(self.button, label)?;
        doc.set_attribute(self.button, "aria-pressed", pressed)?;
        if self.selected {
            doc.set_attribute(self.card, SELECTED_ATTR, "true")?;
        } else {
            doc.remove_attribute(self.card, SELECTED_ATTR)?;
        }
        Ok(())
    }
}

impl MountedComponent for MountedBadge {
    fn handle_event(&mut self, document: &dyn Document, event: &UiEvent) -> Result<(), ComponentError> {
        if event.name != "click" {
            return Ok(());
        }
        self.selected = !self.selected;
        debug!(card = %self.card, selected = self.selected, "Badge toggled");
        self.sync(document)
    }

    fn unmount(&mut self, document: &dyn Document) -> Result<(), ComponentError> {
        // The host may already have dropped the card.
        if document.is_connected(self.card) {
            document.remove_attribute(self.card, SELECTED_ATTR)?;
        }
        Ok(())
    }
}
