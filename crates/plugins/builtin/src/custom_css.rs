//! User stylesheet injection.

use tracing::{debug, info};

use domgraft_core::{define_plugin, PluginContext, PluginDescriptor, PluginHooks};
use domgraft_protocols::storage::keys;
use domgraft_protocols::{Document, DomError, InsertPosition, PluginCategory, PluginError};

/// `id` of the injected `<style>` element.
pub const STYLE_ID: &str = "domgraft-custom-css";

pub fn custom_css() -> Result<PluginDescriptor, PluginError> {
    define_plugin("custom-css")
        .description("Injects the stylesheet stored in settings.customCss")
        .author(crate::author())
        .category(PluginCategory::Appearance)
        .tag("css")
        .enabled_by_default(true)
        .hooks(CustomCss)
        .build()
}

struct CustomCss;

impl PluginHooks for CustomCss {
    fn start(&self, ctx: &PluginContext<'_>) -> Result<(), PluginError> {
        let doc = ctx.document();
        remove_style(doc).map_err(|e| hook_error(ctx, e))?;

        let css = ctx.settings().get(keys::CUSTOM_CSS)?.unwrap_or_default();
        if css.trim().is_empty() {
            debug!(plugin = %ctx.plugin(), "No custom CSS configured");
            return Ok(());
        }

        let head = doc.section("head").unwrap_or_else(|| doc.root());
        let style = doc.create_element("style");
        doc.set_attribute(style, "id", STYLE_ID)
            .and_then(|_| doc.set_text(style, &css))
            .and_then(|_| doc.insert(head, style, InsertPosition::Append))
            .map_err(|e| hook_error(ctx, e))?;
        info!(plugin = %ctx.plugin(), bytes = css.len(), "Custom CSS injected");
        Ok(())
    }

    fn stop(&self, ctx: &PluginContext<'_>) -> Result<(), PluginError> {
        remove_style(ctx.document()).map_err(|e| hook_error(ctx, e))
    }
}

fn remove_style(doc: &dyn Document) -> Result<(), DomError> {
    for style in doc.query_selector_all(doc.root(), &format!("style#{}", STYLE_ID))? {
        doc.remove(style)?;
    }
    Ok(())
}

fn hook_error(ctx: &PluginContext<'_>, e: DomError) -> PluginError {
    PluginError::HookFailed {
        plugin: ctx.plugin().to_string(),
        message: e.to_string(),
    }
}
