//! Theme selection.

use tracing::{info, warn};

use domgraft_core::{define_plugin, PluginContext, PluginDescriptor, PluginHooks};
use domgraft_protocols::storage::keys;
use domgraft_protocols::{PluginCategory, PluginError};

/// Attribute on the root element naming the active theme.
pub const THEME_ATTR: &str = "data-domgraft-theme";

pub fn theme() -> Result<PluginDescriptor, PluginError> {
    define_plugin("theme")
        .description("Applies the theme stored in settings.theme")
        .author(crate::author())
        .category(PluginCategory::Appearance)
        .tag("theme")
        .enabled_by_default(true)
        .hooks(Theme)
        .build()
}

struct Theme;

/// Theme names are used verbatim in stylesheets.
fn is_valid_theme(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl PluginHooks for Theme {
    fn start(&self, ctx: &PluginContext<'_>) -> Result<(), PluginError> {
        let doc = ctx.document();
        let name = ctx.settings().get(keys::THEME)?.unwrap_or_default();
        let name = name.trim();

        let result = if name.is_empty() {
            doc.remove_attribute(doc.root(), THEME_ATTR)
        } else if !is_valid_theme(name) {
            warn!(plugin = %ctx.plugin(), theme = %name, "Ignoring invalid theme name");
            doc.remove_attribute(doc.root(), THEME_ATTR)
        } else {
            info!(plugin = %ctx.plugin(), theme = %name, "Theme applied");
            doc.set_attribute(doc.root(), THEME_ATTR, name)
        };

        result.map_err(|e| PluginError::HookFailed {
            plugin: ctx.plugin().to_string(),
            message: e.to_string(),
        })
    }

    fn stop(&self, ctx: &PluginContext<'_>) -> Result<(), PluginError> {
        let doc = ctx.document();
        doc.remove_attribute(doc.root(), THEME_ATTR)
            .map_err(|e| PluginError::HookFailed {
                plugin: ctx.plugin().to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use domgraft_config::MemorySettingsStore;
    use domgraft_dom::MemoryDocument;
    use domgraft_protocols::Document;

    fn start_with(theme: &str) -> MemoryDocument {
        let doc = MemoryDocument::new();
        let store = MemorySettingsStore::with_values([(keys::THEME, theme)]);
        Theme
            .start(&PluginContext::new("theme", &doc, &store))
            .unwrap();
        doc
    }

    #[test]
    fn test_sets_root_attribute() {
        let doc = start_with(" dark ");
        assert_eq!(doc.attribute(doc.root(), THEME_ATTR).as_deref(), Some("dark"));
    }

    #[test]
    fn test_invalid_or_blank_theme_clears() {
        for value in ["", "dark; color: red", "a b"] {
            let doc = start_with(value);
            assert_eq!(doc.attribute(doc.root(), THEME_ATTR), None, "value {:?}", value);
        }
    }

    #[test]
    fn test_stop_clears_attribute() {
        let doc = start_with("solarized-light");
        let store = MemorySettingsStore::new();
        Theme
            .stop(&PluginContext::new("theme", &doc, &store))
            .unwrap();
        assert_eq!(doc.attribute(doc.root(), THEME_ATTR), None);
    }

    #[test]
    fn test_is_valid_theme() {
        assert!(is_valid_theme("high_contrast-2"));
        assert!(!is_valid_theme(""));
        assert!(!is_valid_theme("dark\""));
    }
}
