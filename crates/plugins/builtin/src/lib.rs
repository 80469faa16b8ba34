//! # domgraft built-in plugins
//!
//! Feature plugins shipped with domgraft, written against the public plugin
//! API only.
//!
//! ## Plugins
//!
//! - `custom-css`: injects the user's stylesheet into `head`
//! - `theme`: tags the root element with the selected theme
//! - `asset-badges`: selection badges on every asset card
//! - `toolbar-shortcut`: a shortcut button next to the host toolbar

pub mod asset_badges;
pub mod custom_css;
pub mod theme;
pub mod toolbar_shortcut;

use tracing::warn;

use domgraft_config::EngineConfig;
use domgraft_core::PluginDescriptor;
use domgraft_protocols::{Author, PluginError};

pub use asset_badges::{asset_badges, AssetBadge, SELECTED_ATTR};
pub use custom_css::{custom_css, STYLE_ID};
pub use theme::{theme, THEME_ATTR};
pub use toolbar_shortcut::{toolbar_shortcut, ShortcutButton, SHORTCUT_SELECTOR};

pub(crate) fn author() -> Author {
    Author::new("domgraft").with_id("domgraft")
}

/// Every built-in plugin, in registration order.
///
/// A plugin that fails to build is logged and left out; the rest still load.
pub fn builtin_plugins(config: &EngineConfig) -> Vec<PluginDescriptor> {
    keep_built([
        custom_css(),
        theme(),
        asset_badges(),
        toolbar_shortcut(config.default_debounce()),
    ])
}

fn keep_built<I>(results: I) -> Vec<PluginDescriptor>
where
    I: IntoIterator<Item = Result<PluginDescriptor, PluginError>>,
{
    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                warn!("Skipping built-in plugin: {}", e);
                None
            }
        })
        .collect()
}
