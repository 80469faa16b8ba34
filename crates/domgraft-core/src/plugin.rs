//! Plugin definition.
//!
//! Plugins are plain values built with [`define_plugin`]:
//!
//! ```ignore
//! let plugin = define_plugin("asset-badges")
//!     .description("Selection badges on asset cards")
//!     .author(Author::new("domgraft"))
//!     .category(PluginCategory::Productivity)
//!     .patch(Patch::selector("[data-asset-id]").for_each().component(AssetBadge))
//!     .build()?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use domgraft_protocols::{
    Author, Document, PluginCategory, PluginError, SettingsStore,
};

use crate::patch::{Patch, PatchDescriptor};

/// What a plugin hook may touch.
pub struct PluginContext<'a> {
    plugin: &'a str,
    document: &'a dyn Document,
    settings: &'a dyn SettingsStore,
}

impl<'a> PluginContext<'a> {
    pub fn new(plugin: &'a str, document: &'a dyn Document, settings: &'a dyn SettingsStore) -> Self {
        Self {
            plugin,
            document,
            settings,
        }
    }

    pub fn plugin(&self) -> &'a str {
        self.plugin
    }

    pub fn document(&self) -> &'a dyn Document {
        self.document
    }

    pub fn settings(&self) -> &'a dyn SettingsStore {
        self.settings
    }
}

/// Optional code run around a plugin's patches.
///
/// `start` runs before the patches are applied and `stop` after they are
/// removed. A failing `start` leaves the plugin disabled.
pub trait PluginHooks: Send + Sync {
    fn start(&self, _ctx: &PluginContext<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    fn stop(&self, _ctx: &PluginContext<'_>) -> Result<(), PluginError> {
        Ok(())
    }
}

/// A validated plugin.
#[derive(Clone)]
pub struct PluginDescriptor {
    pub name: String,
    pub description: String,
    pub authors: Vec<Author>,
    pub category: PluginCategory,
    pub tags: Vec<String>,
    pub patches: Vec<Arc<PatchDescriptor>>,
    pub enabled_by_default: bool,
    pub hooks: Option<Arc<dyn PluginHooks>>,
}

impl PluginDescriptor {
    /// Re-check a descriptor that may not have come from [`PluginBuilder`]:
    /// the name rules, and that every patch selector parses in `document`.
    pub fn validate(&self, document: &dyn Document) -> Result<(), PluginError> {
        validate_name(&self.name)?;
        for (index, patch) in self.patches.iter().enumerate() {
            patch
                .validate(document)
                .map_err(|source| PluginError::InvalidPatch {
                    plugin: self.name.clone(),
                    index,
                    source,
                })?;
        }
        Ok(())
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("tags", &self.tags)
            .field("patches", &self.patches.len())
            .field("enabled_by_default", &self.enabled_by_default)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Registry view of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: String,
    pub description: String,
    pub authors: Vec<Author>,
    pub category: PluginCategory,
    pub tags: Vec<String>,
    pub enabled: bool,
    pub enabled_by_default: bool,
    pub patches: usize,
    pub mounts: usize,
}

/// Start defining a plugin.
pub fn define_plugin(name: impl Into<String>) -> PluginBuilder {
    PluginBuilder {
        name: name.into(),
        description: String::new(),
        authors: Vec::new(),
        category: PluginCategory::default(),
        tags: Vec::new(),
        patches: Vec::new(),
        enabled_by_default: false,
        hooks: None,
    }
}

pub struct PluginBuilder {
    name: String,
    description: String,
    authors: Vec<Author>,
    category: PluginCategory,
    tags: Vec<String>,
    patches: Vec<Patch>,
    enabled_by_default: bool,
    hooks: Option<Arc<dyn PluginHooks>>,
}

impl PluginBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn author(mut self, author: Author) -> Self {
        self.authors.push(author);
        self
    }

    pub fn category(mut self, category: PluginCategory) -> Self {
        self.category = category;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn patch(mut self, patch: Patch) -> Self {
        self.patches.push(patch);
        self
    }

    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }

    pub fn hooks(mut self, hooks: impl PluginHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    /// Validate the name and build every patch.
    pub fn build(self) -> Result<PluginDescriptor, PluginError> {
        validate_name(&self.name)?;

        let name = self.name;
        let patches = self
            .patches
            .into_iter()
            .enumerate()
            .map(|(index, patch)| {
                patch
                    .build()
                    .map(Arc::new)
                    .map_err(|source| PluginError::InvalidPatch {
                        plugin: name.clone(),
                        index,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut tags = self.tags;
        tags.sort();
        tags.dedup();

        Ok(PluginDescriptor {
            name,
            description: self.description,
            authors: self.authors,
            category: self.category,
            tags,
            patches,
            enabled_by_default: self.enabled_by_default,
            hooks: self.hooks,
        })
    }
}

/// Names end up in settings keys (`plugins.<name>.enabled`), so they are
/// limited to lowercase ASCII letters, digits and `-`.
fn validate_name(name: &str) -> Result<(), PluginError> {
    let invalid = |reason: &str| PluginError::InvalidDescriptor {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("name may only contain a-z, 0-9 and '-'"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("name must not start or end with '-'"));
    }
    Ok(())
}
