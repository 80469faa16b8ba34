//! Shared value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Plugin author information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Category shown in the plugin settings list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginCategory {
    Appearance,
    Productivity,
    Utility,
    Developer,
    #[default]
    Other,
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PluginCategory::Appearance => "appearance",
            PluginCategory::Productivity => "productivity",
            PluginCategory::Utility => "utility",
            PluginCategory::Developer => "developer",
            PluginCategory::Other => "other",
        };
        f.write_str(name)
    }
}
