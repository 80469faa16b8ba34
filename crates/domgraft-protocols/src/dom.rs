//! Host document abstraction.
//!
//! The engine never talks to a concrete DOM. It is written against two
//! traits: [`Document`] for tree reads/writes and selector queries, and
//! [`MutationNotifier`] for change notification. A browser binding and the
//! in-memory host both implement them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DomError;

/// Opaque handle to a node in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node is inserted relative to a reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPosition {
    /// Immediately before the reference node, as a sibling.
    Before,
    /// As the first child of the reference node.
    Prepend,
    /// As the last child of the reference node.
    #[default]
    Append,
    /// Immediately after the reference node, as a sibling.
    After,
}

impl InsertPosition {
    /// Whether the inserted node becomes a sibling of the reference node.
    pub fn is_sibling(&self) -> bool {
        matches!(self, InsertPosition::Before | InsertPosition::After)
    }
}

/// Which kinds of changes an observer wants to hear about.
///
/// Used as part of the key that decides whether two subscriptions can share
/// one native observer, so it must hash and compare structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ObserveOptions {
    #[serde(default)]
    pub child_list: bool,
    #[serde(default)]
    pub attributes: bool,
    #[serde(default)]
    pub character_data: bool,
    #[serde(default)]
    pub subtree: bool,
    /// Restricts attribute records to these names. Kept sorted and deduplicated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Child insertions and removals on the target only.
    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Self::default()
        }
    }

    /// Extend observation to the whole subtree of the target.
    pub fn subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    pub fn with_attributes(mut self) -> Self {
        self.attributes = true;
        self
    }

    /// Observe only the named attributes. Implies `attributes`.
    pub fn with_attribute_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        self.attributes = true;
        self.attribute_filter = Some(names);
        self
    }

    pub fn with_character_data(mut self) -> Self {
        self.character_data = true;
        self
    }

    /// An observer must watch at least one kind of change.
    pub fn is_empty(&self) -> bool {
        !self.child_list && !self.attributes && !self.character_data
    }

    /// Whether a record of this kind (and attribute name) is wanted.
    pub fn wants(&self, kind: MutationKind, attribute: Option<&str>) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::CharacterData => self.character_data,
            MutationKind::Attributes => {
                if !self.attributes {
                    return false;
                }
                match (&self.attribute_filter, attribute) {
                    (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                    (Some(_), None) => false,
                    (None, _) => true,
                }
            }
        }
    }
}

/// Kind of a mutation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ChildList,
    Attributes,
    CharacterData,
}

/// One observed change to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    #[serde(default)]
    pub added_nodes: Vec<NodeId>,
    #[serde(default)]
    pub removed_nodes: Vec<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added_nodes: Vec<NodeId>, removed_nodes: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
            attribute_name: None,
            old_value: None,
        }
    }

    pub fn attribute(target: NodeId, name: impl Into<String>, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.into()),
            old_value,
        }
    }

    pub fn character_data(target: NodeId, old_value: Option<String>) -> Self {
        Self {
            kind: MutationKind::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: None,
            old_value,
        }
    }
}

/// Read/write access to the host document tree.
///
/// Writes never deliver mutation records synchronously; records are queued
/// and handed to observers at the host's next delivery checkpoint.
pub trait Document: Send + Sync {
    /// The document element (`<html>`).
    fn root(&self) -> NodeId;

    /// Whether the node is attached to the document tree.
    fn is_connected(&self, node: NodeId) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Lower-case tag name, `None` for text nodes or unknown ids.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Concatenated text of the node and its descendants.
    fn text_content(&self, node: NodeId) -> String;

    /// All elements below `scope` matching `selector`, in document order.
    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError>;

    /// Whether `node` itself matches `selector`.
    fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError>;

    fn create_element(&self, tag: &str) -> NodeId;

    fn create_text(&self, text: &str) -> NodeId;

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DomError>;

    /// Replace the node's content with a single text node.
    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError>;

    /// Insert `node` relative to `reference`, detaching it first if needed.
    fn insert(&self, reference: NodeId, node: NodeId, position: InsertPosition) -> Result<(), DomError>;

    /// Detach `node` (and its subtree) from its parent.
    fn remove(&self, node: NodeId) -> Result<(), DomError>;

    fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(scope, selector)?.into_iter().next())
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// The first element child of the root with the given tag (e.g. `head`).
    fn section(&self, tag: &str) -> Option<NodeId> {
        self.children(self.root())
            .into_iter()
            .find(|child| self.tag_name(*child).as_deref() == Some(tag))
    }
}

/// Callback invoked with one batch of mutation records.
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

/// Handle to a native observer registered with a [`MutationNotifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverToken(pub u64);

/// The host's native mutation-observer primitive.
///
/// Delivery contract: records for one observer arrive in the order the
/// mutations happened, batched per delivery checkpoint.
pub trait MutationNotifier: Send + Sync {
    /// Start observing `target`. The returned token disconnects the observer.
    fn observe(
        &self,
        target: NodeId,
        options: &ObserveOptions,
        callback: MutationCallback,
    ) -> Result<ObserverToken, DomError>;

    /// Stop the observer. Pending, undelivered records are dropped.
    fn disconnect(&self, token: ObserverToken);

    /// Number of native observers currently connected.
    fn active_observers(&self) -> usize;
}
