//! Validated patch descriptor.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use domgraft_protocols::{Component, Document, InsertPosition, NodeId, ObserveOptions, PatchError};

use super::matcher::{Matcher, NodePredicate};

/// Maps one node to another (matched -> anchor, anchor -> parent).
pub type NodeResolver = Arc<dyn Fn(&dyn Document, NodeId) -> Option<NodeId> + Send + Sync>;

/// How many matches a patch mounts at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Only the first match in document order.
    #[default]
    First,
    /// Every match.
    All,
}

/// An immutable, validated patch. Built with [`Patch`](super::Patch).
#[derive(Clone)]
pub struct PatchDescriptor {
    pub(crate) matcher: Arc<dyn Matcher>,
    pub(crate) mode: MatchMode,
    pub(crate) live: bool,
    pub(crate) debounce: Option<Duration>,
    pub(crate) component: Arc<dyn Component>,
    pub(crate) anchor: Option<NodeResolver>,
    pub(crate) parent: Option<NodeResolver>,
    pub(crate) filter: Option<NodePredicate>,
    pub(crate) position: InsertPosition,
    pub(crate) observe: ObserveOptions,
}

impl PatchDescriptor {
    pub fn matcher(&self) -> &Arc<dyn Matcher> {
        &self.matcher
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Whether the patch keeps reacting to mutations after the initial scan.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn debounce(&self) -> Option<Duration> {
        self.debounce
    }

    pub fn component(&self) -> &Arc<dyn Component> {
        &self.component
    }

    pub fn position(&self) -> InsertPosition {
        self.position
    }

    pub fn observe_options(&self) -> &ObserveOptions {
        &self.observe
    }

    pub fn has_parent_resolver(&self) -> bool {
        self.parent.is_some()
    }

    pub fn describe(&self) -> String {
        self.matcher.describe()
    }

    /// Fails when the matcher's selector does not parse against `document`.
    pub fn validate(&self, document: &dyn Document) -> Result<(), PatchError> {
        self.matcher.validate(document)
    }

    /// Whether `node` passes the optional filter.
    pub(crate) fn accepts(&self, document: &dyn Document, node: NodeId) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(document, node))
    }

    /// Anchor for a matched element; the element itself by default.
    pub(crate) fn resolve_anchor(&self, document: &dyn Document, matched: NodeId) -> Option<NodeId> {
        match &self.anchor {
            Some(resolve) => resolve(document, matched),
            None => Some(matched),
        }
    }
}

impl fmt::Debug for PatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchDescriptor")
            .field("matcher", &self.matcher.describe())
            .field("mode", &self.mode)
            .field("live", &self.live)
            .field("debounce", &self.debounce)
            .field("component", &self.component.name())
            .field("position", &self.position)
            .finish()
    }
}
