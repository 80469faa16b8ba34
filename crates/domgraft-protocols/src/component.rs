//! UI components mounted by plugins.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::error::ComponentError;

/// Cleanup callback registered during render, run when the mount is torn down.
pub type Cleanup = Box<dyn FnOnce(&dyn Document) + Send>;

/// A UI fragment that a patch mounts into an engine-owned container.
pub trait Component: Send + Sync {
    /// Name used in logs and fallback diagnostics.
    fn name(&self) -> &str;

    /// Render into `ctx.container()` and return the live instance.
    fn render(&self, ctx: &MountContext<'_>) -> Result<Box<dyn MountedComponent>, ComponentError>;
}

/// A rendered component instance owned by an error boundary.
pub trait MountedComponent: Send {
    /// Handle a UI event targeted at a node inside the container.
    fn handle_event(&mut self, _document: &dyn Document, _event: &UiEvent) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Release component state. The container itself is removed by the engine.
    fn unmount(&mut self, _document: &dyn Document) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// Everything a component may touch while rendering.
///
/// Nodes created outside the container must be registered with
/// [`MountContext::track`] so teardown can remove them.
pub struct MountContext<'a> {
    document: &'a dyn Document,
    plugin: &'a str,
    container: NodeId,
    anchor: NodeId,
    matched: NodeId,
    auxiliary: Mutex<Vec<NodeId>>,
    cleanups: Mutex<Vec<Cleanup>>,
}

impl<'a> MountContext<'a> {
    pub fn new(
        document: &'a dyn Document,
        plugin: &'a str,
        container: NodeId,
        anchor: NodeId,
        matched: NodeId,
    ) -> Self {
        Self {
            document,
            plugin,
            container,
            anchor,
            matched,
            auxiliary: Mutex::new(Vec::new()),
            cleanups: Mutex::new(Vec::new()),
        }
    }

    pub fn document(&self) -> &'a dyn Document {
        self.document
    }

    pub fn plugin(&self) -> &'a str {
        self.plugin
    }

    /// Engine-owned node the component renders into.
    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    /// The element the patch selector matched.
    pub fn matched(&self) -> NodeId {
        self.matched
    }

    /// Register a node created outside the container for removal on teardown.
    pub fn track(&self, node: NodeId) {
        self.auxiliary.lock().push(node);
    }

    /// Register a callback to run on teardown.
    pub fn on_cleanup<F>(&self, cleanup: F)
    where
        F: FnOnce(&dyn Document) + Send + 'static,
    {
        self.cleanups.lock().push(Box::new(cleanup));
    }

    /// Consume the context, returning tracked nodes and cleanups.
    pub fn into_parts(self) -> (Vec<NodeId>, Vec<Cleanup>) {
        (self.auxiliary.into_inner(), self.cleanups.into_inner())
    }
}

/// A UI event routed to a mounted component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiEvent {
    pub name: String,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl UiEvent {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: None,
        }
    }

    pub fn click(target: NodeId) -> Self {
        Self::new("click", target)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
