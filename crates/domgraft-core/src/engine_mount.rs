//! Mount records and engine-owned containers.

use std::iter;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use domgraft_protocols::error::describe_panic;
use domgraft_protocols::{Cleanup, Document, DomError, NodeId};

use crate::boundary::ErrorBoundary;

/// Attribute carrying the owning plugin's name on every container.
pub const CONTAINER_ATTR: &str = "data-domgraft-container";

pub const CONTAINER_CLASS: &str = "domgraft-container";

/// Everything one mount put into the document.
pub(crate) struct MountRecord {
    pub patch: usize,
    pub anchor: NodeId,
    pub matched: NodeId,
    pub container: NodeId,
    pub boundary: Arc<Mutex<ErrorBoundary>>,
    pub auxiliary: Vec<NodeId>,
    pub cleanups: Vec<Cleanup>,
}

impl MountRecord {
    pub fn owned_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        iter::once(self.container).chain(self.auxiliary.iter().copied())
    }

    /// Unmount the component, run cleanups, then remove auxiliary nodes and
    /// the container. Nodes the host already removed are skipped.
    pub fn teardown(self, document: &dyn Document, plugin: &str) {
        self.boundary.lock().unmount(document);

        for cleanup in self.cleanups {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(move || cleanup(document))) {
                error!(
                    plugin = %plugin,
                    "Mount cleanup panicked: {}",
                    describe_panic(payload.as_ref())
                );
            }
        }

        for node in self.auxiliary {
            if let Err(e) = document.remove(node) {
                debug!(plugin = %plugin, node = %node, "Auxiliary node already gone: {}", e);
            }
        }
        if let Err(e) = document.remove(self.container) {
            debug!(plugin = %plugin, node = %self.container, "Container already gone: {}", e);
        }
        debug!(plugin = %plugin, anchor = %self.anchor, "Mount torn down");
    }
}

/// Create a detached container for `plugin`.
pub(crate) fn create_container(document: &dyn Document, plugin: &str) -> Result<NodeId, DomError> {
    let container = document.create_element("div");
    document.set_attribute(container, "class", CONTAINER_CLASS)?;
    document.set_attribute(container, CONTAINER_ATTR, plugin)?;
    Ok(container)
}
