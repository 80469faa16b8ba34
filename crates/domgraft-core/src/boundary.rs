//! Error boundary around one mounted component.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error, warn};

use domgraft_protocols::error::describe_panic;
use domgraft_protocols::{
    Component, ComponentError, Document, DomError, InsertPosition, MountContext,
    MountedComponent, NodeId, UiEvent,
};

#[cfg(test)]
#[path = "boundary_tests.rs"]
mod tests;

/// Class of the fallback panel shown in place of a failed component.
pub const FALLBACK_CLASS: &str = "domgraft-fallback";

/// Deliberately low-alarm; the details go to the log.
pub const FALLBACK_MESSAGE: &str = "This add-on is unavailable right now.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryState {
    Mounted,
    Failed,
    Unmounted,
}

/// Owns a rendered component. Nothing the component does, error or panic,
/// escapes the boundary.
pub struct ErrorBoundary {
    plugin: String,
    component: String,
    container: NodeId,
    state: BoundaryState,
    instance: Option<Box<dyn MountedComponent>>,
    fallback: Option<NodeId>,
    last_error: Option<String>,
}

impl ErrorBoundary {
    /// Render `component` into `ctx.container()`.
    pub fn mount(component: &dyn Component, ctx: &MountContext<'_>) -> Self {
        let mut boundary = Self {
            plugin: ctx.plugin().to_string(),
            component: component.name().to_string(),
            container: ctx.container(),
            state: BoundaryState::Mounted,
            instance: None,
            fallback: None,
            last_error: None,
        };

        match catch_unwind(AssertUnwindSafe(|| component.render(ctx))) {
            Ok(Ok(instance)) => {
                debug!(plugin = %boundary.plugin, component = %boundary.component, "Component mounted");
                boundary.instance = Some(instance);
            }
            Ok(Err(e)) => boundary.fail(ctx.document(), "render", e),
            Err(payload) => boundary.fail(
                ctx.document(),
                "render",
                ComponentError::Panicked(describe_panic(payload.as_ref())),
            ),
        }
        boundary
    }

    pub fn state(&self) -> BoundaryState {
        self.state
    }

    pub fn is_failed(&self) -> bool {
        self.state == BoundaryState::Failed
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// The fallback panel, while one is shown.
    pub fn fallback(&self) -> Option<NodeId> {
        self.fallback
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Route an event to the component. Returns whether it was handled
    /// without error; a failure replaces the component with the fallback.
    pub fn handle_event(&mut self, document: &dyn Document, event: &UiEvent) -> bool {
        let Some(instance) = self.instance.as_mut() else {
            return false;
        };

        let result = catch_unwind(AssertUnwindSafe(|| instance.handle_event(document, event)));
        let err = match result {
            Ok(Ok(())) => return true,
            Ok(Err(e)) => e,
            Err(payload) => ComponentError::Panicked(describe_panic(payload.as_ref())),
        };

        self.release_instance(document);
        self.fail(document, "event", err);
        false
    }

    /// Release the component or remove the fallback. Idempotent.
    pub fn unmount(&mut self, document: &dyn Document) {
        match self.state {
            BoundaryState::Mounted => self.release_instance(document),
            BoundaryState::Failed => {
                if let Some(fallback) = self.fallback.take() {
                    if let Err(e) = document.remove(fallback) {
                        debug!(plugin = %self.plugin, "Fallback already gone: {}", e);
                    }
                }
            }
            BoundaryState::Unmounted => return,
        }
        self.state = BoundaryState::Unmounted;
    }

    fn release_instance(&mut self, document: &dyn Document) {
        let Some(mut instance) = self.instance.take() else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| instance.unmount(document))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                plugin = %self.plugin,
                component = %self.component,
                "Component unmount failed: {}", e
            ),
            Err(payload) => error!(
                plugin = %self.plugin,
                component = %self.component,
                "Component unmount panicked: {}",
                describe_panic(payload.as_ref())
            ),
        }
    }

    fn fail(&mut self, document: &dyn Document, phase: &str, err: ComponentError) {
        error!(
            plugin = %self.plugin,
            component = %self.component,
            phase,
            "Component failed: {}", err
        );
        self.last_error = Some(err.to_string());
        self.state = BoundaryState::Failed;

        // Whatever the component managed to render is discarded.
        for child in document.children(self.container) {
            if let Err(e) = document.remove(child) {
                debug!(plugin = %self.plugin, node = %child, "Partial render already gone: {}", e);
            }
        }
        match self.render_fallback(document) {
            Ok(node) => self.fallback = Some(node),
            Err(e) => error!(plugin = %self.plugin, "Failed to render fallback: {}", e),
        }
    }

    fn render_fallback(&self, document: &dyn Document) -> Result<NodeId, DomError> {
        let panel = document.create_element("div");
        document.set_attribute(panel, "class", FALLBACK_CLASS)?;
        document.set_attribute(panel, "role", "status")?;
        document.set_attribute(panel, "data-domgraft-plugin", &self.plugin)?;
        document.set_text(panel, FALLBACK_MESSAGE)?;
        document.insert(self.container, panel, InsertPosition::Append)?;
        Ok(panel)
    }
}

impl std::fmt::Debug for ErrorBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorBoundary")
            .field("plugin", &self.plugin)
            .field("component", &self.component)
            .field("container", &self.container)
            .field("state", &self.state)
            .finish()
    }
}
