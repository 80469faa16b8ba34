use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use domgraft_dom::MemoryDocument;

use crate::testing::{Broken, Clicker, Exploding, Label};

fn container(doc: &MemoryDocument) -> NodeId {
    doc.element("div").append_to(doc.body()).unwrap()
}

fn mount(doc: &MemoryDocument, container: NodeId, component: &dyn Component) -> ErrorBoundary {
    let ctx = MountContext::new(doc, "test-plugin", container, doc.body(), doc.body());
    ErrorBoundary::mount(component, &ctx)
}

#[test]
fn test_successful_mount_and_unmount() {
    let doc = MemoryDocument::new();
    let container = container(&doc);
    let label = Label::new("hello");
    let unmounts = label.unmounts.clone();

    let mut boundary = mount(&doc, container, &label);
    assert_eq!(boundary.state(), BoundaryState::Mounted);
    assert_eq!(doc.text_content(container), "hello");
    assert!(boundary.fallback().is_none());

    boundary.unmount(&doc);
    boundary.unmount(&doc);
    assert_eq!(boundary.state(), BoundaryState::Unmounted);
    assert_eq!(unmounts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_render_error_shows_fallback() {
    let doc = MemoryDocument::new();
    let container = container(&doc);
    let boundary = mount(&doc, container, &Broken);

    assert!(boundary.is_failed());
    let fallback = boundary.fallback().unwrap();
    assert!(doc.has_class(fallback, FALLBACK_CLASS));
    assert_eq!(doc.text_content(fallback), FALLBACK_MESSAGE);
    assert_eq!(doc.attribute(fallback, "data-domgraft-plugin").as_deref(), Some("test-plugin"));
    assert!(boundary.last_error().unwrap().contains("no data"));
}

#[test]
fn test_render_panic_discards_partial_tree() {
    let doc = MemoryDocument::new();
    let container = container(&doc);
    let boundary = mount(&doc, container, &Exploding);

    assert!(boundary.is_failed());
    assert_eq!(doc.children(container), vec![boundary.fallback().unwrap()]);
    assert!(boundary.last_error().unwrap().contains("render bug"));
}

#[test]
fn test_unmount_failed_boundary_removes_fallback() {
    let doc = MemoryDocument::new();
    let container = container(&doc);
    let mut boundary = mount(&doc, container, &Broken);
    let fallback = boundary.fallback().unwrap();

    boundary.unmount(&doc);
    assert!(!doc.is_connected(fallback));
    assert!(boundary.fallback().is_none());
    assert_eq!(boundary.state(), BoundaryState::Unmounted);
}

#[test]
fn test_event_handling() {
    let doc = MemoryDocument::new();
    let container = container(&doc);
    let clicks = Arc::new(AtomicUsize::new(0));
    let mut boundary = mount(&doc, container, &Clicker { clicks: clicks.clone() });
    let button = doc.children(container)[0];

    assert!(boundary.handle_event(&doc, &UiEvent::click(button)));
    assert!(boundary.handle_event(&doc, &UiEvent::click(button)));
    assert_eq!(clicks.load(Ordering::SeqCst), 2);
}

#[test]
fn test_event_error_replaces_component_with_fallback() {
    let doc = MemoryDocument::new();
    let container = container(&doc);
    let clicks = Arc::new(AtomicUsize::new(0));
    let mut boundary = mount(&doc, container, &Clicker { clicks: clicks.clone() });
    let button = doc.children(container)[0];

    assert!(!boundary.handle_event(&doc, &UiEvent::new("fail", button)));
    assert!(boundary.is_failed());
    assert!(!doc.is_connected(button));
    assert!(doc.has_class(boundary.fallback().unwrap(), FALLBACK_CLASS));

    // A failed boundary ignores further events.
    assert!(!boundary.handle_event(&doc, &UiEvent::click(button)));
    assert_eq!(clicks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_sibling_boundaries_are_isolated() {
    let doc = MemoryDocument::new();
    let broken_container = container(&doc);
    let healthy_container = container(&doc);
    let clicks = Arc::new(AtomicUsize::new(0));

    let broken = mount(&doc, broken_container, &Broken);
    let mut healthy = mount(&doc, healthy_container, &Clicker { clicks: clicks.clone() });
    let button = doc.children(healthy_container)[0];

    assert!(broken.is_failed());
    assert!(healthy.handle_event(&doc, &UiEvent::click(button)));
    assert_eq!(clicks.load(Ordering::SeqCst), 1);
}

/// Delegates to a [`MemoryDocument`] but refuses to detach nodes.
struct PinnedDocument(MemoryDocument);

impl Document for PinnedDocument {
    fn root(&self) -> NodeId {
        self.0.root()
    }
    fn is_connected(&self, node: NodeId) -> bool {
        self.0.is_connected(node)
    }
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.0.parent(node)
    }
    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.0.children(node)
    }
    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.0.tag_name(node)
    }
    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.0.attribute(node, name)
    }
    fn text_content(&self, node: NodeId) -> String {
        self.0.text_content(node)
    }
    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        self.0.query_selector_all(scope, selector)
    }
    fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        self.0.matches(node, selector)
    }
    fn create_element(&self, tag: &str) -> NodeId {
        self.0.create_element(tag)
    }
    fn create_text(&self, text: &str) -> NodeId {
        self.0.create_text(text)
    }
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.0.set_attribute(node, name, value)
    }
    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.0.remove_attribute(node, name)
    }
    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.0.set_text(node, text)
    }
    fn insert(&self, reference: NodeId, node: NodeId, position: InsertPosition) -> Result<(), DomError> {
        self.0.insert(reference, node, position)
    }
    fn remove(&self, node: NodeId) -> Result<(), DomError> {
        Err(DomError::HierarchyRequest(format!("{} is pinned", node)))
    }
}

#[test]
fn test_fallback_renders_when_partial_tree_cannot_be_removed() {
    let doc = PinnedDocument(MemoryDocument::new());
    let container = doc.0.element("div").append_to(doc.0.body()).unwrap();
    let ctx = MountContext::new(&doc, "test-plugin", container, doc.0.body(), doc.0.body());
    let boundary = ErrorBoundary::mount(&Exploding, &ctx);

    assert!(boundary.is_failed());
    let children = doc.children(container);
    assert_eq!(children.len(), 2);
    assert_eq!(children.last().copied(), boundary.fallback());
    assert!(boundary.last_error().unwrap().contains("render bug"));
}
