//! Fluent element construction.

use domgraft_protocols::{Document, DomError, InsertPosition, NodeId};

use crate::document::MemoryDocument;

/// Builds a detached element against any [`Document`].
///
/// The first failing step is remembered and reported by [`build`](Self::build)
/// or [`append_to`](Self::append_to); later steps become no-ops.
pub struct ElementBuilder<'a> {
    document: &'a dyn Document,
    node: NodeId,
    error: Option<DomError>,
}

impl<'a> ElementBuilder<'a> {
    pub fn new(document: &'a dyn Document, tag: &str) -> Self {
        Self {
            node: document.create_element(tag),
            document,
            error: None,
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Adds to the `class` attribute.
    pub fn class(self, class: &str) -> Self {
        let merged = match self.document.attribute(self.node, "class") {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.attr("class", &merged)
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.document.set_attribute(self.node, name, value) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.document.set_text(self.node, text) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn child(mut self, child: NodeId) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.document.insert(self.node, child, InsertPosition::Append) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn build(self) -> Result<NodeId, DomError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.node),
        }
    }

    /// Build and append under `parent`.
    pub fn append_to(self, parent: NodeId) -> Result<NodeId, DomError> {
        let document = self.document;
        let node = self.build()?;
        document.insert(parent, node, InsertPosition::Append)?;
        Ok(node)
    }
}

impl MemoryDocument {
    /// Start building a detached element.
    pub fn element(&self, tag: &str) -> ElementBuilder<'_> {
        ElementBuilder::new(self, tag)
    }
}
