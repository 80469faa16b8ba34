//! In-memory [`Document`] and [`MutationNotifier`].

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, warn};

use domgraft_protocols::error::describe_panic;
use domgraft_protocols::{
    Document, DomError, InsertPosition, MutationCallback, MutationNotifier, MutationRecord,
    NodeId, ObserveOptions, ObserverToken,
};

use crate::selector::SelectorList;
use crate::tree::{NodeData, Tree};

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;

/// Upper bound on delivery rounds per [`MemoryDocument::flush`].
///
/// Callbacks that keep mutating the observed tree would otherwise loop
/// forever; the remaining records stay queued for the next flush.
pub const DEFAULT_MAX_FLUSH_ROUNDS: usize = 64;

struct NativeObserver {
    target: NodeId,
    options: ObserveOptions,
    callback: MutationCallback,
    pending: Vec<MutationRecord>,
}

#[derive(Default)]
struct ObserverTable {
    next_token: u64,
    entries: BTreeMap<ObserverToken, NativeObserver>,
}

/// Lock order is always tree, then observers. Callbacks run with no lock held.
pub struct MemoryDocument {
    tree: RwLock<Tree>,
    observers: Mutex<ObserverTable>,
    head: NodeId,
    body: NodeId,
    max_flush_rounds: usize,
}

impl MemoryDocument {
    /// Create a document containing `<html><head></head><body></body></html>`.
    pub fn new() -> Self {
        let (tree, head, body) = Tree::new();
        Self {
            tree: RwLock::new(tree),
            observers: Mutex::new(ObserverTable::default()),
            head,
            body,
            max_flush_rounds: DEFAULT_MAX_FLUSH_ROUNDS,
        }
    }

    pub fn with_max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds.max(1);
        self
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Deliver queued mutation records to their observers.
    ///
    /// Records produced by callbacks during delivery are delivered in the
    /// following round of the same flush. Returns the number of batches
    /// delivered.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..self.max_flush_rounds {
            let batches: Vec<(ObserverToken, MutationCallback, Vec<MutationRecord>)> = {
                let mut observers = self.observers.lock();
                observers
                    .entries
                    .iter_mut()
                    .filter(|(_, observer)| !observer.pending.is_empty())
                    .map(|(token, observer)| {
                        (
                            *token,
                            observer.callback.clone(),
                            std::mem::take(&mut observer.pending),
                        )
                    })
                    .collect()
            };

            if batches.is_empty() {
                return delivered;
            }

            for (token, callback, records) in batches {
                debug!(observer = token.0, records = records.len(), "Delivering mutation batch");
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(&records))) {
                    error!(
                        observer = token.0,
                        "Mutation callback panicked: {}",
                        describe_panic(payload.as_ref())
                    );
                }
                delivered += 1;
            }
        }

        warn!(
            rounds = self.max_flush_rounds,
            "Mutation delivery did not settle, remaining records stay queued"
        );
        delivered
    }

    /// Number of records waiting for the next flush, across all observers.
    pub fn pending_records(&self) -> usize {
        self.observers
            .lock()
            .entries
            .values()
            .map(|observer| observer.pending.len())
            .sum()
    }

    /// Serialize a node and its subtree as HTML.
    pub fn to_html(&self, node: NodeId) -> String {
        let tree = self.tree.read();
        let mut out = String::new();
        write_html(&tree, node, &mut out);
        out
    }

    fn enqueue(&self, tree: &Tree, record: MutationRecord) {
        let mut observers = self.observers.lock();
        for observer in observers.entries.values_mut() {
            if !observer
                .options
                .wants(record.kind, record.attribute_name.as_deref())
            {
                continue;
            }
            let in_scope = observer.target == record.target
                || (observer.options.subtree
                    && tree.is_inclusive_ancestor(observer.target, record.target));
            if in_scope {
                observer.pending.push(record.clone());
            }
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        self.tree.read().root()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        self.tree.read().is_connected(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.read().parent(node)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.read().children(node).to_vec()
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.tree.read().element(node).map(|e| e.tag.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.tree
            .read()
            .element(node)
            .and_then(|e| e.attributes.get(&name.to_ascii_lowercase()).cloned())
    }

    fn text_content(&self, node: NodeId) -> String {
        self.tree.read().text_content(node)
    }

    fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let list = SelectorList::parse(selector)?;
        let tree = self.tree.read();
        tree.require(scope)?;
        Ok(tree
            .descendants(scope)
            .into_iter()
            .filter(|node| list.matches(&tree, *node))
            .collect())
    }

    fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        let list = SelectorList::parse(selector)?;
        let tree = self.tree.read();
        tree.require(node)?;
        Ok(list.matches(&tree, node))
    }

    fn create_element(&self, tag: &str) -> NodeId {
        self.tree.write().alloc_element(tag)
    }

    fn create_text(&self, text: &str) -> NodeId {
        self.tree.write().alloc_text(text)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let mut tree = self.tree.write();
        let old = tree
            .element_mut(node)?
            .attributes
            .insert(name.clone(), value.to_string());
        self.enqueue(&tree, MutationRecord::attribute(node, name, old));
        Ok(())
    }

    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let mut tree = self.tree.write();
        let old = tree.element_mut(node)?.attributes.remove(&name);
        if old.is_some() {
            self.enqueue(&tree, MutationRecord::attribute(node, name, old));
        }
        Ok(())
    }

    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DomError> {
        let mut tree = self.tree.write();
        let is_text = matches!(tree.require(node)?.data, NodeData::Text(_));

        if is_text {
            let old = match tree.node_mut(node).map(|n| &mut n.data) {
                Some(NodeData::Text(current)) => Some(std::mem::replace(current, text.to_string())),
                _ => None,
            };
            self.enqueue(&tree, MutationRecord::character_data(node, old));
            return Ok(());
        }

        let removed: Vec<NodeId> = tree.children(node).to_vec();
        for child in &removed {
            tree.detach(*child);
        }
        let mut added = Vec::new();
        if !text.is_empty() {
            let text_node = tree.alloc_text(text);
            tree.attach(node, text_node, None);
            added.push(text_node);
        }
        if !added.is_empty() || !removed.is_empty() {
            self.enqueue(&tree, MutationRecord::child_list(node, added, removed));
        }
        Ok(())
    }

    fn insert(&self, reference: NodeId, node: NodeId, position: InsertPosition) -> Result<(), DomError> {
        let mut tree = self.tree.write();
        tree.require(reference)?;
        tree.require(node)?;

        if reference == node {
            return Err(DomError::HierarchyRequest(
                "cannot insert a node relative to itself".to_string(),
            ));
        }
        if node == tree.root() {
            return Err(DomError::HierarchyRequest(
                "the document element cannot be moved".to_string(),
            ));
        }

        let parent = if position.is_sibling() {
            tree.parent(reference).ok_or_else(|| {
                DomError::HierarchyRequest(format!("{} has no parent to insert beside", reference))
            })?
        } else {
            if !tree.is_element(reference) {
                return Err(DomError::NotAnElement(reference));
            }
            reference
        };

        if tree.is_inclusive_ancestor(node, parent) {
            return Err(DomError::HierarchyRequest(format!(
                "{} cannot be inserted into its own subtree",
                node
            )));
        }

        if let Some(old_parent) = tree.detach(node) {
            self.enqueue(&tree, MutationRecord::child_list(old_parent, vec![], vec![node]));
        }

        // Positions are computed after the detach so moving a node within
        // the same parent lands where the caller expects.
        let index = match position {
            InsertPosition::Prepend => Some(0),
            InsertPosition::Append => None,
            InsertPosition::Before => tree.index_in_parent(reference),
            InsertPosition::After => tree.index_in_parent(reference).map(|i| i + 1),
        };
        tree.attach(parent, node, index);
        self.enqueue(&tree, MutationRecord::child_list(parent, vec![node], vec![]));
        Ok(())
    }

    fn remove(&self, node: NodeId) -> Result<(), DomError> {
        let mut tree = self.tree.write();
        tree.require(node)?;
        if let Some(parent) = tree.detach(node) {
            self.enqueue(&tree, MutationRecord::child_list(parent, vec![], vec![node]));
        }
        Ok(())
    }
}

impl MutationNotifier for MemoryDocument {
    fn observe(
        &self,
        target: NodeId,
        options: &ObserveOptions,
        callback: MutationCallback,
    ) -> Result<ObserverToken, DomError> {
        if options.is_empty() {
            return Err(DomError::InvalidOptions(
                "one of child_list, attributes or character_data is required".to_string(),
            ));
        }
        if options.attribute_filter.is_some() && !options.attributes {
            return Err(DomError::InvalidOptions(
                "attribute_filter requires attributes".to_string(),
            ));
        }
        self.tree.read().require(target)?;

        let mut observers = self.observers.lock();
        observers.next_token += 1;
        let token = ObserverToken(observers.next_token);
        observers.entries.insert(
            token,
            NativeObserver {
                target,
                options: options.clone(),
                callback,
                pending: Vec::new(),
            },
        );
        debug!(observer = token.0, node = %target, "Native observer connected");
        Ok(token)
    }

    fn disconnect(&self, token: ObserverToken) {
        if self.observers.lock().entries.remove(&token).is_some() {
            debug!(observer = token.0, "Native observer disconnected");
        }
    }

    fn active_observers(&self) -> usize {
        self.observers.lock().entries.len()
    }
}

fn write_html(tree: &Tree, node: NodeId, out: &mut String) {
    let Some(data) = tree.node(node).map(|n| &n.data) else {
        return;
    };
    match data {
        NodeData::Text(text) => out.push_str(&escape(text)),
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attributes {
                out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
            }
            out.push('>');
            for child in tree.children(node) {
                write_html(tree, *child, out);
            }
            out.push_str(&format!("</{}>", element.tag));
        }
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
