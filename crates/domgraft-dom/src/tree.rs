//! Arena-backed node tree.

use std::collections::{BTreeMap, HashMap};

use domgraft_protocols::{DomError, NodeId};

pub(crate) struct ElementData {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
}

pub(crate) enum NodeData {
    Element(ElementData),
    Text(String),
}

pub(crate) struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

/// Detached nodes stay in the arena so they can be re-inserted, the same way
/// a script can hold on to a removed element.
pub(crate) struct Tree {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
    root: NodeId,
}

impl Tree {
    /// A document with `<html><head></head><body></body></html>`.
    pub fn new() -> (Self, NodeId, NodeId) {
        let mut tree = Self {
            nodes: HashMap::new(),
            next_id: 1,
            root: NodeId(0),
        };
        let root = tree.alloc_element("html");
        tree.root = root;
        let head = tree.alloc_element("head");
        let body = tree.alloc_element("body");
        tree.attach(root, head, None);
        tree.attach(root, body, None);
        (tree, head, body)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn alloc_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
        }))
    }

    pub fn alloc_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                parent: None,
                children: Vec::new(),
                data,
            },
        );
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn require(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(&id).ok_or(DomError::NodeNotFound(id))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(&id)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.nodes.get_mut(&id).ok_or(DomError::NodeNotFound(id))?.data {
            NodeData::Element(element) => Ok(element),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id)?.parent
    }

    /// Parents are always elements, so this is the plain parent link.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    fn element_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.parent(id) {
            Some(parent) => self
                .children(parent)
                .iter()
                .copied()
                .filter(|child| self.is_element(*child))
                .collect(),
            None => vec![id],
        }
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.element_siblings(id);
        let index = siblings.iter().position(|s| *s == id)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    pub fn is_first_element_child(&self, id: NodeId) -> bool {
        self.element_siblings(id).first() == Some(&id)
    }

    pub fn is_last_element_child(&self, id: NodeId) -> bool {
        self.element_siblings(id).last() == Some(&id)
    }

    /// Whether `node` is `ancestor` or below it.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id) && self.is_inclusive_ancestor(self.root, id)
    }

    /// Descendants of `scope` in document (pre-)order, excluding `scope`.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match self.nodes.get(&id).map(|node| &node.data) {
            Some(NodeData::Text(text)) => text.clone(),
            Some(NodeData::Element(_)) => self
                .descendants(id)
                .into_iter()
                .filter_map(|d| match &self.nodes.get(&d)?.data {
                    NodeData::Text(text) => Some(text.as_str()),
                    NodeData::Element(_) => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Link `child` under `parent` at `index` (end when `None`).
    pub fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            let at = index.unwrap_or(node.children.len()).min(node.children.len());
            node.children.insert(at, child);
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }

    /// Unlink `child` from its parent, returning the old parent.
    pub fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(&child)?.parent.take()?;
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|c| *c != child);
        }
        Some(parent)
    }

    pub fn index_in_parent(&self, child: NodeId) -> Option<usize> {
        let parent = self.parent(child)?;
        self.children(parent).iter().position(|c| *c == child)
    }
}
