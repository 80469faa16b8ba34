//! Host document errors.

use thiserror::Error;

use crate::dom::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Node is detached from the document: {0}")]
    Detached(NodeId),

    #[error("Node is not an element: {0}")]
    NotAnElement(NodeId),

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Invalid observer options: {0}")]
    InvalidOptions(String),

    #[error("{0}")]
    Custom(String),
}

impl DomError {
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        DomError::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}
