//! Component render and runtime errors.

use thiserror::Error;

use super::DomError;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Render failed: {0}")]
    Render(String),

    #[error("Event handling failed: {0}")]
    Event(String),

    #[error("Component panicked: {0}")]
    Panicked(String),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeId;

    #[test]
    fn test_render_error() {
        let err = ComponentError::Render("missing data".to_string());
        assert!(err.to_string().contains("Render failed"));
        assert!(err.to_string().contains("missing data"));
    }

    #[test]
    fn test_dom_error_from() {
        let err = ComponentError::from(DomError::NodeNotFound(NodeId(1)));
        assert!(matches!(err, ComponentError::Dom(_)));
        assert!(err.to_string().contains("#1"));
    }

    #[test]
    fn test_panicked_error() {
        let err = ComponentError::Panicked("index out of bounds".to_string());
        assert!(err.to_string().contains("panicked"));
    }
}
