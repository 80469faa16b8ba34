//! Element matching strategies.
//!
//! Host pages change their markup without notice, so locating an element is
//! often a chain of guesses: a precise selector first, then looser
//! heuristics. A [`MatcherChain`] tries strategies in order and the first
//! one that finds anything wins.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use domgraft_protocols::{Document, NodeId, PatchError};

/// Predicate over a candidate element.
pub type NodePredicate = Arc<dyn Fn(&dyn Document, NodeId) -> bool + Send + Sync>;

/// A strategy that locates elements below a scope.
pub trait Matcher: Send + Sync {
    /// All matching elements below `scope`, in document order.
    fn find_all(&self, document: &dyn Document, scope: NodeId) -> Result<Vec<NodeId>, PatchError>;

    /// Human readable form for logs.
    fn describe(&self) -> String;

    /// True when there is nothing to match with: a blank selector, an
    /// unlabeled predicate or a chain without strategies.
    fn is_blank(&self) -> bool {
        false
    }

    /// Check the matcher against `document` without walking the tree, so a
    /// malformed selector is reported before anything is mounted.
    fn validate(&self, _document: &dyn Document) -> Result<(), PatchError> {
        Ok(())
    }
}

/// Matches with a CSS selector.
#[derive(Debug, Clone)]
pub struct SelectorMatcher {
    selector: String,
}

impl SelectorMatcher {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }
}

impl Matcher for SelectorMatcher {
    fn find_all(&self, document: &dyn Document, scope: NodeId) -> Result<Vec<NodeId>, PatchError> {
        Ok(document.query_selector_all(scope, &self.selector)?)
    }

    fn describe(&self) -> String {
        self.selector.clone()
    }

    fn is_blank(&self) -> bool {
        self.selector.trim().is_empty()
    }

    fn validate(&self, document: &dyn Document) -> Result<(), PatchError> {
        document.matches(document.root(), &self.selector)?;
        Ok(())
    }
}

/// Matches every element for which a predicate holds.
#[derive(Clone)]
pub struct PredicateMatcher {
    label: String,
    predicate: NodePredicate,
}

impl PredicateMatcher {
    pub fn new<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&dyn Document, NodeId) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }
}

impl Matcher for PredicateMatcher {
    fn find_all(&self, document: &dyn Document, scope: NodeId) -> Result<Vec<NodeId>, PatchError> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = document.children(scope).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if document.tag_name(node).is_some() {
                if (self.predicate)(document, node) {
                    out.push(node);
                }
                stack.extend(document.children(node).into_iter().rev());
            }
        }
        Ok(out)
    }

    fn describe(&self) -> String {
        format!("predicate({})", self.label)
    }

    fn is_blank(&self) -> bool {
        self.label.trim().is_empty()
    }
}

impl fmt::Debug for PredicateMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateMatcher")
            .field("label", &self.label)
            .finish()
    }
}

/// Ordered strategies; the first one with a non-empty result wins.
///
/// A strategy that errors is logged and skipped.
#[derive(Clone, Default)]
pub struct MatcherChain {
    strategies: Vec<Arc<dyn Matcher>>,
}

impl MatcherChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, matcher: impl Matcher + 'static) -> Self {
        self.strategies.push(Arc::new(matcher));
        self
    }

    pub fn then_selector(self, selector: impl Into<String>) -> Self {
        self.then(SelectorMatcher::new(selector))
    }

    pub fn then_predicate<F>(self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&dyn Document, NodeId) -> bool + Send + Sync + 'static,
    {
        self.then(PredicateMatcher::new(label, predicate))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Matcher for MatcherChain {
    fn find_all(&self, document: &dyn Document, scope: NodeId) -> Result<Vec<NodeId>, PatchError> {
        for strategy in &self.strategies {
            match strategy.find_all(document, scope) {
                Ok(found) if !found.is_empty() => return Ok(found),
                Ok(_) => {}
                Err(e) => debug!(strategy = %strategy.describe(), "Matcher strategy failed: {}", e),
            }
        }
        Ok(Vec::new())
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self.strategies.iter().map(|s| s.describe()).collect();
        parts.join(" | ")
    }

    fn is_blank(&self) -> bool {
        self.strategies.is_empty() || self.strategies.iter().all(|s| s.is_blank())
    }

    fn validate(&self, document: &dyn Document) -> Result<(), PatchError> {
        self.strategies.iter().try_for_each(|s| s.validate(document))
    }
}
