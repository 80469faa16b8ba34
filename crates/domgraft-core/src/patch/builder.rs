//! Fluent patch builder.

use std::sync::Arc;
use std::time::Duration;

use domgraft_protocols::{Component, Document, InsertPosition, NodeId, ObserveOptions, PatchError};

use super::descriptor::{MatchMode, NodeResolver, PatchDescriptor};
use super::matcher::{Matcher, NodePredicate, PredicateMatcher, SelectorMatcher};

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;

/// Declarative "when X appears, mount Y" rule.
///
/// ```ignore
/// let patch = Patch::selector("[data-asset-id]")
///     .for_each()
///     .component(AssetBadge)
///     .build()?;
/// ```
///
/// Defaults: first match only, live, no debounce, appended inside the
/// anchor, observing child list changes across the whole document.
#[derive(Clone)]
pub struct Patch {
    matcher: Arc<dyn Matcher>,
    for_each: bool,
    once: bool,
    debounce: Option<Duration>,
    component: Option<Arc<dyn Component>>,
    anchor: Option<NodeResolver>,
    parent: Option<NodeResolver>,
    filter: Option<NodePredicate>,
    position: InsertPosition,
    watched_attributes: Vec<String>,
}

impl Patch {
    /// Match elements with a CSS selector.
    pub fn selector(selector: impl Into<String>) -> Self {
        Self::from_matcher(Arc::new(SelectorMatcher::new(selector)))
    }

    /// Match every element satisfying `predicate`.
    pub fn predicate<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&dyn Document, NodeId) -> bool + Send + Sync + 'static,
    {
        Self::from_matcher(Arc::new(PredicateMatcher::new(label, predicate)))
    }

    /// Match with any [`Matcher`], such as a
    /// [`MatcherChain`](super::MatcherChain).
    pub fn matcher(matcher: impl Matcher + 'static) -> Self {
        Self::from_matcher(Arc::new(matcher))
    }

    fn from_matcher(matcher: Arc<dyn Matcher>) -> Self {
        Self {
            matcher,
            for_each: false,
            once: false,
            debounce: None,
            component: None,
            anchor: None,
            parent: None,
            filter: None,
            position: InsertPosition::Append,
            watched_attributes: Vec::new(),
        }
    }

    /// Mount only at the first match.
    pub fn first(mut self) -> Self {
        self.for_each = false;
        self
    }

    /// Mount at every match, live.
    pub fn for_each(mut self) -> Self {
        self.for_each = true;
        self
    }

    /// Process the matches present when the plugin is applied, then stop.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&dyn Document, NodeId) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Resolve where to mount from the matched element.
    pub fn anchor<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&dyn Document, NodeId) -> Option<NodeId> + Send + Sync + 'static,
    {
        self.anchor = Some(Arc::new(resolve));
        self
    }

    /// Resolve the container's parent from the anchor. Only `Prepend` and
    /// `Append` positions make sense with a parent.
    pub fn parent<F>(mut self, resolve: F) -> Self
    where
        F: Fn(&dyn Document, NodeId) -> Option<NodeId> + Send + Sync + 'static,
    {
        self.parent = Some(Arc::new(resolve));
        self
    }

    pub fn position(mut self, position: InsertPosition) -> Self {
        self.position = position;
        self
    }

    /// Coalesce bursts of mutations; re-evaluate once `window` passes quietly.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }

    /// Also react to changes of these attributes anywhere in the document.
    pub fn watch_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.watched_attributes
            .extend(names.into_iter().map(|name| name.into().to_ascii_lowercase()));
        self
    }

    pub fn component(mut self, component: impl Component + 'static) -> Self {
        self.component = Some(Arc::new(component));
        self
    }

    /// Share one component instance between patches.
    pub fn shared_component(mut self, component: Arc<dyn Component>) -> Self {
        self.component = Some(component);
        self
    }

    pub fn build(self) -> Result<PatchDescriptor, PatchError> {
        if self.matcher.is_blank() {
            return Err(PatchError::MissingSelector);
        }
        let component = self.component.ok_or(PatchError::MissingComponent)?;

        if self.once && self.for_each {
            return Err(PatchError::Conflict(
                "once() cannot be combined with for_each()".to_string(),
            ));
        }
        if self.once && self.debounce.is_some() {
            return Err(PatchError::Conflict(
                "once() cannot be combined with debounce()".to_string(),
            ));
        }
        if self.parent.is_some() && self.position.is_sibling() {
            return Err(PatchError::Conflict(format!(
                "parent() cannot be combined with {:?} position",
                self.position
            )));
        }

        let mut observe = ObserveOptions::child_list().subtree();
        if !self.watched_attributes.is_empty() {
            observe = observe.with_attribute_filter(self.watched_attributes);
        }

        Ok(PatchDescriptor {
            matcher: self.matcher,
            mode: if self.for_each {
                MatchMode::All
            } else {
                MatchMode::First
            },
            live: !self.once,
            debounce: self.debounce,
            component,
            anchor: self.anchor,
            parent: self.parent,
            filter: self.filter,
            position: self.position,
            observe,
        })
    }
}
