//! # domgraft Core
//!
//! The patch engine and everything it leans on:
//!
//! - [`MutationObserverManager`] shares native observers between patches
//! - [`Patch`] builds validated [`PatchDescriptor`]s
//! - [`PatchEngine`] mounts components and keeps them in sync with the host
//! - [`ErrorBoundary`] contains component failures
//! - [`PluginRegistry`] tracks enabled plugins and drives the engine

pub mod boundary;
pub mod engine;
pub mod observer;
pub mod patch;
pub mod plugin;
pub mod registry;

#[cfg(test)]
mod testing;

pub use boundary::{BoundaryState, ErrorBoundary, FALLBACK_CLASS, FALLBACK_MESSAGE};
pub use engine::{PatchEngine, PatchState, CONTAINER_ATTR, CONTAINER_CLASS};
pub use observer::{MutationObserverManager, ObserverCallback, ObserverSubscription, SubscriptionId};
pub use patch::{
    MatchMode, Matcher, MatcherChain, NodePredicate, NodeResolver, Patch, PatchDescriptor,
    PredicateMatcher, SelectorMatcher,
};
pub use plugin::{define_plugin, PluginBuilder, PluginContext, PluginDescriptor, PluginHooks, PluginInfo};
pub use registry::PluginRegistry;
