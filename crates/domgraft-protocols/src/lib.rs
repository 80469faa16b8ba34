//! # domgraft Protocols
//!
//! Core protocol definitions (traits) for the domgraft framework.
//! Contains only interface definitions and shared value types.
//!
//! ## Core Traits
//!
//! - [`Document`] - Read/write access to the host document tree
//! - [`MutationNotifier`] - The native mutation-observer primitive of the host
//! - [`Component`] - A UI fragment a plugin mounts into the host document
//! - [`MountedComponent`] - A live, rendered component instance
//! - [`SettingsStore`] - Durable key/value storage for plugin settings

pub mod component;
pub mod dom;
pub mod error;
pub mod storage;
pub mod types;

pub use component::{Cleanup, Component, MountContext, MountedComponent, UiEvent};
pub use dom::{
    Document, InsertPosition, MutationCallback, MutationKind, MutationNotifier, MutationRecord,
    NodeId, ObserveOptions, ObserverToken,
};
pub use error::{ComponentError, DomError, PatchError, PluginError, StorageError};
pub use storage::SettingsStore;
pub use types::*;
