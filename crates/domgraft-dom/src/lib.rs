//! # domgraft DOM
//!
//! An in-memory host document implementing [`Document`] and
//! [`MutationNotifier`].
//!
//! Tree writes queue mutation records per observer; records are delivered
//! when [`MemoryDocument::flush`] runs, which plays the role of the browser's
//! microtask checkpoint. Selector queries support a CSS subset: type,
//! universal, `#id`, `.class`, attribute selectors (`=`, `~=`, `^=`, `$=`,
//! `*=`, `|=`), `:not()`, `:first-child`, `:last-child`, `:empty`, the
//! descendant/child/sibling combinators and selector lists.
//!
//! [`Document`]: domgraft_protocols::Document
//! [`MutationNotifier`]: domgraft_protocols::MutationNotifier

mod builder;
mod document;
mod selector;
mod tree;

pub use builder::ElementBuilder;
pub use document::{MemoryDocument, DEFAULT_MAX_FLUSH_ROUNDS};
pub use selector::SelectorList;
