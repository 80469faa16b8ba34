//! Patch descriptors: what to match and what to mount.

mod builder;
mod descriptor;
mod matcher;

pub use builder::Patch;
pub use descriptor::{MatchMode, NodeResolver, PatchDescriptor};
pub use matcher::{Matcher, MatcherChain, NodePredicate, PredicateMatcher, SelectorMatcher};
