//! Patch descriptor and patch processing errors.

use thiserror::Error;

use super::DomError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("Patch selector is required and must not be empty")]
    MissingSelector,

    #[error("Patch has no component to mount")]
    MissingComponent,

    #[error("Conflicting patch options: {0}")]
    Conflict(String),

    #[error("Resolution failed: {0}")]
    Resolution(String),

    #[error("Patch callback panicked: {0}")]
    Panicked(String),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}
