//! Error types for the domgraft protocol layer.

mod component;
mod dom;
mod patch;
mod plugin;
mod storage;

pub use component::*;
pub use dom::*;
pub use patch::*;
pub use plugin::*;
pub use storage::*;

use std::any::Any;

/// Render a caught panic payload as a log-friendly message.
pub fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
