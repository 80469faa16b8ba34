//! # domgraft API
//!
//! A typed client for the remote service and an [`ApiFacade`] that composes
//! its endpoints into operations that degrade instead of failing: fallback
//! chains, pagination draining, partial-failure aggregation and batched
//! deletes, all cancellable through a [`CancellationToken`].
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod client;
mod error;
mod facade;
mod service;
mod types;

pub use client::{ApiClient, CallOptions};
pub use error::ApiError;
pub use facade::ApiFacade;
pub use service::ServiceApi;
pub use types::*;
