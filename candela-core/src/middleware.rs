//! Middleware trait for wrapping `FetchWindow` implementations.

use std::sync::Arc;

use crate::connector::FetchWindow;

/// Trait implemented by provider middleware layers.
///
/// A middleware consumes an inner `FetchWindow` and returns a wrapped provider
/// that augments or restricts behavior (e.g., quotas, timeouts).
pub trait Middleware: Send + Sync {
    /// Apply this middleware to wrap an inner provider and return the wrapped provider.
    fn apply(self: Box<Self>, inner: Arc<dyn FetchWindow>) -> Arc<dyn FetchWindow>;

    /// Human-readable middleware name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Opaque configuration snapshot for serialization/inspection.
    fn config_json(&self) -> serde_json::Value;
}
