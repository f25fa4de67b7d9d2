#![doc = include_str!("../README.md")]
//! candela-middleware
//!
//! Re-exports for provider middleware wrappers.

mod builder;
mod quota;
mod timeout;

pub use crate::builder::ProviderBuilder;
pub use crate::quota::{QuotaAwareProvider, QuotaMiddleware};
pub use crate::timeout::{TimeoutMiddleware, TimeoutProvider};
