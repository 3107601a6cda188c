//! Resilience primitives for calls to external backends.

pub mod retry;

pub use retry::{retry, RetryConfig};
