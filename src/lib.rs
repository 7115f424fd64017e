//! CDN cache invalidation with debounced batching.
//!
//! This library exposes the scheduler, its backends and configuration for the
//! `cdn-invalidator` binary and for services embedding it.

pub mod config;
pub mod invalidation;
pub mod metrics;
pub mod resolver;

// Re-export commonly used types for convenience
pub use invalidation::{
    BatchScheduler, CachePath, HttpInvalidationBackend, InvalidationBackend, InvalidationError,
    NoOpBackend, SchedulerSettings,
};
pub use resolver::PathResolver;
