//! CDN path invalidation.
//!
//! Content mutations hand already-resolved cache paths to a `BatchScheduler`,
//! which debounces them and delivers each burst as one deduplicated batch to an
//! `InvalidationBackend`.

mod backend;
mod collector;
mod error;
mod http_backend;
mod path;
mod scheduler;
mod settings;

pub use backend::{InvalidationBackend, NoOpBackend};
pub use collector::PathCollector;
pub use error::InvalidationError;
pub use http_backend::{HttpInvalidationBackend, InvalidationReceipt};
pub use path::{CachePath, InvalidPathError};
pub use scheduler::{BatchScheduler, SchedulerState};
pub use settings::{BatchMode, DeliveryMode, SchedulerSettings, DEFAULT_BULK_WINDOW};
