//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{MockCdn, DISTRIBUTION_ID};
//!
//! #[tokio::test]
//! async fn test_send() {
//!     let cdn = MockCdn::spawn().await;
//!     let backend = common::http_backend(&cdn);
//!     // ...
//! }
//! ```

mod constants;
mod mock_cdn;

// Public API - this is what tests import
pub use constants::*;
pub use mock_cdn::{MockCdn, RecordedRequest};

use cdn_invalidator::invalidation::{BatchScheduler, HttpInvalidationBackend, SchedulerSettings};
use std::sync::Arc;

/// HTTP backend pointed at the mock CDN
pub fn http_backend(cdn: &MockCdn) -> HttpInvalidationBackend {
    HttpInvalidationBackend::new(cdn.base_url.clone(), DISTRIBUTION_ID.to_string(), 5)
        .expect("Failed to create backend")
}

/// Scheduler delivering to the mock CDN
pub fn scheduler_for(cdn: &MockCdn, settings: SchedulerSettings) -> BatchScheduler {
    BatchScheduler::new(settings, Arc::new(http_backend(cdn)))
}

pub fn bulk_settings() -> SchedulerSettings {
    SchedulerSettings {
        bulk_enabled: true,
        window: TEST_WINDOW,
        dry_run: false,
    }
}
