//! Shared constants for end-to-end tests

use std::time::Duration;

/// Distribution id the mock CDN is addressed with
pub const DISTRIBUTION_ID: &str = "E2TESTDISTRO";

/// API version prefix mounted by the mock CDN
pub const API_PREFIX: &str = "/2020-05-31";

/// Debounce window used by bulk tests
pub const TEST_WINDOW: Duration = Duration::from_millis(50);

/// Maximum time to wait for the mock CDN to observe requests
pub const REQUEST_WAIT_TIMEOUT_MS: u64 = 2000;

/// Polling interval while waiting for requests
pub const REQUEST_POLL_INTERVAL_MS: u64 = 10;
