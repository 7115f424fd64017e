//! Remote side of a flush.

use async_trait::async_trait;
use tracing::debug;

use super::error::InvalidationError;
use super::path::CachePath;

/// Delivers one batch of paths to the CDN.
///
/// Called once per flush with a deduplicated, non-empty batch. Implementations
/// own anything request-specific such as caller references.
#[async_trait]
pub trait InvalidationBackend: Send + Sync {
    async fn send(&self, paths: &[CachePath]) -> Result<(), InvalidationError>;
}

/// Backend that accepts everything and contacts nobody.
/// Used when no distribution is configured.
pub struct NoOpBackend;

#[async_trait]
impl InvalidationBackend for NoOpBackend {
    async fn send(&self, paths: &[CachePath]) -> Result<(), InvalidationError> {
        debug!("NoOpBackend ignoring {} paths", paths.len());
        Ok(())
    }
}
