use thiserror::Error;

/// Errors surfaced by a flush.
///
/// Bad paths are not part of this enum: they are dropped with a warning at
/// admission time and never fail a batch.
#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("Invalidation backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalidation rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalidation scheduler is shut down")]
    ShutDown,
}
