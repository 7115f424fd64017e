use std::fmt;
use std::time::Duration;

/// Default debounce window between the last invalidation request and the flush.
pub const DEFAULT_BULK_WINDOW: Duration = Duration::from_millis(500);

/// How incoming invalidation requests are batched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Requests are collected and flushed once the window elapses with no new request.
    Bulk,
    /// Every request is flushed synchronously on the caller.
    Immediate,
}

/// Whether flushes reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Flushes are logged but the backend is never contacted.
    DryRun,
    Live,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::DryRun => "dry_run",
            DeliveryMode::Live => "live",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime settings of a `BatchScheduler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub bulk_enabled: bool,
    /// Debounce window, restarted by every request.
    pub window: Duration,
    /// True when no distribution is configured.
    pub dry_run: bool,
}

impl SchedulerSettings {
    pub fn batch_mode(&self) -> BatchMode {
        if self.bulk_enabled {
            BatchMode::Bulk
        } else {
            BatchMode::Immediate
        }
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        if self.dry_run {
            DeliveryMode::DryRun
        } else {
            DeliveryMode::Live
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            bulk_enabled: true,
            window: DEFAULT_BULK_WINDOW,
            dry_run: false,
        }
    }
}
