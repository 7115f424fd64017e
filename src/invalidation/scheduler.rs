use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::backend::InvalidationBackend;
use super::collector::PathCollector;
use super::error::InvalidationError;
use super::path::CachePath;
use super::settings::{BatchMode, DeliveryMode, SchedulerSettings};
use crate::metrics;

/// Observable timer state of a `BatchScheduler`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No flush pending, no timer armed.
    Idle,
    /// A flush will run once the debounce window elapses.
    Armed,
}

/// Everything guarded by the scheduler lock.
struct SchedulerCore {
    settings: SchedulerSettings,
    collector: PathCollector,
    /// Cancellation token of the armed timer, `None` while idle.
    timer: Option<CancellationToken>,
    /// Bumped on every arm and disarm. A timer only flushes if its generation
    /// is still current when it takes the lock.
    generation: u64,
    shut_down: bool,
}

impl SchedulerCore {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.generation += 1;
    }
}

struct Inner {
    core: Mutex<SchedulerCore>,
    backend: Arc<dyn InvalidationBackend>,
    /// Parent of every timer token; cancelled on shutdown.
    shutdown_token: CancellationToken,
    /// Tracks timer tasks and every flush, so shutdown can wait for them.
    tasks: TaskTracker,
}

/// Debouncing invalidation scheduler.
///
/// Requests arriving within one window of each other are merged into a single
/// backend call. Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct BatchScheduler {
    inner: Arc<Inner>,
}

impl BatchScheduler {
    /// Create a scheduler delivering to `backend`.
    pub fn new(settings: SchedulerSettings, backend: Arc<dyn InvalidationBackend>) -> Self {
        if settings.dry_run {
            warn!("CDN distribution not configured. Dry run mode is activated.");
        }
        match settings.batch_mode() {
            BatchMode::Bulk => debug!(
                "Bulk invalidation enabled with a {:?} window",
                settings.window
            ),
            BatchMode::Immediate => info!(
                "Bulk invalidation is not activated, every request is sent on its own. \
                 Enable it to group invalidations and tune bulk_timeout_ms instead."
            ),
        }

        Self {
            inner: Arc::new(Inner {
                core: Mutex::new(SchedulerCore {
                    settings,
                    collector: PathCollector::new(),
                    timer: None,
                    generation: 0,
                    shut_down: false,
                }),
                backend,
                shutdown_token: CancellationToken::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }

    /// Request invalidation of `paths`.
    ///
    /// Paths not starting with `/` are skipped with a warning. In bulk mode this
    /// returns as soon as the paths are queued and the window restarted. In
    /// immediate mode it returns the backend's result.
    pub async fn invalidate<I, S>(&self, paths: I) -> Result<(), InvalidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let valid = admit(paths);

        let mut core = self.inner.core.lock().await;
        if core.shut_down {
            warn!(
                "Rejecting invalidation of {} paths, scheduler is shut down",
                valid.len()
            );
            return Err(InvalidationError::ShutDown);
        }
        if valid.is_empty() {
            return Ok(());
        }

        let batch_mode = core.settings.batch_mode();
        match batch_mode {
            BatchMode::Immediate => {
                let mode = core.settings.delivery_mode();

                let mut batch = PathCollector::new();
                batch.add(valid);
                let flush = self.inner.spawn_flush(batch.drain_all(), mode);
                drop(core);

                join_flush(flush).await
            }
            BatchMode::Bulk => {
                let added = core.collector.add(valid);
                self.inner.arm(&mut core);
                debug!(
                    "Queued {} new paths, {} pending, flushing in {:?}",
                    added,
                    core.collector.len(),
                    core.settings.window
                );
                Ok(())
            }
        }
    }

    /// Request invalidation of a single path.
    pub async fn invalidate_path(&self, path: &str) -> Result<(), InvalidationError> {
        self.invalidate([path]).await
    }

    /// Replace the scheduler settings.
    ///
    /// Turning bulk mode off flushes whatever is pending right away. An armed
    /// timer keeps its deadline; a new window applies from the next request.
    pub async fn reconfigure(&self, settings: SchedulerSettings) -> Result<(), InvalidationError> {
        let flush = {
            let mut core = self.inner.core.lock().await;
            if core.shut_down {
                return Err(InvalidationError::ShutDown);
            }
            info!("Reconfiguring invalidation scheduler: {:?}", settings);
            core.settings = settings;

            if core.settings.batch_mode() == BatchMode::Immediate && core.timer.is_some() {
                core.disarm();
                let pending = core.collector.drain_all();
                let mode = core.settings.delivery_mode();
                (!pending.is_empty()).then(|| self.inner.spawn_flush(pending, mode))
            } else {
                None
            }
        };

        match flush {
            Some(flush) => join_flush(flush).await,
            None => Ok(()),
        }
    }

    /// Stop the scheduler.
    ///
    /// The armed timer is cancelled and can no longer fire. Flushes already
    /// running, debounced or immediate, are awaited, then pending paths are
    /// delivered in one final flush whose result is returned. Later calls are
    /// no-ops.
    pub async fn shutdown(&self) -> Result<(), InvalidationError> {
        let (pending, mode) = {
            let mut core = self.inner.core.lock().await;
            if core.shut_down {
                return Ok(());
            }
            core.shut_down = true;
            core.disarm();
            (core.collector.drain_all(), core.settings.delivery_mode())
        };

        self.inner.shutdown_token.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;

        if pending.is_empty() {
            info!("Invalidation scheduler stopped, nothing pending");
            return Ok(());
        }

        info!(
            "Flushing {} pending paths before stopping the invalidation scheduler",
            pending.len()
        );
        self.inner.flush_now(&pending, mode).await
    }

    pub async fn state(&self) -> SchedulerState {
        if self.inner.core.lock().await.timer.is_some() {
            SchedulerState::Armed
        } else {
            SchedulerState::Idle
        }
    }

    /// Number of paths waiting for the next flush.
    pub async fn pending_count(&self) -> usize {
        self.inner.core.lock().await.collector.len()
    }

    pub async fn settings(&self) -> SchedulerSettings {
        self.inner.core.lock().await.settings.clone()
    }
}

impl Inner {
    /// Restart the debounce window. Must be called with the lock held.
    fn arm(self: &Arc<Self>, core: &mut SchedulerCore) {
        core.disarm();

        let generation = core.generation;
        let token = self.shutdown_token.child_token();
        core.timer = Some(token.clone());

        let window = core.settings.window;
        let inner = Arc::clone(self);
        self.tasks.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(window) => inner.on_timer_fired(generation).await,
                _ = token.cancelled() => {}
            }
        });
    }

    /// Run a flush on the task tracker. Must be called with the lock held, so
    /// a concurrent shutdown cannot miss it.
    fn spawn_flush(
        self: &Arc<Self>,
        paths: Vec<CachePath>,
        mode: DeliveryMode,
    ) -> JoinHandle<Result<(), InvalidationError>> {
        let inner = Arc::clone(self);
        self.tasks
            .spawn(async move { inner.flush_now(&paths, mode).await })
    }

    async fn on_timer_fired(&self, generation: u64) {
        let (pending, mode) = {
            let mut core = self.core.lock().await;
            if core.generation != generation {
                debug!("Ignoring stale invalidation timer (generation {})", generation);
                return;
            }
            core.timer = None;
            if core.collector.is_empty() {
                return;
            }
            (core.collector.drain_all(), core.settings.delivery_mode())
        };

        // No caller to report to, and the batch is not re-queued.
        if let Err(e) = self.flush_now(&pending, mode).await {
            error!(
                "Debounced invalidation failed, dropping {} paths: {}",
                pending.len(),
                e
            );
            metrics::record_dropped_paths(pending.len());
        }
    }

    async fn flush_now(
        &self,
        paths: &[CachePath],
        mode: DeliveryMode,
    ) -> Result<(), InvalidationError> {
        let listing: String = paths.iter().map(|p| format!("\n  - {}", p)).collect();

        match mode {
            DeliveryMode::DryRun => {
                info!(mode = %mode, count = paths.len(), "DRY RUN - Invalidate:{}", listing);
                metrics::record_flush(mode.as_str(), "skipped", paths.len());
                Ok(())
            }
            DeliveryMode::Live => {
                info!(mode = %mode, count = paths.len(), "Invalidate:{}", listing);
                let result = self.backend.send(paths).await;
                let outcome = if result.is_ok() { "success" } else { "failure" };
                metrics::record_flush(mode.as_str(), outcome, paths.len());
                result
            }
        }
    }
}

async fn join_flush(
    flush: JoinHandle<Result<(), InvalidationError>>,
) -> Result<(), InvalidationError> {
    match flush.await {
        Ok(result) => result,
        Err(e) => Err(InvalidationError::BackendUnavailable(format!(
            "Invalidation task failed: {}",
            e
        ))),
    }
}

/// Parse raw paths, dropping and logging the invalid ones.
fn admit<I, S>(paths: I) -> Vec<CachePath>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    paths
        .into_iter()
        .filter_map(|raw| match CachePath::parse(raw) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping invalidation request: {}", e);
                metrics::record_rejected_path();
                None
            }
        })
        .collect()
}
