//! The update scheduler.
//!
//! A periodic job, invoked by an external trigger, that fetches the
//! provider's change feed from the persisted watermark, reconciles it
//! against the tracked shows, dispatches per-show update work, and advances
//! the watermark. At most one run executes at a time per scheduler;
//! overlapping invocations are dropped, never queued.

use crate::config::SchedulerConfig;
use crate::dispatch::{DispatchSink, ProgressRegistry, UpdateTask};
use crate::feed::{ChangeFeed, FetchOutcome};
use crate::reconcile;
use crate::registry::ShowRegistry;
use crate::store::WatermarkStore;
use parking_lot::RwLock;
use showsync_protocol::Timestamp;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Externally owned timezone/network metadata refresh.
///
/// Fired once per run before the fetch. Fire-and-forget: implementations
/// handle their own failures, the scheduler does not observe them.
pub trait TimezoneRefresh: Send + Sync {
    /// Refreshes the timezone/network metadata.
    fn refresh(&self);
}

/// Outcome of one scheduler run.
///
/// A run never surfaces an error to its caller; every failure resolves to
/// one of these with the watermark either held or advanced per policy.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Another run was active; this invocation had no side effects.
    Skipped,
    /// The change feed produced no data; the watermark was held and the next
    /// run retries from it.
    FetchFailed,
    /// The watermark store failed; the watermark was not advanced.
    StoreFailed,
    /// The run completed and the watermark was persisted.
    Completed(RunReport),
}

/// Counters for one completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Update tasks handed to the dispatch sink.
    pub dispatched: usize,
    /// Shows whose schedule refresh failed and were skipped.
    pub refresh_failures: usize,
    /// Shows skipped because their provider is retired.
    pub retired_skipped: usize,
    /// True if the feed answered with a malformed document; the run was a
    /// reconciliation no-op and the watermark advanced to the run-start time.
    pub feed_malformed: bool,
    /// The watermark persisted by this run.
    pub watermark: Timestamp,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Cumulative statistics across runs of one scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Runs that completed and persisted a watermark.
    pub runs_completed: u64,
    /// Invocations dropped by the non-reentrancy guard.
    pub runs_skipped: u64,
    /// Runs aborted because the feed produced no data.
    pub fetch_failures: u64,
    /// Runs aborted by a watermark-store failure.
    pub store_failures: u64,
    /// Total update tasks dispatched.
    pub tasks_dispatched: u64,
    /// When the last run finished, in any outcome.
    pub last_run_time: Option<Instant>,
    /// Last failure description, cleared by a completed run.
    pub last_error: Option<String>,
}

/// Releases the active flag on every exit path, including unwinding out of
/// a collaborator call.
struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The update scheduler.
///
/// Independently constructible; it owns its own non-reentrancy guard and
/// feed client, and callers holding a reference control its lifetime. There
/// are no process-wide singletons here.
pub struct UpdateScheduler<F, W, R, D>
where
    F: ChangeFeed,
    W: WatermarkStore,
    R: ShowRegistry,
    D: DispatchSink,
{
    config: SchedulerConfig,
    feed: F,
    store: W,
    registry: R,
    sink: D,
    progress: Option<Arc<dyn ProgressRegistry>>,
    timezones: Option<Arc<dyn TimezoneRefresh>>,
    active: AtomicBool,
    stats: RwLock<SchedulerStats>,
}

impl<F, W, R, D> UpdateScheduler<F, W, R, D>
where
    F: ChangeFeed,
    W: WatermarkStore,
    R: ShowRegistry,
    D: DispatchSink,
{
    /// Creates a scheduler over the given collaborators.
    pub fn new(config: SchedulerConfig, feed: F, store: W, registry: R, sink: D) -> Self {
        Self {
            config,
            feed,
            store,
            registry,
            sink,
            progress: None,
            timezones: None,
            active: AtomicBool::new(false),
            stats: RwLock::new(SchedulerStats::default()),
        }
    }

    /// Attaches a progress registry for dispatched task handles.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressRegistry>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attaches the timezone/network metadata refresh collaborator.
    #[must_use]
    pub fn with_timezone_refresh(mut self, timezones: Arc<dyn TimezoneRefresh>) -> Self {
        self.timezones = Some(timezones);
        self
    }

    /// Returns true while a run is executing.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns the cumulative statistics.
    pub fn stats(&self) -> SchedulerStats {
        self.stats.read().clone()
    }

    /// Executes one update run.
    ///
    /// If a run is already active the invocation returns [`RunOutcome::Skipped`]
    /// immediately with zero side effects. The check-and-set is atomic: two
    /// near-simultaneous invocations cannot both pass the guard.
    pub fn run(&self) -> RunOutcome {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("update run already active; skipping");
            self.stats.write().runs_skipped += 1;
            return RunOutcome::Skipped;
        }

        let _guard = ActiveGuard(&self.active);
        let outcome = self.run_inner();
        self.record(&outcome);
        outcome
    }

    fn run_inner(&self) -> RunOutcome {
        let started = Instant::now();
        let provider = self.config.provider;
        let observed_now = Timestamp::now();

        // Watermark bootstrap: a provider never synced before starts from
        // the minimum encodable time, persisted before the first fetch.
        let last_sync = match self.store.last_sync(provider) {
            Ok(Some(last_sync)) => last_sync,
            Ok(None) => {
                if let Err(error) = self.store.initialize(provider, Timestamp::MIN) {
                    error!("failed to bootstrap watermark for {}: {}", provider, error);
                    return RunOutcome::StoreFailed;
                }
                Timestamp::MIN
            }
            Err(error) => {
                error!("failed to read watermark for {}: {}", provider, error);
                return RunOutcome::StoreFailed;
            }
        };

        if let Some(timezones) = &self.timezones {
            timezones.refresh();
        }

        let (changed, new_watermark, feed_malformed) = match self.feed.changes_since(last_sync) {
            FetchOutcome::Success { next_sync, changed } => {
                // Hold the watermark inside [last_sync, observed_now]: it may
                // never regress, and never pass the clock reading taken
                // before the fetch, or series updated during the fetch
                // window could be missed.
                (changed, next_sync.bounded(last_sync, observed_now), false)
            }
            FetchOutcome::TransportFailed => {
                warn!(
                    "could not fetch recently updated shows from {}; retrying on the next run",
                    provider
                );
                return RunOutcome::FetchFailed;
            }
            FetchOutcome::Malformed => {
                // A received-but-malformed document counts as caught up:
                // reconcile nothing, advance to the run-start time rather
                // than retrying a persistently bad feed forever.
                warn!(
                    "change feed from {} was malformed; treating provider as caught up",
                    provider
                );
                (HashSet::new(), observed_now, true)
            }
        };

        let mut refresh_failures = 0usize;
        let mut retired_skipped = 0usize;
        let mut handles = Vec::new();

        for show in self.registry.tracked_shows() {
            if show.provider.is_retired() {
                warn!(
                    "indexer {} is no longer available for show [{}]",
                    show.provider, show.name
                );
                retired_skipped += 1;
                continue;
            }

            // One bad show must not abort the batch; its failure is an
            // outcome value, logged and counted.
            if let Err(error) = self.registry.refresh_schedule(&show) {
                error!("automatic update failed for [{}]: {}", show.name, error);
                refresh_failures += 1;
                continue;
            }

            if reconcile::is_affected(&show, &changed, provider) {
                handles.push(self.sink.submit(UpdateTask { show, force: true }));
            }
        }

        let dispatched = handles.len();
        if let Some(progress) = &self.progress {
            progress.set_indicator(&self.config.progress_key, handles);
        }

        if let Err(error) = self.store.set_last_sync(provider, new_watermark) {
            error!("failed to persist watermark for {}: {}", provider, error);
            return RunOutcome::StoreFailed;
        }

        info!(
            "update run for {} complete: {} dispatched, watermark {}",
            provider, dispatched, new_watermark
        );

        RunOutcome::Completed(RunReport {
            dispatched,
            refresh_failures,
            retired_skipped,
            feed_malformed,
            watermark: new_watermark,
            duration: started.elapsed(),
        })
    }

    fn record(&self, outcome: &RunOutcome) {
        let mut stats = self.stats.write();
        stats.last_run_time = Some(Instant::now());
        match outcome {
            RunOutcome::Completed(report) => {
                stats.runs_completed += 1;
                stats.tasks_dispatched += report.dispatched as u64;
                stats.last_error = None;
            }
            RunOutcome::FetchFailed => {
                stats.fetch_failures += 1;
                stats.last_error = Some("change feed produced no data".to_string());
            }
            RunOutcome::StoreFailed => {
                stats.store_failures += 1;
                stats.last_error = Some("watermark store failure".to_string());
            }
            RunOutcome::Skipped => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{MemoryDispatchSink, MemoryProgressRegistry};
    use crate::feed::MockChangeFeed;
    use crate::registry::{MemoryShowRegistry, TrackedShow};
    use crate::store::MemoryWatermarkStore;
    use showsync_protocol::{Provider, SeriesId};

    type TestScheduler =
        UpdateScheduler<MockChangeFeed, MemoryWatermarkStore, MemoryShowRegistry, MemoryDispatchSink>;

    fn scheduler() -> TestScheduler {
        UpdateScheduler::new(
            SchedulerConfig::new(Provider::Tvdb),
            MockChangeFeed::new(),
            MemoryWatermarkStore::new(),
            MemoryShowRegistry::new(),
            MemoryDispatchSink::new(),
        )
    }

    fn ids(ids: impl IntoIterator<Item = u64>) -> Vec<SeriesId> {
        ids.into_iter().map(SeriesId::new).collect()
    }

    #[test]
    fn first_run_bootstraps_watermark() {
        let sched = scheduler();
        assert_eq!(sched.store.last_sync(Provider::Tvdb).unwrap(), None);

        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(100), ids([])));
        let outcome = sched.run();

        assert!(matches!(outcome, RunOutcome::Completed(_)));
        // First fetch starts from the minimum encodable time.
        assert_eq!(sched.feed.requests(), vec![Timestamp::MIN]);
        let persisted = sched.store.last_sync(Provider::Tvdb).unwrap().unwrap();
        assert!(persisted >= Timestamp::MIN);
        assert_eq!(persisted, Timestamp::from_secs(100));
    }

    #[test]
    fn transport_failure_holds_watermark() {
        let sched = scheduler();
        sched
            .store
            .set_last_sync(Provider::Tvdb, Timestamp::from_secs(500))
            .unwrap();
        // Feed left unconfigured: every fetch reports a transport failure.

        assert_eq!(sched.run(), RunOutcome::FetchFailed);
        assert_eq!(
            sched.store.last_sync(Provider::Tvdb).unwrap(),
            Some(Timestamp::from_secs(500))
        );
        assert!(sched.sink.submitted().is_empty());
        assert_eq!(sched.stats().fetch_failures, 1);
    }

    #[test]
    fn parse_failure_advances_to_run_start() {
        let sched = scheduler();
        sched
            .store
            .set_last_sync(Provider::Tvdb, Timestamp::from_secs(500))
            .unwrap();
        sched.feed.set_outcome(FetchOutcome::Malformed);

        let before = Timestamp::now();
        let outcome = sched.run();
        let after = Timestamp::now();

        let RunOutcome::Completed(report) = outcome else {
            panic!("expected completed run, got {outcome:?}");
        };
        assert!(report.feed_malformed);
        assert_eq!(report.dispatched, 0);

        let persisted = sched.store.last_sync(Provider::Tvdb).unwrap().unwrap();
        assert_eq!(persisted, report.watermark);
        assert!(persisted >= before && persisted <= after);
        assert_ne!(persisted, Timestamp::from_secs(500));
    }

    #[test]
    fn dispatches_only_matching_provider_and_id() {
        let sched = scheduler();
        sched
            .registry
            .add_show(TrackedShow::new(1u64, Provider::Tvdb, "A1"));
        sched
            .registry
            .add_show(TrackedShow::new(2u64, Provider::Tvdb, "A2"));
        sched
            .registry
            .add_show(TrackedShow::new(1u64, Provider::TvMaze, "B1"));
        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(10), ids([1])));

        let outcome = sched.run();
        assert!(matches!(outcome, RunOutcome::Completed(ref r) if r.dispatched == 1));

        let submitted = sched.sink.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].show.series_id, SeriesId::new(1));
        assert_eq!(submitted[0].show.provider, Provider::Tvdb);
        assert!(submitted[0].force);
    }

    #[test]
    fn retired_provider_is_skipped_with_no_refresh() {
        let sched = scheduler();
        sched
            .registry
            .add_show(TrackedShow::new(5u64, Provider::TvRage, "Legacy"));
        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(10), ids([5])));

        let RunOutcome::Completed(report) = sched.run() else {
            panic!("expected completed run");
        };
        assert_eq!(report.retired_skipped, 1);
        assert_eq!(report.dispatched, 0);
        assert!(sched.registry.refreshed().is_empty());
    }

    #[test]
    fn refresh_failure_is_isolated_per_show() {
        let sched = scheduler();
        sched
            .registry
            .add_show(TrackedShow::new(1u64, Provider::Tvdb, "Y"));
        sched
            .registry
            .add_show(TrackedShow::new(2u64, Provider::Tvdb, "X"));
        sched
            .registry
            .add_show(TrackedShow::new(3u64, Provider::Tvdb, "Z"));
        sched.registry.fail_refresh_for(SeriesId::new(2));
        sched.feed.set_outcome(FetchOutcome::success(
            Timestamp::from_secs(10),
            ids([1, 2, 3]),
        ));

        let RunOutcome::Completed(report) = sched.run() else {
            panic!("expected completed run");
        };
        // Shows before and after the failing one still dispatch.
        assert_eq!(report.refresh_failures, 1);
        assert_eq!(report.dispatched, 2);
        let dispatched: Vec<SeriesId> = sched
            .sink
            .submitted()
            .iter()
            .map(|t| t.show.series_id)
            .collect();
        assert_eq!(dispatched, ids([1, 3]));
    }

    #[test]
    fn watermark_is_monotonic_across_runs() {
        let sched = scheduler();
        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(100), ids([])));
        sched.run();

        // A feed reporting an older time cannot move the watermark back.
        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(50), ids([])));
        sched.run();

        assert_eq!(
            sched.store.last_sync(Provider::Tvdb).unwrap(),
            Some(Timestamp::from_secs(100))
        );
        // The second run fetched from the first run's watermark.
        assert_eq!(
            sched.feed.requests(),
            vec![Timestamp::MIN, Timestamp::from_secs(100)]
        );
    }

    #[test]
    fn watermark_never_passes_run_start() {
        let sched = scheduler();
        let future = Timestamp::from_secs(Timestamp::now().as_secs() + 10_000);
        sched.feed.set_outcome(FetchOutcome::success(future, ids([])));

        sched.run();

        let persisted = sched.store.last_sync(Provider::Tvdb).unwrap().unwrap();
        assert!(persisted <= Timestamp::now());
    }

    #[test]
    fn progress_registration_replaces_prior_entry() {
        let progress = Arc::new(MemoryProgressRegistry::new());
        let sched = UpdateScheduler::new(
            SchedulerConfig::new(Provider::Tvdb),
            MockChangeFeed::new(),
            MemoryWatermarkStore::new(),
            MemoryShowRegistry::new(),
            MemoryDispatchSink::new(),
        )
        .with_progress(Arc::clone(&progress) as Arc<dyn ProgressRegistry>);

        sched
            .registry
            .add_show(TrackedShow::new(1u64, Provider::Tvdb, "A"));
        sched
            .registry
            .add_show(TrackedShow::new(2u64, Provider::Tvdb, "B"));

        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(10), ids([1, 2])));
        sched.run();
        assert_eq!(
            progress.indicator("daily-update").map(|h| h.len()),
            Some(2)
        );

        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(20), ids([1])));
        sched.run();
        assert_eq!(
            progress.indicator("daily-update").map(|h| h.len()),
            Some(1)
        );
    }

    #[test]
    fn timezone_refresh_fires_once_per_run() {
        #[derive(Default)]
        struct CountingRefresh(std::sync::atomic::AtomicU64);
        impl TimezoneRefresh for CountingRefresh {
            fn refresh(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let refresh = Arc::new(CountingRefresh::default());
        let sched = UpdateScheduler::new(
            SchedulerConfig::new(Provider::Tvdb),
            MockChangeFeed::new(),
            MemoryWatermarkStore::new(),
            MemoryShowRegistry::new(),
            MemoryDispatchSink::new(),
        )
        .with_timezone_refresh(Arc::clone(&refresh) as Arc<dyn TimezoneRefresh>);

        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(1), ids([])));
        sched.run();
        sched.run();

        assert_eq!(refresh.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stats_track_outcomes() {
        let sched = scheduler();
        sched.run(); // unconfigured feed: fetch failure
        assert_eq!(sched.stats().fetch_failures, 1);
        assert!(sched.stats().last_error.is_some());

        sched
            .feed
            .set_outcome(FetchOutcome::success(Timestamp::from_secs(1), ids([])));
        sched.run();
        let stats = sched.stats();
        assert_eq!(stats.runs_completed, 1);
        assert_eq!(stats.last_error, None);
        assert!(stats.last_run_time.is_some());
    }
}
