//! The locally tracked show collection.
//!
//! The registry is externally owned and read-only from the engine's
//! perspective; the only thing the scheduler asks of it besides a snapshot
//! is a per-show refresh of the locally cached next-airing metadata.

use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use showsync_protocol::{Provider, SeriesId};
use std::collections::HashSet;

/// A locally tracked show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedShow {
    /// The show's identifier at its provider.
    pub series_id: SeriesId,
    /// The provider this show is tracked against.
    pub provider: Provider,
    /// Display name, used in log messages.
    pub name: String,
}

impl TrackedShow {
    /// Creates a tracked show.
    pub fn new(series_id: impl Into<SeriesId>, provider: Provider, name: impl Into<String>) -> Self {
        Self {
            series_id: series_id.into(),
            provider,
            name: name.into(),
        }
    }
}

/// Read-only view of the tracked show collection.
pub trait ShowRegistry: Send + Sync {
    /// Returns a snapshot of the currently tracked shows.
    fn tracked_shows(&self) -> Vec<TrackedShow>;

    /// Refreshes the show's locally cached schedule metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails; the scheduler logs it and
    /// moves on to the next show.
    fn refresh_schedule(&self, show: &TrackedShow) -> EngineResult<()>;
}

/// An in-memory show registry for testing.
///
/// Refresh failures can be injected per series, and successful refreshes are
/// recorded for assertions.
#[derive(Debug, Default)]
pub struct MemoryShowRegistry {
    shows: RwLock<Vec<TrackedShow>>,
    failing: RwLock<HashSet<SeriesId>>,
    refreshed: RwLock<Vec<SeriesId>>,
}

impl MemoryShowRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a show to the registry.
    pub fn add_show(&self, show: TrackedShow) {
        self.shows.write().push(show);
    }

    /// Makes `refresh_schedule` fail for the given series.
    pub fn fail_refresh_for(&self, series_id: SeriesId) {
        self.failing.write().insert(series_id);
    }

    /// Returns the series whose schedules were refreshed, in order.
    #[must_use]
    pub fn refreshed(&self) -> Vec<SeriesId> {
        self.refreshed.read().clone()
    }
}

impl ShowRegistry for MemoryShowRegistry {
    fn tracked_shows(&self) -> Vec<TrackedShow> {
        self.shows.read().clone()
    }

    fn refresh_schedule(&self, show: &TrackedShow) -> EngineResult<()> {
        if self.failing.read().contains(&show.series_id) {
            return Err(EngineError::schedule_refresh(
                show.name.clone(),
                "injected refresh failure",
            ));
        }
        self.refreshed.write().push(show.series_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_registry_snapshot_and_refresh() {
        let registry = MemoryShowRegistry::new();
        registry.add_show(TrackedShow::new(1u64, Provider::Tvdb, "One"));
        registry.add_show(TrackedShow::new(2u64, Provider::Tvdb, "Two"));

        let shows = registry.tracked_shows();
        assert_eq!(shows.len(), 2);

        registry.refresh_schedule(&shows[0]).unwrap();
        assert_eq!(registry.refreshed(), vec![SeriesId::new(1)]);
    }

    #[test]
    fn injected_refresh_failure() {
        let registry = MemoryShowRegistry::new();
        let show = TrackedShow::new(7u64, Provider::Tvdb, "Flaky");
        registry.add_show(show.clone());
        registry.fail_refresh_for(SeriesId::new(7));

        let err = registry.refresh_schedule(&show).unwrap_err();
        assert!(err.to_string().contains("Flaky"));
        assert!(registry.refreshed().is_empty());
    }
}
