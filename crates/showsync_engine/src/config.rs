//! Configuration for the update scheduler.

use showsync_protocol::Provider;

/// Progress-indicator key the scheduler registers its task handles under.
///
/// One registration per run, replacing the previous run's entry.
pub const DAILY_UPDATE_KEY: &str = "daily-update";

/// Configuration for an [`crate::UpdateScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// The provider whose change feed drives this scheduler.
    pub provider: Provider,
    /// Progress-indicator key for the run's dispatched task handles.
    pub progress_key: String,
}

impl SchedulerConfig {
    /// Creates a configuration for the given provider.
    #[must_use]
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            progress_key: DAILY_UPDATE_KEY.to_string(),
        }
    }

    /// Sets the progress-indicator key.
    #[must_use]
    pub fn with_progress_key(mut self, key: impl Into<String>) -> Self {
        self.progress_key = key.into();
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(Provider::Tvdb)
    }
}
