//! Watermark and feed timestamps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point in time as signed seconds since the Unix epoch.
///
/// This is the provider-native encoding: the change feed takes and reports
/// times as plain integer seconds, and the watermark store persists the same
/// representation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The minimum watermark the provider encoding can express.
    ///
    /// A provider that has never been synced starts here, so the first fetch
    /// covers the provider's full history.
    pub const MIN: Timestamp = Timestamp(0);

    /// Creates a timestamp from seconds since the Unix epoch.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Returns the seconds since the Unix epoch.
    #[must_use]
    pub const fn as_secs(self) -> i64 {
        self.0
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        Self(secs)
    }

    /// Clamps `self` to be no earlier than `floor` and no later than `ceil`.
    ///
    /// Used when advancing a watermark: the new value must be monotonically
    /// non-decreasing (`floor` = previous watermark) and must not pass the
    /// wall-clock time observed before the fetch (`ceil`).
    #[must_use]
    pub fn bounded(self, floor: Timestamp, ceil: Timestamp) -> Self {
        self.min(ceil).max(floor)
    }
}

impl From<i64> for Timestamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
