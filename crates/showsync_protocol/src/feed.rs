//! The changed-series document.
//!
//! The remote service is queried with `GET <base>?type=series&time=<since>`
//! and answers with a JSON document carrying the server's own time and zero
//! or more change records, one changed series per record:
//!
//! ```json
//! { "time": 1693400000, "series": [ { "id": 71663 }, { "id": 73739 } ] }
//! ```
//!
//! An empty or absent body is a transport-level failure and never reaches
//! [`ChangeFeedResponse::parse`]. A body that does not decode, or that lacks
//! the `time` field, is a parse failure.

use crate::error::ProtocolResult;
use crate::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a series as reported by the change feed.
///
/// Opaque to this crate; it only matches against the identifiers the local
/// registry tracks. Identifiers are scoped per provider and may collide
/// numerically across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(u64);

impl SeriesId {
    /// Creates a series identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SeriesId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A request for all series changed since a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFeedRequest {
    /// Only series changed after this time are reported.
    pub since: Timestamp,
}

impl ChangeFeedRequest {
    /// Creates a request for changes since `since`.
    #[must_use]
    pub const fn new(since: Timestamp) -> Self {
        Self { since }
    }

    /// Returns the query string in the provider's encoding.
    #[must_use]
    pub fn query(&self) -> String {
        format!("type=series&time={}", self.since)
    }

    /// Returns the full request URL for the given feed base.
    #[must_use]
    pub fn url(&self, base: &str) -> String {
        format!("{}?{}", base, self.query())
    }
}

/// One change record: a single series the provider reports as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The changed series.
    pub id: SeriesId,
}

/// The changed-series document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeFeedResponse {
    /// The server's time when the document was produced. Successful runs
    /// advance the watermark toward this value.
    pub time: Timestamp,
    /// Series changed since the requested watermark. May be empty.
    #[serde(default)]
    pub series: Vec<ChangeRecord>,
}

impl ChangeFeedResponse {
    /// Decodes a received document body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProtocolError::Malformed`] if the body is not a
    /// conforming document.
    pub fn parse(body: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Returns the set of changed-series identifiers.
    #[must_use]
    pub fn changed_ids(&self) -> HashSet<SeriesId> {
        self.series.iter().map(|record| record.id).collect()
    }
}
