//! Change-feed client.
//!
//! Fetches the set of series the provider reports as changed since a
//! watermark. No retry happens here; a failed fetch is simply retried by the
//! next scheduled run, so the scheduler's watermark policy stays in one
//! place.

use crate::http::HttpClient;
use parking_lot::Mutex;
use showsync_protocol::{ChangeFeedRequest, ChangeFeedResponse, SeriesId, Timestamp};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Outcome of one change-feed fetch.
///
/// Transport and parse failures are distinct because the scheduler's
/// watermark policy differs: a transport failure holds the watermark for a
/// retry, a received-but-malformed document advances it.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The feed answered with a conforming document.
    Success {
        /// The feed's reported time; the watermark advances toward it.
        next_sync: Timestamp,
        /// Series changed since the requested watermark.
        changed: HashSet<SeriesId>,
    },
    /// No usable response: network error, non-success status, or empty body.
    TransportFailed,
    /// A response body was received but does not conform to the document
    /// format.
    Malformed,
}

impl FetchOutcome {
    /// Builds a success outcome from a reported time and changed series.
    pub fn success(next_sync: Timestamp, changed: impl IntoIterator<Item = SeriesId>) -> Self {
        Self::Success {
            next_sync,
            changed: changed.into_iter().collect(),
        }
    }
}

/// A source of changed-series sets.
pub trait ChangeFeed: Send + Sync {
    /// Fetches the series changed since `since`.
    fn changes_since(&self, since: Timestamp) -> FetchOutcome;
}

/// Change-feed client over an HTTP transport.
pub struct HttpChangeFeed<C: HttpClient> {
    base_url: String,
    client: C,
}

impl<C: HttpClient> HttpChangeFeed<C> {
    /// Creates a feed client for the given feed base URL.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Returns the feed base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl<C: HttpClient> ChangeFeed for HttpChangeFeed<C> {
    fn changes_since(&self, since: Timestamp) -> FetchOutcome {
        let url = ChangeFeedRequest::new(since).url(&self.base_url);

        let response = match self.client.get(&url) {
            Ok(response) => response,
            Err(message) => {
                debug!("GET {} failed: {}", url, message);
                return FetchOutcome::TransportFailed;
            }
        };

        // Request diagnostic, mirrored into the host's log stream.
        debug!("GET {} [status: {}]", url, response.status);

        if !response.is_success() || response.body.is_empty() {
            return FetchOutcome::TransportFailed;
        }

        match ChangeFeedResponse::parse(&response.body) {
            Ok(document) => FetchOutcome::Success {
                next_sync: document.time,
                changed: document.changed_ids(),
            },
            Err(error) => {
                warn!("change-feed document from {} did not parse: {}", url, error);
                FetchOutcome::Malformed
            }
        }
    }
}

/// A scripted change feed for testing.
///
/// Returns the configured outcome for every fetch and records the requested
/// watermarks. An unconfigured feed reports a transport failure.
#[derive(Debug, Default)]
pub struct MockChangeFeed {
    outcome: Mutex<Option<FetchOutcome>>,
    requests: Mutex<Vec<Timestamp>>,
}

impl MockChangeFeed {
    /// Creates a mock feed with no configured outcome.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outcome returned by subsequent fetches.
    pub fn set_outcome(&self, outcome: FetchOutcome) {
        *self.outcome.lock() = Some(outcome);
    }

    /// Returns the watermarks that have been requested.
    #[must_use]
    pub fn requests(&self) -> Vec<Timestamp> {
        self.requests.lock().clone()
    }
}

impl ChangeFeed for MockChangeFeed {
    fn changes_since(&self, since: Timestamp) -> FetchOutcome {
        self.requests.lock().push(since);
        self.outcome
            .lock()
            .clone()
            .unwrap_or(FetchOutcome::TransportFailed)
    }
}
