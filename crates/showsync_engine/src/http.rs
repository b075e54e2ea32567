//! HTTP client abstraction.
//!
//! The engine never speaks HTTP itself. Implement [`HttpClient`] with
//! whatever transport the host application uses (reqwest, ureq, a session
//! pool, ...); the engine only needs a blocking GET. Timeouts are the
//! client's responsibility - the scheduler imposes none.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body. May be empty, which the feed client treats as a
    /// transport failure.
    pub body: String,
}

impl HttpResponse {
    /// Creates a 200 response with the given body.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Creates a response with an explicit status code.
    #[must_use]
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx status codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP client seam.
///
/// Errors are plain strings: the engine does not distinguish transport
/// failure causes, it only decides "retry next run".
pub trait HttpClient: Send + Sync {
    /// Sends a GET request and returns the response.
    fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

impl<C: HttpClient> HttpClient for std::sync::Arc<C> {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        (**self).get(url)
    }
}

/// A scripted HTTP client for testing.
///
/// Responses are returned in the order they were queued; once the queue is
/// empty every request fails. Requested URLs are recorded.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<String>>,
}

impl MockHttpClient {
    /// Creates a mock client with an empty response queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn push_response(&self, response: HttpResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a transport-level failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.responses.lock().push_back(Err(message.into()));
    }

    /// Returns the URLs requested so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl HttpClient for MockHttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        self.requests.lock().push(url.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response".to_string()))
    }
}
