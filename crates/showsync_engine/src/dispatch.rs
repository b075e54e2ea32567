//! Work-dispatch and progress-indicator seams.
//!
//! The engine hands per-show update work to an external dispatch sink and
//! never inspects task completion; the opaque handles it gets back are only
//! forwarded to the progress registry.

use crate::registry::TrackedShow;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle to a unit of dispatched work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

impl TaskHandle {
    /// Creates a handle with the given identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw handle identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// A request to update one show.
///
/// Ownership transfers to the dispatch sink on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTask {
    /// The show to update.
    pub show: TrackedShow,
    /// Whether the update should bypass freshness checks.
    pub force: bool,
}

/// External system that accepts and executes update work.
pub trait DispatchSink: Send + Sync {
    /// Submits an update task and returns its handle.
    fn submit(&self, task: UpdateTask) -> TaskHandle;
}

/// External keyed registry of in-flight task handles.
pub trait ProgressRegistry: Send + Sync {
    /// Registers the handles under `key`, replacing any previous entry.
    fn set_indicator(&self, key: &str, handles: Vec<TaskHandle>);
}

/// An in-memory dispatch sink for testing.
///
/// Records every submitted task and hands out sequential handles.
#[derive(Debug, Default)]
pub struct MemoryDispatchSink {
    submitted: RwLock<Vec<UpdateTask>>,
    next_id: AtomicU64,
}

impl MemoryDispatchSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tasks submitted so far, in order.
    #[must_use]
    pub fn submitted(&self) -> Vec<UpdateTask> {
        self.submitted.read().clone()
    }
}

impl DispatchSink for MemoryDispatchSink {
    fn submit(&self, task: UpdateTask) -> TaskHandle {
        self.submitted.write().push(task);
        TaskHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

/// An in-memory progress registry for testing.
#[derive(Debug, Default)]
pub struct MemoryProgressRegistry {
    indicators: RwLock<HashMap<String, Vec<TaskHandle>>>,
}

impl MemoryProgressRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handles registered under `key`, if any.
    #[must_use]
    pub fn indicator(&self, key: &str) -> Option<Vec<TaskHandle>> {
        self.indicators.read().get(key).cloned()
    }
}

impl ProgressRegistry for MemoryProgressRegistry {
    fn set_indicator(&self, key: &str, handles: Vec<TaskHandle>) {
        self.indicators.write().insert(key.to_string(), handles);
    }
}
