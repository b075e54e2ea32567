//! # Showsync Engine
//!
//! Incremental show-update scheduler.
//!
//! This crate provides:
//! - Non-reentrant update scheduler (at most one run at a time, overlapping
//!   invocations dropped)
//! - Per-provider watermark store (memory and file backends)
//! - Change-feed client over an HTTP transport seam
//! - Reconciliation of the remote changed-set against the tracked shows
//! - Dispatch-sink and progress-registry seams for per-show update work
//!
//! ## Run contract
//!
//! One run reads the provider's watermark (bootstrapping it on first use),
//! fetches the series changed since it, refreshes each tracked show's
//! schedule metadata, dispatches update tasks for the changed shows, and
//! persists the new watermark.
//!
//! ## Key invariants
//!
//! - The watermark is monotonically non-decreasing across successful runs
//! - The watermark never advances past the wall-clock time observed before
//!   the fetch
//! - A transport failure holds the watermark; a received-but-malformed
//!   document advances it to the run-start time
//! - Per-show failures never abort a run, and `run()` never returns an
//!   error to its caller

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dispatch;
mod error;
mod feed;
mod http;
pub mod reconcile;
mod registry;
mod scheduler;
mod store;

pub use config::{SchedulerConfig, DAILY_UPDATE_KEY};
pub use dispatch::{
    DispatchSink, MemoryDispatchSink, MemoryProgressRegistry, ProgressRegistry, TaskHandle,
    UpdateTask,
};
pub use error::{EngineError, EngineResult};
pub use feed::{ChangeFeed, FetchOutcome, HttpChangeFeed, MockChangeFeed};
pub use http::{HttpClient, HttpResponse, MockHttpClient};
pub use registry::{MemoryShowRegistry, ShowRegistry, TrackedShow};
pub use scheduler::{RunOutcome, RunReport, SchedulerStats, TimezoneRefresh, UpdateScheduler};
pub use store::{FileWatermarkStore, MemoryWatermarkStore, WatermarkStore};
