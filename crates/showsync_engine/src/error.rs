//! Error types for the update engine.

use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur inside the update engine.
///
/// None of these ever reach the caller of `UpdateScheduler::run`; the
/// scheduler contains every failure to its own show or step and reports
/// through logging and the run outcome.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The durable watermark document could not be read back.
    #[error("watermark store corrupted: {0}")]
    StoreCorrupted(String),

    /// Refreshing a show's locally cached schedule metadata failed.
    #[error("schedule refresh failed for [{show}]: {reason}")]
    ScheduleRefresh {
        /// Name of the show whose refresh failed.
        show: String,
        /// Why the refresh failed.
        reason: String,
    },
}

impl EngineError {
    /// Creates a corrupted-store error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::StoreCorrupted(message.into())
    }

    /// Creates a schedule-refresh error for a named show.
    pub fn schedule_refresh(show: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScheduleRefresh {
            show: show.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = EngineError::corrupted("not a watermark document");
        assert_eq!(
            err.to_string(),
            "watermark store corrupted: not a watermark document"
        );

        let err = EngineError::schedule_refresh("Daily Show", "episode data unavailable");
        assert_eq!(
            err.to_string(),
            "schedule refresh failed for [Daily Show]: episode data unavailable"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err = EngineError::from(io_err);
        assert!(matches!(err, EngineError::Io(_)));
    }
}
