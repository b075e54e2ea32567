//! # Showsync Protocol
//!
//! Change-feed wire types for showsync.
//!
//! This crate provides:
//! - `Timestamp` for watermark and feed times
//! - `SeriesId` for changed-series identifiers
//! - `Provider` for upstream indexer names
//! - `ChangeFeedRequest` / `ChangeFeedResponse` for the changed-series
//!   document
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod feed;
mod provider;
mod timestamp;

pub use error::{ProtocolError, ProtocolResult};
pub use feed::{ChangeFeedRequest, ChangeFeedResponse, ChangeRecord, SeriesId};
pub use provider::Provider;
pub use timestamp::Timestamp;
