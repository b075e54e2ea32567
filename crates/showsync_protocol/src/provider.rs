//! Upstream metadata providers.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An upstream metadata provider (indexer).
///
/// Controlled enum: the watermark store keys rows by the provider's wire
/// name, so adding a variant is a persistence-format change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// TheTVDB.
    Tvdb,
    /// TVRage. Retired; shows still pointing here are skipped.
    TvRage,
    /// TVmaze.
    TvMaze,
}

impl Provider {
    /// Returns the provider's wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tvdb => "tvdb",
            Self::TvRage => "tvrage",
            Self::TvMaze => "tvmaze",
        }
    }

    /// Returns true if the provider no longer serves metadata.
    ///
    /// Retired providers cannot be fetched from; tracked shows that still
    /// reference one are skipped with a warning rather than updated.
    #[must_use]
    pub fn is_retired(self) -> bool {
        matches!(self, Self::TvRage)
    }
}

impl FromStr for Provider {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tvdb" => Ok(Self::Tvdb),
            "tvrage" => Ok(Self::TvRage),
            "tvmaze" => Ok(Self::TvMaze),
            other => Err(ProtocolError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_and_from_str() {
        assert_eq!(Provider::Tvdb.as_str(), "tvdb");
        assert_eq!(Provider::from_str("tvdb").unwrap(), Provider::Tvdb);
        assert_eq!(Provider::from_str("tvrage").unwrap(), Provider::TvRage);
        assert!(Provider::from_str("tvmuse").is_err());
    }

    #[test]
    fn retired_providers() {
        assert!(Provider::TvRage.is_retired());
        assert!(!Provider::Tvdb.is_retired());
        assert!(!Provider::TvMaze.is_retired());
    }
}
