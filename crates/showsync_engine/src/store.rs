//! Durable per-provider watermark storage.
//!
//! One logical row per provider: `(provider, last_sync)`. Rows are created
//! on first run, updated in place by the scheduler after a successful pass,
//! and never deleted here.

use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use showsync_protocol::{Provider, Timestamp};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Durable mapping from provider to last-successful-sync time.
///
/// # Invariants
///
/// - `set_last_sync` replaces the provider's row in place; there is never
///   more than one row per provider
/// - `initialize` is insert-if-absent and never overwrites an existing row
/// - rows written before a crash are visible after reopening
pub trait WatermarkStore: Send + Sync {
    /// Reads the provider's watermark, if one has been persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be read.
    fn last_sync(&self, provider: Provider) -> EngineResult<Option<Timestamp>>;

    /// Writes the provider's watermark, replacing any existing row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be made durable.
    fn set_last_sync(&self, provider: Provider, last_sync: Timestamp) -> EngineResult<()>;

    /// Inserts the provider's watermark only if no row exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be made durable.
    fn initialize(&self, provider: Provider, last_sync: Timestamp) -> EngineResult<()>;
}

/// An in-memory watermark store.
///
/// Suitable for unit tests and ephemeral schedulers that do not need their
/// watermark to survive a restart.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    rows: RwLock<HashMap<Provider, Timestamp>>,
}

impl MemoryWatermarkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn last_sync(&self, provider: Provider) -> EngineResult<Option<Timestamp>> {
        Ok(self.rows.read().get(&provider).copied())
    }

    fn set_last_sync(&self, provider: Provider, last_sync: Timestamp) -> EngineResult<()> {
        self.rows.write().insert(provider, last_sync);
        Ok(())
    }

    fn initialize(&self, provider: Provider, last_sync: Timestamp) -> EngineResult<()> {
        self.rows.write().entry(provider).or_insert(last_sync);
        Ok(())
    }
}

/// A file-backed watermark store.
///
/// Rows are kept as a small JSON object keyed by the provider's wire name
/// and rewritten whole on every mutation: the document is written to a
/// sibling temp file, synced, then renamed over the live path, so a crash
/// mid-write leaves the previous document intact.
#[derive(Debug)]
pub struct FileWatermarkStore {
    path: PathBuf,
    rows: RwLock<HashMap<String, Timestamp>>,
}

impl FileWatermarkStore {
    /// Opens or creates a watermark store at the given path.
    ///
    /// A missing file starts the store empty; the file is created on the
    /// first write.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or does not
    /// contain a watermark document.
    pub fn open(path: &Path) -> EngineResult<Self> {
        let rows = if path.exists() {
            let contents = fs::read_to_string(path)?;
            if contents.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| EngineError::corrupted(e.to_string()))?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            rows: RwLock::new(rows),
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, rows: &HashMap<String, Timestamp>) -> EngineResult<()> {
        let document =
            serde_json::to_string_pretty(rows).map_err(|e| EngineError::corrupted(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(document.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn last_sync(&self, provider: Provider) -> EngineResult<Option<Timestamp>> {
        Ok(self.rows.read().get(provider.as_str()).copied())
    }

    fn set_last_sync(&self, provider: Provider, last_sync: Timestamp) -> EngineResult<()> {
        let mut rows = self.rows.write();
        rows.insert(provider.as_str().to_string(), last_sync);
        self.persist(&rows)
    }

    fn initialize(&self, provider: Provider, last_sync: Timestamp) -> EngineResult<()> {
        let mut rows = self.rows.write();
        if rows.contains_key(provider.as_str()) {
            return Ok(());
        }
        rows.insert(provider.as_str().to_string(), last_sync);
        self.persist(&rows)
    }
}
