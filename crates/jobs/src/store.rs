//! Persistence of the job cache snapshot.
//!
//! A [`JobStore`] holds opaque serialized snapshots under string keys.
//! The tracker owns the snapshot format; stores only move bytes.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

/// Keyed snapshot storage. Last writer wins.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Load the snapshot stored under `key`, or `None` if there is none.
    async fn load(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the snapshot stored under `key`.
    async fn save(&self, key: &str, contents: &str) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// FileJobStore
// ---------------------------------------------------------------------------

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling that is then renamed over the
/// target, so readers never observe a partially written snapshot.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the snapshot file for `key`. Characters outside
    /// `[A-Za-z0-9_-]` are replaced so a key cannot escape `dir`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn load(&self, key: &str) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, key: &str, contents: &str) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &path).await
    }
}

// ---------------------------------------------------------------------------
// MemoryJobStore
// ---------------------------------------------------------------------------

/// In-process store. Counts writes so callers can observe how often the
/// tracker persists.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    entries: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `contents` under `key`.
    pub fn with_snapshot(key: &str, contents: impl Into<String>) -> Self {
        let store = Self::default();
        store
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), contents.into());
        store
    }

    /// Current snapshot under `key`.
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Number of successful [`JobStore::save`] calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.snapshot(key))
    }

    async fn save(&self, key: &str, contents: &str) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), contents.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
