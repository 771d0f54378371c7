//! Content-addressed response cache
//!
//! Responses are stored under a deterministic hash of the concrete request.
//! Entries are write-once per key; concurrent writes of the same key are
//! idempotent because the content is determined by the key.

use crate::error::{Error, Result};
use crate::template::ConcreteRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Deterministic key for a concrete request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash `(method, url, body)` into a file-safe hex digest
    pub fn for_request(request: &ConcreteRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request.method.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(request.url.as_bytes());
        hasher.update(b"\n");
        if let Some(body) = &request.body {
            hasher.update(body.to_string().as_bytes());
        }
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A stored raw response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub cached_at: DateTime<Utc>,
}

/// Storage backend for cached responses
///
/// `put` is best-effort: the gate logs failures and continues. The presence
/// of a store on the client is what switches the pipeline into cache mode.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;
    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()>;
    fn location(&self) -> Option<&Path>;
}

/// File-backed store keeping one JSON document per key
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the store, making the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| Error::Io {
            message: format!("failed to create cache directory {}", dir.display()),
            source: e,
        })?;
        Ok(Self { dir })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("failed to read cache entry {}: {e}", path.display());
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("corrupt cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        let path = self.entry_path(key);
        // Write-once: an existing entry already holds this key's content.
        if path.exists() {
            return Ok(());
        }
        let data = serde_json::to_string_pretty(entry)?;
        fs::write(&path, data).map_err(|e| Error::Io {
            message: format!("failed to write cache entry {}", path.display()),
            source: e,
        })
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}
