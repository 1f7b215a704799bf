//! Key/value storage slots
//!
//! A slot is a small persistent map from string keys to string values, the
//! same contract a browser's `localStorage` offers. Values must be text, so
//! binary state has to be encoded before it is stored (see `persist`).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use crate::{Error, Result};

/// Default quota, matching the usual per-origin browser storage limit
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// A text-only key/value store
pub trait StorageSlot {
    /// Read a value; `None` means the key was never written
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// Fails with `StorageFailure` when the medium rejects the write.
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing an absent key is not an error
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

impl<S: StorageSlot + ?Sized> StorageSlot for Box<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        (**self).remove_item(key)
    }
}

fn used_bytes<'a>(entries: impl Iterator<Item = (&'a String, &'a String)>) -> usize {
    entries.map(|(k, v)| k.len() + v.len()).sum()
}

fn quota_exceeded(needed: usize, quota: usize) -> Error {
    Error::StorageFailure(format!(
        "quota exceeded: {} bytes needed, {} bytes allowed",
        needed, quota
    ))
}

/// Process-local slot, used for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemorySlot {
    items: HashMap<String, String>,
    quota: Option<usize>,
    writes: usize,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot that rejects writes beyond `quota` bytes in total
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    /// Number of successful `set_item` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl StorageSlot for MemorySlot {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            let others = used_bytes(self.items.iter().filter(|(k, _)| k.as_str() != key));
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(quota_exceeded(needed, quota));
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// Slot persisted as one JSON object file on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
    quota: Option<usize>,
}

impl FileSlot {
    /// Open a slot file (created lazily on the first write)
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota: Some(DEFAULT_QUOTA_BYTES),
        }
    }

    /// Override the quota; `None` disables the limit
    pub fn with_quota(mut self, quota: Option<usize>) -> Self {
        self.quota = quota;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::StorageFailure(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            Error::StorageFailure(format!("unreadable slot file {}: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let failure = |e: std::io::Error| {
            Error::StorageFailure(format!("cannot write {}: {}", self.path.display(), e))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(failure)?;
            }
        }

        let contents = serde_json::to_string(items)
            .map_err(|e| Error::StorageFailure(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents).map_err(failure)?;
        std::fs::rename(&tmp, &self.path).map_err(failure)?;
        Ok(())
    }
}

impl StorageSlot for FileSlot {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());

        if let Some(quota) = self.quota {
            let needed = used_bytes(items.iter());
            if needed > quota {
                return Err(quota_exceeded(needed, quota));
            }
        }

        self.write_all(&items)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}
