//! File-backed key/value cache with TTL and a size cap (§4.J).
//!
//! Grounded on the teacher's `utils/file_cache.rs` `FileCache`, replacing
//! its `DefaultHasher`-based filenames with sanitised-key filenames and its
//! JSON `metadata.json` with a plain newline-delimited text index
//! (`key,unix_seconds_created,value` per line), which also keeps the
//! loader free of `serde_json` for this one path.

use log::debug;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::wip_common_rs::packet::core::{WipError, WipResult};

struct Entry {
    created_at: u64,
    value: String,
}

impl Entry {
    fn is_expired(&self, ttl: Duration, now: u64) -> bool {
        now.saturating_sub(self.created_at) > ttl.as_secs()
    }
}

/// A directory-backed cache: one file per key plus a flat text index for
/// fast reload without opening every data file.
pub struct PersistentCache {
    cache_dir: PathBuf,
    default_ttl: Duration,
    max_cache_size: u64,
    index: HashMap<String, Entry>,
}

fn now_unix_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Replaces every non-alphanumeric character with `_` (§4.J) so the result
/// is always a valid filename component.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

impl PersistentCache {
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> WipResult<Self> {
        Self::with_options(cache_dir, Duration::from_secs(86_400), 100 * 1024 * 1024)
    }

    pub fn with_options<P: AsRef<Path>>(
        cache_dir: P,
        default_ttl: Duration,
        max_cache_size: u64,
    ) -> WipResult<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)
            .map_err(|e| WipError::ConfigError(format!("failed to create cache directory: {e}")))?;
        let mut cache = Self {
            cache_dir,
            default_ttl,
            max_cache_size,
            index: HashMap::new(),
        };
        cache.load_index()?;
        cache.cleanup_expired()?;
        Ok(cache)
    }

    fn index_path(&self) -> PathBuf {
        self.cache_dir.join("index.txt")
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.cache", sanitize_key(key)))
    }

    fn load_index(&mut self) -> WipResult<()> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(());
        }
        let file = File::open(&path)
            .map_err(|e| WipError::ConfigError(format!("failed to open cache index: {e}")))?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| WipError::ConfigError(format!("failed to read cache index: {e}")))?;
            let Some((key, rest)) = line.split_once(',') else { continue };
            let Some((created_at, value)) = rest.split_once(',') else { continue };
            let Ok(created_at) = created_at.parse::<u64>() else { continue };
            self.index.insert(
                key.to_string(),
                Entry {
                    created_at,
                    value: value.to_string(),
                },
            );
        }
        Ok(())
    }

    fn save_index(&self) -> WipResult<()> {
        let mut out = String::new();
        for (key, entry) in &self.index {
            out.push_str(&format!("{key},{},{}\n", entry.created_at, entry.value));
        }
        fs::write(self.index_path(), out)
            .map_err(|e| WipError::ConfigError(format!("failed to write cache index: {e}")))
    }

    pub fn set(&mut self, key: &str, value: &str) -> WipResult<()> {
        self.ensure_space_available(value.len() as u64)?;
        let path = self.data_path(key);
        let mut file =
            File::create(&path).map_err(|e| WipError::ConfigError(format!("failed to create cache file: {e}")))?;
        file.write_all(value.as_bytes())
            .map_err(|e| WipError::ConfigError(format!("failed to write cache file: {e}")))?;
        self.index.insert(
            key.to_string(),
            Entry {
                created_at: now_unix_secs(),
                value: value.to_string(),
            },
        );
        self.save_index()
    }

    pub fn get(&mut self, key: &str) -> WipResult<Option<String>> {
        let now = now_unix_secs();
        let expired = match self.index.get(key) {
            Some(entry) => entry.is_expired(self.default_ttl, now),
            None => return Ok(None),
        };
        if expired {
            self.delete(key)?;
            return Ok(None);
        }
        Ok(self.index.get(key).map(|e| e.value.clone()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = now_unix_secs();
        matches!(self.index.get(key), Some(e) if !e.is_expired(self.default_ttl, now))
    }

    pub fn delete(&mut self, key: &str) -> WipResult<bool> {
        if self.index.remove(key).is_none() {
            return Ok(false);
        }
        let path = self.data_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| WipError::ConfigError(format!("failed to delete cache file: {e}")))?;
        }
        self.save_index()?;
        Ok(true)
    }

    pub fn cleanup_expired(&mut self) -> WipResult<usize> {
        let now = now_unix_secs();
        let expired: Vec<String> = self
            .index
            .iter()
            .filter(|(_, e)| e.is_expired(self.default_ttl, now))
            .map(|(k, _)| k.clone())
            .collect();
        let count = expired.len();
        for key in expired {
            self.delete(&key)?;
        }
        if count > 0 {
            debug!("cleaned up {count} expired persistent cache entr(y/ies)");
        }
        Ok(count)
    }

    fn current_size(&self) -> u64 {
        self.index.values().map(|e| e.value.len() as u64).sum()
    }

    /// Evicts oldest-first until `needed` additional bytes fit under
    /// `max_cache_size` (§4.J, the teacher's `ensure_space_available` shape).
    fn ensure_space_available(&mut self, needed: u64) -> WipResult<()> {
        let current = self.current_size();
        if current + needed <= self.max_cache_size {
            return Ok(());
        }
        let mut entries: Vec<(String, u64)> =
            self.index.iter().map(|(k, e)| (k.clone(), e.created_at)).collect();
        entries.sort_by_key(|(_, created_at)| *created_at);

        let mut freed = 0u64;
        for (key, _) in entries {
            if current + needed - freed <= self.max_cache_size {
                break;
            }
            if let Some(entry) = self.index.get(&key) {
                freed += entry.value.len() as u64;
            }
            self.delete(&key)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates every indexed entry and reports the keys whose backing
    /// file is missing from disk (§4.J: "Integrity check iterates entries
    /// and reports any whose file is missing").
    pub fn integrity_check(&self) -> Vec<String> {
        self.index
            .keys()
            .filter(|key| !self.data_path(key).exists())
            .cloned()
            .collect()
    }
}
