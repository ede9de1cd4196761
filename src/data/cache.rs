use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use super::DataError;
use crate::models::{DailySnapshotRow, TimeSeriesTable};

/// When cached tables may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Always read from disk.
    Disabled,
    /// Reuse a table while the file's size and modification time are unchanged.
    #[default]
    ModifiedTime,
}

/// Identity of a source file's contents at load time.
///
/// Only the size and modification time are compared, not the contents. A
/// rewrite that keeps the same size within one modification-time tick of
/// the filesystem is not detected; use [`CachePolicy::Disabled`] or
/// [`TableCache::invalidate`] when files may change that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl SourceStamp {
    /// Read the stamp of a file on disk.
    pub fn read(path: &Path) -> Result<Self, DataError> {
        let metadata = fs::metadata(path).map_err(|source| DataError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

#[derive(Clone)]
enum CachedTable {
    Snapshot(Arc<Vec<DailySnapshotRow>>),
    TimeSeries(Arc<TimeSeriesTable>),
}

/// Read-through cache of parsed tables, keyed by source path.
pub struct TableCache {
    policy: CachePolicy,
    entries: HashMap<PathBuf, (SourceStamp, CachedTable)>,
    hits: usize,
    misses: usize,
}

impl TableCache {
    /// Create an empty cache with the given policy.
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached snapshot at `path`, loading it on a miss.
    pub fn snapshot<F>(&mut self, path: &Path, load: F) -> Result<Arc<Vec<DailySnapshotRow>>, DataError>
    where
        F: FnOnce(&Path) -> Result<Vec<DailySnapshotRow>, DataError>,
    {
        if self.policy == CachePolicy::Disabled {
            self.misses += 1;
            return load(path).map(Arc::new);
        }

        let key = cache_key(path);
        let stamp = SourceStamp::read(path)?;
        if let Some(CachedTable::Snapshot(rows)) = self.lookup(&key, stamp) {
            self.hits += 1;
            return Ok(rows);
        }

        self.misses += 1;
        let rows = Arc::new(load(path)?);
        self.entries
            .insert(key, (stamp, CachedTable::Snapshot(Arc::clone(&rows))));
        Ok(rows)
    }

    /// Return the cached time-series table at `path`, loading it on a miss.
    pub fn time_series<F>(&mut self, path: &Path, load: F) -> Result<Arc<TimeSeriesTable>, DataError>
    where
        F: FnOnce(&Path) -> Result<TimeSeriesTable, DataError>,
    {
        if self.policy == CachePolicy::Disabled {
            self.misses += 1;
            return load(path).map(Arc::new);
        }

        let key = cache_key(path);
        let stamp = SourceStamp::read(path)?;
        if let Some(CachedTable::TimeSeries(table)) = self.lookup(&key, stamp) {
            self.hits += 1;
            return Ok(table);
        }

        self.misses += 1;
        let table = Arc::new(load(path)?);
        self.entries
            .insert(key, (stamp, CachedTable::TimeSeries(Arc::clone(&table))));
        Ok(table)
    }

    /// Drop the entry for one path.
    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(&cache_key(path));
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn lookup(&mut self, key: &Path, stamp: SourceStamp) -> Option<CachedTable> {
        let fresh = self.entries.get(key).map(|(cached, _)| *cached == stamp);
        match fresh {
            Some(true) => self.entries.get(key).map(|(_, table)| table.clone()),
            Some(false) => {
                debug!("Cached table for {} is stale", key.display());
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

fn cache_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
