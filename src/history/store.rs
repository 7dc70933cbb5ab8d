//! History store with optional JSON file persistence

use std::{
    collections::BTreeSet,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::HistoryEntry;
use crate::error::HistoryError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct HistoryFile {
    next_id: u64,
    entries: Vec<HistoryEntry>,
}

/// Thread-safe list of recorded runs
#[derive(Debug)]
pub struct HistoryStore {
    inner: Mutex<HistoryFile>,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(HistoryFile::default()),
            path: None,
        }
    }

    /// Open a store, loading `path` when it exists
    ///
    /// Every mutation rewrites the file. `None` behaves like [`in_memory`](Self::in_memory).
    pub fn open(path: Option<PathBuf>) -> Result<Self, HistoryError> {
        let Some(path) = path else {
            return Ok(Self::in_memory());
        };

        let file = if path.exists() {
            let raw = fs::read(&path).map_err(|source| HistoryError::Io {
                path: path.clone(),
                source,
            })?;
            let mut file: HistoryFile =
                serde_json::from_slice(&raw).map_err(|source| HistoryError::Serde {
                    path: path.clone(),
                    source,
                })?;
            // Never hand out an id that is already on disk
            let max_id = file.entries.iter().map(|e| e.id).max();
            if let Some(max_id) = max_id {
                file.next_id = file.next_id.max(max_id + 1);
            }
            info!("Loaded {} history entries from {}", file.entries.len(), path.display());
            file
        } else {
            info!("History file {} not found, starting empty", path.display());
            HistoryFile::default()
        };

        Ok(Self {
            inner: Mutex::new(file),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a run created now
    pub fn insert(&self, elapsed_seconds: u64, set_seconds: u64) -> Result<HistoryEntry, HistoryError> {
        self.insert_at(Utc::now(), elapsed_seconds, set_seconds)
    }

    /// Record a run with an explicit creation time
    pub fn insert_at(
        &self,
        created_at: DateTime<Utc>,
        elapsed_seconds: u64,
        set_seconds: u64,
    ) -> Result<HistoryEntry, HistoryError> {
        let mut file = self.lock()?;
        let entry = self.commit(&mut file, |next| {
            let entry = HistoryEntry {
                id: next.next_id,
                created_at,
                elapsed_seconds,
                set_seconds,
            };
            next.next_id += 1;
            next.entries.push(entry.clone());
            entry
        })?;

        debug!("Inserted history entry {}", entry.id);
        Ok(entry)
    }

    /// All entries, newest first
    pub fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let file = self.lock()?;
        Ok(sorted_desc(&file.entries))
    }

    pub fn len(&self) -> Result<usize, HistoryError> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.len()? == 0)
    }

    /// Delete one entry by id
    pub fn delete(&self, id: u64) -> Result<HistoryEntry, HistoryError> {
        let mut file = self.lock()?;
        let position = file
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(HistoryError::NotFound(id))?;
        let removed = self.commit(&mut file, |next| next.entries.remove(position))?;

        info!("Deleted history entry {}", id);
        Ok(removed)
    }

    /// Delete entries by their positions in [`list`](Self::list) order
    ///
    /// All indices are validated before anything is removed.
    pub fn delete_indices(&self, indices: &[usize]) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut file = self.lock()?;
        let ordered = sorted_desc(&file.entries);

        let unique: BTreeSet<usize> = indices.iter().copied().collect();
        if let Some(&index) = unique.iter().find(|&&i| i >= ordered.len()) {
            return Err(HistoryError::IndexOutOfRange {
                index,
                len: ordered.len(),
            });
        }

        let doomed: BTreeSet<u64> = unique.iter().map(|&i| ordered[i].id).collect();
        let removed: Vec<HistoryEntry> = unique.iter().map(|&i| ordered[i].clone()).collect();
        self.commit(&mut file, |next| next.entries.retain(|e| !doomed.contains(&e.id)))?;

        info!("Deleted {} history entries by index", removed.len());
        Ok(removed)
    }

    /// Remove everything, returning how many entries were dropped
    pub fn clear(&self) -> Result<usize, HistoryError> {
        let mut file = self.lock()?;
        let count = file.entries.len();
        self.commit(&mut file, |next| next.entries.clear())?;

        info!("Cleared {} history entries", count);
        Ok(count)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HistoryFile>, HistoryError> {
        self.inner
            .lock()
            .map_err(|e| HistoryError::LockPoisoned(e.to_string()))
    }

    /// Apply `change` to a copy, persist it, then swap it in
    ///
    /// The in-memory list only changes once the file write succeeded.
    fn commit<T, F>(&self, file: &mut HistoryFile, change: F) -> Result<T, HistoryError>
    where
        F: FnOnce(&mut HistoryFile) -> T,
    {
        let mut next = file.clone();
        let output = change(&mut next);
        self.persist(&next)?;
        *file = next;
        Ok(output)
    }

    /// Write to a sibling temp file and rename it over the history file
    fn persist(&self, file: &HistoryFile) -> Result<(), HistoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source: io::Error| HistoryError::Io {
            path: path.clone(),
            source,
        };

        let raw = serde_json::to_vec_pretty(file).map_err(|source| HistoryError::Serde {
            path: path.clone(),
            source,
        })?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&raw).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn sorted_desc(entries: &[HistoryEntry]) -> Vec<HistoryEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    sorted
}
