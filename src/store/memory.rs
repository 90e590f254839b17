//! In-memory session document with an optional JSON snapshot file.

use crate::models::{LogEntry, SessionState};
use crate::store::{Changeset, Persistence, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Snapshot {
    state: SessionState,
    log: Vec<LogEntry>,
}

/// Document store guarded by one `RwLock`; each commit holds the write lock for
/// precondition check plus apply, so a commit is atomic with respect to every other.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Snapshot>,
    snapshot_path: Option<PathBuf>,
    /// Number of upcoming writes to reject as unavailable (fault injection).
    failing_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: RwLock::new(Snapshot {
                state,
                log: Vec::new(),
            }),
            snapshot_path: None,
            failing_writes: AtomicUsize::new(0),
        }
    }

    /// Load from `path` if it exists, otherwise start from `initial`. Later calls to
    /// `flush` write back to `path`. An unreadable snapshot is an error, not a fresh start.
    pub fn open(path: impl AsRef<Path>, initial: SessionState) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
            let snapshot: Snapshot = serde_json::from_str(&raw)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
            log::info!(
                "Loaded session snapshot from {} ({} players, {} logged games)",
                path.display(),
                snapshot.state.players.len(),
                snapshot.log.len()
            );
            snapshot
        } else {
            Snapshot {
                state: initial,
                log: Vec::new(),
            }
        };
        Ok(Self {
            inner: RwLock::new(snapshot),
            snapshot_path: Some(path),
            failing_writes: AtomicUsize::new(0),
        })
    }

    /// Write the current document and log to the snapshot file (no-op without one).
    pub fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let json = {
            let guard = self.read_guard()?;
            serde_json::to_string_pretty(&*guard)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
        };
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, path))
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))
    }

    /// Make the next `n` writes fail with `StoreError::Unavailable`.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> Result<(), StoreError> {
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("write not confirmed".to_string()));
        }
        Ok(())
    }

    fn read_guard(&self) -> Result<std::sync::RwLockReadGuard<'_, Snapshot>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock error".to_string()))
    }

    fn write_guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, Snapshot>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock error".to_string()))
    }
}

impl Persistence for MemoryStore {
    fn read_state(&self) -> Result<SessionState, StoreError> {
        Ok(self.read_guard()?.state.clone())
    }

    fn commit(&self, changes: &Changeset) -> Result<(), StoreError> {
        self.take_injected_failure()?;
        let mut guard = self.write_guard()?;
        changes.apply_to(&mut guard.state)?;
        if let Some(entry) = &changes.log_entry {
            guard.log.push(entry.clone());
        }
        Ok(())
    }

    fn replace_state(&self, state: SessionState) -> Result<(), StoreError> {
        self.take_injected_failure()?;
        self.write_guard()?.state = state;
        Ok(())
    }

    fn append_log(&self, entry: LogEntry) -> Result<(), StoreError> {
        self.take_injected_failure()?;
        self.write_guard()?.log.push(entry);
        Ok(())
    }

    fn stream_log(&self) -> Result<Vec<LogEntry>, StoreError> {
        let mut log = self.read_guard()?.log.clone();
        log.sort_by_key(|e| e.finish_time);
        Ok(log)
    }
}
