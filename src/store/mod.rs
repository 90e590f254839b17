//! Collaborator interfaces around the session document: persistence, presence, clock.

mod clock;
mod field;
mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use field::{
    Changeset, FieldOp, FieldPath, FieldUpdate, FieldValue, PlayerField, Precondition,
};
pub use memory::MemoryStore;

use crate::models::{LogEntry, PlayerId, SessionError, SessionState};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Errors reported by a storage backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreError {
    /// A precondition no longer holds; nothing was written.
    Conflict(String),
    /// The update does not fit the addressed field; nothing was written.
    InvalidUpdate(String),
    /// The backend could not be reached or did not confirm the write.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict(what) => write!(f, "precondition failed: {}", what),
            StoreError::InvalidUpdate(what) => write!(f, "invalid update: {}", what),
            StoreError::Unavailable(what) => write!(f, "storage unavailable: {}", what),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => SessionError::StaleSelection,
            StoreError::InvalidUpdate(what) | StoreError::Unavailable(what) => {
                SessionError::PersistenceFailure(what)
            }
        }
    }
}

/// Durable storage for the session document and the game log.
///
/// Writes are field-level so that two operators working on unrelated parts of the
/// session (e.g. finishing two different courts) never overwrite each other.
pub trait Persistence: Send + Sync {
    fn read_state(&self) -> Result<SessionState, StoreError>;

    /// Atomically check the changeset's preconditions, apply its updates and append its
    /// log entry. Returns only after the write is confirmed.
    fn commit(&self, changes: &Changeset) -> Result<(), StoreError>;

    /// Whole-document overwrite. Last writer wins; used only for admin resets.
    fn replace_state(&self, state: SessionState) -> Result<(), StoreError>;

    fn append_log(&self, entry: LogEntry) -> Result<(), StoreError>;

    /// All log entries, oldest first.
    fn stream_log(&self) -> Result<Vec<LogEntry>, StoreError>;

    fn apply_field_update(&self, update: FieldUpdate) -> Result<(), StoreError> {
        let mut changes = Changeset::new();
        changes.push(update);
        self.commit(&changes)
    }
}

impl<P: Persistence + ?Sized> Persistence for Arc<P> {
    fn read_state(&self) -> Result<SessionState, StoreError> {
        (**self).read_state()
    }

    fn commit(&self, changes: &Changeset) -> Result<(), StoreError> {
        (**self).commit(changes)
    }

    fn replace_state(&self, state: SessionState) -> Result<(), StoreError> {
        (**self).replace_state(state)
    }

    fn append_log(&self, entry: LogEntry) -> Result<(), StoreError> {
        (**self).append_log(entry)
    }

    fn stream_log(&self) -> Result<Vec<LogEntry>, StoreError> {
        (**self).stream_log()
    }
}

/// Check-in bookkeeping. Marking presence alone does not touch the queue.
pub trait PresenceStore {
    fn mark_present(&self, player_id: PlayerId) -> Result<(), StoreError>;
    fn mark_absent(&self, player_id: PlayerId) -> Result<(), StoreError>;
    fn list_present(&self) -> Result<BTreeSet<PlayerId>, StoreError>;
}

impl<P: Persistence + ?Sized> PresenceStore for P {
    fn mark_present(&self, player_id: PlayerId) -> Result<(), StoreError> {
        self.apply_field_update(FieldUpdate::append_unique(FieldPath::Attendees, [player_id]))
    }

    fn mark_absent(&self, player_id: PlayerId) -> Result<(), StoreError> {
        self.apply_field_update(FieldUpdate::remove(FieldPath::Attendees, [player_id]))
    }

    fn list_present(&self) -> Result<BTreeSet<PlayerId>, StoreError> {
        Ok(self.read_state()?.attendees)
    }
}
