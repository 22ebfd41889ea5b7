use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{PoisonError, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use super::domain::{EventId, ScoreKey, ScoreRecord};

/// What an upsert did to the key it targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Older than the current value; kept in the audit trail only.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("score store is sealed")]
    Sealed,
    #[error("score store is being sealed")]
    Sealing,
}

/// Outcome of [`ScoreStore::seal_with`].
#[derive(Debug, thiserror::Error)]
pub enum SealError<E> {
    #[error("score store is already sealed")]
    AlreadySealed,
    #[error("score store is already being sealed")]
    InProgress,
    #[error("scores changed since revision {expected}; store is at revision {current}")]
    Moved { expected: u64, current: u64 },
    #[error("sealing aborted: {0}")]
    Aborted(E),
}

const OPEN: u8 = 0;
const SEALING: u8 = 1;
const SEALED: u8 = 2;

#[derive(Debug, Clone)]
struct ScoreEntry {
    current: ScoreRecord,
    superseded: Vec<ScoreRecord>,
}

/// Append-only, last-write-wins score storage for one camp.
///
/// Writes to the same key serialize on the map shard; writes to unrelated
/// keys only share the gate in read mode. Snapshots and the start of a seal
/// take the gate exclusively, so they never observe a half-applied write.
///
/// Every write that changes a current value bumps the revision. Snapshots
/// carry the revision they were taken at.
#[derive(Debug, Default)]
pub struct ScoreStore {
    entries: DashMap<ScoreKey, ScoreEntry>,
    gate: RwLock<()>,
    state: AtomicU8,
    revision: AtomicU64,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, record: ScoreRecord) -> Result<UpsertOutcome, StoreError> {
        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        match self.state.load(Ordering::Acquire) {
            OPEN => {}
            SEALING => return Err(StoreError::Sealing),
            _ => return Err(StoreError::Sealed),
        }

        let outcome = match self.entries.entry(record.key()) {
            Entry::Vacant(slot) => {
                slot.insert(ScoreEntry {
                    current: record,
                    superseded: Vec::new(),
                });
                UpsertOutcome::Inserted
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if record.submitted_at < entry.current.submitted_at {
                    entry.superseded.push(record);
                    UpsertOutcome::Stale
                } else {
                    let previous = std::mem::replace(&mut entry.current, record);
                    entry.superseded.push(previous);
                    UpsertOutcome::Replaced
                }
            }
        };

        if outcome != UpsertOutcome::Stale {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
        Ok(outcome)
    }

    /// Number of writes that changed a current value so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Consistent copy of every current record.
    pub fn snapshot(&self) -> ScoreSnapshot {
        let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
        self.collect_snapshot()
    }

    /// Seals the store once `finalize` accepts the snapshot at `expected`.
    ///
    /// Fails with [`SealError::Moved`] when the store is no longer at
    /// `expected`. While `finalize` runs the gate is released and writes are
    /// rejected with [`StoreError::Sealing`]; when it fails the store reopens.
    pub fn seal_with<T, E, F>(&self, expected: u64, finalize: F) -> Result<T, SealError<E>>
    where
        F: FnOnce(ScoreSnapshot) -> Result<T, E>,
    {
        let snapshot = {
            let _gate = self.gate.write().unwrap_or_else(PoisonError::into_inner);
            match self.state.load(Ordering::Acquire) {
                OPEN => {}
                SEALING => return Err(SealError::InProgress),
                _ => return Err(SealError::AlreadySealed),
            }
            let current = self.revision.load(Ordering::Acquire);
            if current != expected {
                return Err(SealError::Moved { expected, current });
            }
            self.state.store(SEALING, Ordering::Release);
            self.collect_snapshot()
        };

        let mut pending = PendingSeal {
            state: &self.state,
            committed: false,
        };
        let value = finalize(snapshot).map_err(SealError::Aborted)?;
        pending.commit();
        Ok(value)
    }

    pub fn is_sealed(&self) -> bool {
        self.state.load(Ordering::Acquire) == SEALED
    }

    pub fn current(&self, key: &ScoreKey) -> Option<ScoreRecord> {
        self.entries.get(key).map(|entry| entry.current.clone())
    }

    /// Superseded and stale submissions for `key`, in arrival order.
    pub fn history(&self, key: &ScoreKey) -> Vec<ScoreRecord> {
        self.entries
            .get(key)
            .map(|entry| entry.superseded.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn collect_snapshot(&self) -> ScoreSnapshot {
        let mut records: Vec<ScoreRecord> = self
            .entries
            .iter()
            .map(|entry| entry.current.clone())
            .collect();
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        ScoreSnapshot {
            records,
            revision: self.revision.load(Ordering::Acquire),
        }
    }
}

/// Reopens the store unless the seal was committed, including on unwind.
struct PendingSeal<'a> {
    state: &'a AtomicU8,
    committed: bool,
}

impl PendingSeal<'_> {
    fn commit(&mut self) {
        self.state.store(SEALED, Ordering::Release);
        self.committed = true;
    }
}

impl Drop for PendingSeal<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.state.store(OPEN, Ordering::Release);
        }
    }
}

/// Immutable view of the store's current records, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct ScoreSnapshot {
    records: Vec<ScoreRecord>,
    revision: u64,
}

impl ScoreSnapshot {
    pub fn from_records(mut records: Vec<ScoreRecord>) -> Self {
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        Self {
            records,
            revision: 0,
        }
    }

    /// Store revision this snapshot reflects.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn for_event<'a>(&'a self, event_id: &'a EventId) -> impl Iterator<Item = &'a ScoreRecord> {
        self.records
            .iter()
            .filter(move |record| &record.event_id == event_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
