//! Bounded undo history of structural + layout snapshots.
//!
//! Each entry stores the MessagePack encoding of the diagram before and after
//! one historied change. Undo restores `before` of the entry at the cursor,
//! redo restores `after` of the entry past it. Encodings are compared
//! byte-wise, so a gesture that ends where it started records nothing.

use erdraw_core::{DiagramData, LayoutDocument};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// The historied part of the diagram state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: DiagramData,
    pub layout: LayoutDocument,
}

/// Borrowed twin of [`Snapshot`]; encodes to the same bytes without cloning.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    data: &'a DiagramData,
    layout: &'a LayoutDocument,
}

pub fn encode_parts(data: &DiagramData, layout: &LayoutDocument) -> Result<Vec<u8>, HistoryError> {
    Ok(rmp_serde::to_vec_named(&SnapshotRef { data, layout })?)
}

impl Snapshot {
    pub fn encode(&self) -> Result<Vec<u8>, HistoryError> {
        encode_parts(&self.data, &self.layout)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, HistoryError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Milliseconds since the epoch, from the store's clock.
    pub timestamp: f64,
    pub label: String,
    before: Vec<u8>,
    after: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Append-only ring with a cursor in `-1..len`.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: isize,
    capacity: usize,
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            cursor: -1,
            capacity: config.capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index of the most recently applied entry, `-1` when none.
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len() as isize
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = -1;
    }

    /// Record an already-encoded change. Returns false when nothing changed.
    pub fn push_encoded(&mut self, label: &str, timestamp: f64, before: Vec<u8>, after: Vec<u8>) -> bool {
        if before == after {
            return false;
        }
        self.entries.truncate((self.cursor + 1) as usize);
        self.entries.push_back(HistoryEntry {
            timestamp,
            label: label.to_string(),
            before,
            after,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() as isize - 1;
        log::debug!("history: recorded {label:?} ({} entries)", self.entries.len());
        true
    }

    pub fn record(
        &mut self,
        label: &str,
        timestamp: f64,
        before: &Snapshot,
        after: &Snapshot,
    ) -> Result<bool, HistoryError> {
        Ok(self.push_encoded(label, timestamp, before.encode()?, after.encode()?))
    }

    /// Step back. Returns the snapshot to restore and the entry label.
    pub fn undo(&mut self) -> Result<Option<(Snapshot, String)>, HistoryError> {
        if self.cursor < 0 {
            return Ok(None);
        }
        let entry = &self.entries[self.cursor as usize];
        let snapshot = Snapshot::decode(&entry.before)?;
        let label = entry.label.clone();
        self.cursor -= 1;
        Ok(Some((snapshot, label)))
    }

    /// Step forward. Returns the snapshot to restore and the entry label.
    pub fn redo(&mut self) -> Result<Option<(Snapshot, String)>, HistoryError> {
        if !self.can_redo() {
            return Ok(None);
        }
        let entry = &self.entries[(self.cursor + 1) as usize];
        let snapshot = Snapshot::decode(&entry.after)?;
        let label = entry.label.clone();
        self.cursor += 1;
        Ok(Some((snapshot, label)))
    }
}
