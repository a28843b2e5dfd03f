// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Entity store contract and the in-memory reference ledger.
//!
//! The engine only ever talks to an [`EntityStore`] scoped to one invocation.
//! Whoever owns the ledger decides when that invocation commits: all of its
//! writes and events become visible together, or none do.
//!
//! [`MemoryLedger`] implements that contract with optimistic concurrency.
//! Every key carries a version; an invocation remembers the version of each
//! key it read and the commit fails with [`StoreError::Conflict`] if any of
//! them moved in the meantime.

use crate::error::StoreError;
use crossbeam::queue::SegQueue;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Read access to the ledger.
pub trait EntityReader {
    /// Returns the value under `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Read-write access to the ledger within one invocation.
pub trait EntityStore: EntityReader {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&mut self, key: &str) -> Result<(), StoreError>;

    /// Queues a named notification, published only if the invocation commits.
    fn emit(&mut self, event: &str, payload: Vec<u8>) -> Result<(), StoreError>;
}

/// A ledger that runs invocations as atomic units.
pub trait Ledger {
    /// Runs `f` against a fresh invocation-scoped store. Commits on `Ok`,
    /// discards every write and event on `Err`.
    ///
    /// # Errors
    ///
    /// Returns `f`'s error, or the commit failure converted into `E`.
    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn EntityStore) -> Result<T, E>,
        E: From<StoreError>;
}

/// A committed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub payload: Vec<u8>,
}

impl Event {
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

#[derive(Debug)]
struct Versioned {
    version: u64,
    value: Vec<u8>,
}

/// In-memory ledger with per-invocation optimistic commit.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<HashMap<String, Versioned>>,
    /// Source of fresh versions; never reused, so a delete-then-recreate is
    /// still seen as a change.
    clock: AtomicU64,
    events: SegQueue<Event>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an invocation. Nothing it writes is visible to others until
    /// [`Invocation::commit`].
    pub fn begin(&self) -> Invocation<'_> {
        Invocation {
            ledger: self,
            reads: RefCell::new(HashMap::new()),
            writes: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Committed value under `key`, outside any invocation.
    pub fn get_committed(&self, key: &str) -> Option<Vec<u8>> {
        self.state.read().get(key).map(|entry| entry.value.clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    /// Drains committed events in commit order.
    pub fn take_events(&self) -> Vec<Event> {
        let mut drained = Vec::with_capacity(self.events.len());
        while let Some(event) = self.events.pop() {
            drained.push(event);
        }
        drained
    }

    fn next_version(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Ledger for MemoryLedger {
    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn EntityStore) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut invocation = self.begin();
        let value = f(&mut invocation)?;
        invocation.commit()?;
        Ok(value)
    }
}

/// One invocation against a [`MemoryLedger`].
///
/// Reads see this invocation's own staged writes first. Dropping it without
/// committing discards everything.
#[derive(Debug)]
pub struct Invocation<'a> {
    ledger: &'a MemoryLedger,
    /// Version observed on first read of each key; `None` if it was absent.
    reads: RefCell<HashMap<String, Option<u64>>>,
    /// Staged writes; `None` stages a delete.
    writes: HashMap<String, Option<Vec<u8>>>,
    events: Vec<Event>,
}

impl Invocation<'_> {
    /// Validates the read set and applies staged writes and events.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if any key this invocation read was
    /// committed by someone else since.
    pub fn commit(self) -> Result<(), StoreError> {
        let mut state = self.ledger.state.write();

        let reads = self.reads.into_inner();
        for (key, seen) in &reads {
            let current = state.get(key).map(|entry| entry.version);
            if current != *seen {
                debug!(key = %key, "commit conflict");
                return Err(StoreError::Conflict { key: key.clone() });
            }
        }

        let write_count = self.writes.len();
        for (key, staged) in self.writes {
            match staged {
                Some(value) => {
                    let version = self.ledger.next_version();
                    state.insert(key, Versioned { version, value });
                }
                None => {
                    state.remove(&key);
                }
            }
        }
        // Published while still holding the write lock so event order
        // follows commit order.
        for event in self.events {
            self.ledger.events.push(event);
        }
        debug!(reads = reads.len(), writes = write_count, "invocation committed");
        Ok(())
    }
}

impl EntityReader for Invocation<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(staged) = self.writes.get(key) {
            return Ok(staged.clone());
        }
        let state = self.ledger.state.read();
        let entry = state.get(key);
        if let Entry::Vacant(slot) = self.reads.borrow_mut().entry(key.to_owned()) {
            slot.insert(entry.map(|entry| entry.version));
        }
        Ok(entry.map(|entry| entry.value.clone()))
    }
}

impl EntityStore for Invocation<'_> {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.writes.insert(key.to_owned(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.writes.insert(key.to_owned(), None);
        Ok(())
    }

    fn emit(&mut self, event: &str, payload: Vec<u8>) -> Result<(), StoreError> {
        self.events.push(Event {
            name: event.to_owned(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_see_own_staged_writes() {
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        invocation.put("k", b"v1".to_vec()).unwrap();
        assert_eq!(invocation.get("k").unwrap(), Some(b"v1".to_vec()));
        invocation.delete("k").unwrap();
        assert_eq!(invocation.get("k").unwrap(), None);
    }

    #[test]
    fn nothing_is_visible_before_commit() {
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        invocation.put("k", b"v".to_vec()).unwrap();
        invocation.emit("evtsender", b"{}".to_vec()).unwrap();
        assert_eq!(ledger.get_committed("k"), None);
        invocation.commit().unwrap();
        assert_eq!(ledger.get_committed("k"), Some(b"v".to_vec()));
        assert_eq!(ledger.take_events().len(), 1);
    }

    #[test]
    fn dropped_invocation_discards_everything() {
        let ledger = MemoryLedger::new();
        {
            let mut invocation = ledger.begin();
            invocation.put("k", b"v".to_vec()).unwrap();
            invocation.emit("evtsender", b"{}".to_vec()).unwrap();
        }
        assert!(ledger.is_empty());
        assert!(ledger.take_events().is_empty());
    }

    #[test]
    fn stale_read_fails_commit() {
        let ledger = MemoryLedger::new();
        ledger
            .transact(|store| store.put("counter", b"0".to_vec()))
            .unwrap();

        let mut slow = ledger.begin();
        assert_eq!(slow.get("counter").unwrap(), Some(b"0".to_vec()));

        ledger
            .transact(|store| store.put("counter", b"1".to_vec()))
            .unwrap();

        slow.put("counter", b"2".to_vec()).unwrap();
        assert_eq!(
            slow.commit(),
            Err(StoreError::Conflict {
                key: "counter".into()
            })
        );
        assert_eq!(ledger.get_committed("counter"), Some(b"1".to_vec()));
    }

    #[test]
    fn absent_key_read_conflicts_with_concurrent_create() {
        let ledger = MemoryLedger::new();
        let mut slow = ledger.begin();
        assert_eq!(slow.get("C1").unwrap(), None);

        ledger.transact(|store| store.put("C1", b"a".to_vec())).unwrap();

        slow.put("C1", b"b".to_vec()).unwrap();
        assert!(matches!(slow.commit(), Err(StoreError::Conflict { .. })));
    }

    #[test]
    fn recreated_key_gets_new_version() {
        let ledger = MemoryLedger::new();
        ledger.transact(|store| store.put("k", b"a".to_vec())).unwrap();

        let mut slow = ledger.begin();
        slow.get("k").unwrap();

        ledger.transact(|store| store.delete("k")).unwrap();
        ledger.transact(|store| store.put("k", b"a".to_vec())).unwrap();

        assert!(matches!(slow.commit(), Err(StoreError::Conflict { .. })));
    }

    #[test]
    fn transact_error_rolls_back() {
        let ledger = MemoryLedger::new();
        let result: Result<(), StoreError> = ledger.transact(|store| {
            store.put("k", b"v".to_vec())?;
            Err(StoreError::Backend("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(ledger.get_committed("k"), None);
    }
}
