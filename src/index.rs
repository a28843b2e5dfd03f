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

//! Secondary indices.
//!
//! Each entity category has one well-known key holding a JSON array of the
//! entity keys created in that category, in insertion order. Indices never
//! deduplicate; creators guarantee identifier uniqueness beforehand.

use crate::config::IndexKeys;
use crate::error::StoreError;
use crate::store::{EntityReader, EntityStore};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Customer,
    Merchant,
    Owner,
    Transaction,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Customer,
        IndexKind::Merchant,
        IndexKind::Owner,
        IndexKind::Transaction,
    ];

    pub fn key(self, keys: &IndexKeys) -> &str {
        match self {
            IndexKind::Customer => &keys.customer,
            IndexKind::Merchant => &keys.merchant,
            IndexKind::Owner => &keys.owner,
            IndexKind::Transaction => &keys.transaction,
        }
    }
}

/// Reads the index under `index_key`. An absent index is empty.
///
/// # Errors
///
/// Returns [`StoreError::Corrupted`] if the stored value is not a JSON array
/// of strings.
pub fn load<S>(store: &S, index_key: &str) -> Result<Vec<String>, StoreError>
where
    S: EntityReader + ?Sized,
{
    match store.get(index_key)? {
        None => Ok(Vec::new()),
        Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupted {
            key: index_key.to_owned(),
            reason: e.to_string(),
        }),
    }
}

/// Overwrites the index under `index_key`.
pub fn save<S>(store: &mut S, index_key: &str, entries: &[String]) -> Result<(), StoreError>
where
    S: EntityStore + ?Sized,
{
    let bytes = serde_json::to_vec(entries).map_err(|e| StoreError::Corrupted {
        key: index_key.to_owned(),
        reason: e.to_string(),
    })?;
    store.put(index_key, bytes)
}

/// Appends `entity_key` to the index.
pub fn append<S>(store: &mut S, index_key: &str, entity_key: &str) -> Result<(), StoreError>
where
    S: EntityStore + ?Sized,
{
    let mut entries = load(&*store, index_key)?;
    entries.push(entity_key.to_owned());
    debug!(index = index_key, key = entity_key, len = entries.len(), "index append");
    save(store, index_key, &entries)
}

/// Removes the first exact occurrence of `entity_key`. Returns whether one
/// was found; a miss leaves the index untouched.
pub fn remove<S>(store: &mut S, index_key: &str, entity_key: &str) -> Result<bool, StoreError>
where
    S: EntityStore + ?Sized,
{
    let mut entries = load(&*store, index_key)?;
    let Some(position) = entries.iter().position(|entry| entry == entity_key) else {
        debug!(index = index_key, key = entity_key, "index remove miss");
        return Ok(false);
    };
    entries.remove(position);
    debug!(index = index_key, key = entity_key, position, "index remove");
    save(store, index_key, &entries)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedger;

    #[test]
    fn absent_index_is_empty() {
        let ledger = MemoryLedger::new();
        let invocation = ledger.begin();
        assert!(load(&invocation, "_Customerindex").unwrap().is_empty());
    }

    #[test]
    fn append_keeps_insertion_order() {
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        for key in ["C2", "C1", "C3"] {
            append(&mut invocation, "_Customerindex", key).unwrap();
        }
        assert_eq!(load(&invocation, "_Customerindex").unwrap(), ["C2", "C1", "C3"]);
    }

    #[test]
    fn remove_takes_only_first_match() {
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        for key in ["A", "B", "A", "C"] {
            append(&mut invocation, "idx", key).unwrap();
        }
        assert!(remove(&mut invocation, "idx", "A").unwrap());
        assert_eq!(load(&invocation, "idx").unwrap(), ["B", "A", "C"]);
    }

    #[test]
    fn remove_miss_is_not_an_error() {
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        append(&mut invocation, "idx", "A").unwrap();
        assert!(!remove(&mut invocation, "idx", "Z").unwrap());
        assert_eq!(load(&invocation, "idx").unwrap(), ["A"]);
    }

    #[test]
    fn malformed_index_is_corruption() {
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        invocation.put("idx", b"{not an array".to_vec()).unwrap();
        assert!(matches!(
            load(&invocation, "idx"),
            Err(StoreError::Corrupted { .. })
        ));
    }

    #[test]
    fn kinds_resolve_configured_keys() {
        let keys = IndexKeys::default();
        let resolved: Vec<&str> = IndexKind::ALL.iter().map(|kind| kind.key(&keys)).collect();
        assert_eq!(
            resolved,
            ["_Customerindex", "_Merchantindex", "_Ownerindex", "_Transactionindex"]
        );
    }
}
