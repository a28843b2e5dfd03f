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

//! Typed entity records on top of the raw byte store.
//!
//! Records are stored as flat JSON objects under their own identifier. A key
//! that holds something other than the expected kind of record (absent, not a
//! JSON object, or an object whose identifier field does not name the key)
//! reads as `None`. An object that does name the key but fails to decode is
//! corrupted.

use crate::error::{LoyaltyError, StoreError};
use crate::index;
use crate::store::{EntityReader, EntityStore};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A JSON record stored under its own identifier.
pub trait Record: Serialize + DeserializeOwned {
    /// Human-readable kind, used in duplicate-creation messages.
    const KIND: &'static str;

    /// Wire field holding the record's own identifier.
    const KEY_FIELD: &'static str;

    fn key(&self) -> &str;
}

/// Reads the record of kind `R` stored under `key`.
///
/// # Errors
///
/// Returns [`StoreError::Corrupted`] if the stored object identifies itself
/// as this record but does not decode.
pub fn read<R, S>(store: &S, key: &str) -> Result<Option<R>, StoreError>
where
    R: Record,
    S: EntityReader + ?Sized,
{
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    let Ok(value) = serde_json::from_slice::<Value>(&bytes) else {
        return Ok(None);
    };
    if value.get(R::KEY_FIELD).and_then(Value::as_str) != Some(key) {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| StoreError::Corrupted {
            key: key.to_owned(),
            reason: e.to_string(),
        })
}

pub fn write<R, S>(store: &mut S, record: &R) -> Result<(), StoreError>
where
    R: Record,
    S: EntityStore + ?Sized,
{
    let bytes = serde_json::to_vec(record).map_err(|e| StoreError::Corrupted {
        key: record.key().to_owned(),
        reason: e.to_string(),
    })?;
    store.put(record.key(), bytes)
}

/// True if anything at all is stored under `key`.
pub fn occupied<S>(store: &S, key: &str) -> Result<bool, StoreError>
where
    S: EntityReader + ?Sized,
{
    Ok(store.get(key)?.is_some())
}

/// Rejects creation of `record` if its key is taken by any entity.
pub fn ensure_vacant<R, S>(store: &S, record: &R) -> Result<(), LoyaltyError>
where
    R: Record,
    S: EntityReader + ?Sized,
{
    if occupied(store, record.key())? {
        return Err(LoyaltyError::AlreadyExists {
            kind: R::KIND,
            key: record.key().to_owned(),
        });
    }
    Ok(())
}

/// Loads every record named by the index, in index order.
///
/// # Errors
///
/// Returns [`LoyaltyError::IndexCorrupted`] if an entry names a key that
/// does not hold a readable record of type `R`.
pub fn scan<R, S>(store: &S, index_key: &str) -> Result<Vec<R>, LoyaltyError>
where
    R: Record,
    S: EntityReader + ?Sized,
{
    index::load(store, index_key)?
        .into_iter()
        .map(|key| {
            read::<R, S>(store, &key)?.ok_or_else(|| LoyaltyError::IndexCorrupted {
                index: index_key.to_owned(),
                key,
            })
        })
        .collect()
}
