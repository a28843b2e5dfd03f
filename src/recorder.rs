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

//! Transaction Recorder.
//!
//! Writes the audit entry for a ledger movement and appends it to the
//! transaction index. Entries are append-only: an identifier that is already
//! in use is refused instead of overwritten.

use crate::config::IndexKeys;
use crate::error::LoyaltyError;
use crate::index;
use crate::record::{occupied, write};
use crate::store::EntityStore;
use crate::transaction::Transaction;
use tracing::debug;

pub fn record<S>(store: &mut S, keys: &IndexKeys, transaction: &Transaction) -> Result<(), LoyaltyError>
where
    S: EntityStore + ?Sized,
{
    if occupied(&*store, transaction.transaction_id.as_str())? {
        return Err(LoyaltyError::DuplicateTransaction(
            transaction.transaction_id.clone(),
        ));
    }
    write(store, transaction)?;
    index::append(store, &keys.transaction, transaction.transaction_id.as_str())?;
    debug!(
        transaction_id = %transaction.transaction_id,
        kind = %transaction.kind,
        customer_id = %transaction.customer_id,
        "transaction recorded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{CustomerId, TransactionId};
    use crate::store::MemoryLedger;
    use crate::transaction::{Leg, TransactionKind};
    use rust_decimal_macros::dec;

    fn accumulation(id: &str) -> Transaction {
        Leg {
            transaction_id: TransactionId::new(id),
            date_time: "2017-03-01".into(),
            from: "M1 Store".into(),
            to: "alice".into(),
            credit: dec!(5.00),
            debit: dec!(0.00),
        }
        .attribute(TransactionKind::Accumulation, CustomerId::new("C1"))
    }

    #[test]
    fn records_and_indexes() {
        let ledger = MemoryLedger::new();
        let keys = IndexKeys::default();
        let mut invocation = ledger.begin();
        record(&mut invocation, &keys, &accumulation("T1")).unwrap();
        record(&mut invocation, &keys, &accumulation("T2")).unwrap();
        assert_eq!(index::load(&invocation, &keys.transaction).unwrap(), ["T1", "T2"]);
        let stored: Option<Transaction> = crate::record::read(&invocation, "T2").unwrap();
        assert_eq!(stored, Some(accumulation("T2")));
    }

    #[test]
    fn identifiers_are_never_reused() {
        let ledger = MemoryLedger::new();
        let keys = IndexKeys::default();
        let mut invocation = ledger.begin();
        record(&mut invocation, &keys, &accumulation("T1")).unwrap();
        let err = record(&mut invocation, &keys, &accumulation("T1")).unwrap_err();
        assert_eq!(err, LoyaltyError::DuplicateTransaction(TransactionId::new("T1")));
        assert_eq!(index::load(&invocation, &keys.transaction).unwrap(), ["T1"]);
    }

    #[test]
    fn any_occupant_blocks_the_identifier() {
        let ledger = MemoryLedger::new();
        let keys = IndexKeys::default();
        let mut invocation = ledger.begin();
        invocation.put("T1", b"{}".to_vec()).unwrap();
        assert!(record(&mut invocation, &keys, &accumulation("T1")).is_err());
    }
}
