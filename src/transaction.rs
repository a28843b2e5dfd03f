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

//! Transaction records.
//!
//! A transaction is the audit entry for one ledger movement. It is written
//! once under its caller-supplied identifier and never changed or removed.

use crate::base::{CustomerId, TransactionId};
use crate::error::LoyaltyError;
use crate::record::Record;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    CustomerOnBoarding,
    Purchase,
    Transfer,
    Accumulation,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CustomerOnBoarding => "CustomerOnBoarding",
            Self::Purchase => "Purchase",
            Self::Transfer => "Transfer",
            Self::Accumulation => "Accumulation",
        }
    }

    /// Checks that an operation recording `expected` was handed this kind.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::UnexpectedTransactionType`] on mismatch.
    pub fn require(self, expected: TransactionKind) -> Result<(), LoyaltyError> {
        if self == expected {
            Ok(())
        } else {
            Err(LoyaltyError::UnexpectedTransactionType {
                expected: expected.as_str(),
                actual: self.as_str(),
            })
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = LoyaltyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CustomerOnBoarding" => Ok(Self::CustomerOnBoarding),
            "Purchase" => Ok(Self::Purchase),
            "Transfer" => Ok(Self::Transfer),
            "Accumulation" => Ok(Self::Accumulation),
            other => Err(LoyaltyError::InvalidTransactionType(other.to_owned())),
        }
    }
}

/// One movement as described by the caller, before it is attributed to a
/// customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub transaction_id: TransactionId,
    pub date_time: String,
    pub from: String,
    pub to: String,
    pub credit: Decimal,
    pub debit: Decimal,
}

impl Leg {
    pub fn attribute(self, kind: TransactionKind, customer_id: CustomerId) -> Transaction {
        Transaction {
            transaction_id: self.transaction_id,
            date_time: self.date_time,
            kind,
            from: self.from,
            to: self.to,
            credit: self.credit,
            debit: self.debit,
            customer_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transactionId")]
    pub transaction_id: TransactionId,
    #[serde(rename = "transactionDateTime")]
    pub date_time: String,
    #[serde(rename = "transactionType")]
    pub kind: TransactionKind,
    #[serde(rename = "transactionFrom")]
    pub from: String,
    #[serde(rename = "transactionTo")]
    pub to: String,
    pub credit: Decimal,
    pub debit: Decimal,
    #[serde(rename = "customerId")]
    pub customer_id: CustomerId,
}

impl Record for Transaction {
    const KIND: &'static str = "Transaction";
    const KEY_FIELD: &'static str = "transactionId";

    fn key(&self) -> &str {
        self.transaction_id.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kinds_parse_exactly() {
        assert_eq!(
            "CustomerOnBoarding".parse::<TransactionKind>().unwrap(),
            TransactionKind::CustomerOnBoarding
        );
        assert_eq!(
            "purchase".parse::<TransactionKind>(),
            Err(LoyaltyError::InvalidTransactionType("purchase".into()))
        );
    }

    #[test]
    fn require_reports_both_kinds() {
        assert!(TransactionKind::Transfer.require(TransactionKind::Transfer).is_ok());
        assert_eq!(
            TransactionKind::Purchase.require(TransactionKind::Accumulation),
            Err(LoyaltyError::UnexpectedTransactionType {
                expected: "Accumulation",
                actual: "Purchase",
            })
        );
    }

    #[test]
    fn wire_shape() {
        let leg = Leg {
            transaction_id: TransactionId::new("T1"),
            date_time: "2017-02-03T10:00:00".into(),
            from: "alice".into(),
            to: "M1 Store".into(),
            credit: dec!(0.00),
            debit: dec!(12.50),
        };
        let tx = leg.attribute(TransactionKind::Purchase, CustomerId::new("C1"));
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["transactionType"], "Purchase");
        assert_eq!(json["transactionFrom"], "alice");
        assert_eq!(json["debit"], "12.50");
        assert_eq!(json["customerId"], "C1");
        assert_eq!(serde_json::from_value::<Transaction>(json).unwrap(), tx);
    }
}
