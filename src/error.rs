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

//! Error types for the loyalty engine and its ledger.

use crate::base::{CustomerId, MerchantId, OwnerId, TransactionId};
use crate::outcome::Outcome;
use thiserror::Error;

/// Ledger failures. These always abort the invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store failed to read or write
    #[error("ledger backend error: {0}")]
    Backend(String),

    /// A key read by this invocation was changed by a concurrent commit
    #[error("commit conflict on key {key}")]
    Conflict { key: String },

    /// A stored value could not be decoded where it must be readable
    #[error("corrupted value under {key}: {reason}")]
    Corrupted { key: String, reason: String },
}

/// Loyalty program errors.
///
/// Everything except [`LoyaltyError::Store`] and
/// [`LoyaltyError::IndexCorrupted`] is a rejection: an expected outcome
/// reported to the caller with code 503, after which no state has changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoyaltyError {
    /// Invocation name is not part of the command or query set
    #[error("Received unknown function {surface}")]
    UnknownFunction {
        surface: &'static str,
        name: String,
    },

    /// Wrong number of positional arguments
    #[error("Incorrect number of arguments. Expecting {expected}")]
    Arity {
        function: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Numeric argument is not a decimal
    #[error("invalid amount for {field}: {value:?}")]
    InvalidAmount { field: &'static str, value: String },

    /// Argument violates a field constraint
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },

    /// Transaction type is not one of the known kinds
    #[error("unknown transaction type {0:?}")]
    InvalidTransactionType(String),

    /// Transaction type does not match the operation recording it
    #[error("transaction type {actual} not allowed here, expected {expected}")]
    UnexpectedTransactionType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0} Not Found.")]
    CustomerNotFound(CustomerId),

    #[error("{0} Not Found.")]
    MerchantNotFound(MerchantId),

    #[error("{0} Not Found.")]
    OwnerNotFound(OwnerId),

    /// Create targeted a key that is already occupied
    #[error("This {kind} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    /// Transaction id already written; transactions are append-only
    #[error("Transaction {0} already exists")]
    DuplicateTransaction(TransactionId),

    /// Replacement point lists do not line up with the customer's associations
    #[error("{customer_id}: expected {expected} positional values, got {actual}")]
    PositionalMismatch {
        customer_id: CustomerId,
        expected: usize,
        actual: usize,
    },

    /// Exchange rate must be positive to derive a point grant
    #[error("exchange rate of {0} must be positive")]
    InvalidExchangeRate(MerchantId),

    /// Arithmetic on an amount left the representable decimal range
    #[error("{field} out of range")]
    AmountOverflow { field: &'static str },

    /// An index names a key that holds no readable record
    #[error("index {index} references missing or unreadable record {key}")]
    IndexCorrupted { index: String, key: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoyaltyError {
    pub const REJECTED_CODE: u16 = 503;
    pub const FAILED_CODE: u16 = 500;

    /// True for expected, recoverable outcomes (validation, not-found,
    /// duplicate). False for ledger failures.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::IndexCorrupted { .. })
    }

    pub fn code(&self) -> u16 {
        if self.is_rejection() {
            Self::REJECTED_CODE
        } else {
            Self::FAILED_CODE
        }
    }

    /// Notification envelope describing this error.
    pub fn outcome(&self) -> Outcome {
        Outcome::new(self.to_string(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            LoyaltyError::Arity {
                function: "createCustomer",
                expected: 13,
                actual: 2
            }
            .to_string(),
            "Incorrect number of arguments. Expecting 13"
        );
        assert_eq!(
            LoyaltyError::MerchantNotFound(MerchantId::new("M9")).to_string(),
            "M9 Not Found."
        );
        assert_eq!(
            LoyaltyError::AlreadyExists {
                kind: "Customer",
                key: "C1".into()
            }
            .to_string(),
            "This Customer already exists"
        );
        assert_eq!(
            LoyaltyError::UnknownFunction {
                surface: "invocation",
                name: "explode".into()
            }
            .to_string(),
            "Received unknown function invocation"
        );
        assert_eq!(
            LoyaltyError::Store(StoreError::Conflict { key: "_Customerindex".into() }).to_string(),
            "commit conflict on key _Customerindex"
        );
    }

    #[test]
    fn rejections_map_to_503() {
        let rejection = LoyaltyError::CustomerNotFound(CustomerId::new("C1"));
        assert!(rejection.is_rejection());
        assert_eq!(rejection.code(), 503);

        let failure = LoyaltyError::Store(StoreError::Backend("disk".into()));
        assert!(!failure.is_rejection());
        assert_eq!(failure.code(), 500);

        let corrupted = LoyaltyError::IndexCorrupted {
            index: "_Merchantindex".into(),
            key: "M1".into(),
        };
        assert!(!corrupted.is_rejection());
    }

    #[test]
    fn errors_are_cloneable() {
        let error = LoyaltyError::DuplicateTransaction(TransactionId::new("T1"));
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
