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

//! # Loyalty Ledger
//!
//! This library implements a merchant loyalty-points program on top of a
//! key-addressed, transactionally committed ledger: customer onboarding and
//! association with merchants, point accumulation, purchase redemption,
//! transfers between customers, and balance and activity reporting.
//!
//! ## Core Components
//!
//! - [`LoyaltyEngine`]: dispatches one [`Request`] per ledger invocation
//! - [`Ledger`] / [`EntityStore`]: the store contract the engine runs on
//! - [`MemoryLedger`]: in-memory ledger with optimistic per-invocation commit
//! - [`Customer`], [`Merchant`], [`Owner`], [`Transaction`]: entity records
//! - [`LoyaltyError`]: rejections (code 503) and ledger failures (code 500)
//!
//! ## Example
//!
//! ```
//! use loyalty_ledger_rs::{LoyaltyEngine, MemoryLedger, ProgramConfig, Response};
//!
//! let ledger = MemoryLedger::new();
//! let engine = LoyaltyEngine::new(ProgramConfig::default());
//!
//! // Register a merchant, then a customer, and onboard one with the other
//! engine
//!     .invoke(&ledger, "createMerchant", &[
//!         "M1", "shopkeeper", "Corner Shop", "Retail", "#0a0",
//!         "1.00", "2.00", "0.00", "USD", "2017-01-01",
//!     ])
//!     .unwrap();
//! engine
//!     .invoke(&ledger, "createCustomer", &[
//!         "C1", "alice", "Alice", "0.00", "", "", "", "", "", "", "", "", "",
//!     ])
//!     .unwrap();
//! engine
//!     .invoke(&ledger, "associateCustomer", &[
//!         "C1", "M1", "T1", "2017-01-02", "CustomerOnBoarding",
//!     ])
//!     .unwrap();
//!
//! // Read it back
//! let Response::Customer(customer) = engine.query(&ledger, "getCustomerByID", &["C1"]).unwrap()
//! else {
//!     unreachable!()
//! };
//! assert_eq!(customer.wallet_worth.to_string(), "100.00");
//! assert_eq!(customer.associations()[0].points_count.to_string(), "50.00");
//! ```
//!
//! ## Concurrency
//!
//! Each invocation runs to completion against its own staged view of the
//! ledger. [`MemoryLedger`] rejects a commit whose read set went stale with
//! [`StoreError::Conflict`]; the engine never retries on its own.

pub mod association;
pub mod balance;
mod base;
pub mod config;
pub mod customer;
mod engine;
pub mod error;
pub mod index;
pub mod merchant;
pub mod money;
mod outcome;
pub mod owner;
pub mod query;
pub mod record;
pub mod recorder;
pub mod request;
pub mod store;
pub mod transaction;

pub use association::Association;
pub use base::{CustomerId, MerchantId, OwnerId, TransactionId};
pub use config::{ConfigError, EventNames, IndexKeys, ProgramConfig};
pub use customer::Customer;
pub use engine::{LoyaltyEngine, Response};
pub use error::{LoyaltyError, StoreError};
pub use merchant::{Merchant, MerchantProfile};
pub use outcome::{OK_CODE, Outcome};
pub use owner::Owner;
pub use request::{Command, CustomerUpdate, Onboarding, Query, Request};
pub use store::{EntityReader, EntityStore, Event, Invocation, Ledger, MemoryLedger};
pub use transaction::{Leg, Transaction, TransactionKind};
