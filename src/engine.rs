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

//! Loyalty program engine.
//!
//! The [`LoyaltyEngine`] is the single dispatch point for every invocation.
//! It executes one [`Request`] against an invocation-scoped [`EntityStore`]
//! and signals the outcome on the ledger's event channel.
//!
//! # Outcomes
//!
//! - **Success**: all writes plus one success envelope on the configured
//!   success event (`evtsender`) commit together.
//! - **Rejection** (arity, validation, not found, duplicate): every write of
//!   the invocation is discarded, the error envelope is published on the
//!   configured error event (`errEvent`) in a commit of its own, and the
//!   caller receives the [`LoyaltyError`].
//! - **Failure** (ledger errors, corrupted indices): nothing is committed and
//!   no event is published.
//!
//! # Atomicity
//!
//! Each operation's reads and writes happen inside one [`Ledger::transact`]
//! call, so the customer, merchant, transaction and index writes of an
//! operation are all or nothing, and the ledger sees the full read set when
//! it checks for conflicting commits.

use crate::association::Association;
use crate::balance;
use crate::base::{CustomerId, MerchantId};
use crate::config::ProgramConfig;
use crate::customer::Customer;
use crate::error::{LoyaltyError, StoreError};
use crate::index::{self, IndexKind};
use crate::merchant::Merchant;
use crate::money::{checked_add, settle, zero};
use crate::outcome::{OK_CODE, Outcome};
use crate::owner::Owner;
use crate::query;
use crate::record::{self, Record};
use crate::recorder;
use crate::request::{Command, CustomerUpdate, Query, Request};
use crate::store::{EntityReader, EntityStore, Ledger};
use crate::transaction::{Leg, Transaction, TransactionKind};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A command committed; its outcome went out as an event.
    Done,
    Customer(Customer),
    Merchant(Merchant),
    Owner(Owner),
    Transactions(Vec<Transaction>),
    Customers(Vec<Customer>),
    Merchants(Vec<Merchant>),
    AccountBalance(Decimal),
    UserCount(usize),
    OwnerCounts { merchants: usize, users: usize },
}

impl Response {
    /// Query payload as JSON. `None` for commands, which answer through the
    /// event channel only.
    ///
    /// Aggregates are objects keyed by entity identifier in index order;
    /// counts and balances are single string-valued fields.
    pub fn to_json(&self) -> Result<Option<Value>, serde_json::Error> {
        let value = match self {
            Self::Done => return Ok(None),
            Self::Customer(customer) => serde_json::to_value(customer)?,
            Self::Merchant(merchant) => serde_json::to_value(merchant)?,
            Self::Owner(owner) => serde_json::to_value(owner)?,
            Self::Transactions(transactions) => keyed(transactions)?,
            Self::Customers(customers) => keyed(customers)?,
            Self::Merchants(merchants) => keyed(merchants)?,
            Self::AccountBalance(balance) => {
                json!({ "merchantAccountBalance": balance.to_string() })
            }
            Self::UserCount(count) => json!({ "merchantUsersCount": count.to_string() }),
            Self::OwnerCounts { merchants, users } => json!({
                "merchantCount": merchants.to_string(),
                "userCount": users.to_string(),
            }),
        };
        Ok(Some(value))
    }
}

fn keyed<R: Record>(records: &[R]) -> Result<Value, serde_json::Error> {
    let mut map = Map::new();
    for record in records {
        map.insert(record.key().to_owned(), serde_json::to_value(record)?);
    }
    Ok(Value::Object(map))
}

/// Dispatches invocations for one loyalty program.
#[derive(Debug, Clone, Default)]
pub struct LoyaltyEngine {
    config: ProgramConfig,
}

impl LoyaltyEngine {
    pub fn new(config: ProgramConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    /// Parses and submits a named invocation from the command surface, which
    /// also answers queries.
    ///
    /// # Errors
    ///
    /// See [`LoyaltyEngine::submit`]. Parse errors are rejections too and are
    /// signalled the same way.
    pub fn invoke<L, A>(&self, ledger: &L, name: &str, args: &[A]) -> Result<Response, LoyaltyError>
    where
        L: Ledger,
        A: AsRef<str>,
    {
        match Request::parse(name, args) {
            Ok(request) => self.submit(ledger, request),
            Err(err) => Err(self.reject(ledger, name, err)),
        }
    }

    /// Parses and submits a named invocation from the read-only query surface.
    ///
    /// # Errors
    ///
    /// As [`LoyaltyEngine::invoke`]; command names are unknown here.
    pub fn query<L, A>(&self, ledger: &L, name: &str, args: &[A]) -> Result<Response, LoyaltyError>
    where
        L: Ledger,
        A: AsRef<str>,
    {
        match Request::parse_query(name, args) {
            Ok(request) => self.submit(ledger, request),
            Err(err) => Err(self.reject(ledger, name, err)),
        }
    }

    /// Runs `request` as one atomic invocation.
    ///
    /// # Errors
    ///
    /// Returns the rejection after publishing its error envelope, or the
    /// ledger failure that aborted the invocation.
    pub fn submit<L: Ledger>(&self, ledger: &L, request: Request) -> Result<Response, LoyaltyError> {
        let name = request.name();
        self.run(ledger, name, |store| self.handle(store, request))
    }

    /// Posts a purchase settlement to a merchant in its own invocation.
    ///
    /// # Errors
    ///
    /// As [`LoyaltyEngine::submit`]; an unknown merchant is a rejection.
    pub fn update_merchants_purchase_bal<L: Ledger>(
        &self,
        ledger: &L,
        merchant_id: &MerchantId,
        delta: Decimal,
        timestamp: &str,
    ) -> Result<Merchant, LoyaltyError> {
        self.run(ledger, "updateMerchantsPurchaseBal", |store| {
            let merchant = balance::update_purchase_balance(store, merchant_id, delta, timestamp)?;
            self.notify(
                store,
                Outcome::success(
                    "merchantID",
                    merchant_id.as_str(),
                    "Merchant purchase balance details updated successfully",
                ),
            )?;
            Ok(merchant)
        })
    }

    /// Executes `request` against an invocation-scoped store without
    /// committing. Commands also queue their success envelope.
    ///
    /// # Errors
    ///
    /// Any rejection or ledger failure. The caller must discard the store's
    /// writes when this fails.
    pub fn handle<S>(&self, store: &mut S, request: Request) -> Result<Response, LoyaltyError>
    where
        S: EntityStore + ?Sized,
    {
        debug!(operation = request.name(), "handling invocation");
        match request {
            Request::Init { label } => {
                for kind in IndexKind::ALL {
                    index::save(store, kind.key(&self.config.indices), &[])?;
                }
                info!(label = %label, "ledger initialised");
                self.notify(
                    store,
                    Outcome::new("Loyalty program ledger initialised successfully.", OK_CODE),
                )?;
                Ok(Response::Done)
            }
            Request::Command(command) => {
                let outcome = self.execute(store, command)?;
                self.notify(store, outcome)?;
                Ok(Response::Done)
            }
            Request::Query(lookup) => self.answer(&*store, lookup),
        }
    }

    fn run<L, T, F>(&self, ledger: &L, operation: &'static str, f: F) -> Result<T, LoyaltyError>
    where
        L: Ledger,
        F: FnOnce(&mut dyn EntityStore) -> Result<T, LoyaltyError>,
    {
        match ledger.transact(f) {
            Ok(value) => {
                info!(operation, "invocation committed");
                Ok(value)
            }
            Err(err) if err.is_rejection() => Err(self.reject(ledger, operation, err)),
            Err(err) => {
                error!(operation, error = %err, "invocation failed");
                Err(err)
            }
        }
    }

    /// Publishes the error envelope for a rejection. Returns the error to hand
    /// back to the caller: the rejection itself, or the ledger failure that
    /// prevented publishing it.
    fn reject<L: Ledger>(&self, ledger: &L, operation: &str, err: LoyaltyError) -> LoyaltyError {
        warn!(operation, code = err.code(), reason = %err, "invocation rejected");
        let event = &self.config.events.error;
        let published: Result<(), LoyaltyError> = ledger.transact(|store| {
            let payload = envelope(event, &err.outcome())?;
            Ok(store.emit(event, payload)?)
        });
        match published {
            Ok(()) => err,
            Err(failure) => {
                error!(operation, error = %failure, "failed to publish rejection");
                failure
            }
        }
    }

    fn notify<S>(&self, store: &mut S, outcome: Outcome) -> Result<(), LoyaltyError>
    where
        S: EntityStore + ?Sized,
    {
        let event = &self.config.events.success;
        store.emit(event, envelope(event, &outcome)?)?;
        Ok(())
    }

    fn execute<S>(&self, store: &mut S, command: Command) -> Result<Outcome, LoyaltyError>
    where
        S: EntityStore + ?Sized,
    {
        let keys = &self.config.indices;
        match command {
            Command::CreateCustomer {
                mut customer,
                onboarding,
            } => {
                record::ensure_vacant(&*store, &customer)?;
                let id = customer.customer_id.clone();
                let onboarding_leg = match onboarding {
                    Some(onboarding) => {
                        let merchant_id = onboarding.association.merchant_id.clone();
                        let mut merchant = query::merchant(&*store, &merchant_id)?;
                        merchant.fund_onboarding(self.config.starting_balance)?;
                        record::write(store, &merchant)?;
                        customer.associate(onboarding.association);
                        Some(onboarding.leg)
                    }
                    None => None,
                };
                record::write(store, &customer)?;
                index::append(store, &keys.customer, id.as_str())?;
                if let Some(leg) = onboarding_leg {
                    let transaction = leg.attribute(TransactionKind::CustomerOnBoarding, id.clone());
                    recorder::record(store, keys, &transaction)?;
                }
                info!(customer_id = %id, "customer created");
                Ok(Outcome::success("customerID", id.as_str(), "Customer created successfully"))
            }
            Command::AssociateCustomer {
                customer_id,
                merchant_id,
                transaction_id,
                date_time,
            } => {
                let mut customer = query::customer(&*store, &customer_id)?;
                let mut merchant = query::merchant(&*store, &merchant_id)?;
                let starting = self.config.starting_balance;
                let association = Association::onboard(&merchant, starting)?;

                let wallet_worth = checked_add("walletWorth", customer.wallet_worth, starting)?;
                customer.wallet_worth = settle(wallet_worth);
                customer.associate(association);
                merchant.fund_onboarding(starting)?;
                record::write(store, &customer)?;
                record::write(store, &merchant)?;

                let leg = Leg {
                    transaction_id,
                    date_time,
                    from: merchant.name.clone(),
                    to: customer.user_name.clone(),
                    credit: settle(starting),
                    debit: zero(),
                };
                recorder::record(
                    store,
                    keys,
                    &leg.attribute(TransactionKind::CustomerOnBoarding, customer_id.clone()),
                )?;
                info!(customer_id = %customer_id, merchant_id = %merchant_id, "customer associated");
                Ok(Outcome::success(
                    "customerID",
                    customer_id.as_str(),
                    "Customer associated successfully",
                ))
            }
            Command::UpdateCustomerAccumulation { update, leg } => {
                let customer_id = self.apply_update(store, update)?;
                recorder::record(
                    store,
                    keys,
                    &leg.attribute(TransactionKind::Accumulation, customer_id.clone()),
                )?;
                Ok(updated(&customer_id))
            }
            Command::UpdateCustomerPurchase {
                update,
                debit_leg,
                credit_leg,
                merchant_id,
                purchase_delta,
                merchant_date,
            } => {
                let customer_id = self.apply_update(store, update)?;
                for leg in [debit_leg, credit_leg] {
                    let transaction = leg.attribute(TransactionKind::Purchase, customer_id.clone());
                    recorder::record(store, keys, &transaction)?;
                }
                balance::update_purchase_balance(store, &merchant_id, purchase_delta, &merchant_date)?;
                Ok(updated(&customer_id))
            }
            Command::UpdateCustomerTransfer {
                source,
                debit_leg,
                credit_leg,
                destination,
            } => {
                let source_id = self.apply_update(store, source)?;
                let destination_id = self.apply_update(store, destination)?;
                recorder::record(
                    store,
                    keys,
                    &debit_leg.attribute(TransactionKind::Transfer, source_id.clone()),
                )?;
                recorder::record(
                    store,
                    keys,
                    &credit_leg.attribute(TransactionKind::Transfer, destination_id),
                )?;
                Ok(updated(&source_id))
            }
            Command::DeleteCustomer { customer_id } => {
                query::customer(&*store, &customer_id)?;
                store.delete(customer_id.as_str())?;
                index::remove(store, &keys.customer, customer_id.as_str())?;
                info!(customer_id = %customer_id, "customer deleted");
                Ok(Outcome::success(
                    "customerID",
                    customer_id.as_str(),
                    "Customer deleted successfully",
                ))
            }
            Command::CreateMerchant(profile) => {
                let merchant = profile.into_merchant(self.config.merchant_initial_balance);
                record::ensure_vacant(&*store, &merchant)?;
                record::write(store, &merchant)?;
                index::append(store, &keys.merchant, merchant.key())?;
                info!(merchant_id = %merchant.merchant_id, "merchant created");
                Ok(Outcome::success(
                    "merchantID",
                    merchant.key(),
                    "Merchant created successfully",
                ))
            }
            Command::UpdateMerchant(profile) => {
                let mut merchant = query::merchant(&*store, &profile.merchant_id)?;
                merchant.update_profile(profile);
                record::write(store, &merchant)?;
                Ok(Outcome::success(
                    "merchantID",
                    merchant.key(),
                    "Merchant details updated successfully",
                ))
            }
            Command::UpdateMerchantsPpds {
                merchant_id,
                points_per_dollar_spent,
                date,
            } => {
                let mut merchant = query::merchant(&*store, &merchant_id)?;
                merchant.set_points_per_dollar_spent(points_per_dollar_spent, &date);
                record::write(store, &merchant)?;
                Ok(Outcome::success(
                    "merchantID",
                    merchant_id.as_str(),
                    "Merchant points per dollar spent updated successfully",
                ))
            }
            Command::UpdateMerchantsExchangeRate {
                merchant_id,
                exchange_rate,
                date,
            } => {
                let mut merchant = query::merchant(&*store, &merchant_id)?;
                merchant.set_exchange_rate(exchange_rate, &date);
                record::write(store, &merchant)?;
                Ok(Outcome::success(
                    "merchantID",
                    merchant_id.as_str(),
                    "Merchant exchange rate updated successfully",
                ))
            }
            Command::DeleteMerchant { merchant_id } => {
                query::merchant(&*store, &merchant_id)?;
                store.delete(merchant_id.as_str())?;
                index::remove(store, &keys.merchant, merchant_id.as_str())?;
                info!(merchant_id = %merchant_id, "merchant deleted");
                Ok(Outcome::success(
                    "merchantID",
                    merchant_id.as_str(),
                    "Merchant deleted successfully",
                ))
            }
            Command::CreateOwner(owner) => {
                record::ensure_vacant(&*store, &owner)?;
                record::write(store, &owner)?;
                index::append(store, &keys.owner, owner.key())?;
                Ok(Outcome::success("ownerID", owner.key(), "Owner created successfully"))
            }
        }
    }

    /// Rewrites a customer with caller-computed wallet worth and points.
    fn apply_update<S>(&self, store: &mut S, update: CustomerUpdate) -> Result<CustomerId, LoyaltyError>
    where
        S: EntityStore + ?Sized,
    {
        let mut customer = query::customer(&*store, &update.customer_id)?;
        customer.reprice(update.wallet_worth, &update.points_count, &update.points_worth)?;
        record::write(store, &customer)?;
        debug!(customer_id = %update.customer_id, "customer repriced");
        Ok(update.customer_id)
    }

    fn answer<S>(&self, store: &S, lookup: Query) -> Result<Response, LoyaltyError>
    where
        S: EntityReader + ?Sized,
    {
        let config = &self.config;
        Ok(match lookup {
            Query::CustomerById(id) | Query::CustomerDetailsById(id) => {
                Response::Customer(query::customer(store, &id)?)
            }
            Query::ActivityHistory(id) => {
                Response::Transactions(query::activity_history(store, config, &id)?)
            }
            Query::ActivityHistoryForMerchant(name) => {
                Response::Transactions(query::activity_history_for_merchant(store, config, &name)?)
            }
            Query::AllCustomers => Response::Customers(query::all_customers(store, config)?),
            Query::CustomersByMerchantId(id) => {
                Response::Customers(query::customers_by_merchant(store, config, &id)?)
            }
            Query::MerchantByName(name) => {
                Response::Merchants(query::merchants_by_name(store, config, &name)?)
            }
            Query::MerchantById(id) | Query::MerchantDetailsById(id) => {
                Response::Merchant(query::merchant(store, &id)?)
            }
            Query::MerchantsByIndustry(industry) => {
                Response::Merchants(query::merchants_by_industry(store, config, &industry)?)
            }
            Query::AllMerchants => Response::Merchants(query::all_merchants(store, config)?),
            Query::MerchantsAccountBalance(id) => {
                Response::AccountBalance(balance::account_balance(store, config, &id)?)
            }
            Query::MerchantsUserCount(id) => {
                Response::UserCount(query::merchant_user_count(store, config, &id)?)
            }
            Query::OwnersMerchantUserCount => {
                let (merchants, users) = query::owner_counts(store, config)?;
                Response::OwnerCounts { merchants, users }
            }
            Query::OwnerById(id) => Response::Owner(query::owner(store, &id)?),
        })
    }
}

fn envelope(event: &str, outcome: &Outcome) -> Result<Vec<u8>, StoreError> {
    outcome.to_bytes().map_err(|e| StoreError::Corrupted {
        key: event.to_owned(),
        reason: e.to_string(),
    })
}

fn updated(customer_id: &CustomerId) -> Outcome {
    Outcome::success(
        "customerID",
        customer_id.as_str(),
        "Customer details updated successfully",
    )
}
