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

//! Query Engine.
//!
//! Read-only traversals over the indices. Every function takes an
//! [`EntityReader`], so a query can never stage a write. Aggregates come back
//! in index order.

use crate::base::{CustomerId, MerchantId, OwnerId};
use crate::config::ProgramConfig;
use crate::customer::Customer;
use crate::error::LoyaltyError;
use crate::index;
use crate::merchant::Merchant;
use crate::owner::Owner;
use crate::record::{read, scan};
use crate::store::EntityReader;
use crate::transaction::{Transaction, TransactionKind};

pub fn customer<S>(store: &S, customer_id: &CustomerId) -> Result<Customer, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    read(store, customer_id.as_str())?
        .ok_or_else(|| LoyaltyError::CustomerNotFound(customer_id.clone()))
}

pub fn merchant<S>(store: &S, merchant_id: &MerchantId) -> Result<Merchant, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    read(store, merchant_id.as_str())?
        .ok_or_else(|| LoyaltyError::MerchantNotFound(merchant_id.clone()))
}

pub fn owner<S>(store: &S, owner_id: &OwnerId) -> Result<Owner, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    read(store, owner_id.as_str())?.ok_or_else(|| LoyaltyError::OwnerNotFound(owner_id.clone()))
}

/// Transactions a customer took part in: their onboardings, plus every
/// movement sent from their login name.
pub fn activity_history<S>(
    store: &S,
    config: &ProgramConfig,
    customer_id: &CustomerId,
) -> Result<Vec<Transaction>, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    let customer = customer(store, customer_id)?;
    let transactions: Vec<Transaction> = scan(store, &config.indices.transaction)?;
    Ok(transactions
        .into_iter()
        .filter(|tx| {
            (tx.kind == TransactionKind::CustomerOnBoarding && &tx.customer_id == customer_id)
                || tx.from == customer.user_name
        })
        .collect())
}

/// Transactions a merchant took part in, matched by merchant name: the
/// onboardings it granted, plus every movement sent to it.
pub fn activity_history_for_merchant<S>(
    store: &S,
    config: &ProgramConfig,
    merchant_name: &str,
) -> Result<Vec<Transaction>, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    let transactions: Vec<Transaction> = scan(store, &config.indices.transaction)?;
    Ok(transactions
        .into_iter()
        .filter(|tx| {
            (tx.kind == TransactionKind::CustomerOnBoarding && tx.from == merchant_name)
                || tx.to == merchant_name
        })
        .collect())
}

pub fn all_customers<S>(store: &S, config: &ProgramConfig) -> Result<Vec<Customer>, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    scan(store, &config.indices.customer)
}

pub fn customers_by_merchant<S>(
    store: &S,
    config: &ProgramConfig,
    merchant_id: &MerchantId,
) -> Result<Vec<Customer>, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    let mut customers = all_customers(store, config)?;
    customers.retain(|customer| customer.is_member(merchant_id));
    Ok(customers)
}

pub fn all_merchants<S>(store: &S, config: &ProgramConfig) -> Result<Vec<Merchant>, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    scan(store, &config.indices.merchant)
}

pub fn merchants_by_name<S>(
    store: &S,
    config: &ProgramConfig,
    name: &str,
) -> Result<Vec<Merchant>, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    let mut merchants = all_merchants(store, config)?;
    merchants.retain(|merchant| merchant.name == name);
    Ok(merchants)
}

pub fn merchants_by_industry<S>(
    store: &S,
    config: &ProgramConfig,
    industry: &str,
) -> Result<Vec<Merchant>, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    let mut merchants = all_merchants(store, config)?;
    merchants.retain(|merchant| merchant.industry == industry);
    Ok(merchants)
}

/// Number of customers associated with `merchant_id`. An unknown merchant
/// simply has none.
pub fn merchant_user_count<S>(
    store: &S,
    config: &ProgramConfig,
    merchant_id: &MerchantId,
) -> Result<usize, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    Ok(customers_by_merchant(store, config, merchant_id)?.len())
}

/// Program-wide `(merchants, customers)` counts, taken from the index
/// lengths.
pub fn owner_counts<S>(store: &S, config: &ProgramConfig) -> Result<(usize, usize), LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    let merchants = index::load(store, &config.indices.merchant)?.len();
    let customers = index::load(store, &config.indices.customer)?.len();
    Ok((merchants, customers))
}
