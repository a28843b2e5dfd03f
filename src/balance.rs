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

//! Balance & aggregation calculator.
//!
//! A merchant's live account balance is reconstructed from three sources:
//! the points worth its customers hold with it, its purchase settlements,
//! and what remains of its onboarding pool. The pool portion already spent
//! on onboarding grants is subtracted once, since those grants are counted
//! through the customers' points worth.

use crate::base::MerchantId;
use crate::config::ProgramConfig;
use crate::customer::Customer;
use crate::error::LoyaltyError;
use crate::merchant::Merchant;
use crate::money::{checked_add, checked_sub, checked_sum, settle};
use crate::query;
use crate::record::{self, scan};
use crate::store::{EntityReader, EntityStore};
use rust_decimal::Decimal;
use tracing::debug;

const BALANCE_FIELD: &str = "merchantAccountBalance";

/// Live account balance of `merchant_id`.
///
/// `Σ points worth at the merchant + initial + purchase − (configured
/// initial − initial)`, settled to two decimals.
///
/// # Errors
///
/// Returns [`LoyaltyError::MerchantNotFound`] for an unknown merchant and
/// [`LoyaltyError::IndexCorrupted`] if the customer index is inconsistent.
/// Returns [`LoyaltyError::AmountOverflow`] if the stored amounts do not sum
/// within range.
pub fn account_balance<S>(
    store: &S,
    config: &ProgramConfig,
    merchant_id: &MerchantId,
) -> Result<Decimal, LoyaltyError>
where
    S: EntityReader + ?Sized,
{
    let merchant = query::merchant(store, merchant_id)?;
    let customers: Vec<Customer> = scan(store, &config.indices.customer)?;
    let held = checked_sum(
        "merchantsPointsWorth",
        customers
            .iter()
            .filter_map(|customer| customer.points_worth_at(merchant_id)),
    )?;
    let spent_on_onboarding = checked_sub(
        "merchantInitialBalance",
        config.merchant_initial_balance,
        merchant.initial_balance,
    )?;
    let balance = checked_add(BALANCE_FIELD, held, merchant.initial_balance)
        .and_then(|sum| checked_add(BALANCE_FIELD, sum, merchant.purchase_balance))
        .and_then(|sum| checked_sub(BALANCE_FIELD, sum, spent_on_onboarding))?;
    debug!(merchant_id = %merchant_id, %held, %balance, "account balance");
    Ok(settle(balance))
}

/// Posts `delta` to the merchant's purchase balance and stamps `timestamp`.
///
/// # Errors
///
/// Returns [`LoyaltyError::MerchantNotFound`] for an unknown merchant and
/// [`LoyaltyError::AmountOverflow`] if the new balance is out of range.
pub fn update_purchase_balance<S>(
    store: &mut S,
    merchant_id: &MerchantId,
    delta: Decimal,
    timestamp: &str,
) -> Result<Merchant, LoyaltyError>
where
    S: EntityStore + ?Sized,
{
    let mut merchant = query::merchant(&*store, merchant_id)?;
    merchant.post_purchase(delta, timestamp)?;
    record::write(store, &merchant)?;
    debug!(merchant_id = %merchant_id, %delta, purchase_balance = %merchant.purchase_balance, "purchase posted");
    Ok(merchant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::Association;
    use crate::base::CustomerId;
    use crate::index;
    use crate::merchant::tests::profile;
    use crate::store::MemoryLedger;
    use rust_decimal_macros::dec;

    fn seed(store: &mut dyn EntityStore, config: &ProgramConfig, merchant: &Merchant, customers: &[Customer]) {
        record::write(store, merchant).unwrap();
        index::append(store, &config.indices.merchant, merchant.merchant_id.as_str()).unwrap();
        for customer in customers {
            record::write(store, customer).unwrap();
            index::append(store, &config.indices.customer, customer.customer_id.as_str()).unwrap();
        }
    }

    fn onboarded(id: &str, merchant: &Merchant, config: &ProgramConfig) -> Customer {
        let mut customer = Customer::new(CustomerId::new(id), id, id, dec!(0));
        customer.associate(Association::onboard(merchant, config.starting_balance).unwrap());
        customer
    }

    #[test]
    fn balance_after_one_onboarding() {
        let config = ProgramConfig::default();
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        let mut merchant = profile("M1", dec!(2.00)).into_merchant(config.merchant_initial_balance);
        merchant.fund_onboarding(config.starting_balance).unwrap();
        let customer = onboarded("C1", &merchant, &config);
        seed(&mut invocation, &config, &merchant, &[customer]);

        let balance = account_balance(&invocation, &config, &MerchantId::new("M1")).unwrap();
        assert_eq!(balance.to_string(), "99900.00");
    }

    #[test]
    fn balance_overflow_is_rejected() {
        let config = ProgramConfig::default();
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        let mut merchant = profile("M1", dec!(2.00)).into_merchant(config.merchant_initial_balance);
        merchant.purchase_balance = Decimal::MAX;
        seed(&mut invocation, &config, &merchant, &[]);

        let err = account_balance(&invocation, &config, &MerchantId::new("M1")).unwrap_err();
        assert_eq!(
            err,
            LoyaltyError::AmountOverflow {
                field: "merchantAccountBalance"
            }
        );
    }

    #[test]
    fn held_points_overflow_is_rejected() {
        let config = ProgramConfig::default();
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        let merchant = profile("M1", dec!(2.00)).into_merchant(config.merchant_initial_balance);
        let mut rich = Vec::new();
        for id in ["C1", "C2"] {
            let mut customer = onboarded(id, &merchant, &config);
            customer.reprice(dec!(0), &[dec!(1)], &[Decimal::MAX]).unwrap();
            rich.push(customer);
        }
        seed(&mut invocation, &config, &merchant, &rich);

        let err = account_balance(&invocation, &config, &MerchantId::new("M1")).unwrap_err();
        assert_eq!(
            err,
            LoyaltyError::AmountOverflow {
                field: "merchantsPointsWorth"
            }
        );
    }

    #[test]
    fn purchase_overflow_stages_nothing() {
        let config = ProgramConfig::default();
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        let mut merchant = profile("M1", dec!(2.00)).into_merchant(config.merchant_initial_balance);
        merchant.purchase_balance = Decimal::MAX;
        seed(&mut invocation, &config, &merchant, &[]);

        let m1 = MerchantId::new("M1");
        let err = update_purchase_balance(&mut invocation, &m1, dec!(1), "t").unwrap_err();
        assert!(matches!(err, LoyaltyError::AmountOverflow { .. }));
        assert_eq!(query::merchant(&invocation, &m1).unwrap(), merchant);
    }

    #[test]
    fn only_members_contribute() {
        let config = ProgramConfig::default();
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        let merchant = profile("M1", dec!(2.00)).into_merchant(config.merchant_initial_balance);
        let other = profile("M10", dec!(2.00)).into_merchant(config.merchant_initial_balance);
        let outsider = onboarded("C9", &other, &config);
        seed(&mut invocation, &config, &merchant, &[outsider]);

        let balance = account_balance(&invocation, &config, &MerchantId::new("M1")).unwrap();
        assert_eq!(balance, dec!(100000.00));
    }

    #[test]
    fn purchase_moves_balance_by_delta() {
        let config = ProgramConfig::default();
        let ledger = MemoryLedger::new();
        let mut invocation = ledger.begin();
        let merchant = profile("M1", dec!(2.00)).into_merchant(config.merchant_initial_balance);
        seed(&mut invocation, &config, &merchant, &[]);
        let merchant_id = MerchantId::new("M1");

        let before = account_balance(&invocation, &config, &merchant_id).unwrap();
        update_purchase_balance(&mut invocation, &merchant_id, dec!(10.00), "t1").unwrap();
        let updated = update_purchase_balance(&mut invocation, &merchant_id, dec!(15.00), "t2").unwrap();
        let after = account_balance(&invocation, &config, &merchant_id).unwrap();

        assert_eq!(updated.purchase_balance.to_string(), "25.00");
        assert_eq!(after - before, dec!(25.00));
    }

    #[test]
    fn unknown_merchant() {
        let config = ProgramConfig::default();
        let ledger = MemoryLedger::new();
        let invocation = ledger.begin();
        assert_eq!(
            account_balance(&invocation, &config, &MerchantId::new("M1")),
            Err(LoyaltyError::MerchantNotFound(MerchantId::new("M1")))
        );
    }
}
