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

//! Merchant records.

use crate::base::MerchantId;
use crate::error::LoyaltyError;
use crate::money::{checked_add, checked_sub, settle};
use crate::record::Record;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Caller-owned merchant fields, as supplied to create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerchantProfile {
    pub merchant_id: MerchantId,
    pub user_name: String,
    pub name: String,
    pub industry: String,
    pub industry_color: String,
    pub points_per_dollar_spent: Decimal,
    pub exchange_rate: Decimal,
    pub purchase_balance: Decimal,
    pub currency: String,
    pub updated_at: String,
}

impl MerchantProfile {
    /// A new merchant record with a freshly funded onboarding pool.
    pub fn into_merchant(self, initial_balance: Decimal) -> Merchant {
        Merchant {
            merchant_id: self.merchant_id,
            user_name: self.user_name,
            name: self.name,
            industry: self.industry,
            industry_color: self.industry_color,
            points_per_dollar_spent: self.points_per_dollar_spent,
            exchange_rate: self.exchange_rate,
            purchase_balance: self.purchase_balance,
            currency: self.currency,
            updated_at: self.updated_at,
            initial_balance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    #[serde(rename = "merchantId")]
    pub merchant_id: MerchantId,
    #[serde(rename = "merchantUserName")]
    pub user_name: String,
    #[serde(rename = "merchantName")]
    pub name: String,
    #[serde(rename = "merchantIndustry")]
    pub industry: String,
    #[serde(rename = "industryColor")]
    pub industry_color: String,
    #[serde(rename = "pointsPerDollarSpent")]
    pub points_per_dollar_spent: Decimal,
    #[serde(rename = "exchangeRate")]
    pub exchange_rate: Decimal,
    /// Running total of purchase settlements received.
    #[serde(rename = "purchaseBalance")]
    pub purchase_balance: Decimal,
    #[serde(rename = "merchantCurrency")]
    pub currency: String,
    #[serde(rename = "merchantCU_date")]
    pub updated_at: String,
    /// What is left of the pre-funded onboarding pool.
    #[serde(rename = "merchantInitialBalance")]
    pub initial_balance: Decimal,
}

impl Merchant {
    /// Replaces every caller-owned field. The onboarding pool is kept.
    pub fn update_profile(&mut self, profile: MerchantProfile) {
        let initial_balance = self.initial_balance;
        *self = profile.into_merchant(initial_balance);
    }

    /// Posts a purchase settlement. `delta` may be negative.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::AmountOverflow`] if the new balance is out of
    /// range; the merchant is left unchanged.
    pub fn post_purchase(&mut self, delta: Decimal, timestamp: &str) -> Result<(), LoyaltyError> {
        let balance = checked_add("purchaseBalance", self.purchase_balance, delta)?;
        self.purchase_balance = settle(balance);
        self.updated_at = timestamp.to_owned();
        Ok(())
    }

    pub fn set_points_per_dollar_spent(&mut self, value: Decimal, timestamp: &str) {
        self.points_per_dollar_spent = value;
        self.updated_at = timestamp.to_owned();
    }

    pub fn set_exchange_rate(&mut self, value: Decimal, timestamp: &str) {
        self.exchange_rate = value;
        self.updated_at = timestamp.to_owned();
    }

    /// Points a new customer receives for `starting_balance` of currency.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::InvalidExchangeRate`] unless the exchange rate
    /// is positive.
    pub fn starting_grant(&self, starting_balance: Decimal) -> Result<Decimal, LoyaltyError> {
        if self.exchange_rate <= Decimal::ZERO {
            return Err(LoyaltyError::InvalidExchangeRate(self.merchant_id.clone()));
        }
        starting_balance
            .checked_div(self.exchange_rate)
            .map(settle)
            .ok_or_else(|| LoyaltyError::InvalidExchangeRate(self.merchant_id.clone()))
    }

    /// Spends one starting balance from the onboarding pool.
    pub fn fund_onboarding(&mut self, starting_balance: Decimal) -> Result<(), LoyaltyError> {
        let remaining = checked_sub("merchantInitialBalance", self.initial_balance, starting_balance)?;
        self.initial_balance = settle(remaining);
        Ok(())
    }
}

impl Record for Merchant {
    const KIND: &'static str = "Merchant";
    const KEY_FIELD: &'static str = "merchantId";

    fn key(&self) -> &str {
        self.merchant_id.as_str()
    }
}
