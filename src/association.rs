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

//! Customer-merchant associations.
//!
//! An association is one customer's membership in one merchant's program. A
//! customer owns an ordered list of them; on the wire each field becomes one
//! of six comma-joined lists, which is why the text fields here may never
//! contain a comma.

use crate::base::MerchantId;
use crate::error::LoyaltyError;
use crate::merchant::Merchant;
use crate::money::settle;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub merchant_id: MerchantId,
    pub merchant_name: String,
    pub color: String,
    pub currency: String,
    pub points_count: Decimal,
    /// Currency-equivalent value of `points_count` at this merchant.
    pub points_worth: Decimal,
}

impl Association {
    /// Builds an association from caller-supplied fields.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::InvalidField`] if an id or text field is empty
    /// or contains the list separator.
    pub fn new(
        merchant_id: MerchantId,
        merchant_name: String,
        color: String,
        currency: String,
        points_count: Decimal,
        points_worth: Decimal,
    ) -> Result<Self, LoyaltyError> {
        if merchant_id.as_str().is_empty() {
            return Err(LoyaltyError::InvalidField {
                field: "merchantId",
                reason: "must not be empty",
            });
        }
        for (field, value) in [
            ("merchantId", merchant_id.as_str()),
            ("merchantName", merchant_name.as_str()),
            ("merchantColor", color.as_str()),
            ("merchantCurrency", currency.as_str()),
        ] {
            if value.contains(',') {
                return Err(LoyaltyError::InvalidField {
                    field,
                    reason: "must not contain ','",
                });
            }
        }
        Ok(Self {
            merchant_id,
            merchant_name,
            color,
            currency,
            points_count,
            points_worth,
        })
    }

    /// The association a customer gets when onboarding with `merchant`: the
    /// starting balance converted into points at the merchant's rate.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::InvalidExchangeRate`] for a non-positive rate,
    /// or [`LoyaltyError::InvalidField`] if the merchant's text fields cannot
    /// be listed.
    pub fn onboard(merchant: &Merchant, starting_balance: Decimal) -> Result<Self, LoyaltyError> {
        let points_count = merchant.starting_grant(starting_balance)?;
        Self::new(
            merchant.merchant_id.clone(),
            merchant.name.clone(),
            merchant.industry_color.clone(),
            merchant.currency.clone(),
            points_count,
            settle(starting_balance),
        )
    }
}
