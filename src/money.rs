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

//! Fixed-precision money and point values.
//!
//! Values arriving from callers are parsed as-is and keep their textual scale,
//! so a record fetched back renders exactly what was supplied. Values the
//! engine derives itself are settled to [`MONEY_SCALE`] decimal places with
//! midpoint-away-from-zero rounding and always carry exactly that scale.

use crate::error::LoyaltyError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places carried by every derived amount.
pub const MONEY_SCALE: u32 = 2;

/// Parses a caller-supplied decimal string.
///
/// # Errors
///
/// Returns [`LoyaltyError::InvalidAmount`] if `value` is not a plain decimal.
pub fn parse_amount(field: &'static str, value: &str) -> Result<Decimal, LoyaltyError> {
    Decimal::from_str(value.trim()).map_err(|_| LoyaltyError::InvalidAmount {
        field,
        value: value.to_owned(),
    })
}

/// Parses a comma-joined list of decimal strings. An empty string is an empty
/// list.
///
/// # Errors
///
/// Returns [`LoyaltyError::InvalidAmount`] naming the first bad element.
pub fn parse_amount_list(field: &'static str, value: &str) -> Result<Vec<Decimal>, LoyaltyError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|element| parse_amount(field, element))
        .collect()
}

/// Adds two amounts.
///
/// # Errors
///
/// Returns [`LoyaltyError::AmountOverflow`] naming `field` if the sum is out
/// of range.
pub fn checked_add(field: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, LoyaltyError> {
    a.checked_add(b).ok_or(LoyaltyError::AmountOverflow { field })
}

/// Subtracts `b` from `a`; errors as [`checked_add`].
pub fn checked_sub(field: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, LoyaltyError> {
    a.checked_sub(b).ok_or(LoyaltyError::AmountOverflow { field })
}

/// Sums `values`; errors as [`checked_add`].
pub fn checked_sum<I>(field: &'static str, values: I) -> Result<Decimal, LoyaltyError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| checked_add(field, total, value))
}

/// Rounds a derived amount to [`MONEY_SCALE`] places and pins its scale.
pub fn settle(value: Decimal) -> Decimal {
    let mut settled = value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    settled.rescale(MONEY_SCALE);
    settled
}

/// The settled zero amount, rendered "0.00".
pub fn zero() -> Decimal {
    Decimal::new(0, MONEY_SCALE)
}
