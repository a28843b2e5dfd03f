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

//! Customer records.
//!
//! In memory a customer owns an ordered `Vec` of [`Association`]s. The stored
//! JSON keeps the six positional comma-joined lists (`merchantIDs`,
//! `merchantNames`, ...) so element `i` of each list describes association
//! `i`. Conversion happens only at the serde boundary, and decoding rejects a
//! record whose lists disagree in length.

use crate::association::Association;
use crate::base::{CustomerId, MerchantId};
use crate::error::LoyaltyError;
use crate::money::parse_amount;
use crate::record::Record;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CustomerRecord", into = "CustomerRecord")]
pub struct Customer {
    pub customer_id: CustomerId,
    pub user_name: String,
    pub customer_name: String,
    pub wallet_worth: Decimal,
    associations: Vec<Association>,
}

impl Customer {
    /// A customer with no merchant associations.
    pub fn new(
        customer_id: CustomerId,
        user_name: impl Into<String>,
        customer_name: impl Into<String>,
        wallet_worth: Decimal,
    ) -> Self {
        Self {
            customer_id,
            user_name: user_name.into(),
            customer_name: customer_name.into(),
            wallet_worth,
            associations: Vec::new(),
        }
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Position of the first association with `merchant_id`.
    pub fn position(&self, merchant_id: &MerchantId) -> Option<usize> {
        self.associations
            .iter()
            .position(|association| &association.merchant_id == merchant_id)
    }

    pub fn is_member(&self, merchant_id: &MerchantId) -> bool {
        self.position(merchant_id).is_some()
    }

    /// Points worth held at `merchant_id`, read at its first association.
    pub fn points_worth_at(&self, merchant_id: &MerchantId) -> Option<Decimal> {
        self.position(merchant_id)
            .map(|position| self.associations[position].points_worth)
    }

    /// Appends an association at the end of the list.
    pub fn associate(&mut self, association: Association) {
        self.associations.push(association);
    }

    /// Replaces the wallet worth and every association's points, position by
    /// position.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::PositionalMismatch`] unless both lists have
    /// exactly one value per association. The customer is unchanged then.
    pub fn reprice(
        &mut self,
        wallet_worth: Decimal,
        points_count: &[Decimal],
        points_worth: &[Decimal],
    ) -> Result<(), LoyaltyError> {
        let expected = self.associations.len();
        for actual in [points_count.len(), points_worth.len()] {
            if actual != expected {
                return Err(LoyaltyError::PositionalMismatch {
                    customer_id: self.customer_id.clone(),
                    expected,
                    actual,
                });
            }
        }
        for ((association, count), worth) in
            self.associations.iter_mut().zip(points_count).zip(points_worth)
        {
            association.points_count = *count;
            association.points_worth = *worth;
        }
        self.wallet_worth = wallet_worth;
        Ok(())
    }
}

impl Record for Customer {
    const KIND: &'static str = "Customer";
    const KEY_FIELD: &'static str = "customerId";

    fn key(&self) -> &str {
        self.customer_id.as_str()
    }
}

/// Stored shape of a customer.
#[derive(Serialize, Deserialize)]
struct CustomerRecord {
    #[serde(rename = "customerId")]
    customer_id: CustomerId,
    #[serde(rename = "userName")]
    user_name: String,
    #[serde(rename = "customerName")]
    customer_name: String,
    #[serde(rename = "walletWorth")]
    wallet_worth: Decimal,
    #[serde(rename = "merchantIDs", default)]
    merchant_ids: String,
    #[serde(rename = "merchantNames", default)]
    merchant_names: String,
    #[serde(rename = "merchantColors", default)]
    merchant_colors: String,
    #[serde(rename = "merchantCurrencies", default)]
    merchant_currencies: String,
    #[serde(rename = "merchantsPointsCount", default)]
    points_count: String,
    #[serde(rename = "merchantsPointsWorth", default)]
    points_worth: String,
}

fn split(list: &str) -> Vec<&str> {
    if list.is_empty() {
        Vec::new()
    } else {
        list.split(SEPARATOR).collect()
    }
}

fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(",")
}

impl TryFrom<CustomerRecord> for Customer {
    type Error = LoyaltyError;

    fn try_from(record: CustomerRecord) -> Result<Self, Self::Error> {
        let ids = split(&record.merchant_ids);
        let names = split(&record.merchant_names);
        let colors = split(&record.merchant_colors);
        let currencies = split(&record.merchant_currencies);
        let counts = split(&record.points_count);
        let worths = split(&record.points_worth);

        let expected = ids.len();
        for actual in [names.len(), colors.len(), currencies.len(), counts.len(), worths.len()] {
            if actual != expected {
                return Err(LoyaltyError::PositionalMismatch {
                    customer_id: record.customer_id,
                    expected,
                    actual,
                });
            }
        }

        let associations = (0..expected)
            .map(|i| {
                Association::new(
                    MerchantId::new(ids[i]),
                    names[i].to_owned(),
                    colors[i].to_owned(),
                    currencies[i].to_owned(),
                    parse_amount("merchantsPointsCount", counts[i])?,
                    parse_amount("merchantsPointsWorth", worths[i])?,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            customer_id: record.customer_id,
            user_name: record.user_name,
            customer_name: record.customer_name,
            wallet_worth: record.wallet_worth,
            associations,
        })
    }
}

impl From<Customer> for CustomerRecord {
    fn from(customer: Customer) -> Self {
        let list = &customer.associations;
        let counts: Vec<String> = list.iter().map(|a| a.points_count.to_string()).collect();
        let worths: Vec<String> = list.iter().map(|a| a.points_worth.to_string()).collect();
        Self {
            merchant_ids: join(list.iter().map(|a| a.merchant_id.as_str())),
            merchant_names: join(list.iter().map(|a| a.merchant_name.as_str())),
            merchant_colors: join(list.iter().map(|a| a.color.as_str())),
            merchant_currencies: join(list.iter().map(|a| a.currency.as_str())),
            points_count: join(counts.iter().map(String::as_str)),
            points_worth: join(worths.iter().map(String::as_str)),
            customer_id: customer.customer_id,
            user_name: customer.user_name,
            customer_name: customer.customer_name,
            wallet_worth: customer.wallet_worth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn association(id: &str, count: Decimal, worth: Decimal) -> Association {
        Association::new(
            MerchantId::new(id),
            format!("{id} Store"),
            "blue".into(),
            "USD".into(),
            count,
            worth,
        )
        .unwrap()
    }

    fn member_of_two() -> Customer {
        let mut customer = Customer::new(CustomerId::new("C1"), "alice", "Alice", dec!(200.00));
        customer.associate(association("M1", dec!(50.00), dec!(100.00)));
        customer.associate(association("M2", dec!(10.00), dec!(100.00)));
        customer
    }

    #[test]
    fn lists_are_joined_positionally() {
        let json = serde_json::to_value(member_of_two()).unwrap();
        assert_eq!(json["merchantIDs"], "M1,M2");
        assert_eq!(json["merchantNames"], "M1 Store,M2 Store");
        assert_eq!(json["merchantsPointsCount"], "50.00,10.00");
        assert_eq!(json["merchantsPointsWorth"], "100.00,100.00");
        assert_eq!(json["walletWorth"], "200.00");
    }

    #[test]
    fn no_associations_is_empty_lists() {
        let customer = Customer::new(CustomerId::new("C2"), "bob", "Bob", dec!(0));
        let json = serde_json::to_value(&customer).unwrap();
        assert_eq!(json["merchantIDs"], "");
        assert_eq!(json["merchantsPointsWorth"], "");
        let decoded: Customer = serde_json::from_value(json).unwrap();
        assert!(decoded.associations().is_empty());
    }

    #[test]
    fn decode_rejects_misaligned_lists() {
        let stored = json!({
            "customerId": "C1",
            "userName": "alice",
            "customerName": "Alice",
            "walletWorth": "1.00",
            "merchantIDs": "M1,M2",
            "merchantNames": "One,Two",
            "merchantColors": "red",
            "merchantCurrencies": "USD,USD",
            "merchantsPointsCount": "1,2",
            "merchantsPointsWorth": "1,2"
        });
        assert!(serde_json::from_value::<Customer>(stored).is_err());
    }

    #[test]
    fn first_occurrence_wins() {
        let mut customer = member_of_two();
        customer.associate(association("M1", dec!(5), dec!(7.77)));
        assert_eq!(customer.position(&MerchantId::new("M1")), Some(0));
        assert_eq!(customer.points_worth_at(&MerchantId::new("M1")), Some(dec!(100.00)));
        assert_eq!(customer.points_worth_at(&MerchantId::new("M9")), None);
    }

    #[test]
    fn membership_is_exact() {
        let customer = member_of_two();
        assert!(customer.is_member(&MerchantId::new("M2")));
        assert!(!customer.is_member(&MerchantId::new("M")));
        assert!(!customer.is_member(&MerchantId::new("M1,M2")));
    }

    #[test]
    fn reprice_replaces_points_in_place() {
        let mut customer = member_of_two();
        customer
            .reprice(dec!(180.00), &[dec!(40.00), dec!(12.00)], &[dec!(80.00), dec!(120.00)])
            .unwrap();
        assert_eq!(customer.wallet_worth, dec!(180.00));
        assert_eq!(customer.associations()[1].points_count, dec!(12.00));
        assert_eq!(customer.associations()[0].points_worth, dec!(80.00));
        assert_eq!(customer.associations()[1].merchant_id, MerchantId::new("M2"));
    }

    #[test]
    fn reprice_checks_lengths() {
        let mut customer = member_of_two();
        let before = customer.clone();
        let err = customer
            .reprice(dec!(1), &[dec!(1)], &[dec!(1), dec!(2)])
            .unwrap_err();
        assert_eq!(
            err,
            LoyaltyError::PositionalMismatch {
                customer_id: CustomerId::new("C1"),
                expected: 2,
                actual: 1
            }
        );
        assert_eq!(customer, before);
    }

    #[test]
    fn supplied_scale_survives_round_trip() {
        let mut customer = Customer::new(CustomerId::new("C3"), "cy", "Cy", dec!(12.5));
        customer.associate(association("M1", dec!(3), dec!(4.125)));
        let text = serde_json::to_string(&customer).unwrap();
        let decoded: Customer = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded.wallet_worth.to_string(), "12.5");
        assert_eq!(decoded.associations()[0].points_worth.to_string(), "4.125");
    }
}
