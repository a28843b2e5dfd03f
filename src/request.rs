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

//! Invocation requests.
//!
//! Callers select an operation by name and pass fixed-arity positional string
//! arguments. [`Request::parse`] checks the arity and turns the strings into
//! one typed variant, so the engine never sees raw positional input.

use crate::association::Association;
use crate::base::{CustomerId, MerchantId, OwnerId, TransactionId};
use crate::customer::Customer;
use crate::error::LoyaltyError;
use crate::merchant::MerchantProfile;
use crate::money::{parse_amount, parse_amount_list, zero};
use crate::owner::Owner;
use crate::transaction::{Leg, TransactionKind};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Resets every index to empty. The label is informational.
    Init { label: String },
    Command(Command),
    Query(Query),
}

/// Onboarding half of a combined customer registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onboarding {
    pub association: Association,
    pub leg: Leg,
}

/// New wallet worth and per-association points for an existing customer,
/// computed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerUpdate {
    pub customer_id: CustomerId,
    pub wallet_worth: Decimal,
    pub points_count: Vec<Decimal>,
    pub points_worth: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateCustomer {
        customer: Customer,
        onboarding: Option<Onboarding>,
    },
    AssociateCustomer {
        customer_id: CustomerId,
        merchant_id: MerchantId,
        transaction_id: TransactionId,
        date_time: String,
    },
    UpdateCustomerAccumulation {
        update: CustomerUpdate,
        leg: Leg,
    },
    /// A redemption: the customer pays out of the wallet and the merchant
    /// receives the settlement.
    UpdateCustomerPurchase {
        update: CustomerUpdate,
        debit_leg: Leg,
        credit_leg: Leg,
        merchant_id: MerchantId,
        purchase_delta: Decimal,
        merchant_date: String,
    },
    UpdateCustomerTransfer {
        source: CustomerUpdate,
        debit_leg: Leg,
        credit_leg: Leg,
        destination: CustomerUpdate,
    },
    DeleteCustomer {
        customer_id: CustomerId,
    },
    CreateMerchant(MerchantProfile),
    UpdateMerchant(MerchantProfile),
    UpdateMerchantsPpds {
        merchant_id: MerchantId,
        points_per_dollar_spent: Decimal,
        date: String,
    },
    UpdateMerchantsExchangeRate {
        merchant_id: MerchantId,
        exchange_rate: Decimal,
        date: String,
    },
    DeleteMerchant {
        merchant_id: MerchantId,
    },
    CreateOwner(Owner),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    CustomerById(CustomerId),
    CustomerDetailsById(CustomerId),
    ActivityHistory(CustomerId),
    ActivityHistoryForMerchant(String),
    AllCustomers,
    CustomersByMerchantId(MerchantId),
    MerchantByName(String),
    MerchantById(MerchantId),
    MerchantDetailsById(MerchantId),
    MerchantsByIndustry(String),
    AllMerchants,
    MerchantsAccountBalance(MerchantId),
    MerchantsUserCount(MerchantId),
    OwnersMerchantUserCount,
    OwnerById(OwnerId),
}

impl Request {
    /// Parses a named invocation. Commands, queries and `init` are all
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::UnknownFunction`] for an unknown name, otherwise
    /// the first argument error.
    pub fn parse<A: AsRef<str>>(name: &str, args: &[A]) -> Result<Self, LoyaltyError> {
        if name == "init" {
            let args = Args::new("init", args, 1)?;
            return Ok(Self::Init {
                label: args.text(0),
            });
        }
        if let Some(command) = Command::parse(name, args)? {
            return Ok(Self::Command(command));
        }
        if let Some(query) = Query::parse(name, args)? {
            return Ok(Self::Query(query));
        }
        Err(LoyaltyError::UnknownFunction {
            surface: "invocation",
            name: name.to_owned(),
        })
    }

    /// Parses a named read-only query.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::UnknownFunction`] for anything that is not a
    /// query, otherwise the first argument error.
    pub fn parse_query<A: AsRef<str>>(name: &str, args: &[A]) -> Result<Self, LoyaltyError> {
        match Query::parse(name, args)? {
            Some(query) => Ok(Self::Query(query)),
            None => Err(LoyaltyError::UnknownFunction {
                surface: "query",
                name: name.to_owned(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Command(command) => command.name(),
            Self::Query(query) => query.name(),
        }
    }
}

impl Command {
    /// Returns `Ok(None)` if `name` is not a command.
    pub fn parse<A: AsRef<str>>(name: &str, args: &[A]) -> Result<Option<Self>, LoyaltyError> {
        let command = match name {
            "createCustomer" => parse_create_customer(Args::new("createCustomer", args, 13)?)?,
            "associateCustomer" => {
                let args = Args::new("associateCustomer", args, 5)?;
                args.kind(4)?.require(TransactionKind::CustomerOnBoarding)?;
                Self::AssociateCustomer {
                    customer_id: args.id(0, "customerId")?,
                    merchant_id: args.id(1, "merchantId")?,
                    transaction_id: args.id(2, "transactionId")?,
                    date_time: args.text(3),
                }
            }
            "updateCustomerAccumulation" => {
                let args = Args::new("updateCustomerAccumulation", args, 11)?;
                args.kind(6)?.require(TransactionKind::Accumulation)?;
                Self::UpdateCustomerAccumulation {
                    update: args.customer_update(0)?,
                    leg: args.leg([4, 5, 7, 8, 9, 10])?,
                }
            }
            "updateCustomerPurchase" => {
                let args = Args::new("updateCustomerPurchase", args, 20)?;
                args.kind(6)?.require(TransactionKind::Purchase)?;
                Self::UpdateCustomerPurchase {
                    update: args.customer_update(0)?,
                    debit_leg: args.leg([4, 5, 7, 8, 9, 10])?,
                    credit_leg: args.leg([11, 12, 13, 14, 15, 16])?,
                    merchant_id: args.id(17, "merchantId")?,
                    purchase_delta: args.amount(18, "purchaseBalance")?,
                    merchant_date: args.text(19),
                }
            }
            "updateCustomerTransfer" => {
                let args = Args::new("updateCustomerTransfer", args, 21)?;
                args.kind(6)?.require(TransactionKind::Transfer)?;
                Self::UpdateCustomerTransfer {
                    source: args.customer_update(0)?,
                    debit_leg: args.leg([4, 5, 7, 8, 9, 10])?,
                    credit_leg: args.leg([11, 12, 13, 14, 15, 16])?,
                    destination: args.customer_update(17)?,
                }
            }
            "deleteCustomer" => Self::DeleteCustomer {
                customer_id: Args::new("deleteCustomer", args, 1)?.id(0, "customerId")?,
            },
            "createMerchant" => {
                Self::CreateMerchant(Args::new("createMerchant", args, 10)?.merchant_profile()?)
            }
            "updateMerchant" => {
                Self::UpdateMerchant(Args::new("updateMerchant", args, 10)?.merchant_profile()?)
            }
            "updateMerchantsPPDS" => {
                let args = Args::new("updateMerchantsPPDS", args, 3)?;
                Self::UpdateMerchantsPpds {
                    merchant_id: args.id(0, "merchantId")?,
                    points_per_dollar_spent: args.amount(1, "pointsPerDollarSpent")?,
                    date: args.text(2),
                }
            }
            "updateMerchantsExchangeRate" => {
                let args = Args::new("updateMerchantsExchangeRate", args, 3)?;
                Self::UpdateMerchantsExchangeRate {
                    merchant_id: args.id(0, "merchantId")?,
                    exchange_rate: args.amount(1, "exchangeRate")?,
                    date: args.text(2),
                }
            }
            "deleteMerchant" => Self::DeleteMerchant {
                merchant_id: Args::new("deleteMerchant", args, 1)?.id(0, "merchantId")?,
            },
            "createOwner" => {
                let args = Args::new("createOwner", args, 3)?;
                Self::CreateOwner(Owner {
                    owner_id: args.id(0, "ownerId")?,
                    user_name: args.text(1),
                    name: args.text(2),
                })
            }
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateCustomer { .. } => "createCustomer",
            Self::AssociateCustomer { .. } => "associateCustomer",
            Self::UpdateCustomerAccumulation { .. } => "updateCustomerAccumulation",
            Self::UpdateCustomerPurchase { .. } => "updateCustomerPurchase",
            Self::UpdateCustomerTransfer { .. } => "updateCustomerTransfer",
            Self::DeleteCustomer { .. } => "deleteCustomer",
            Self::CreateMerchant(_) => "createMerchant",
            Self::UpdateMerchant(_) => "updateMerchant",
            Self::UpdateMerchantsPpds { .. } => "updateMerchantsPPDS",
            Self::UpdateMerchantsExchangeRate { .. } => "updateMerchantsExchangeRate",
            Self::DeleteMerchant { .. } => "deleteMerchant",
            Self::CreateOwner(_) => "createOwner",
        }
    }
}

fn parse_create_customer<A: AsRef<str>>(args: Args<'_, A>) -> Result<Command, LoyaltyError> {
    let customer = Customer::new(
        args.id(0, "customerId")?,
        args.text(1),
        args.text(2),
        args.amount(3, "walletWorth")?,
    );

    // Plain registration leaves every association argument empty.
    if args.str(4).is_empty() {
        if (5..10).any(|i| !args.str(i).is_empty()) {
            return Err(LoyaltyError::InvalidField {
                field: "merchantId",
                reason: "required when association fields are given",
            });
        }
        return Ok(Command::CreateCustomer {
            customer,
            onboarding: None,
        });
    }

    args.kind(12)?.require(TransactionKind::CustomerOnBoarding)?;
    let association = Association::new(
        args.id(4, "merchantId")?,
        args.text(5),
        args.text(6),
        args.text(7),
        args.amount(8, "merchantsPointsCount")?,
        args.amount(9, "merchantsPointsWorth")?,
    )?;
    let leg = Leg {
        transaction_id: args.id(10, "transactionId")?,
        date_time: args.text(11),
        from: association.merchant_name.clone(),
        to: customer.user_name.clone(),
        credit: association.points_worth,
        debit: zero(),
    };
    Ok(Command::CreateCustomer {
        customer,
        onboarding: Some(Onboarding { association, leg }),
    })
}

impl Query {
    /// Returns `Ok(None)` if `name` is not a query.
    pub fn parse<A: AsRef<str>>(name: &str, args: &[A]) -> Result<Option<Self>, LoyaltyError> {
        let query = match name {
            "getCustomerByID" => {
                Self::CustomerById(Args::new("getCustomerByID", args, 1)?.id(0, "customerId")?)
            }
            "getCustomerDetailsByID" => Self::CustomerDetailsById(
                Args::new("getCustomerDetailsByID", args, 1)?.id(0, "customerId")?,
            ),
            "getActivityHistory" => {
                Self::ActivityHistory(Args::new("getActivityHistory", args, 1)?.id(0, "customerId")?)
            }
            "getActivityHistoryForMerchant" => Self::ActivityHistoryForMerchant(
                Args::new("getActivityHistoryForMerchant", args, 1)?.text(0),
            ),
            "getAllCustomers" => {
                Args::new("getAllCustomers", args, 0)?;
                Self::AllCustomers
            }
            "getCustomersByMerchantID" => Self::CustomersByMerchantId(
                Args::new("getCustomersByMerchantID", args, 1)?.id(0, "merchantId")?,
            ),
            "getMerchantByName" => {
                Self::MerchantByName(Args::new("getMerchantByName", args, 1)?.text(0))
            }
            "getMerchantByID" => {
                Self::MerchantById(Args::new("getMerchantByID", args, 1)?.id(0, "merchantId")?)
            }
            "getMerchantDetailsByID" => Self::MerchantDetailsById(
                Args::new("getMerchantDetailsByID", args, 1)?.id(0, "merchantId")?,
            ),
            "getMerchantsByIndustry" => {
                Self::MerchantsByIndustry(Args::new("getMerchantsByIndustry", args, 1)?.text(0))
            }
            "getAllMerchants" => {
                Args::new("getAllMerchants", args, 0)?;
                Self::AllMerchants
            }
            "getMerchantsAccountBalance" => Self::MerchantsAccountBalance(
                Args::new("getMerchantsAccountBalance", args, 1)?.id(0, "merchantId")?,
            ),
            "getMerchantsUserCount" => Self::MerchantsUserCount(
                Args::new("getMerchantsUserCount", args, 1)?.id(0, "merchantId")?,
            ),
            "getOwnersMerchantUserCount" => {
                Args::new("getOwnersMerchantUserCount", args, 0)?;
                Self::OwnersMerchantUserCount
            }
            "getOwnerByID" => {
                Self::OwnerById(Args::new("getOwnerByID", args, 1)?.id(0, "ownerId")?)
            }
            _ => return Ok(None),
        };
        Ok(Some(query))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CustomerById(_) => "getCustomerByID",
            Self::CustomerDetailsById(_) => "getCustomerDetailsByID",
            Self::ActivityHistory(_) => "getActivityHistory",
            Self::ActivityHistoryForMerchant(_) => "getActivityHistoryForMerchant",
            Self::AllCustomers => "getAllCustomers",
            Self::CustomersByMerchantId(_) => "getCustomersByMerchantID",
            Self::MerchantByName(_) => "getMerchantByName",
            Self::MerchantById(_) => "getMerchantByID",
            Self::MerchantDetailsById(_) => "getMerchantDetailsByID",
            Self::MerchantsByIndustry(_) => "getMerchantsByIndustry",
            Self::AllMerchants => "getAllMerchants",
            Self::MerchantsAccountBalance(_) => "getMerchantsAccountBalance",
            Self::MerchantsUserCount(_) => "getMerchantsUserCount",
            Self::OwnersMerchantUserCount => "getOwnersMerchantUserCount",
            Self::OwnerById(_) => "getOwnerByID",
        }
    }
}

/// Positional arguments of one invocation, arity already checked.
struct Args<'a, A> {
    values: &'a [A],
}

impl<'a, A: AsRef<str>> Args<'a, A> {
    fn new(function: &'static str, values: &'a [A], expected: usize) -> Result<Self, LoyaltyError> {
        if values.len() != expected {
            return Err(LoyaltyError::Arity {
                function,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { values })
    }

    fn str(&self, at: usize) -> &str {
        self.values[at].as_ref()
    }

    fn text(&self, at: usize) -> String {
        self.str(at).to_owned()
    }

    /// An entity identifier; it becomes a ledger key, so it cannot be empty.
    fn id<T: From<String>>(&self, at: usize, field: &'static str) -> Result<T, LoyaltyError> {
        let value = self.str(at);
        if value.is_empty() {
            return Err(LoyaltyError::InvalidField {
                field,
                reason: "must not be empty",
            });
        }
        Ok(T::from(value.to_owned()))
    }

    fn amount(&self, at: usize, field: &'static str) -> Result<Decimal, LoyaltyError> {
        parse_amount(field, self.str(at))
    }

    fn amounts(&self, at: usize, field: &'static str) -> Result<Vec<Decimal>, LoyaltyError> {
        parse_amount_list(field, self.str(at))
    }

    fn kind(&self, at: usize) -> Result<TransactionKind, LoyaltyError> {
        self.str(at).parse()
    }

    /// Reads `[id, dateTime, from, to, credit, debit]` from the given positions.
    fn leg(&self, [id, date_time, from, to, credit, debit]: [usize; 6]) -> Result<Leg, LoyaltyError> {
        Ok(Leg {
            transaction_id: self.id(id, "transactionId")?,
            date_time: self.text(date_time),
            from: self.text(from),
            to: self.text(to),
            credit: self.amount(credit, "credit")?,
            debit: self.amount(debit, "debit")?,
        })
    }

    /// Reads `customerId, walletWorth, pointsCount list, pointsWorth list`
    /// starting at `at`.
    fn customer_update(&self, at: usize) -> Result<CustomerUpdate, LoyaltyError> {
        Ok(CustomerUpdate {
            customer_id: self.id(at, "customerId")?,
            wallet_worth: self.amount(at + 1, "walletWorth")?,
            points_count: self.amounts(at + 2, "merchantsPointsCount")?,
            points_worth: self.amounts(at + 3, "merchantsPointsWorth")?,
        })
    }

    fn merchant_profile(&self) -> Result<MerchantProfile, LoyaltyError> {
        Ok(MerchantProfile {
            merchant_id: self.id(0, "merchantId")?,
            user_name: self.text(1),
            name: self.text(2),
            industry: self.text(3),
            industry_color: self.text(4),
            points_per_dollar_spent: self.amount(5, "pointsPerDollarSpent")?,
            exchange_rate: self.amount(6, "exchangeRate")?,
            purchase_balance: self.amount(7, "purchaseBalance")?,
            currency: self.text(8),
            updated_at: self.text(9),
        })
    }
}
