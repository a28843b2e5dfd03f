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

//! Program configuration.
//!
//! The well-known index keys, the onboarding grant and the merchant pre-funded
//! pool are values handed to the engine at construction. Defaults reproduce the
//! deployed program; a TOML file may override any subset:
//!
//! ```toml
//! starting_balance = "250.00"
//!
//! [indices]
//! customer = "_Customerindex"
//!
//! [events]
//! error = "errEvent"
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Keys under which the four secondary indices are stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexKeys {
    pub customer: String,
    pub merchant: String,
    pub owner: String,
    pub transaction: String,
}

impl Default for IndexKeys {
    fn default() -> Self {
        Self {
            customer: "_Customerindex".into(),
            merchant: "_Merchantindex".into(),
            owner: "_Ownerindex".into(),
            transaction: "_Transactionindex".into(),
        }
    }
}

/// Event names used on the notification side channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventNames {
    pub success: String,
    pub error: String,
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            success: "evtsender".into(),
            error: "errEvent".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    pub indices: IndexKeys,

    pub events: EventNames,

    /// Currency grant a customer receives when onboarding with a merchant.
    pub starting_balance: Decimal,

    /// Pool every new merchant starts with; each onboarding spends one
    /// starting balance from it.
    pub merchant_initial_balance: Decimal,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            indices: IndexKeys::default(),
            events: EventNames::default(),
            starting_balance: dec!(100.00),
            merchant_initial_balance: dec!(100000.00),
        }
    }
}

impl ProgramConfig {
    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on malformed input and
    /// [`ConfigError::Invalid`] if the values break an engine assumption.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`ProgramConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_balance <= Decimal::ZERO {
            return Err(ConfigError::Invalid("starting_balance must be positive"));
        }
        if self.merchant_initial_balance < Decimal::ZERO {
            return Err(ConfigError::Invalid("merchant_initial_balance must not be negative"));
        }
        let keys = [
            &self.indices.customer,
            &self.indices.merchant,
            &self.indices.owner,
            &self.indices.transaction,
        ];
        if keys.iter().any(|key| key.is_empty()) {
            return Err(ConfigError::Invalid("index keys must not be empty"));
        }
        for (i, key) in keys.iter().enumerate() {
            if keys[i + 1..].contains(key) {
                return Err(ConfigError::Invalid("index keys must be distinct"));
            }
        }
        Ok(())
    }
}
