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

//! Outcome notification envelope.
//!
//! Every invocation reports how it went on the ledger's event side channel as
//! `{"message": ..., "code": "..."}`, with the affected entity's identifier in
//! front when there is one.

use serde::ser::{Serialize, SerializeMap, Serializer};

pub const OK_CODE: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    subject: Option<(&'static str, String)>,
    message: String,
    code: u16,
}

impl Outcome {
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            subject: None,
            message: message.into(),
            code,
        }
    }

    /// Success envelope naming the entity it concerns, e.g.
    /// `{"customerID": "C1", "message": "...", "code": "200"}`.
    pub fn success(field: &'static str, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: Some((field, id.into())),
            message: message.into(),
            code: OK_CODE,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl Serialize for Outcome {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.subject.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some((field, id)) = &self.subject {
            map.serialize_entry(field, id)?;
        }
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry("code", &self.code.to_string())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_encoded_as_strings() {
        let outcome = Outcome::new("Incorrect number of arguments. Expecting 3", 503);
        let json: serde_json::Value = serde_json::from_slice(&outcome.to_bytes().unwrap()).unwrap();
        assert_eq!(json["code"], "503");
        assert_eq!(json["message"], "Incorrect number of arguments. Expecting 3");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn subject_leads_the_envelope() {
        let outcome = Outcome::success("merchantID", "M1", "Merchant created successfully");
        let text = String::from_utf8(outcome.to_bytes().unwrap()).unwrap();
        assert_eq!(
            text,
            r#"{"merchantID":"M1","message":"Merchant created successfully","code":"200"}"#
        );
    }
}
