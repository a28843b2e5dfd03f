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

//! Program owner records. Owners are created once and never change.

use crate::base::OwnerId;
use crate::record::Record;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "ownerId")]
    pub owner_id: OwnerId,
    #[serde(rename = "ownerUserName")]
    pub user_name: String,
    #[serde(rename = "ownerName")]
    pub name: String,
}

impl Record for Owner {
    const KIND: &'static str = "Owner";
    const KEY_FIELD: &'static str = "ownerId";

    fn key(&self) -> &str {
        self.owner_id.as_str()
    }
}
