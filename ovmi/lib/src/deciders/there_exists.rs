// This file is part of Astar.

// Copyright (C) 2019-2024 Stake Technologies Pte.Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

// Astar is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Astar is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Astar. If not, see <http://www.gnu.org/licenses/>.

use super::*;
use once_cell::sync::Lazy;

/// Decides that the generated property holds for at least one quantified item.
pub struct ThereExistsSuchThatDecider;

static INSTANCE: Lazy<Arc<ThereExistsSuchThatDecider>> =
    Lazy::new(|| Arc::new(ThereExistsSuchThatDecider));

impl ThereExistsSuchThatDecider {
    /// Unique id, also the justification frame name.
    pub const ID: &'static str = "ThereExistsSuchThatDecider";

    /// The shared instance.
    pub fn instance() -> Arc<Self> {
        INSTANCE.clone()
    }
}

#[async_trait]
impl Decider for ThereExistsSuchThatDecider {
    fn unique_id(&self) -> &str {
        Self::ID
    }

    async fn decide(
        &self,
        property: &Property,
        _witness: Option<&Witness>,
        depth: usize,
    ) -> DecideResult<Decision> {
        let input = input_of!(Self::ID, property, ThereExistsSuchThat);
        decide_quantified(property, input, true, depth).await
    }
}
