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

/// Decides that the generated property holds for every quantified item.
///
/// One counterexample disproves the claim. Proving it needs every item decided `true`
/// and a quantifier vouching that it saw every item.
pub struct ForAllSuchThatDecider;

static INSTANCE: Lazy<Arc<ForAllSuchThatDecider>> = Lazy::new(|| Arc::new(ForAllSuchThatDecider));

impl ForAllSuchThatDecider {
    /// Unique id, also the justification frame name.
    pub const ID: &'static str = "ForAllSuchThatDecider";

    /// The shared instance.
    pub fn instance() -> Arc<Self> {
        INSTANCE.clone()
    }
}

#[async_trait]
impl Decider for ForAllSuchThatDecider {
    fn unique_id(&self) -> &str {
        Self::ID
    }

    async fn decide(
        &self,
        property: &Property,
        _witness: Option<&Witness>,
        depth: usize,
    ) -> DecideResult<Decision> {
        let input = input_of!(Self::ID, property, ForAllSuchThat);
        decide_quantified(property, input, false, depth).await
    }
}
