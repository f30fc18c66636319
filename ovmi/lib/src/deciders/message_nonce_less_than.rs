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

/// Decides that a state channel message carries a nonce below `less_than_this`.
///
/// The nonce is part of the input, so the answer is always decisive in both directions.
pub struct MessageNonceLessThanDecider;

static INSTANCE: Lazy<Arc<MessageNonceLessThanDecider>> =
    Lazy::new(|| Arc::new(MessageNonceLessThanDecider));

impl MessageNonceLessThanDecider {
    /// Unique id, also the justification frame name.
    pub const ID: &'static str = "MessageNonceLessThanDecider";

    /// The shared instance.
    pub fn instance() -> Arc<Self> {
        INSTANCE.clone()
    }
}

#[async_trait]
impl Decider for MessageNonceLessThanDecider {
    fn unique_id(&self) -> &str {
        Self::ID
    }

    async fn decide(
        &self,
        property: &Property,
        _witness: Option<&Witness>,
        _depth: usize,
    ) -> DecideResult<Decision> {
        let input = input_of!(Self::ID, property, MessageNonceLessThan);
        Ok(Decision {
            outcome: input.message_with_nonce.nonce < input.less_than_this,
            justification: vec![ImplicationProofItem {
                implication: property.clone(),
                implication_witness: None,
            }],
        })
    }
}
