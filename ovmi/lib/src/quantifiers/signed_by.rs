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
use crate::state_channel::{SignedByDb, StateChannelMessage};
use crate::Error;
use std::sync::Arc;

/// Enumerates the messages the local store knows to be signed by an address.
///
/// Only the set of messages signed by `my_address` is known in full: anyone else may hold
/// messages they signed and never showed us.
pub struct SignedByQuantifier {
    db: Arc<dyn SignedByDb>,
    my_address: Address,
}

impl SignedByQuantifier {
    /// Quantifier id.
    pub const ID: &'static str = "SignedByQuantifier";

    /// Enumerates `db`, vouching for completeness of `my_address` only.
    pub fn new(db: Arc<dyn SignedByDb>, my_address: Address) -> Self {
        SignedByQuantifier { db, my_address }
    }
}

#[async_trait]
impl Quantifier for SignedByQuantifier {
    fn unique_id(&self) -> &str {
        Self::ID
    }

    async fn get_all_quantified(
        &self,
        parameters: &QuantifierParameters,
    ) -> DecideResult<QuantifierResult> {
        let (address, channel_id) = match parameters {
            QuantifierParameters::SignedBy {
                address,
                channel_id,
            } => (address, channel_id),
            _ => {
                return Err(Error::InvalidInput {
                    decider: Self::ID.to_string(),
                    expected: "SignedBy",
                })
            }
        };
        let results = self
            .db
            .get_all_signed_by(address)
            .await?
            .into_iter()
            .filter(|signed| match channel_id {
                // Messages of other formats cannot belong to the channel.
                Some(channel_id) => StateChannelMessage::deserialize(&signed.serialized_message)
                    .map_or(false, |message| message.channel_id == *channel_id),
                None => true,
            })
            .map(Quantified::SignedMessage)
            .collect();
        Ok(QuantifierResult {
            results,
            all_results_quantified: *address == self.my_address,
        })
    }
}
