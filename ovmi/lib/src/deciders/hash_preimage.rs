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
use crate::crypto::HashFunction;
use crate::db::KeyValueStore;

/// Decides that a preimage of `hash` exists, given one as witness.
///
/// A witness that does not hash to `hash` proves nothing about other preimages, so the
/// decider never answers `false`: it either proves existence or cannot decide.
pub struct HashPreimageExistenceDecider {
    hash_function: HashFunction,
}

impl HashPreimageExistenceDecider {
    /// Unique id, also the cache namespace.
    pub const ID: &'static str = "HashPreimageExistenceDecider";

    /// Decider checking preimages with `hash_function`.
    pub fn new(hash_function: HashFunction) -> Self {
        HashPreimageExistenceDecider { hash_function }
    }

    /// The decider behind a decision cache kept in `db`.
    pub fn cached(
        hash_function: HashFunction,
        db: &dyn KeyValueStore,
    ) -> Arc<KeyValueStoreDecider<Self>> {
        Arc::new(KeyValueStoreDecider::new(Self::new(hash_function), db))
    }
}

#[async_trait]
impl PrimitiveDecider for HashPreimageExistenceDecider {
    fn unique_id(&self) -> &str {
        Self::ID
    }

    fn serialize_input(&self, input: &PropertyInput) -> DecideResult<Vec<u8>> {
        match input {
            PropertyInput::HashPreimage(input) => Ok(input.encode()),
            _ => Err(Error::InvalidInput {
                decider: Self::ID.to_string(),
                expected: "HashPreimage",
            }),
        }
    }

    async fn make_decision(
        &self,
        input: &PropertyInput,
        witness: Option<&Witness>,
    ) -> DecideResult<CachedDecision> {
        let input = match input {
            PropertyInput::HashPreimage(input) => input,
            _ => {
                return Err(Error::InvalidInput {
                    decider: Self::ID.to_string(),
                    expected: "HashPreimage",
                })
            }
        };
        let preimage = match witness {
            Some(Witness::Preimage(preimage)) => preimage,
            _ => {
                return Err(Error::cannot_decide(format!(
                    "no preimage witness for hash 0x{}",
                    hex::encode(&input.hash)
                )))
            }
        };
        if (self.hash_function)(preimage) != input.hash {
            return Err(Error::cannot_decide(format!(
                "witness is not a preimage of 0x{}",
                hex::encode(&input.hash)
            )));
        }
        Ok(CachedDecision {
            outcome: true,
            witness: Some(Witness::Preimage(preimage.clone())),
        })
    }
}
