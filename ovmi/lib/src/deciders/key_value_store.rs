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
use crate::crypto::keccak_256;
use crate::db::{Bucket, KeyValueStore};
use parity_scale_codec::DecodeAll;

const LOG_TARGET: &str = "ovmi::cache";

/// The verdict of a primitive decider, as persisted in the decision cache.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct CachedDecision {
    /// The verdict.
    pub outcome: bool,
    /// Witness that grounded it.
    pub witness: Option<Witness>,
}

/// An atomic judgement that checks one property against its witness.
///
/// Implementors only produce the verdict; [`KeyValueStoreDecider`] turns it into a
/// [`Decision`], caches it and answers [`Decider::decide`] on their behalf.
#[async_trait]
pub trait PrimitiveDecider: Send + Sync {
    /// Identifies the decider kind and names its cache bucket.
    fn unique_id(&self) -> &str;

    /// Canonical bytes of the typed input, hashed into the cache key.
    fn serialize_input(&self, input: &PropertyInput) -> DecideResult<Vec<u8>>;

    /// Checks `input` against `witness` without consulting the cache.
    async fn make_decision(
        &self,
        input: &PropertyInput,
        witness: Option<&Witness>,
    ) -> DecideResult<CachedDecision>;
}

/// Decision cache in front of a [`PrimitiveDecider`], namespaced by its unique id.
pub struct KeyValueStoreDecider<D> {
    decider: D,
    bucket: Arc<dyn Bucket>,
}

impl<D: PrimitiveDecider> KeyValueStoreDecider<D> {
    /// Caches `decider` in the bucket of `db` named after its id.
    pub fn new(decider: D, db: &dyn KeyValueStore) -> Self {
        let bucket = db.bucket(decider.unique_id().as_bytes());
        KeyValueStoreDecider { decider, bucket }
    }

    /// The wrapped decider.
    pub fn inner(&self) -> &D {
        &self.decider
    }

    fn cache_key(&self, input: &PropertyInput) -> DecideResult<[u8; 32]> {
        Ok(keccak_256(&self.decider.serialize_input(input)?))
    }

    /// Stores an encoded [`CachedDecision`] for `input`.
    pub async fn store_decision(
        &self,
        input: &PropertyInput,
        serialized_decision: Vec<u8>,
    ) -> DecideResult<()> {
        let key = self.cache_key(input)?;
        self.bucket.put(&key, serialized_decision).await
    }

    /// Rebuilds the decision on `property` from its cached encoding.
    pub fn deserialize_decision(&self, property: &Property, bytes: &[u8]) -> DecideResult<Decision> {
        let cached = CachedDecision::decode_all(&mut &bytes[..]).map_err(|source| Error::Codec {
            type_name: "CachedDecision",
            source,
        })?;
        Ok(Decision {
            outcome: cached.outcome,
            justification: vec![ImplicationProofItem {
                implication: property.clone(),
                implication_witness: cached.witness,
            }],
        })
    }
}

#[async_trait]
impl<D: PrimitiveDecider> Decider for KeyValueStoreDecider<D> {
    fn unique_id(&self) -> &str {
        self.decider.unique_id()
    }

    async fn decide(
        &self,
        property: &Property,
        witness: Option<&Witness>,
        _depth: usize,
    ) -> DecideResult<Decision> {
        if let Some(decision) = self.check_decision(property).await? {
            return Ok(decision);
        }
        let verdict = self.decider.make_decision(&property.input, witness).await?;
        let serialized = verdict.encode();
        self.store_decision(&property.input, serialized.clone()).await?;
        self.deserialize_decision(property, &serialized)
    }

    async fn check_decision(&self, property: &Property) -> DecideResult<Option<Decision>> {
        let key = self.cache_key(&property.input)?;
        match self.bucket.get(&key).await? {
            Some(bytes) => {
                log::trace!(
                    target: LOG_TARGET,
                    "{} cache hit for {}",
                    self.unique_id(),
                    hex::encode(key)
                );
                self.deserialize_decision(property, &bytes).map(Some)
            }
            None => {
                log::trace!(
                    target: LOG_TARGET,
                    "{} cache miss for {}",
                    self.unique_id(),
                    hex::encode(key)
                );
                Ok(None)
            }
        }
    }
}
