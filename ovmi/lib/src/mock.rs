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

use crate::crypto::{keccak_hash_function, EcdsaSignatureVerifier, EcdsaSigner, SignatureProvider};
use crate::db::InMemoryKeyValueStore;
use crate::deciders::*;
use crate::quantifiers::*;
use crate::state_channel::*;
use crate::{Address, DecideResult};
use async_trait::async_trait;
use std::sync::Arc;

pub const ALICE_SEED: [u8; 32] = [0x0a; 32];
pub const BOB_SEED: [u8; 32] = [0x0b; 32];

/// One channel party with its own stores, deciders and client.
pub struct Participant {
    pub address: Address,
    pub signer: Arc<EcdsaSigner>,
    pub message_db: Arc<InMemoryMessageDb>,
    pub signed_by_decider: Arc<KeyValueStoreDecider<SignedByDecider>>,
    pub signed_by_quantifier: Arc<SignedByQuantifier>,
    pub client: StateChannelClient,
}

impl Participant {
    pub fn new(seed: &[u8; 32]) -> Self {
        let signer = Arc::new(EcdsaSigner::from_seed(seed).unwrap());
        let address = signer.address();
        let message_db = Arc::new(InMemoryMessageDb::new());
        let signed_by_decider =
            SignedByDecider::cached(EcdsaSignatureVerifier::instance(), &InMemoryKeyValueStore::new());
        let signed_by_quantifier = Arc::new(SignedByQuantifier::new(message_db.clone(), address));
        let client = StateChannelClient::new(
            message_db.clone(),
            signed_by_decider.clone(),
            signed_by_quantifier.clone(),
            signer.clone(),
            EcdsaSignatureVerifier::instance(),
        );
        Participant {
            address,
            signer,
            message_db,
            signed_by_decider,
            signed_by_quantifier,
            client,
        }
    }

    pub fn alice() -> Self {
        Self::new(&ALICE_SEED)
    }

    pub fn bob() -> Self {
        Self::new(&BOB_SEED)
    }
}

pub fn balances(entries: &[(Address, Balance)]) -> AddressBalance {
    entries.iter().copied().collect()
}

/// Decides `true` with nothing but its own frame.
pub fn truthy() -> Claim {
    Claim::new(
        AndDecider::instance(),
        PropertyInput::And(ConnectiveInput { properties: vec![] }),
    )
}

/// Decides `false` with nothing but its own frame.
pub fn falsy() -> Claim {
    Claim::new(
        OrDecider::instance(),
        PropertyInput::Or(ConnectiveInput { properties: vec![] }),
    )
}

/// A preimage claim without a witness.
pub fn undecidable() -> Claim {
    preimage_claim(b"unknown", None)
}

pub fn preimage_decider() -> Arc<KeyValueStoreDecider<HashPreimageExistenceDecider>> {
    HashPreimageExistenceDecider::cached(keccak_hash_function(), &InMemoryKeyValueStore::new())
}

pub fn preimage_claim(preimage: &[u8], witness: Option<&[u8]>) -> Claim {
    let claim = Claim::new(
        preimage_decider(),
        PropertyInput::HashPreimage(HashPreimageInput {
            hash: crate::crypto::keccak_256(preimage).to_vec(),
        }),
    );
    match witness {
        Some(witness) => claim.with_witness(Witness::Preimage(witness.to_vec())),
        None => claim,
    }
}

pub fn and(properties: Vec<Claim>) -> Claim {
    Claim::new(
        AndDecider::instance(),
        PropertyInput::And(ConnectiveInput { properties }),
    )
}

pub fn or(properties: Vec<Claim>) -> Claim {
    Claim::new(
        OrDecider::instance(),
        PropertyInput::Or(ConnectiveInput { properties }),
    )
}

pub fn not(property: Claim) -> Claim {
    Claim::new(NotDecider::instance(), PropertyInput::Not(NotInput { property }))
}

pub fn message(nonce: Nonce) -> StateChannelMessage {
    StateChannelMessage {
        channel_id: ChannelId::random(),
        nonce,
        address_balance: AddressBalance::new(),
    }
}

/// A quantifier returning a fixed list, complete or not.
pub struct StaticQuantifier {
    pub results: Vec<Quantified>,
    pub complete: bool,
}

impl StaticQuantifier {
    pub fn new(results: Vec<Quantified>, complete: bool) -> Arc<Self> {
        Arc::new(StaticQuantifier { results, complete })
    }
}

#[async_trait]
impl Quantifier for StaticQuantifier {
    fn unique_id(&self) -> &str {
        "StaticQuantifier"
    }

    async fn get_all_quantified(
        &self,
        _parameters: &QuantifierParameters,
    ) -> DecideResult<QuantifierResult> {
        Ok(QuantifierResult {
            results: self.results.clone(),
            all_results_quantified: self.complete,
        })
    }
}
