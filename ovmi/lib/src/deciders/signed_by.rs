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
use crate::crypto::SignatureVerifier;
use crate::db::KeyValueStore;

/// Decides that `message` was signed by `public_key`, given the signature as witness.
///
/// Failing to verify only means this witness proves nothing; someone may still hold a
/// valid signature off-path. Such cases are undecidable, never `false`.
pub struct SignedByDecider {
    signature_verifier: Arc<dyn SignatureVerifier>,
}

impl SignedByDecider {
    /// Unique id, also the cache namespace.
    pub const ID: &'static str = "SignedByDecider";

    /// Decider checking signatures with `signature_verifier`.
    pub fn new(signature_verifier: Arc<dyn SignatureVerifier>) -> Self {
        SignedByDecider { signature_verifier }
    }

    /// The decider behind a decision cache kept in `db`.
    pub fn cached(
        signature_verifier: Arc<dyn SignatureVerifier>,
        db: &dyn KeyValueStore,
    ) -> Arc<KeyValueStoreDecider<Self>> {
        Arc::new(KeyValueStoreDecider::new(Self::new(signature_verifier), db))
    }
}

#[async_trait]
impl PrimitiveDecider for SignedByDecider {
    fn unique_id(&self) -> &str {
        Self::ID
    }

    fn serialize_input(&self, input: &PropertyInput) -> DecideResult<Vec<u8>> {
        match input {
            PropertyInput::SignedBy(input) => Ok(input.encode()),
            _ => Err(Error::InvalidInput {
                decider: Self::ID.to_string(),
                expected: "SignedBy",
            }),
        }
    }

    async fn make_decision(
        &self,
        input: &PropertyInput,
        witness: Option<&Witness>,
    ) -> DecideResult<CachedDecision> {
        let input = match input {
            PropertyInput::SignedBy(input) => input,
            _ => {
                return Err(Error::InvalidInput {
                    decider: Self::ID.to_string(),
                    expected: "SignedBy",
                })
            }
        };
        let signature = match witness {
            Some(Witness::Signature(signature)) => signature,
            _ => {
                return Err(Error::cannot_decide(format!(
                    "no signature witness from {:?}",
                    input.public_key
                )))
            }
        };
        let verified = self
            .signature_verifier
            .verify(&input.public_key, &input.message, signature)
            .await?;
        if !verified {
            return Err(Error::cannot_decide(format!(
                "signature does not verify against {:?}",
                input.public_key
            )));
        }
        Ok(CachedDecision {
            outcome: true,
            witness: Some(Witness::Signature(signature.clone())),
        })
    }
}
