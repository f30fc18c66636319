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

//! Hashing and signature collaborators consumed by the primitive deciders.
//!
//! The engine only depends on [`HashFunction`], [`SignatureVerifier`] and
//! [`SignatureProvider`]; the ECDSA types below are the defaults used by the state channel.

use crate::{Address, DecideResult, Error};
use async_trait::async_trait;
use libsecp256k1::{Message, PublicKey, RecoveryId, SecretKey, Signature};
use rand::RngCore;
use sha3::{Digest, Keccak256};
use std::sync::Arc;

/// Hash applied to a preimage witness, e.g. [`keccak_256`].
pub type HashFunction = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// Keccak-256 digest of `data`.
pub fn keccak_256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// [`keccak_256`] as an injectable [`HashFunction`].
pub fn keccak_hash_function() -> HashFunction {
    Arc::new(|data: &[u8]| keccak_256(data).to_vec())
}

/// Checks that `signature` was produced over `message` by the owner of `public_key`.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Whether `signature` over `message` was made by `public_key`. Malformed signatures
    /// are `false`, not an error.
    async fn verify(
        &self,
        public_key: &Address,
        message: &[u8],
        signature: &[u8],
    ) -> DecideResult<bool>;
}

/// Signs messages on behalf of a single address.
#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// The address signatures are attributed to.
    fn address(&self) -> Address;

    /// Signs `message`.
    async fn sign(&self, message: &[u8]) -> DecideResult<Vec<u8>>;
}

/// Constructs the message that Ethereum RPC's `personal_sign` and `eth_sign` would sign.
fn ethereum_signable_message(what: &[u8]) -> Vec<u8> {
    let mut v = b"\x19Ethereum Signed Message:\n".to_vec();
    v.extend_from_slice(what.len().to_string().as_bytes());
    v.extend_from_slice(what);
    v
}

fn message_digest(message: &[u8]) -> Message {
    Message::parse(&keccak_256(&ethereum_signable_message(message)))
}

/// Get Ethereum address for given ECDSA public key.
pub fn to_address(public: &PublicKey) -> Address {
    Address::from_slice(&keccak_256(&public.serialize()[1..])[12..32])
}

/// Verifies 65 byte `r ++ s ++ v` secp256k1 signatures by recovering the signer address.
#[derive(Clone, Copy, Debug, Default)]
pub struct EcdsaSignatureVerifier;

impl EcdsaSignatureVerifier {
    /// Shared verifier handle.
    pub fn instance() -> Arc<dyn SignatureVerifier> {
        Arc::new(EcdsaSignatureVerifier)
    }

    /// Recovers the address that produced `signature` over `message`, if any.
    pub fn recover(message: &[u8], signature: &[u8]) -> Option<Address> {
        if signature.len() != 65 {
            return None;
        }
        let sig = Signature::parse_standard_slice(&signature[..64]).ok()?;
        let v = match signature[64] {
            v @ 27..=28 => v - 27,
            v => v,
        };
        let recovery_id = RecoveryId::parse(v).ok()?;
        libsecp256k1::recover(&message_digest(message), &sig, &recovery_id)
            .ok()
            .map(|public| to_address(&public))
    }
}

#[async_trait]
impl SignatureVerifier for EcdsaSignatureVerifier {
    async fn verify(
        &self,
        public_key: &Address,
        message: &[u8],
        signature: &[u8],
    ) -> DecideResult<bool> {
        Ok(Self::recover(message, signature).as_ref() == Some(public_key))
    }
}

/// secp256k1 key pair signing with the Ethereum message envelope.
pub struct EcdsaSigner {
    secret: SecretKey,
    address: Address,
}

impl EcdsaSigner {
    /// Uses `seed` as the secret key.
    pub fn from_seed(seed: &[u8; 32]) -> DecideResult<Self> {
        let secret = SecretKey::parse(seed).map_err(|e| Error::Crypto {
            msg: format!("invalid secret key: {:?}", e),
        })?;
        let address = to_address(&PublicKey::from_secret_key(&secret));
        Ok(EcdsaSigner { secret, address })
    }

    /// Generates a fresh key pair from the thread-local RNG.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut seed = [0u8; 32];
            rng.fill_bytes(&mut seed);
            // Rejects the zero key and values above the curve order.
            if let Ok(signer) = Self::from_seed(&seed) {
                return signer;
            }
        }
    }
}

#[async_trait]
impl SignatureProvider for EcdsaSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, message: &[u8]) -> DecideResult<Vec<u8>> {
        let (signature, recovery_id) = libsecp256k1::sign(&message_digest(message), &self.secret);
        let mut out = signature.serialize().to_vec();
        out.push(recovery_id.serialize());
        Ok(out)
    }
}
