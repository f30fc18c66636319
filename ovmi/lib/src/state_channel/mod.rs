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

//! # State channel
//! A two-party payment channel whose exits are settled with OVM properties.
//!
//! Each channel moves through: no channel, pending (one signature on the newest message),
//! countersigned (both signatures; the only state new messages are built on) and exited.

use crate::crypto::SignatureVerifier;
use crate::{Address, DecideResult, Error};
use parity_scale_codec::{Decode, DecodeAll, Encode};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

mod client;
mod db;

pub use client::{nonce_less_than_factory, StateChannelClient};
pub use db::{InMemoryMessageDb, SignedByDb, StateChannelMessageDb};

#[cfg(test)]
mod tests;

/// Position of a message in its channel, starting at 1.
pub type Nonce = u64;
/// Amount held by a party. Signed so that negative balances can be rejected.
pub type Balance = i128;
/// Balance of every party of a channel.
pub type AddressBalance = BTreeMap<Address, Balance>;

/// Opaque channel identifier, a random UUID.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct ChannelId([u8; 16]);

impl ChannelId {
    /// A fresh random id.
    pub fn random() -> Self {
        ChannelId(Uuid::new_v4().into_bytes())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0))
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self)
    }
}

/// Off-chain channel state. Its SCALE encoding is what both parties sign.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct StateChannelMessage {
    /// Channel the state belongs to.
    pub channel_id: ChannelId,
    /// Strictly increasing within the channel.
    pub nonce: Nonce,
    /// Balances of the two parties.
    pub address_balance: AddressBalance,
}

impl StateChannelMessage {
    /// The bytes parties sign.
    pub fn serialize(&self) -> Vec<u8> {
        self.encode()
    }

    /// Decodes a message, rejecting trailing bytes.
    pub fn deserialize(bytes: &[u8]) -> DecideResult<Self> {
        Self::decode_all(&mut &bytes[..]).map_err(|source| Error::Codec {
            type_name: "StateChannelMessage",
            source,
        })
    }
}

/// A serialized message with one signature over it, as exchanged between parties.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct SignedMessage {
    /// [`StateChannelMessage::serialize`] output.
    pub serialized_message: Vec<u8>,
    /// Signature of one party over `serialized_message`.
    pub signature: Vec<u8>,
}

/// A message with its parties resolved and every signature collected so far.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Party that proposed the state.
    pub sender: Address,
    /// Party asked to countersign it.
    pub recipient: Address,
    /// The proposed state.
    pub message: StateChannelMessage,
    /// Signatures collected so far, by signer.
    pub signatures: BTreeMap<Address, Vec<u8>>,
}

impl ParsedMessage {
    /// Whether both parties signed.
    pub fn is_countersigned(&self) -> bool {
        self.signatures.len() == 2
    }

    /// The message as signed by `signer`, if they did.
    pub fn signed_message(&self, signer: &Address) -> Option<SignedMessage> {
        self.signatures.get(signer).map(|signature| SignedMessage {
            serialized_message: self.message.serialize(),
            signature: signature.clone(),
        })
    }
}

/// Exactly two parties, neither with a negative balance.
pub fn is_valid_address_balance(address_balance: &AddressBalance) -> bool {
    address_balance.len() == 2 && address_balance.values().all(|balance| *balance >= 0)
}

/// Two messages conflict when they claim the same (channel, nonce) slot with different state.
pub fn messages_conflict(a: &ParsedMessage, b: &ParsedMessage) -> bool {
    a.message.channel_id == b.message.channel_id
        && a.message.nonce == b.message.nonce
        && a.message != b.message
}

/// Finds which channel party produced `signature` over `message`.
pub async fn find_signer(
    message: &StateChannelMessage,
    signature: &[u8],
    verifier: &dyn SignatureVerifier,
) -> DecideResult<Option<Address>> {
    let serialized = message.serialize();
    for party in message.address_balance.keys() {
        if verifier.verify(party, &serialized, signature).await? {
            return Ok(Some(*party));
        }
    }
    Ok(None)
}

/// Parses a signed message whose signer must be one of its two parties.
pub async fn parse_state_channel_signed_message(
    signed: &SignedMessage,
    verifier: &dyn SignatureVerifier,
) -> DecideResult<ParsedMessage> {
    let message = StateChannelMessage::deserialize(&signed.serialized_message)?;
    if !is_valid_address_balance(&message.address_balance) {
        return Err(Error::invalid_message(
            "a channel needs exactly two parties with non-negative balances",
        ));
    }
    let sender = find_signer(&message, &signed.signature, verifier)
        .await?
        .ok_or_else(|| Error::invalid_message("message is not signed by a channel party"))?;
    let recipient = message
        .address_balance
        .keys()
        .find(|party| **party != sender)
        .copied()
        .ok_or_else(|| Error::invalid_message("message has no recipient"))?;
    let mut signatures = BTreeMap::new();
    signatures.insert(sender, signed.signature.clone());
    Ok(ParsedMessage {
        sender,
        recipient,
        message,
        signatures,
    })
}
