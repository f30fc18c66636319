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
use crate::crypto::SignatureProvider;
use crate::deciders::{
    AndDecider, Claim, ConnectiveInput, Decider, ForAllSuchThatDecider, ImplicationProofItem,
    MessageNonceLessThanDecider, MessageNonceLessThanInput, PropertyFactory, PropertyInput,
    QuantifiedInput, SignedByInput, Witness,
};
use crate::quantifiers::{Quantified, Quantifier, QuantifierParameters};
use std::sync::Arc;

const LOG_TARGET: &str = "ovmi::state-channel";

/// One party of two-party state channels.
pub struct StateChannelClient {
    message_db: Arc<dyn StateChannelMessageDb>,
    signed_by_decider: Arc<dyn Decider>,
    signed_by_quantifier: Arc<dyn Quantifier>,
    signature_provider: Arc<dyn SignatureProvider>,
    signature_verifier: Arc<dyn SignatureVerifier>,
    my_address: Address,
}

impl StateChannelClient {
    /// Client signing with `signature_provider`, whose address identifies it in channels.
    pub fn new(
        message_db: Arc<dyn StateChannelMessageDb>,
        signed_by_decider: Arc<dyn Decider>,
        signed_by_quantifier: Arc<dyn Quantifier>,
        signature_provider: Arc<dyn SignatureProvider>,
        signature_verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let my_address = signature_provider.address();
        StateChannelClient {
            message_db,
            signed_by_decider,
            signed_by_quantifier,
            signature_provider,
            signature_verifier,
            my_address,
        }
    }

    /// Address of this party.
    pub fn my_address(&self) -> Address {
        self.my_address
    }

    /// Signs the next state of the channel with `recipient`, opening one if needed.
    ///
    /// Fails while our previous message is not countersigned or once the channel exited.
    pub async fn create_new_message(
        &self,
        address_balance: AddressBalance,
        recipient: Address,
    ) -> DecideResult<SignedMessage> {
        if !is_valid_address_balance(&address_balance)
            || !address_balance.contains_key(&self.my_address)
            || !address_balance.contains_key(&recipient)
        {
            return Err(Error::invalid_message(
                "balances must be non-negative and cover exactly both parties",
            ));
        }

        let (channel_id, nonce) =
            match self.message_db.get_channel_for_counterparty(&recipient).await? {
                Some(channel_id) => {
                    if self.message_db.is_channel_exited(&channel_id).await? {
                        return Err(Error::ChannelExited { channel_id });
                    }
                    let last_valid = self
                        .message_db
                        .get_most_recent_valid_message(&channel_id)
                        .await?
                        .ok_or(Error::NotCountersigned { channel_id })?;
                    let last_signed = self
                        .message_db
                        .get_most_recent_message_signed_by(&channel_id, &self.my_address)
                        .await?;
                    if last_signed.map_or(false, |m| m.message.nonce > last_valid.message.nonce)
                    {
                        return Err(Error::NotCountersigned { channel_id });
                    }
                    (channel_id, next_nonce(last_valid.message.nonce)?)
                }
                None => (ChannelId::random(), 1),
            };

        let message = StateChannelMessage {
            channel_id,
            nonce,
            address_balance,
        };
        let serialized_message = message.serialize();
        let signature = self.signature_provider.sign(&serialized_message).await?;
        let mut signatures = BTreeMap::new();
        signatures.insert(self.my_address, signature.clone());
        self.message_db
            .store_message(ParsedMessage {
                sender: self.my_address,
                recipient,
                message,
                signatures,
            })
            .await?;
        log::info!(
            target: LOG_TARGET,
            "signed message {} of channel {} for {:?}",
            nonce,
            channel_id,
            recipient
        );
        Ok(SignedMessage {
            serialized_message,
            signature,
        })
    }

    /// Stores an incoming message and countersigns it when it is a new, acceptable state.
    ///
    /// Duplicate, stale, conflicting or malformed states are kept but get no reply.
    /// Only bytes that do not decode as a message are an error.
    pub async fn handle_message(
        &self,
        signed: &SignedMessage,
    ) -> DecideResult<Option<SignedMessage>> {
        let message = StateChannelMessage::deserialize(&signed.serialized_message)?;
        if !is_valid_address_balance(&message.address_balance)
            || !message.address_balance.contains_key(&self.my_address)
        {
            log::debug!(target: LOG_TARGET, "ignoring message with invalid parties or balances");
            return Ok(None);
        }
        let sender = match find_signer(&message, &signed.signature, &*self.signature_verifier).await?
        {
            Some(sender) if sender != self.my_address => sender,
            _ => {
                log::debug!(target: LOG_TARGET, "ignoring message not signed by the counterparty");
                return Ok(None);
            }
        };
        let channel_id = message.channel_id;
        if self.message_db.is_channel_exited(&channel_id).await? {
            log::debug!(target: LOG_TARGET, "ignoring message for exited channel {}", channel_id);
            return Ok(None);
        }

        match self.message_db.get_channel_for_counterparty(&sender).await? {
            Some(known) if known != channel_id => {
                log::debug!(
                    target: LOG_TARGET,
                    "ignoring message for channel {}, already in channel {} with {:?}",
                    channel_id,
                    known,
                    sender
                );
                return Ok(None);
            }
            _ => {}
        }

        let mut signatures = BTreeMap::new();
        signatures.insert(sender, signed.signature.clone());
        let mut parsed = ParsedMessage {
            sender,
            recipient: self.my_address,
            message,
            signatures,
        };

        if let Some(mut existing) = self
            .message_db
            .get_message_by_channel_id_and_nonce(&channel_id, parsed.message.nonce)
            .await?
        {
            if !messages_conflict(&existing, &parsed) {
                existing.signatures.append(&mut parsed.signatures);
                parsed = existing;
            }
            self.message_db.store_message(parsed).await?;
            return Ok(None);
        }

        let acceptable = self.is_acceptable(&parsed).await?;
        self.message_db.store_message(parsed.clone()).await?;
        if !acceptable {
            return Ok(None);
        }

        let serialized_message = parsed.message.serialize();
        let signature = self.signature_provider.sign(&serialized_message).await?;
        parsed.signatures.insert(self.my_address, signature.clone());
        log::info!(
            target: LOG_TARGET,
            "countersigned message {} of channel {}",
            parsed.message.nonce,
            channel_id
        );
        self.message_db.store_message(parsed).await?;
        Ok(Some(SignedMessage {
            serialized_message,
            signature,
        }))
    }

    // A first message for a channel nobody uses yet, or a state beyond the countersigned one.
    async fn is_acceptable(&self, parsed: &ParsedMessage) -> DecideResult<bool> {
        let channel_id = parsed.message.channel_id;
        let nonce = parsed.message.nonce;
        if self
            .message_db
            .conflicts_with_another_message(parsed)
            .await?
            .is_some()
        {
            log::debug!(target: LOG_TARGET, "message {} of channel {} conflicts", nonce, channel_id);
            return Ok(false);
        }
        if nonce == Nonce::MAX {
            log::debug!(target: LOG_TARGET, "message of channel {} exhausts the nonce space", channel_id);
            return Ok(false);
        }
        if nonce == 1 {
            return Ok(!self.message_db.channel_id_exists(&channel_id).await?);
        }
        let last_valid = self
            .message_db
            .get_most_recent_valid_message(&channel_id)
            .await?;
        Ok(last_valid.map_or(false, |last| nonce > last.message.nonce))
    }

    /// Claims the exit of the channel with `counterparty` at its latest countersigned state
    /// and stops using the channel.
    pub async fn exit_channel(&self, counterparty: Address) -> DecideResult<Claim> {
        let channel_id = self
            .message_db
            .get_channel_for_counterparty(&counterparty)
            .await?
            .ok_or(Error::UnknownCounterparty { counterparty })?;
        let latest = self
            .message_db
            .get_most_recent_valid_message(&channel_id)
            .await?
            .ok_or(Error::NotCountersigned { channel_id })?;
        let claim = self.exit_claim(counterparty, &latest)?;

        self.message_db.mark_channel_exited(&channel_id).await?;
        log::info!(
            target: LOG_TARGET,
            "exiting channel {} at nonce {}",
            channel_id,
            latest.message.nonce
        );
        Ok(claim)
    }

    /// The exit claim at `exited`: the counterparty signed it, and every message we signed
    /// in its channel has a nonce below the one after it.
    pub fn exit_claim(&self, counterparty: Address, exited: &ParsedMessage) -> DecideResult<Claim> {
        let channel_id = exited.message.channel_id;
        let signature = exited
            .signatures
            .get(&counterparty)
            .cloned()
            .ok_or(Error::NotCountersigned { channel_id })?;

        let signed_by_counterparty = Claim::new(
            self.signed_by_decider.clone(),
            PropertyInput::SignedBy(SignedByInput {
                public_key: counterparty,
                message: exited.message.serialize(),
            }),
        )
        .with_witness(Witness::Signature(signature));
        let nothing_newer = Claim::new(
            ForAllSuchThatDecider::instance(),
            PropertyInput::ForAllSuchThat(QuantifiedInput {
                quantifier: self.signed_by_quantifier.clone(),
                parameters: QuantifierParameters::SignedBy {
                    address: self.my_address,
                    channel_id: Some(channel_id),
                },
                property_factory: nonce_less_than_factory(next_nonce(exited.message.nonce)?),
            }),
        );
        Ok(Claim::new(
            AndDecider::instance(),
            PropertyInput::And(ConnectiveInput {
                properties: vec![signed_by_counterparty, nothing_newer],
            }),
        ))
    }

    /// Decides an exit claimed on `channel_id`.
    ///
    /// Returns the refuting justification when the claim is false. Otherwise, including
    /// when it cannot be decided, the exit is accepted and the channel marked exited.
    pub async fn handle_channel_exit(
        &self,
        channel_id: &ChannelId,
        claim: &Claim,
    ) -> DecideResult<Option<Vec<ImplicationProofItem>>> {
        match claim.decide().await {
            Ok(decision) if !decision.outcome => {
                log::info!(
                    target: LOG_TARGET,
                    "disputing exit of channel {} with {} justification items",
                    channel_id,
                    decision.justification.len()
                );
                return Ok(Some(decision.justification));
            }
            Ok(_) => {}
            Err(e) if e.is_cannot_decide() => {
                log::debug!(target: LOG_TARGET, "accepting undecidable exit of {}: {}", channel_id, e);
            }
            Err(e) => return Err(e),
        }
        self.message_db.mark_channel_exited(channel_id).await?;
        log::info!(target: LOG_TARGET, "channel {} exited", channel_id);
        Ok(None)
    }
}

/// Nonce following `nonce`. The last nonce has no successor, so it is never countersigned.
fn next_nonce(nonce: Nonce) -> DecideResult<Nonce> {
    nonce
        .checked_add(1)
        .ok_or_else(|| Error::invalid_message("nonce space exhausted"))
}

/// Maps a quantified signed message to "its nonce is below `less_than_this`".
pub fn nonce_less_than_factory(less_than_this: Nonce) -> PropertyFactory {
    Arc::new(move |item: &Quantified| {
        let signed = match item {
            Quantified::SignedMessage(signed) => signed,
            other => {
                return Err(Error::invalid_message(format!(
                    "expected a signed message, got {:?}",
                    other
                )))
            }
        };
        Ok(Claim::new(
            MessageNonceLessThanDecider::instance(),
            PropertyInput::MessageNonceLessThan(MessageNonceLessThanInput {
                message_with_nonce: StateChannelMessage::deserialize(&signed.serialized_message)?,
                less_than_this,
            }),
        ))
    })
}
