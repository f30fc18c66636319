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
use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

/// Signed messages indexed by signer.
#[async_trait]
pub trait SignedByDb: Send + Sync {
    /// Records that `signer` signed `signed`. Duplicates are ignored.
    async fn store_signed_message(&self, signer: Address, signed: SignedMessage)
        -> DecideResult<()>;

    /// Every message known to be signed by `signer`.
    async fn get_all_signed_by(&self, signer: &Address) -> DecideResult<Vec<SignedMessage>>;
}

/// Persistence the [`StateChannelClient`] runs on.
#[async_trait]
pub trait StateChannelMessageDb: SignedByDb {
    /// Stores `message` under its (channel, nonce) slot, or as a conflict when the slot
    /// holds different state. Every signature it carries is indexed by signer.
    ///
    /// Two parties share at most one channel; messages opening another one are refused.
    async fn store_message(&self, message: ParsedMessage) -> DecideResult<()>;

    /// The message held at (channel, nonce).
    async fn get_message_by_channel_id_and_nonce(
        &self,
        channel_id: &ChannelId,
        nonce: Nonce,
    ) -> DecideResult<Option<ParsedMessage>>;

    /// The highest-nonce countersigned message of the channel.
    async fn get_most_recent_valid_message(
        &self,
        channel_id: &ChannelId,
    ) -> DecideResult<Option<ParsedMessage>>;

    /// The highest-nonce message of the channel carrying a signature of `address`.
    async fn get_most_recent_message_signed_by(
        &self,
        channel_id: &ChannelId,
        address: &Address,
    ) -> DecideResult<Option<ParsedMessage>>;

    /// A stored message disagreeing with `message` about its (channel, nonce) slot.
    async fn conflicts_with_another_message(
        &self,
        message: &ParsedMessage,
    ) -> DecideResult<Option<ParsedMessage>>;

    /// The channel shared with `counterparty`.
    async fn get_channel_for_counterparty(
        &self,
        counterparty: &Address,
    ) -> DecideResult<Option<ChannelId>>;

    /// Whether any message of the channel is stored.
    async fn channel_id_exists(&self, channel_id: &ChannelId) -> DecideResult<bool>;

    /// Whether the channel was exited.
    async fn is_channel_exited(&self, channel_id: &ChannelId) -> DecideResult<bool>;

    /// Closes the channel to new state.
    async fn mark_channel_exited(&self, channel_id: &ChannelId) -> DecideResult<()>;
}

#[derive(Default)]
struct Inner {
    messages: BTreeMap<(ChannelId, Nonce), ParsedMessage>,
    conflicts: BTreeMap<(ChannelId, Nonce), ParsedMessage>,
    signed_by: BTreeMap<Address, Vec<SignedMessage>>,
    exited: BTreeSet<ChannelId>,
}

impl Inner {
    fn index_signatures(&mut self, message: &ParsedMessage) {
        for signer in message.signatures.keys() {
            if let Some(signed) = message.signed_message(signer) {
                let known = self.signed_by.entry(*signer).or_default();
                if !known.contains(&signed) {
                    known.push(signed);
                }
            }
        }
    }

    fn channel_of(&self, party: &Address) -> Option<ChannelId> {
        self.messages
            .values()
            .find(|message| message.sender == *party || message.recipient == *party)
            .map(|message| message.message.channel_id)
    }

    fn channel_between(&self, a: &Address, b: &Address) -> Option<ChannelId> {
        self.messages
            .values()
            .find(|message| {
                (message.sender == *a && message.recipient == *b)
                    || (message.sender == *b && message.recipient == *a)
            })
            .map(|message| message.message.channel_id)
    }

    fn channel_messages<'a>(
        &'a self,
        channel_id: &ChannelId,
    ) -> impl DoubleEndedIterator<Item = &'a ParsedMessage> + 'a {
        let channel_id = *channel_id;
        self.messages
            .range((channel_id, Nonce::MIN)..=(channel_id, Nonce::MAX))
            .map(|(_, message)| message)
    }
}

/// Process-local message store.
#[derive(Default)]
pub struct InMemoryMessageDb {
    inner: RwLock<Inner>,
}

impl InMemoryMessageDb {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SignedByDb for InMemoryMessageDb {
    async fn store_signed_message(
        &self,
        signer: Address,
        signed: SignedMessage,
    ) -> DecideResult<()> {
        let mut inner = self.inner.write().await;
        let known = inner.signed_by.entry(signer).or_default();
        if !known.contains(&signed) {
            known.push(signed);
        }
        Ok(())
    }

    async fn get_all_signed_by(&self, signer: &Address) -> DecideResult<Vec<SignedMessage>> {
        Ok(self
            .inner
            .read()
            .await
            .signed_by
            .get(signer)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl StateChannelMessageDb for InMemoryMessageDb {
    async fn store_message(&self, message: ParsedMessage) -> DecideResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(known) = inner.channel_between(&message.sender, &message.recipient) {
            if known != message.message.channel_id {
                return Err(Error::Storage {
                    msg: format!(
                        "{:?} and {:?} already share channel {}",
                        message.sender, message.recipient, known
                    ),
                });
            }
        }
        inner.index_signatures(&message);
        let key = (message.message.channel_id, message.message.nonce);
        let conflicting = inner
            .messages
            .get(&key)
            .map_or(false, |existing| messages_conflict(existing, &message));
        if conflicting {
            inner.conflicts.insert(key, message);
        } else {
            inner.messages.insert(key, message);
        }
        Ok(())
    }

    async fn get_message_by_channel_id_and_nonce(
        &self,
        channel_id: &ChannelId,
        nonce: Nonce,
    ) -> DecideResult<Option<ParsedMessage>> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .get(&(*channel_id, nonce))
            .cloned())
    }

    async fn get_most_recent_valid_message(
        &self,
        channel_id: &ChannelId,
    ) -> DecideResult<Option<ParsedMessage>> {
        let inner = self.inner.read().await;
        let found = inner
            .channel_messages(channel_id)
            .rev()
            .find(|message| message.is_countersigned())
            .cloned();
        Ok(found)
    }

    async fn get_most_recent_message_signed_by(
        &self,
        channel_id: &ChannelId,
        address: &Address,
    ) -> DecideResult<Option<ParsedMessage>> {
        let inner = self.inner.read().await;
        let found = inner
            .channel_messages(channel_id)
            .rev()
            .find(|message| message.signatures.contains_key(address))
            .cloned();
        Ok(found)
    }

    async fn conflicts_with_another_message(
        &self,
        message: &ParsedMessage,
    ) -> DecideResult<Option<ParsedMessage>> {
        let inner = self.inner.read().await;
        let key = (message.message.channel_id, message.message.nonce);
        if let Some(conflict) = inner.conflicts.get(&key) {
            return Ok(Some(conflict.clone()));
        }
        Ok(inner
            .messages
            .get(&key)
            .filter(|stored| messages_conflict(stored, message))
            .cloned())
    }

    async fn get_channel_for_counterparty(
        &self,
        counterparty: &Address,
    ) -> DecideResult<Option<ChannelId>> {
        Ok(self.inner.read().await.channel_of(counterparty))
    }

    async fn channel_id_exists(&self, channel_id: &ChannelId) -> DecideResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .channel_messages(channel_id)
            .next()
            .is_some())
    }

    async fn is_channel_exited(&self, channel_id: &ChannelId) -> DecideResult<bool> {
        Ok(self.inner.read().await.exited.contains(channel_id))
    }

    async fn mark_channel_exited(&self, channel_id: &ChannelId) -> DecideResult<()> {
        self.inner.write().await.exited.insert(*channel_id);
        Ok(())
    }
}
