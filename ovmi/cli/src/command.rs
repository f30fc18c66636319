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

//! OVM state channel CLI handlers.

use crate::cli::*;

use clap::Parser;
use ovmi::crypto::{EcdsaSignatureVerifier, EcdsaSigner, SignatureProvider};
use ovmi::db::InMemoryKeyValueStore;
use ovmi::deciders::SignedByDecider;
use ovmi::quantifiers::SignedByQuantifier;
use ovmi::state_channel::{
    AddressBalance, InMemoryMessageDb, SignedMessage, StateChannelClient, StateChannelMessage,
    StateChannelMessageDb,
};
use ovmi::{Address, DecideResult};
use std::sync::Arc;

const LOG_TARGET: &str = "ovmi::cli";

/// CLI error type.
pub type Error = String;

/// Parse command line arguments and run the requested command.
pub fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    match &cli.subcommand {
        Some(Subcommand::Address(cmd)) => {
            let signer = EcdsaSigner::from_seed(&cmd.seed).map_err(|e| e.to_string())?;
            println!("{:?}", signer.address());
        }
        Some(Subcommand::Session(cmd)) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .build()
                .map_err(|e| e.to_string())?;
            runtime.block_on(session(cmd)).map_err(|e| e.to_string())?;
        }
        None => {}
    }
    Ok(())
}

struct Party {
    name: &'static str,
    address: Address,
    message_db: Arc<InMemoryMessageDb>,
    client: StateChannelClient,
}

impl Party {
    fn new(name: &'static str, seed: Option<&[u8; 32]>) -> DecideResult<Self> {
        let signer = Arc::new(match seed {
            Some(seed) => EcdsaSigner::from_seed(seed)?,
            None => EcdsaSigner::random(),
        });
        let address = signer.address();
        let message_db = Arc::new(InMemoryMessageDb::new());
        let decisions = InMemoryKeyValueStore::new();
        let client = StateChannelClient::new(
            message_db.clone(),
            SignedByDecider::cached(EcdsaSignatureVerifier::instance(), &decisions),
            Arc::new(SignedByQuantifier::new(message_db.clone(), address)),
            signer,
            EcdsaSignatureVerifier::instance(),
        );
        Ok(Party {
            name,
            address,
            message_db,
            client,
        })
    }
}

// `receiver` countersigns and `sender` records the countersignature.
async fn exchange(sender: &Party, receiver: &Party, signed: &SignedMessage) -> DecideResult<()> {
    let countersigned = receiver.client.handle_message(signed).await?.ok_or_else(|| {
        ovmi::Error::invalid_message(format!("{} refused to countersign", receiver.name))
    })?;
    sender.client.handle_message(&countersigned).await?;
    Ok(())
}

async fn session(cmd: &SessionCmd) -> DecideResult<()> {
    let alice = Party::new("alice", cmd.alice_seed.as_ref())?;
    let bob = Party::new("bob", cmd.bob_seed.as_ref())?;
    println!("alice: {:?}", alice.address);
    println!("bob:   {:?}", bob.address);

    let mut balance = AddressBalance::new();
    balance.insert(alice.address, cmd.deposit);
    balance.insert(bob.address, cmd.deposit);
    let opening = alice
        .client
        .create_new_message(balance.clone(), bob.address)
        .await?;
    exchange(&alice, &bob, &opening).await?;
    let channel_id = StateChannelMessage::deserialize(&opening.serialized_message)?.channel_id;
    println!("opened channel {}", channel_id);

    let (mut payer, mut payee) = (&alice, &bob);
    for round in 1..=cmd.rounds {
        let remaining = balance.get(&payer.address).copied().unwrap_or_default() - cmd.transfer;
        if remaining < 0 {
            log::warn!(
                target: LOG_TARGET,
                "{} cannot pay {} in round {}",
                payer.name,
                cmd.transfer,
                round
            );
            break;
        }
        balance.insert(payer.address, remaining);
        *balance.entry(payee.address).or_default() += cmd.transfer;

        let signed = payer
            .client
            .create_new_message(balance.clone(), payee.address)
            .await?;
        exchange(payer, payee, &signed).await?;
        println!(
            "round {}: {} paid {} to {}",
            round, payer.name, cmd.transfer, payee.name
        );
        std::mem::swap(&mut payer, &mut payee);
    }

    let claim = if cmd.dispute {
        let opening = alice
            .message_db
            .get_message_by_channel_id_and_nonce(&channel_id, 1)
            .await?
            .ok_or(ovmi::Error::NotCountersigned { channel_id })?;
        alice.client.exit_claim(bob.address, &opening)?
    } else {
        alice.client.exit_channel(bob.address).await?
    };

    match bob.client.handle_channel_exit(&channel_id, &claim).await? {
        Some(justification) => {
            println!("bob refuted the exit of channel {}:", channel_id);
            for item in justification {
                println!(
                    "  {} {:?}",
                    item.implication.decider.unique_id(),
                    item.implication.input
                );
            }
        }
        None => println!("bob accepted the exit of channel {}", channel_id),
    }
    Ok(())
}
