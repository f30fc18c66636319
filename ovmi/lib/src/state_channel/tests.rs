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
use crate::crypto::{EcdsaSignatureVerifier, SignatureProvider, SignatureVerifier};
use crate::deciders::*;
use crate::mock::*;
use crate::quantifiers::{Quantifier, QuantifierParameters};
use assert_matches::assert_matches;

async fn create_channel(a: &Participant, b: &Participant) -> SignedMessage {
    let signed = a
        .client
        .create_new_message(balances(&[(a.address, 10), (b.address, 10)]), b.address)
        .await
        .unwrap();
    let message = StateChannelMessage::deserialize(&signed.serialized_message).unwrap();
    assert_eq!(message.nonce, 1);
    assert!(EcdsaSignatureVerifier
        .verify(&a.address, &signed.serialized_message, &signed.signature)
        .await
        .unwrap());
    signed
}

/// `me` countersigns `signed` and `other` takes the countersignature without replying.
async fn acknowledge(signed: &SignedMessage, me: &Participant, other: &Participant) {
    let countersigned = me
        .client
        .handle_message(signed)
        .await
        .unwrap()
        .expect("message should be countersigned");
    assert_eq!(countersigned.serialized_message, signed.serialized_message);
    assert!(EcdsaSignatureVerifier
        .verify(&me.address, &countersigned.serialized_message, &countersigned.signature)
        .await
        .unwrap());
    assert_eq!(other.client.handle_message(&countersigned).await.unwrap(), None);
}

fn channel_id_of(signed: &SignedMessage) -> ChannelId {
    StateChannelMessage::deserialize(&signed.serialized_message)
        .unwrap()
        .channel_id
}

async fn sign_as(
    participant: &Participant,
    channel_id: ChannelId,
    nonce: Nonce,
    address_balance: AddressBalance,
) -> SignedMessage {
    let serialized_message = StateChannelMessage {
        channel_id,
        nonce,
        address_balance,
    }
    .serialize();
    let signature = participant.signer.sign(&serialized_message).await.unwrap();
    SignedMessage {
        serialized_message,
        signature,
    }
}

#[tokio::test]
async fn channel_creation_is_acknowledged() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;

    let channel_id = channel_id_of(&signed);
    for participant in [&a, &b] {
        let latest = participant
            .message_db
            .get_most_recent_valid_message(&channel_id)
            .await
            .unwrap()
            .unwrap();
        assert!(latest.is_countersigned());
        assert_eq!(latest.message.nonce, 1);
    }
    assert_eq!(
        a.message_db.get_channel_for_counterparty(&b.address).await.unwrap(),
        Some(channel_id)
    );
}

#[tokio::test]
async fn messages_need_countersignature() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    let channel_id = channel_id_of(&signed);

    assert_matches!(
        a.client
            .create_new_message(balances(&[(a.address, 5), (b.address, 15)]), b.address)
            .await,
        Err(Error::NotCountersigned { channel_id: id }) if id == channel_id
    );

    acknowledge(&signed, &b, &a).await;
    let next = a
        .client
        .create_new_message(balances(&[(a.address, 5), (b.address, 15)]), b.address)
        .await
        .unwrap();
    let message = StateChannelMessage::deserialize(&next.serialized_message).unwrap();
    assert_eq!(message.nonce, 2);
    assert_eq!(message.channel_id, channel_id);

    // still pending
    assert_matches!(
        a.client
            .create_new_message(balances(&[(a.address, 4), (b.address, 16)]), b.address)
            .await,
        Err(Error::NotCountersigned { .. })
    );
}

#[tokio::test]
async fn both_parties_advance_the_channel() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;

    let from_a = a
        .client
        .create_new_message(balances(&[(a.address, 5), (b.address, 15)]), b.address)
        .await
        .unwrap();
    acknowledge(&from_a, &b, &a).await;

    let from_b = b
        .client
        .create_new_message(balances(&[(a.address, 15), (b.address, 5)]), a.address)
        .await
        .unwrap();
    assert_eq!(
        StateChannelMessage::deserialize(&from_b.serialized_message)
            .unwrap()
            .nonce,
        3
    );
    acknowledge(&from_b, &a, &b).await;
}

#[tokio::test]
async fn invalid_messages_get_no_reply() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;
    let channel_id = channel_id_of(&signed);

    // duplicate
    assert_eq!(b.client.handle_message(&signed).await.unwrap(), None);

    // negative balance
    let negative = sign_as(&a, channel_id, 2, balances(&[(a.address, -1), (b.address, 21)])).await;
    assert_eq!(b.client.handle_message(&negative).await.unwrap(), None);

    // third party
    let carol = Participant::new(&[0x0c; 32]);
    let crowded = sign_as(
        &a,
        channel_id,
        2,
        balances(&[(a.address, 5), (b.address, 5), (carol.address, 10)]),
    )
    .await;
    assert_eq!(b.client.handle_message(&crowded).await.unwrap(), None);

    // signed by someone else
    let forged = sign_as(&carol, channel_id, 2, balances(&[(a.address, 0), (b.address, 20)])).await;
    assert_eq!(b.client.handle_message(&forged).await.unwrap(), None);

    // stale nonce
    let stale = sign_as(&a, channel_id, 1, balances(&[(a.address, 0), (b.address, 20)])).await;
    assert_eq!(b.client.handle_message(&stale).await.unwrap(), None);

    // garbage is an error
    let garbage = SignedMessage {
        serialized_message: vec![1, 2, 3],
        signature: vec![0; 65],
    };
    assert_matches!(
        b.client.handle_message(&garbage).await,
        Err(Error::Codec { .. })
    );
}

#[tokio::test]
async fn second_channel_with_same_counterparty_is_refused() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;

    let other_channel = sign_as(
        &a,
        ChannelId::random(),
        1,
        balances(&[(a.address, 1), (b.address, 1)]),
    )
    .await;
    assert_eq!(b.client.handle_message(&other_channel).await.unwrap(), None);
    assert!(!b
        .message_db
        .channel_id_exists(&channel_id_of(&other_channel))
        .await
        .unwrap());
    assert_eq!(
        b.message_db.get_channel_for_counterparty(&a.address).await.unwrap(),
        Some(channel_id_of(&signed))
    );
}

#[tokio::test]
async fn conflicting_message_is_kept_aside() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;
    let channel_id = channel_id_of(&signed);

    let next = a
        .client
        .create_new_message(balances(&[(a.address, 5), (b.address, 15)]), b.address)
        .await
        .unwrap();
    acknowledge(&next, &b, &a).await;

    // A signs a different state for nonce 2
    let conflicting = sign_as(&a, channel_id, 2, balances(&[(a.address, 20), (b.address, 0)])).await;
    assert_eq!(b.client.handle_message(&conflicting).await.unwrap(), None);

    let stored = b
        .message_db
        .get_message_by_channel_id_and_nonce(&channel_id, 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.message.serialize(), next.serialized_message);
    assert!(stored.is_countersigned());

    let conflict = b
        .message_db
        .conflicts_with_another_message(&stored)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conflict.message.serialize(), conflicting.serialized_message);

    // the conflicting signature is still on record
    let signed_by_a = b.message_db.get_all_signed_by(&a.address).await.unwrap();
    assert!(signed_by_a.contains(&conflicting));
}

#[tokio::test]
async fn exited_channel_is_closed() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;
    let channel_id = channel_id_of(&signed);

    let claim = a.client.exit_channel(b.address).await.unwrap();
    assert!(a.message_db.is_channel_exited(&channel_id).await.unwrap());
    assert_matches!(
        a.client
            .create_new_message(balances(&[(a.address, 5), (b.address, 15)]), b.address)
            .await,
        Err(Error::ChannelExited { .. })
    );

    assert_eq!(b.client.handle_channel_exit(&channel_id, &claim).await.unwrap(), None);
    assert!(b.message_db.is_channel_exited(&channel_id).await.unwrap());
    let late = sign_as(&a, channel_id, 2, balances(&[(a.address, 5), (b.address, 15)])).await;
    assert_eq!(b.client.handle_message(&late).await.unwrap(), None);
}

#[tokio::test]
async fn exit_needs_known_counterparty() {
    let (a, b) = (Participant::alice(), Participant::bob());
    assert_matches!(
        a.client.exit_channel(b.address).await,
        Err(Error::UnknownCounterparty { .. })
    );

    let signed = create_channel(&a, &b).await;
    assert_matches!(
        a.client.exit_channel(b.address).await,
        Err(Error::NotCountersigned { channel_id }) if channel_id == channel_id_of(&signed)
    );
}

#[tokio::test]
async fn signed_by_quantifier_is_complete_only_for_own_address() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;
    let channel_id = channel_id_of(&signed);

    let mine = a
        .signed_by_quantifier
        .get_all_quantified(&QuantifierParameters::SignedBy {
            address: a.address,
            channel_id: Some(channel_id),
        })
        .await
        .unwrap();
    assert!(mine.all_results_quantified);
    assert_eq!(mine.results.len(), 1);

    let theirs = a
        .signed_by_quantifier
        .get_all_quantified(&QuantifierParameters::SignedBy {
            address: b.address,
            channel_id: Some(channel_id),
        })
        .await
        .unwrap();
    assert!(!theirs.all_results_quantified);
    assert_eq!(theirs.results.len(), 1);

    let elsewhere = a
        .signed_by_quantifier
        .get_all_quantified(&QuantifierParameters::SignedBy {
            address: a.address,
            channel_id: Some(ChannelId::random()),
        })
        .await
        .unwrap();
    assert!(elsewhere.results.is_empty());
}

#[tokio::test]
async fn exit_of_a_is_accepted_by_b() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;

    let claim = a.client.exit_channel(b.address).await.unwrap();
    assert_eq!(claim.property.decider.unique_id(), AndDecider::ID);
    assert!(claim.decide().await.unwrap().outcome);
    assert_eq!(
        b.client
            .handle_channel_exit(&channel_id_of(&signed), &claim)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn exit_of_b_is_accepted_by_a() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;

    let claim = b.client.exit_channel(a.address).await.unwrap();
    assert_eq!(
        a.client
            .handle_channel_exit(&channel_id_of(&signed), &claim)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn exit_of_second_message_is_accepted() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;
    let next = a
        .client
        .create_new_message(balances(&[(a.address, 5), (b.address, 15)]), b.address)
        .await
        .unwrap();
    acknowledge(&next, &b, &a).await;

    let claim = a.client.exit_channel(b.address).await.unwrap();
    match &*claim.property.input {
        PropertyInput::And(input) => match &*input.properties[0].property.input {
            PropertyInput::SignedBy(signed_by) => {
                assert_eq!(signed_by.public_key, b.address);
                assert_eq!(signed_by.message, next.serialized_message);
            }
            other => panic!("unexpected left operand {:?}", other),
        },
        other => panic!("unexpected exit claim {:?}", other),
    }
    assert_eq!(
        b.client
            .handle_channel_exit(&channel_id_of(&signed), &claim)
            .await
            .unwrap(),
        None
    );
}

/// An exit at `latest`, claiming `exiter` never signed a nonce of `latest` or above.
fn refutable_exit(
    disputer: &Participant,
    exiter: &Participant,
    latest: &ParsedMessage,
) -> Claim {
    let signed_by_disputer = Claim::new(
        disputer.signed_by_decider.clone(),
        PropertyInput::SignedBy(SignedByInput {
            public_key: disputer.address,
            message: latest.message.serialize(),
        }),
    );
    let signed_by_disputer = match latest.signatures.get(&disputer.address) {
        Some(signature) => signed_by_disputer.with_witness(Witness::Signature(signature.clone())),
        None => signed_by_disputer,
    };
    let nothing_newer = Claim::new(
        ForAllSuchThatDecider::instance(),
        PropertyInput::ForAllSuchThat(QuantifiedInput {
            quantifier: disputer.signed_by_quantifier.clone(),
            parameters: QuantifierParameters::SignedBy {
                address: exiter.address,
                channel_id: Some(latest.message.channel_id),
            },
            property_factory: nonce_less_than_factory(latest.message.nonce),
        }),
    );
    Claim::new(
        AndDecider::instance(),
        PropertyInput::And(ConnectiveInput {
            properties: vec![signed_by_disputer, nothing_newer],
        }),
    )
}

async fn assert_refuted(disputer: &Participant, exiter: &Participant, signed: &SignedMessage) {
    let latest = parse_state_channel_signed_message(signed, &EcdsaSignatureVerifier)
        .await
        .unwrap();
    let claim = refutable_exit(disputer, exiter, &latest);

    let justification = disputer
        .client
        .handle_channel_exit(&latest.message.channel_id, &claim)
        .await
        .unwrap()
        .expect("exit should be refuted");

    assert_eq!(justification.len(), 3);
    let ids: Vec<_> = justification
        .iter()
        .map(|item| item.implication.decider.unique_id().to_string())
        .collect();
    assert_eq!(
        ids,
        vec![
            AndDecider::ID,
            ForAllSuchThatDecider::ID,
            MessageNonceLessThanDecider::ID
        ]
    );
    match &*justification[2].implication.input {
        PropertyInput::MessageNonceLessThan(input) => {
            assert!(input.message_with_nonce.nonce >= input.less_than_this)
        }
        other => panic!("unexpected counter-claim {:?}", other),
    }
    assert!(!disputer
        .message_db
        .is_channel_exited(&latest.message.channel_id)
        .await
        .unwrap());
}

#[tokio::test]
async fn b_refutes_invalid_nonce_exit_from_a() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;

    assert_refuted(&b, &a, &signed).await;
}

#[tokio::test]
async fn a_refutes_invalid_nonce_exit_from_b() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;

    assert_refuted(&a, &b, &signed).await;
}

#[tokio::test]
async fn exit_composes_signed_by_inside_and() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    let verifier = EcdsaSignatureVerifier::instance();
    let signed_by = |signature: Option<Vec<u8>>| {
        let claim = Claim::new(
            a.signed_by_decider.clone(),
            PropertyInput::SignedBy(SignedByInput {
                public_key: a.address,
                message: signed.serialized_message.clone(),
            }),
        );
        match signature {
            Some(signature) => claim.with_witness(Witness::Signature(signature)),
            None => claim,
        }
    };

    let decision = and(vec![signed_by(Some(signed.signature.clone())), truthy()])
        .decide()
        .await
        .unwrap();
    assert!(decision.outcome);
    assert_eq!(decision.justification.len(), 3);
    assert_eq!(
        decision.justification[1].implication_witness,
        Some(Witness::Signature(signed.signature.clone()))
    );
    assert!(verifier
        .verify(&a.address, &signed.serialized_message, &signed.signature)
        .await
        .unwrap());

    // once decided, the cache vouches for the signature
    let decision = and(vec![signed_by(None), truthy()]).decide().await.unwrap();
    assert!(decision.outcome);
}

#[tokio::test]
async fn message_db_keeps_one_channel_per_pair() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let carol = Participant::new(&[0x0c; 32]);
    let parsed = |recipient: Address, channel_id| ParsedMessage {
        sender: a.address,
        recipient,
        message: StateChannelMessage {
            channel_id,
            nonce: 1,
            address_balance: balances(&[(a.address, 1), (recipient, 1)]),
        },
        signatures: Default::default(),
    };

    a.message_db
        .store_message(parsed(b.address, ChannelId::random()))
        .await
        .unwrap();
    assert_matches!(
        a.message_db
            .store_message(parsed(b.address, ChannelId::random()))
            .await,
        Err(Error::Storage { .. })
    );
    // another counterparty gets its own channel
    a.message_db
        .store_message(parsed(carol.address, ChannelId::random()))
        .await
        .unwrap();
}

#[tokio::test]
async fn stale_exit_is_refuted() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;
    let next = a
        .client
        .create_new_message(balances(&[(a.address, 5), (b.address, 15)]), b.address)
        .await
        .unwrap();
    acknowledge(&next, &b, &a).await;
    let channel_id = channel_id_of(&signed);

    let stale = a
        .message_db
        .get_message_by_channel_id_and_nonce(&channel_id, 1)
        .await
        .unwrap()
        .unwrap();
    let claim = a.client.exit_claim(b.address, &stale).unwrap();
    let justification = b
        .client
        .handle_channel_exit(&channel_id, &claim)
        .await
        .unwrap()
        .expect("stale exit should be refuted");

    assert_eq!(justification.len(), 3);
    match &*justification[2].implication.input {
        PropertyInput::MessageNonceLessThan(input) => {
            assert_eq!(input.message_with_nonce.nonce, 2);
            assert_eq!(input.less_than_this, 2);
        }
        other => panic!("unexpected counter-claim {:?}", other),
    }
}

#[tokio::test]
async fn last_nonce_is_never_countersigned() {
    let (a, b) = (Participant::alice(), Participant::bob());
    let signed = create_channel(&a, &b).await;
    acknowledge(&signed, &b, &a).await;
    let channel_id = channel_id_of(&signed);

    let last = sign_as(
        &a,
        channel_id,
        Nonce::MAX,
        balances(&[(a.address, 0), (b.address, 20)]),
    )
    .await;
    assert_eq!(b.client.handle_message(&last).await.unwrap(), None);
    assert_eq!(
        b.message_db
            .get_most_recent_valid_message(&channel_id)
            .await
            .unwrap()
            .unwrap()
            .message
            .nonce,
        1
    );

    // the channel keeps working from the last countersigned state
    let next = b
        .client
        .create_new_message(balances(&[(a.address, 15), (b.address, 5)]), a.address)
        .await
        .unwrap();
    assert_eq!(
        StateChannelMessage::deserialize(&next.serialized_message)
            .unwrap()
            .nonce,
        2
    );
    b.client.exit_channel(a.address).await.unwrap();
    assert!(b.message_db.is_channel_exited(&channel_id).await.unwrap());

    let parsed = parse_state_channel_signed_message(&last, &EcdsaSignatureVerifier)
        .await
        .unwrap();
    assert_matches!(
        b.client.exit_claim(a.address, &parsed),
        Err(Error::InvalidMessage { .. })
    );
}
