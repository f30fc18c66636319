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

//! # Deciders
//! A [`Decider`] judges a [`Property`] true or false and justifies the judgement with a
//! chain of [`ImplicationProofItem`]s, or reports that the evidence at hand cannot settle it.
//!
//! ## Primitive deciders
//! - [`HashPreimageExistenceDecider`]
//! - [`SignedByDecider`]
//! - [`MessageNonceLessThanDecider`]
//!
//! ## Logical connectives
//! - [`AndDecider`], [`OrDecider`], [`NotDecider`]
//! - [`ForAllSuchThatDecider`], [`ThereExistsSuchThatDecider`]
//!
//! Witness-checking primitives are wrapped in a [`KeyValueStoreDecider`], which caches
//! their positive decisions by a hash of the input.

use crate::quantifiers::{Quantified, Quantifier, QuantifierParameters};
use crate::state_channel::{Nonce, StateChannelMessage};
use crate::{Address, DecideResult, Error};
use async_trait::async_trait;
use parity_scale_codec::{Decode, Encode};
use std::fmt;
use std::sync::Arc;

mod and;
mod for_all;
mod hash_preimage;
mod key_value_store;
mod message_nonce_less_than;
mod not;
mod or;
mod signed_by;
mod there_exists;

pub use and::AndDecider;
pub use for_all::ForAllSuchThatDecider;
pub use hash_preimage::HashPreimageExistenceDecider;
pub use key_value_store::{CachedDecision, KeyValueStoreDecider, PrimitiveDecider};
pub use message_nonce_less_than::MessageNonceLessThanDecider;
pub use not::NotDecider;
pub use or::OrDecider;
pub use signed_by::SignedByDecider;
pub use there_exists::ThereExistsSuchThatDecider;

/// How deep a property graph may nest before deciding it is abandoned.
pub const MAX_DECISION_DEPTH: usize = 64;

/// Pulls the expected variant out of a property input or fails with `InvalidInput`.
macro_rules! input_of {
    ($decider:expr, $property:expr, $variant:ident) => {
        match &*$property.input {
            $crate::deciders::PropertyInput::$variant(input) => input,
            _ => {
                return Err($crate::Error::InvalidInput {
                    decider: $decider.to_string(),
                    expected: stringify!($variant),
                })
            }
        }
    };
}
pub(crate) use input_of;

/// Judges properties of the kinds it understands.
#[async_trait]
pub trait Decider: Send + Sync {
    /// Identifies the decider kind in justifications and namespaces its cache.
    fn unique_id(&self) -> &str;

    /// Decides `property`, whose input must be one this decider understands.
    /// `depth` is the nesting level of `property` inside the claim being decided.
    async fn decide(
        &self,
        property: &Property,
        witness: Option<&Witness>,
        depth: usize,
    ) -> DecideResult<Decision>;

    /// Returns a previously stored decision for `property`, if there is one.
    async fn check_decision(&self, _property: &Property) -> DecideResult<Option<Decision>> {
        Ok(None)
    }
}

/// Evidence grounding a primitive property.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub enum Witness {
    /// A preimage of the claimed hash.
    Preimage(Vec<u8>),
    /// A signature over the claimed message.
    Signature(Vec<u8>),
}

/// A claim to be decided: the decider and the input it interprets.
#[derive(Clone)]
pub struct Property {
    /// Decider interpreting `input`.
    pub decider: Arc<dyn Decider>,
    /// What is claimed.
    pub input: Arc<PropertyInput>,
}

impl Property {
    /// Property of `decider` over `input`.
    pub fn new(decider: Arc<dyn Decider>, input: PropertyInput) -> Self {
        Property {
            decider,
            input: Arc::new(input),
        }
    }

    /// Decides this property as a root claim.
    pub async fn decide(&self, witness: Option<&Witness>) -> DecideResult<Decision> {
        self.decide_at(witness, 0).await
    }

    /// Decides this property nested `depth` levels deep, failing past the depth limit.
    pub async fn decide_at(
        &self,
        witness: Option<&Witness>,
        depth: usize,
    ) -> DecideResult<Decision> {
        if depth > MAX_DECISION_DEPTH {
            return Err(Error::DepthExceeded {
                depth,
                limit: MAX_DECISION_DEPTH,
            });
        }
        self.decider.decide(self, witness, depth).await
    }

    /// A stored decision on this property, if its decider keeps one.
    pub async fn check_decision(&self) -> DecideResult<Option<Decision>> {
        self.decider.check_decision(self).await
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.decider.unique_id() == other.decider.unique_id() && self.input == other.input
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("decider", &self.decider.unique_id())
            .field("input", &self.input)
            .finish()
    }
}

/// A property together with the witness offered for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Claim {
    /// The claimed property.
    pub property: Property,
    /// Evidence offered for it.
    pub witness: Option<Witness>,
}

impl Claim {
    /// Claim without a witness.
    pub fn new(decider: Arc<dyn Decider>, input: PropertyInput) -> Self {
        Claim {
            property: Property::new(decider, input),
            witness: None,
        }
    }

    /// Offers `witness` for the claim.
    pub fn with_witness(mut self, witness: Witness) -> Self {
        self.witness = Some(witness);
        self
    }

    /// Decides the claim as a root claim.
    pub async fn decide(&self) -> DecideResult<Decision> {
        self.decide_at(0).await
    }

    /// Decides the claim nested `depth` levels deep.
    pub async fn decide_at(&self, depth: usize) -> DecideResult<Decision> {
        self.property.decide_at(self.witness.as_ref(), depth).await
    }
}

/// One link of a justification: the property implied at this level and its grounding witness.
#[derive(Clone, Debug, PartialEq)]
pub struct ImplicationProofItem {
    /// Property implied at this level.
    pub implication: Property,
    /// Witness grounding it, set by primitive deciders.
    pub implication_witness: Option<Witness>,
}

/// The outcome of deciding a property.
///
/// `justification[i]` implies `justification[i - 1]`: the first item is the decided
/// property itself and the last one is the primitive fact the outcome rests on.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    /// Whether the property holds.
    pub outcome: bool,
    /// Chain from the decided property down to the fact it rests on.
    pub justification: Vec<ImplicationProofItem>,
}

impl Decision {
    /// Prefixes `justification` with the frame of `property`, which a connective decided.
    pub(crate) fn implied_by(
        property: &Property,
        outcome: bool,
        justification: impl IntoIterator<Item = ImplicationProofItem>,
    ) -> Self {
        let mut items = vec![ImplicationProofItem {
            implication: property.clone(),
            implication_witness: None,
        }];
        items.extend(justification);
        Decision {
            outcome,
            justification: items,
        }
    }
}

/// Builds the claim to decide for one quantified item.
pub type PropertyFactory = Arc<dyn Fn(&Quantified) -> DecideResult<Claim> + Send + Sync>;

/// Inputs of every decider, one variant per decider kind.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyInput {
    /// Input of [`HashPreimageExistenceDecider`].
    HashPreimage(HashPreimageInput),
    /// Input of [`SignedByDecider`].
    SignedBy(SignedByInput),
    /// Input of [`MessageNonceLessThanDecider`].
    MessageNonceLessThan(MessageNonceLessThanInput),
    /// Input of [`AndDecider`].
    And(ConnectiveInput),
    /// Input of [`OrDecider`].
    Or(ConnectiveInput),
    /// Input of [`NotDecider`].
    Not(NotInput),
    /// Input of [`ForAllSuchThatDecider`].
    ForAllSuchThat(QuantifiedInput),
    /// Input of [`ThereExistsSuchThatDecider`].
    ThereExistsSuchThat(QuantifiedInput),
}

/// A hash someone knows a preimage of.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct HashPreimageInput {
    /// The hash.
    pub hash: Vec<u8>,
}

/// A message signed by an address.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct SignedByInput {
    /// The signer.
    pub public_key: Address,
    /// The signed bytes.
    pub message: Vec<u8>,
}

/// A message nonce below a bound.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode)]
pub struct MessageNonceLessThanInput {
    /// The message.
    pub message_with_nonce: StateChannelMessage,
    /// Exclusive bound.
    pub less_than_this: Nonce,
}

/// Operands of a connective.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectiveInput {
    /// Operands, in order.
    pub properties: Vec<Claim>,
}

/// The negated claim.
#[derive(Clone, Debug, PartialEq)]
pub struct NotInput {
    /// Operand.
    pub property: Claim,
}

/// A property generated for each item of a domain.
#[derive(Clone)]
pub struct QuantifiedInput {
    /// Enumerates the domain.
    pub quantifier: Arc<dyn Quantifier>,
    /// Selects the domain.
    pub parameters: QuantifierParameters,
    /// Builds the claim for one item.
    pub property_factory: PropertyFactory,
}

impl PartialEq for QuantifiedInput {
    // Factories are opaque, so only the same factory instance compares equal.
    fn eq(&self, other: &Self) -> bool {
        self.quantifier.unique_id() == other.quantifier.unique_id()
            && self.parameters == other.parameters
            && Arc::ptr_eq(&self.property_factory, &other.property_factory)
    }
}

impl fmt::Debug for QuantifiedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuantifiedInput")
            .field("quantifier", &self.quantifier.unique_id())
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Decides `claims` concurrently and reduces them under three-valued logic.
///
/// `dominant` is the outcome settling the connective by itself (`false` for AND, `true`
/// for OR). The first claim in order deciding `dominant` wins and the rest are dropped as
/// soon as every claim before it has resolved otherwise. With no dominant outcome, any
/// undecidable claim makes the connective undecidable; otherwise the justifications of
/// all claims are concatenated.
pub(crate) async fn decide_connective(
    property: &Property,
    claims: &[Claim],
    dominant: bool,
    depth: usize,
) -> DecideResult<Decision> {
    use futures::stream::{FuturesUnordered, StreamExt};

    let mut pending: FuturesUnordered<_> = claims
        .iter()
        .enumerate()
        .map(|(index, claim)| async move { (index, claim.decide_at(depth + 1).await) })
        .collect();
    // None while pending, Some(None) once undecidable.
    let mut resolved: Vec<Option<Option<Decision>>> = claims.iter().map(|_| None).collect();

    while let Some((index, result)) = pending.next().await {
        resolved[index] = Some(match result {
            Ok(decision) => Some(decision),
            Err(e) if e.is_cannot_decide() => {
                log::debug!(
                    target: "ovmi",
                    "{} operand {} undecided: {}",
                    property.decider.unique_id(),
                    index,
                    e
                );
                None
            }
            Err(e) => return Err(e),
        });
        if let Some(decision) = first_dominant(&resolved, dominant) {
            return Ok(Decision::implied_by(
                property,
                dominant,
                decision.justification.iter().cloned(),
            ));
        }
    }

    let mut justification = Vec::new();
    for decision in resolved.into_iter().flatten() {
        match decision {
            Some(decision) => justification.extend(decision.justification),
            None => {
                return Err(Error::cannot_decide(format!(
                    "{} has undecidable operands",
                    property.decider.unique_id()
                )))
            }
        }
    }
    Ok(Decision::implied_by(property, !dominant, justification))
}

// The first dominant decision in claim order, once everything before it has resolved.
fn first_dominant(resolved: &[Option<Option<Decision>>], dominant: bool) -> Option<&Decision> {
    for slot in resolved {
        match slot {
            None => return None,
            Some(Some(decision)) if decision.outcome == dominant => return Some(decision),
            Some(_) => {}
        }
    }
    None
}

/// Decides the claims built for each quantified item, in order, stopping at the first one
/// deciding `dominant` (`false` for "for all", `true` for "there exists").
///
/// Without a dominant outcome the quantifier resolves to `!dominant` only when every claim
/// was decided and the enumeration is complete: an item nobody has seen could still be
/// the dominant one.
pub(crate) async fn decide_quantified(
    property: &Property,
    input: &QuantifiedInput,
    dominant: bool,
    depth: usize,
) -> DecideResult<Decision> {
    let quantified = input
        .quantifier
        .get_all_quantified(&input.parameters)
        .await?;

    let mut justification = Vec::new();
    let mut undecided = 0usize;
    for item in &quantified.results {
        let claim = (input.property_factory)(item)?;
        match claim.decide_at(depth + 1).await {
            Ok(decision) if decision.outcome == dominant => {
                return Ok(Decision::implied_by(
                    property,
                    dominant,
                    decision.justification,
                ))
            }
            Ok(decision) => justification.extend(decision.justification),
            Err(e) if e.is_cannot_decide() => {
                log::debug!(
                    target: "ovmi",
                    "{} item {:?} undecided: {}",
                    property.decider.unique_id(),
                    item,
                    e
                );
                undecided += 1
            }
            Err(e) => return Err(e),
        }
    }

    if undecided > 0 {
        return Err(Error::cannot_decide(format!(
            "{} of {} quantified properties are undecidable",
            undecided,
            quantified.results.len()
        )));
    }
    if !quantified.all_results_quantified {
        return Err(Error::cannot_decide(format!(
            "{} cannot enumerate every result for {:?}",
            input.quantifier.unique_id(),
            input.parameters
        )));
    }
    Ok(Decision::implied_by(property, !dominant, justification))
}
