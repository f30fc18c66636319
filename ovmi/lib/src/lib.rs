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

//! # ovmi
//! Decision engine of the Optimistic Virtual Machine and a two-party state channel that
//! settles its exits with it.
//!
//! # Introduction
//! A **property** is a claim about the world: "this hash has a known preimage", "this
//! message was signed by that address", "every message signed by A has a lower nonce".
//! A [`Decider`](deciders::Decider) judges a property under three-valued logic: `true`,
//! `false`, or [`Error::CannotDecide`] when the evidence at hand proves neither.
//!
//! Every decision carries a justification, a list of
//! [`ImplicationProofItem`](deciders::ImplicationProofItem)s walking from the decided
//! property down to the primitive fact it rests on. A `false` exit claim is refuted by
//! handing that list back.
//!
//! ## Primitive deciders
//! - hash preimage existence
//! - signed by
//! - message nonce less than
//!
//! ## Logical connectives
//! - and, or, not
//! - for all such that, there exists such that, ranging over a
//!   [`Quantifier`](quantifiers::Quantifier)
//!
//! # State channel
//! [`StateChannelClient`](state_channel::StateChannelClient) exchanges countersigned
//! balance updates with one counterparty per channel, builds exit claims from the latest
//! countersigned state and disputes invalid exits of the counterparty.

#![warn(missing_docs)]

pub mod crypto;
pub mod db;
pub mod deciders;
mod errors;
pub mod quantifiers;
pub mod state_channel;

pub use errors::{DecideResult, Error};

/// An account of the channel: a 20-byte Ethereum address.
pub type Address = ethereum_types::H160;

#[cfg(test)]
mod mock;
