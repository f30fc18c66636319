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

//! # Quantifiers
//! Enumerate the domain a [`ForAllSuchThatDecider`](crate::deciders::ForAllSuchThatDecider)
//! or [`ThereExistsSuchThatDecider`](crate::deciders::ThereExistsSuchThatDecider) ranges over.

use crate::state_channel::{ChannelId, SignedMessage};
use crate::{Address, DecideResult};
use async_trait::async_trait;

mod integer_range;
mod signed_by;

pub use integer_range::IntegerRangeQuantifier;
pub use signed_by::SignedByQuantifier;

/// Lists the items of a domain.
#[async_trait]
pub trait Quantifier: Send + Sync {
    /// Identifies the quantifier kind.
    fn unique_id(&self) -> &str;

    /// Items matching `parameters`, and whether that is all of them.
    async fn get_all_quantified(
        &self,
        parameters: &QuantifierParameters,
    ) -> DecideResult<QuantifierResult>;
}

/// What to enumerate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuantifierParameters {
    /// Messages signed by `address`, optionally restricted to one channel.
    SignedBy {
        /// The signer.
        address: Address,
        /// Channel to restrict to, if any.
        channel_id: Option<ChannelId>,
    },
    /// Integers in `[start, end)`.
    IntegerRange {
        /// First integer, inclusive.
        start: u128,
        /// Bound, exclusive.
        end: u128,
    },
}

/// One enumerated item, handed to the property factory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Quantified {
    /// A message with one signature over it.
    SignedMessage(SignedMessage),
    /// An integer of a range.
    Integer(u128),
}

/// What a quantifier found, and whether that is everything there is.
///
/// `all_results_quantified` is only set when the quantifier has authoritative knowledge of
/// the whole domain; otherwise unseen items may exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantifierResult {
    /// Items found.
    pub results: Vec<Quantified>,
    /// Whether no other item exists.
    pub all_results_quantified: bool,
}
