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

//! Errors raised while deciding properties and running the state channel protocol.

use crate::state_channel::ChannelId;
use crate::Address;
use snafu::Snafu;

/// Everything that can go wrong while deciding a property.
///
/// `CannotDecide` is not a failure of the machinery: it is the third outcome of the logic,
/// meaning the available evidence proves neither `true` nor `false`. Logical connectives
/// fold it into their reduction; every other variant is a hard error and propagates.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The evidence at hand proves neither outcome.
    #[snafu(display("Cannot decide: {}", reason))]
    CannotDecide {
        /// What was missing.
        reason: String,
    },
    /// A decider or quantifier was handed input of another kind.
    #[snafu(display("Invalid input for {}: expected {}", decider, expected))]
    InvalidInput {
        /// Id of the rejecting decider or quantifier.
        decider: String,
        /// Kind of input it takes.
        expected: &'static str,
    },
    /// The property graph nests deeper than [`MAX_DECISION_DEPTH`](crate::deciders::MAX_DECISION_DEPTH).
    #[snafu(display("Decision depth {} exceeds the limit of {}", depth, limit))]
    DepthExceeded {
        /// Depth reached.
        depth: usize,
        /// Deepest level allowed.
        limit: usize,
    },
    /// Bytes that do not decode as the expected type.
    #[snafu(display("Codec error: type name is {}", type_name))]
    Codec {
        /// Type being decoded.
        type_name: &'static str,
        /// Underlying decode failure.
        source: parity_scale_codec::Error,
    },
    /// The backing store failed or refused a write.
    #[snafu(display("Storage error: {}", msg))]
    Storage {
        /// Details.
        msg: String,
    },
    /// Key material could not be used.
    #[snafu(display("Crypto error: {}", msg))]
    Crypto {
        /// Details.
        msg: String,
    },
    /// A state channel message breaks the protocol rules.
    #[snafu(display("Invalid message: {}", msg))]
    InvalidMessage {
        /// The broken rule.
        msg: String,
    },
    /// The channel no longer takes new state.
    #[snafu(display("Channel {} has already exited", channel_id))]
    ChannelExited {
        /// The exited channel.
        channel_id: ChannelId,
    },
    /// The channel has no state signed by both parties to build on.
    #[snafu(display(
        "The last message in channel {} has not been countersigned yet",
        channel_id
    ))]
    NotCountersigned {
        /// The channel awaiting a countersignature.
        channel_id: ChannelId,
    },
    /// No channel is open with this address.
    #[snafu(display("There is no channel with counterparty {:?}", counterparty))]
    UnknownCounterparty {
        /// The unknown address.
        counterparty: Address,
    },
}

impl Error {
    /// Builds the undecidable outcome.
    pub fn cannot_decide(reason: impl Into<String>) -> Self {
        Error::CannotDecide {
            reason: reason.into(),
        }
    }

    /// Builds an [`Error::InvalidMessage`].
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Error::InvalidMessage { msg: msg.into() }
    }

    /// Whether this is the undecidable outcome rather than a hard error.
    pub fn is_cannot_decide(&self) -> bool {
        matches!(self, Error::CannotDecide { .. })
    }
}

/// Result of deciding, with [`Error::CannotDecide`] as the third outcome.
pub type DecideResult<T> = core::result::Result<T, Error>;
