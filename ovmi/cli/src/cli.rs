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

//! OVM state channel CLI parameters.

use ovmi::state_channel::Balance;

/// OVM state channel tools.
#[derive(Debug, clap::Parser)]
#[clap(subcommand_required = true)]
pub struct Cli {
    /// Possible subcommand with parameters.
    #[clap(subcommand)]
    pub subcommand: Option<Subcommand>,
}

/// Possible subcommands of the main binary.
#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Prints the channel address of a key seed.
    Address(AddressCmd),
    /// Opens a channel between two local parties, exchanges payments and exits it.
    Session(SessionCmd),
}

/// Helper that prints the address of a key seed.
#[derive(Debug, clap::Parser)]
pub struct AddressCmd {
    /// Secret key seed, 0x followed by 64 hex digits.
    #[clap(value_parser = seed_parser)]
    pub seed: [u8; 32],
}

/// Runs a payment session between Alice and Bob.
#[derive(Debug, clap::Parser)]
pub struct SessionCmd {
    /// Key seed of Alice, who opens and exits the channel. A random key when omitted.
    #[clap(long, value_parser = seed_parser)]
    pub alice_seed: Option<[u8; 32]>,
    /// Key seed of Bob. A random key when omitted.
    #[clap(long, value_parser = seed_parser)]
    pub bob_seed: Option<[u8; 32]>,
    /// Initial balance of each party.
    #[clap(long, default_value = "10")]
    pub deposit: Balance,
    /// Amount paid in every round.
    #[clap(long, default_value = "1")]
    pub transfer: Balance,
    /// Number of payments, alternating between Alice and Bob.
    #[clap(long, default_value = "3")]
    pub rounds: u32,
    /// Exit at the opening state instead of the latest one, for Bob to refute.
    #[clap(long)]
    pub dispute: bool,
}

/// Used to parse a secret key seed as [u8; 32] from the received string.
fn seed_parser(seed: &str) -> Result<[u8; 32], String> {
    let digits = seed
        .strip_prefix("0x")
        .ok_or_else(|| "Invalid seed received. Expected format is '0x1234...4321'.".to_string())?;
    let decoded = hex::decode(digits).map_err(|e| e.to_string())?;

    TryInto::<[u8; 32]>::try_into(decoded)
        .map_err(|_| "Invalid seed received. Expected 64 hex digits.".into())
}
