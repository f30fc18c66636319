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
use crate::Error;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Enumerates `[start, end)`. The range is known in full, so the result is always complete.
pub struct IntegerRangeQuantifier;

static INSTANCE: Lazy<Arc<IntegerRangeQuantifier>> = Lazy::new(|| Arc::new(IntegerRangeQuantifier));

impl IntegerRangeQuantifier {
    /// Quantifier id.
    pub const ID: &'static str = "IntegerRangeQuantifier";

    /// Longest range enumerated. Every item is materialized up front.
    pub const MAX_RANGE_LEN: u128 = 1 << 16;

    /// The shared instance.
    pub fn instance() -> Arc<Self> {
        INSTANCE.clone()
    }
}

#[async_trait]
impl Quantifier for IntegerRangeQuantifier {
    fn unique_id(&self) -> &str {
        Self::ID
    }

    async fn get_all_quantified(
        &self,
        parameters: &QuantifierParameters,
    ) -> DecideResult<QuantifierResult> {
        let (start, end) = match parameters {
            QuantifierParameters::IntegerRange { start, end } => (*start, *end),
            _ => {
                return Err(Error::InvalidInput {
                    decider: Self::ID.to_string(),
                    expected: "IntegerRange",
                })
            }
        };
        if start > end {
            return Err(Error::InvalidInput {
                decider: Self::ID.to_string(),
                expected: "a range with start <= end",
            });
        }
        if end - start > Self::MAX_RANGE_LEN {
            return Err(Error::InvalidInput {
                decider: Self::ID.to_string(),
                expected: "a range of at most MAX_RANGE_LEN integers",
            });
        }
        Ok(QuantifierResult {
            results: (start..end).map(Quantified::Integer).collect(),
            all_results_quantified: true,
        })
    }
}
