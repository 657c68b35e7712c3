// Copyright 2015-2020 Parity Technologies (UK) Ltd.
// This file is part of OpenEthereum.

// OpenEthereum is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// OpenEthereum is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with OpenEthereum.  If not, see <http://www.gnu.org/licenses/>.

//! Per-chain IPoS parameters, the way a chain spec JSON file overrides a
//! client's built-in protocol constants. Every field defaults to the
//! matching constant in [`crate::constants`]; a network only needs to
//! mention the fields it diverges on.

use crate::constants;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};

/// Tunable IPoS constants, serializable as part of a chain spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IPosParams {
    /// Target seconds between blocks.
    pub block_time: i64,
    /// Retarget gamma used by the "too fast" branch.
    pub base_target_gamma: i64,
    /// Maximum whole-unit stake `MAX_BASE_TARGET` is normalized against.
    pub max_balance: i64,
    /// Maximum uncles referenced by a single block.
    pub max_uncles: usize,
    /// How far into the future a header's timestamp may be, in seconds.
    pub allowed_future_block_time: u64,
    /// JSON-RPC / IPC endpoint used to reach the mint-power contract, e.g.
    /// `"ipc:/var/run/ipos.ipc"` or `"rpc:http://localhost:8545"`. The
    /// scheme prefix is optional.
    pub stake_oracle_endpoint: String,
}

impl IPosParams {
    /// `MaxBlockTimeLimit = block_time + 2`.
    pub fn max_blocktime_limit(&self) -> i64 {
        self.block_time + 2
    }

    /// `MinBlockTimeLimit = block_time - 2`.
    pub fn min_blocktime_limit(&self) -> i64 {
        self.block_time - 2
    }

    /// `InitialBaseTarget = floor((2^63 - 1) / (block_time * max_balance))`.
    pub fn initial_base_target(&self) -> U256 {
        U256::from(i64::MAX) / U256::from(self.block_time * self.max_balance)
    }

    /// `MaxBaseTarget = InitialBaseTarget * max_balance`.
    pub fn max_base_target(&self) -> U256 {
        self.initial_base_target() * U256::from(self.max_balance)
    }

    /// `MinBaseTarget = InitialBaseTarget * 9 / 10`.
    pub fn min_base_target(&self) -> U256 {
        self.initial_base_target() * U256::from(9) / U256::from(10)
    }
}

impl Default for IPosParams {
    fn default() -> Self {
        IPosParams {
            block_time: constants::BLOCK_TIME,
            base_target_gamma: constants::BASE_TARGET_GAMMA,
            max_balance: constants::MAX_BALANCE,
            max_uncles: constants::MAX_UNCLES,
            allowed_future_block_time: constants::ALLOWED_FUTURE_BLOCK_TIME,
            stake_oracle_endpoint: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let params = IPosParams::default();
        assert_eq!(params.max_base_target(), U256::from(constants::MAX_BASE_TARGET));
        assert_eq!(params.min_base_target(), U256::from(constants::MIN_BASE_TARGET));
        assert_eq!(params.max_blocktime_limit(), constants::MAX_BLOCKTIME_LIMIT);
        assert_eq!(params.min_blocktime_limit(), constants::MIN_BLOCKTIME_LIMIT);
    }

    #[test]
    fn roundtrips_through_json() {
        let params = IPosParams::default();
        let json = serde_json::to_string(&params).expect("serialize");
        let back: IPosParams = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(params, back);
    }
}
