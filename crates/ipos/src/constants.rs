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

//! IPoS protocol constants. These are the *defaults*;
//! [`crate::params::IPosParams`] allows a chain spec to override them.

use ethereum_types::Address;

/// Target seconds between blocks.
pub const BLOCK_TIME: i64 = 15;
/// Upper soft bound on the 3-block moving average used by the retarget rule.
pub const MAX_BLOCKTIME_LIMIT: i64 = BLOCK_TIME + 2;
/// Lower soft bound on the 3-block moving average used by the retarget rule.
pub const MIN_BLOCKTIME_LIMIT: i64 = BLOCK_TIME - 2;
/// Retarget gamma used by the "too fast" branch.
pub const BASE_TARGET_GAMMA: i64 = 64;

/// Total whole-unit stake assumed to exist, used to derive `InitialBaseTarget`.
pub const MAX_BALANCE: i64 = 800_000_000;

/// `floor((2^63 - 1) / (BLOCK_TIME * MAX_BALANCE))`.
pub const INITIAL_BASE_TARGET: i64 = i64::MAX / (BLOCK_TIME * MAX_BALANCE);
/// `InitialBaseTarget * MAX_BALANCE`.
pub const MAX_BASE_TARGET: i64 = INITIAL_BASE_TARGET * MAX_BALANCE;
/// `InitialBaseTarget * 9 / 10`.
pub const MIN_BASE_TARGET: i64 = INITIAL_BASE_TARGET * 9 / 10;

/// `(2^64 - 1) * 60`, used as the numerator of the difficulty derivation.
pub const DIFFICULTY_MULTIPLIER_LOW: u64 = u64::MAX;
/// Multiplier applied to `DIFFICULTY_MULTIPLIER_LOW` (kept as a separate
/// constant because the product overflows `u64`; the arithmetic module
/// widens to `u128`/`U256` before multiplying).
pub const DIFFICULTY_MULTIPLIER_SCALE: u64 = 60;

/// How far into the future (seconds) a header's timestamp may be and still
/// be accepted.
pub const ALLOWED_FUTURE_BLOCK_TIME: u64 = 15;

/// Maximum uncles referenced by a single block.
pub const MAX_UNCLES: usize = 2;
/// Generations of ancestry scanned when collecting the uncle/ancestor set.
pub const MAX_UNCLE_GENERATIONS: usize = 7;

/// Maximum length, in bytes, of a header's `extra_data` field.
pub const MAXIMUM_EXTRA_DATA_SIZE: usize = 32;
/// Gas limit may not exceed `2^63 - 1`.
pub const MAX_GAS_LIMIT: u64 = i64::MAX as u64;
/// Floor on the gas limit.
pub const MIN_GAS_LIMIT: u64 = 5_000;
/// The gas limit may move by at most `parent.gas_limit / GAS_LIMIT_BOUND_DIVISOR`
/// between consecutive blocks.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;

/// The fixed, well-known "mint-power" contract address queried by the stake
/// oracle. The original IonChain source encodes the
/// canonical address in base58; since the engine only ever needs the raw
/// bytes to build calldata, it is stored here already decoded, equivalent to
/// the raw form of `0x0000000000000000000000000000000000000100`.
pub const IPOS_CONTRACT_ADDRESS_BYTES: [u8; 20] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0,
];

/// See [`IPOS_CONTRACT_ADDRESS_BYTES`].
pub fn ipos_contract_address() -> Address {
    Address::from(IPOS_CONTRACT_ADDRESS_BYTES)
}

/// Wei-equivalent base units per whole unit of stake.
pub const STAKE_BASE_UNITS: u64 = 1_000_000_000_000_000_000;
