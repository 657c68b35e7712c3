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

//! Structural header invariants that don't depend on
//! the stake oracle or a signature check: number continuity, timestamp
//! bounds, `extra_data` length, and the gas limit/used relationship.
//! These are "family independent" of the parent's content beyond its
//! number, gas limit and timestamp, so they can run ahead of ancestry
//! lookups.

use crate::constants;
use crate::error::ErrorKind;
use crate::params::IPosParams;
use ethereum_types::U256;
use ipos_types::header::Header;

/// Checks that do not require the parent header.
pub fn verify_basic(params: &IPosParams, header: &Header) -> Result<(), crate::error::Error> {
    if header.extra_data().len() > constants::MAXIMUM_EXTRA_DATA_SIZE {
        return Err(ErrorKind::ExtraTooLong(
            header.extra_data().len(),
            constants::MAXIMUM_EXTRA_DATA_SIZE,
        )
        .into());
    }

    let gas_limit = *header.gas_limit();
    if gas_limit > U256::from(constants::MAX_GAS_LIMIT) || gas_limit < U256::from(constants::MIN_GAS_LIMIT) {
        return Err(ErrorKind::InvalidGasLimit(gas_limit).into());
    }

    if *header.gas_used() > gas_limit {
        return Err(ErrorKind::InvalidGasUsed(*header.gas_used(), gas_limit).into());
    }

    let now = crate::engines::now_unix();
    let max_timestamp = now + params.allowed_future_block_time;
    if header.timestamp() > max_timestamp {
        return Err(ErrorKind::FutureBlock(header.timestamp(), max_timestamp).into());
    }

    Ok(())
}

/// Checks that compare `header` against its immediate parent.
pub fn verify_family(header: &Header, parent: &Header) -> Result<(), crate::error::Error> {
    if header.number() != parent.number() + 1 {
        return Err(ErrorKind::InvalidNumber(header.number(), parent.number() + 1).into());
    }

    if header.timestamp() <= parent.timestamp() {
        return Err(ErrorKind::InvalidTimestamp(header.timestamp(), parent.timestamp()).into());
    }

    let gas_limit = *header.gas_limit();
    let bound = *parent.gas_limit() / U256::from(constants::GAS_LIMIT_BOUND_DIVISOR);
    let diff = if gas_limit > *parent.gas_limit() {
        gas_limit - *parent.gas_limit()
    } else {
        *parent.gas_limit() - gas_limit
    };
    // Strict: a step of exactly parent.gas_limit / 1024 is already invalid.
    if diff >= bound {
        return Err(ErrorKind::InvalidGasLimit(gas_limit).into());
    }

    Ok(())
}
