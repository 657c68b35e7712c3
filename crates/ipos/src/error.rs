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

//! The engine's error taxonomy. Every verification failure
//! is one of these named kinds, never a generic string; callers match on
//! `ErrorKind` to decide how to react (e.g. `UnknownAncestor` means "try
//! again once the parent has been imported").

use error_chain::error_chain;
use ethereum_types::{H256, U256};

error_chain! {
    foreign_links {
        Decoder(rlp::DecoderError) #[doc = "Failed to decode RLP."];
        Crypto(parity_crypto::publickey::Error) #[doc = "Signature recovery failed."];
    }

    errors {
        /// Genesis was submitted to `seal` or `verify_seal`.
        UnknownBlock {
            description("unknown block")
            display("unknown block")
        }
        /// The parent header is absent from the chain store.
        UnknownAncestor {
            description("unknown ancestor")
            display("unknown ancestor")
        }
        /// `header.timestamp > now + allowed_future_block_time`.
        FutureBlock(given: u64, max: u64) {
            description("block from the future")
            display("block timestamp {} is newer than allowed {}", given, max)
        }
        /// `header.timestamp <= parent.timestamp`.
        InvalidTimestamp(given: u64, parent: u64) {
            description("invalid timestamp")
            display("timestamp {} does not exceed parent timestamp {}", given, parent)
        }
        /// `header.extra_data` longer than `MAXIMUM_EXTRA_DATA_SIZE`.
        ExtraTooLong(len: usize, max: usize) {
            description("extra data too long")
            display("extra data is {} bytes, maximum is {}", len, max)
        }
        /// Gas limit bounds or step violation.
        InvalidGasLimit(given: U256) {
            description("invalid gas limit")
            display("invalid gas limit: {}", given)
        }
        /// `gas_used > gas_limit`.
        InvalidGasUsed(used: U256, limit: U256) {
            description("invalid gas used")
            display("gas used {} exceeds gas limit {}", used, limit)
        }
        /// `header.number != parent.number + 1`.
        InvalidNumber(given: u64, expected: u64) {
            description("invalid block number")
            display("block number {}, expected {}", given, expected)
        }
        /// Recomputed `base_target` disagrees with the header's.
        InvalidBaseTarget(given: U256, expected: U256) {
            description("invalid baseTarget")
            display("invalid baseTarget: have {}, expected {}", given, expected)
        }
        /// Recomputed `difficulty` disagrees with the header's.
        InvalidDifficulty(given: U256, expected: U256) {
            description("invalid difficulty")
            display("invalid difficulty: have {}, expected {}", given, expected)
        }
        /// Recomputed generation signature disagrees with the header's.
        InvalidGenerationSignature(given: H256, expected: H256) {
            description("invalid generation signature")
            display("invalid generation signature: have {}, expected {}", given, expected)
        }
        /// `ecrecover(sealing_hash, block_signature) != coinbase`.
        InvalidBlockSignature {
            description("invalid block signature")
            display("recovered signer does not match coinbase")
        }
        /// `hit(header) >= target` during verification.
        InvalidHit {
            description("invalid hit")
            display("hit does not satisfy the eligibility target")
        }
        /// `hit(header) >= target` re-checked at seal-timer expiry.
        UnableToMineTime {
            description("unable to mine at this time")
            display("no longer eligible to mine by the time the seal timer expired")
        }
        /// More than `MAX_UNCLES` uncles declared.
        TooManyUncles(given: usize, max: usize) {
            description("too many uncles")
            display("block declares {} uncles, maximum is {}", given, max)
        }
        /// The same uncle hash appears twice.
        DuplicateUncle(hash: H256) {
            description("duplicate uncle")
            display("uncle {} included more than once", hash)
        }
        /// An uncle is also an ancestor of the block.
        UncleIsAncestor(hash: H256) {
            description("uncle is ancestor")
            display("uncle {} is an ancestor of the block", hash)
        }
        /// An uncle's parent is not a recent ancestor.
        DanglingUncle(hash: H256) {
            description("dangling uncle")
            display("uncle {} has no recent ancestor as parent", hash)
        }
        /// The stake oracle's RPC transport or contract call failed.
        StakeOracle(msg: String) {
            description("stake oracle call failed")
            display("stake oracle call failed: {}", msg)
        }
        /// `authorize` was never called before `seal`.
        RequiresSigner {
            description("requires signer")
            display("seal requested but no signer has been authorized")
        }
        /// `verify_headers_batch` was stopped before every header finished.
        Cancelled {
            description("verification cancelled")
            display("header batch verification was cancelled")
        }
    }
}
