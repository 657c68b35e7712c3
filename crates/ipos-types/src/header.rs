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

//! Block header, its non-consensus fields, and the sealing-hash codec.

use ethereum_types::{Address, Bloom, H256, U256};
use keccak_hash::keccak;
use parity_bytes::Bytes;
use rlp::{Encodable, RlpStream};

/// A block number.
pub type BlockNumber = u64;

/// A block header carrying the fields the IPoS engine owns plus the usual
/// chain fields it merely transports.
///
/// Fields are private; use the accessors below. This mirrors the shape of
/// a typical client's internal block header type, trimmed to what the
/// consensus engine actually inspects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    parent_hash: H256,
    uncle_hash: H256,
    state_root: H256,
    transactions_root: H256,
    receipts_root: H256,
    log_bloom: Bloom,
    difficulty: U256,
    number: BlockNumber,
    gas_limit: U256,
    gas_used: U256,
    timestamp: u64,
    extra_data: Bytes,

    /// Stake-weighted target for the *next* block's lottery.
    base_target: U256,
    /// The minter address; also the signer identity for consensus.
    coinbase: Address,
    /// `SHA-256(parent.generation_signature || coinbase)`, seeds the next lottery.
    generation_signature: H256,
    /// Recoverable ECDSA signature over `sealing_hash(self)`. Excluded from
    /// the sealing hash itself.
    block_signature: Bytes,
}

impl Header {
    /// A new, empty header with nothing set.
    pub fn new() -> Self {
        Header::default()
    }

    pub fn parent_hash(&self) -> &H256 {
        &self.parent_hash
    }
    pub fn set_parent_hash(&mut self, h: H256) {
        self.parent_hash = h;
    }

    pub fn uncle_hash(&self) -> &H256 {
        &self.uncle_hash
    }
    pub fn set_uncle_hash(&mut self, h: H256) {
        self.uncle_hash = h;
    }

    pub fn state_root(&self) -> &H256 {
        &self.state_root
    }
    pub fn set_state_root(&mut self, h: H256) {
        self.state_root = h;
    }

    pub fn transactions_root(&self) -> &H256 {
        &self.transactions_root
    }
    pub fn set_transactions_root(&mut self, h: H256) {
        self.transactions_root = h;
    }

    pub fn receipts_root(&self) -> &H256 {
        &self.receipts_root
    }
    pub fn set_receipts_root(&mut self, h: H256) {
        self.receipts_root = h;
    }

    pub fn log_bloom(&self) -> &Bloom {
        &self.log_bloom
    }

    pub fn difficulty(&self) -> &U256 {
        &self.difficulty
    }
    pub fn set_difficulty(&mut self, d: U256) {
        self.difficulty = d;
    }

    pub fn number(&self) -> BlockNumber {
        self.number
    }
    pub fn set_number(&mut self, n: BlockNumber) {
        self.number = n;
    }

    pub fn gas_limit(&self) -> &U256 {
        &self.gas_limit
    }
    pub fn set_gas_limit(&mut self, g: U256) {
        self.gas_limit = g;
    }

    pub fn gas_used(&self) -> &U256 {
        &self.gas_used
    }
    pub fn set_gas_used(&mut self, g: U256) {
        self.gas_used = g;
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
    pub fn set_timestamp(&mut self, t: u64) {
        self.timestamp = t;
    }

    pub fn extra_data(&self) -> &Bytes {
        &self.extra_data
    }
    pub fn set_extra_data(&mut self, extra: Bytes) {
        self.extra_data = extra;
    }

    pub fn base_target(&self) -> &U256 {
        &self.base_target
    }
    pub fn set_base_target(&mut self, bt: U256) {
        self.base_target = bt;
    }

    pub fn coinbase(&self) -> &Address {
        &self.coinbase
    }
    pub fn set_coinbase(&mut self, addr: Address) {
        self.coinbase = addr;
    }

    pub fn generation_signature(&self) -> &H256 {
        &self.generation_signature
    }
    pub fn set_generation_signature(&mut self, sig: H256) {
        self.generation_signature = sig;
    }

    pub fn block_signature(&self) -> &Bytes {
        &self.block_signature
    }
    pub fn set_block_signature(&mut self, sig: Bytes) {
        self.block_signature = sig;
    }

    /// The Keccak-256 hash of the RLP encoding of the consensus-relevant
    /// fields, excluding `block_signature`. This is the message the minter
    /// signs and the only tamper-evident binding of the header to its
    /// coinbase; any field not present here is consensus-free.
    ///
    /// Field order is part of the consensus rules and MUST NOT change: a
    /// different order recovers a different address from the same
    /// signature and silently forks the chain.
    pub fn sealing_hash(&self) -> H256 {
        keccak(rlp::encode(&SealingFields(self)))
    }

    /// The header's own identity hash: every field, including
    /// `block_signature`. This is what a chain store keys headers by; it is
    /// distinct from [`Header::sealing_hash`], which is the signed message
    /// and deliberately excludes the signature itself.
    pub fn hash(&self) -> H256 {
        keccak(rlp::encode(&FullFields(self)))
    }
}

/// Wrapper selecting exactly the fields that go into the sealing hash, in
/// the exact order the consensus rules mandate. Kept separate from the header's
/// own (future) wire `Encodable` impl so that adding a non-consensus field
/// to `Header` can never accidentally change the signed message.
struct SealingFields<'a>(&'a Header);

impl<'a> Encodable for SealingFields<'a> {
    fn rlp_append(&self, s: &mut RlpStream) {
        let h = self.0;
        s.begin_list(15);
        s.append(&h.parent_hash);
        s.append(&h.uncle_hash);
        s.append(&h.state_root);
        s.append(&h.transactions_root);
        s.append(&h.receipts_root);
        s.append(&h.log_bloom);
        s.append(&h.difficulty);
        s.append(&h.number);
        s.append(&h.gas_limit);
        s.append(&h.gas_used);
        s.append(&h.timestamp);
        s.append(&h.extra_data);
        s.append(&h.base_target);
        s.append(&h.coinbase);
        s.append(&h.generation_signature);
    }
}

/// Wrapper for the header's full identity hash: the sealing fields plus
/// `block_signature`.
struct FullFields<'a>(&'a Header);

impl<'a> Encodable for FullFields<'a> {
    fn rlp_append(&self, s: &mut RlpStream) {
        let h = self.0;
        s.begin_list(16);
        s.append(&h.parent_hash);
        s.append(&h.uncle_hash);
        s.append(&h.state_root);
        s.append(&h.transactions_root);
        s.append(&h.receipts_root);
        s.append(&h.log_bloom);
        s.append(&h.difficulty);
        s.append(&h.number);
        s.append(&h.gas_limit);
        s.append(&h.gas_used);
        s.append(&h.timestamp);
        s.append(&h.extra_data);
        s.append(&h.base_target);
        s.append(&h.coinbase);
        s.append(&h.generation_signature);
        s.append(&h.block_signature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealing_hash_is_deterministic() {
        let mut header = Header::new();
        header.set_number(5);
        header.set_timestamp(100);
        header.set_coinbase(Address::from_low_u64_be(1));

        let a = header.sealing_hash();
        let b = header.sealing_hash();
        assert_eq!(a, b);
    }

    #[test]
    fn sealing_hash_excludes_block_signature() {
        let mut header = Header::new();
        header.set_number(5);

        let before = header.sealing_hash();
        header.set_block_signature(vec![1; 65]);
        let after = header.sealing_hash();

        assert_eq!(before, after);
    }

    #[test]
    fn sealing_hash_changes_with_consensus_fields() {
        let mut a = Header::new();
        a.set_base_target(U256::from(10));
        let mut b = a.clone();
        b.set_base_target(U256::from(11));

        assert_ne!(a.sealing_hash(), b.sealing_hash());
    }

    #[test]
    fn full_hash_is_sensitive_to_block_signature() {
        let mut header = Header::new();
        header.set_number(5);

        let before = header.hash();
        header.set_block_signature(vec![1; 65]);
        let after = header.hash();

        assert_ne!(before, after);
    }

    #[test]
    fn full_hash_differs_from_sealing_hash() {
        let mut header = Header::new();
        header.set_number(5);
        header.set_block_signature(vec![7; 65]);

        assert_ne!(header.hash(), header.sealing_hash());
    }
}
