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

//! The chain-store capability the engine borrows but never owns
//! The real implementation lives in the node's database
//! crate; the engine only ever needs to look headers up by hash+number.

use crate::params::IPosParams;
use ethereum_types::H256;
use ipos_types::header::{BlockNumber, Header};

/// Read-only access to stored headers and blocks, and to the chain's
/// consensus parameters. One-way borrow: the engine calls into the chain
/// reader, never the other way around.
pub trait ChainReader: Sync + Send {
    /// Look up a header by hash and number. Returns `None` if not present,
    /// mirroring the Go source's nil-sentinel convention.
    fn header(&self, hash: &H256, number: BlockNumber) -> Option<Header>;

    /// Look up a full block (header + uncles) by hash and number.
    fn block(&self, hash: &H256, number: BlockNumber) -> Option<(Header, Vec<Header>)>;

    /// The chain's consensus configuration.
    fn config(&self) -> &IPosParams;
}

/// An in-memory `ChainReader` used by the test suite. Stores headers keyed
/// by `(hash, number)` and never models uncles beyond what's stored
/// alongside the block.
#[derive(Default)]
pub struct MemoryChain {
    params: IPosParams,
    headers: parking_lot::RwLock<std::collections::HashMap<(H256, BlockNumber), Header>>,
    uncles: parking_lot::RwLock<std::collections::HashMap<(H256, BlockNumber), Vec<Header>>>,
}

impl MemoryChain {
    /// A fresh chain with the given parameters and no stored headers.
    pub fn new(params: IPosParams) -> Self {
        MemoryChain {
            params,
            headers: Default::default(),
            uncles: Default::default(),
        }
    }

    /// Insert a header (with optional uncles) keyed by its own hash.
    pub fn insert(&self, hash: H256, header: Header, uncles: Vec<Header>) {
        let number = header.number();
        self.headers.write().insert((hash, number), header);
        self.uncles.write().insert((hash, number), uncles);
    }
}

impl ChainReader for MemoryChain {
    fn header(&self, hash: &H256, number: BlockNumber) -> Option<Header> {
        self.headers.read().get(&(*hash, number)).cloned()
    }

    fn block(&self, hash: &H256, number: BlockNumber) -> Option<(Header, Vec<Header>)> {
        let header = self.header(hash, number)?;
        let uncles = self
            .uncles
            .read()
            .get(&(*hash, number))
            .cloned()
            .unwrap_or_default();
        Some((header, uncles))
    }

    fn config(&self) -> &IPosParams {
        &self.params
    }
}
