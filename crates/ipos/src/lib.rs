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

#![warn(missing_docs)]

//! The IPoS consensus engine: header verification, `BaseTarget`/`Difficulty`
//! retargeting, the stake-weighted eligibility lottery, and block sealing.
//!
//! This crate is the consensus kernel only. The chain store, transaction
//! pool, networking and RPC surface are external collaborators, reached
//! through the [`client::ChainReader`] trait and the [`stake::StakeOracle`]
//! trait rather than owned here.

pub mod client;
pub mod constants;
pub mod engines;
pub mod error;
pub mod params;
pub mod stake;

pub use client::ChainReader;
pub use engines::IPos;
pub use error::{Error, ErrorKind};
pub use ipos_types::header::{BlockNumber, Header};
pub use params::IPosParams;
