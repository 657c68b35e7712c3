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

//! The engine façade: assembles the header codec, the
//! retarget arithmetic, the eligibility lottery and the signer state into
//! the operations the rest of the node calls: `author`, `verify_header`,
//! `verify_headers_batch`, `verify_seal`, `verify_uncles`, `prepare`,
//! `finalize`, `authorize`, `seal`.

pub mod batch;
pub mod lottery;
pub mod retarget;
pub mod signer;
mod verification;

use crate::client::ChainReader;
use crate::constants;
use crate::error::{Error, ErrorKind};
use crate::params::IPosParams;
use crate::stake::StakeOracle;
use ethereum_types::{Address, H256, U256};
use ipos_types::header::Header;
use log::{debug, trace, warn};
use parity_crypto::publickey::{self, Message, Signature};
use retarget::RetargetAncestry;
pub use signer::{EngineSigner, SignFn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The IPoS consensus engine. Generic over the chain-store capability and
/// the stake-oracle capability it borrows; owns nothing but
/// its own signer state.
pub struct IPos<C, O> {
    chain: Arc<C>,
    oracle: Arc<O>,
    signer: EngineSigner,
}

impl<C: ChainReader, O: StakeOracle> IPos<C, O> {
    /// A new engine reading from `chain` and querying stake through
    /// `oracle`. No signer is authorized yet; `seal` will fail with
    /// `RequiresSigner` until [`IPos::authorize`] is called.
    pub fn new(chain: Arc<C>, oracle: Arc<O>) -> Self {
        IPos {
            chain,
            oracle,
            signer: EngineSigner::default(),
        }
    }

    fn params(&self) -> &IPosParams {
        self.chain.config()
    }

    /// The block's minter is just its coinbase.
    pub fn author(&self, header: &Header) -> Address {
        *header.coinbase()
    }

    /// The engine's name, as surfaced by diagnostics and logging that sit
    /// outside consensus proper (e.g. a node's `--engine-signer` status
    /// output). Not consulted by any consensus rule.
    pub fn name(&self) -> &'static str {
        "IPoS"
    }

    /// The maximum number of uncles a block may declare, per
    /// [`IPosParams::max_uncles`]. A read-only accessor for callers that
    /// want to size a block assembly buffer ahead of `verify_uncles`.
    pub fn maximum_uncle_count(&self) -> usize {
        self.params().max_uncles
    }

    /// Installs the signer state used by `seal`. Takes the writer half
    /// of the signer's lock; never
    /// blocks on a concurrent `seal`, which only ever takes the reader.
    pub fn authorize(&self, address: Address, sign_fn: Arc<SignFn>) {
        self.signer.authorize(address, sign_fn);
    }

    /// Commits the world-state root. Cannot
    /// fail by design — the engine mints no reward and settles no other
    /// state here.
    pub fn finalize(&self, header: &mut Header, state_root: H256) {
        header.set_state_root(state_root);
    }

    /// Fills in the draft header's `base_target` and `difficulty` per
    /// the retarget rule, given its (not-yet-final) timestamp.
    pub fn prepare(&self, header: &mut Header) -> Result<(), Error> {
        let parent = self.parent_of(header)?;
        let ancestry = self.retarget_ancestry(&parent)?;
        let base_target = retarget::calc_base_target(
            self.params(),
            ancestry.as_ref(),
            *parent.base_target(),
            parent.number(),
            header.timestamp(),
        );
        let difficulty =
            retarget::calc_difficulty(*parent.base_target(), parent.timestamp(), header.timestamp());
        header.set_base_target(base_target);
        header.set_difficulty(difficulty);
        Ok(())
    }

    /// Ok if `header` is already stored
    /// (its full identity hash is known to the chain); otherwise fetches
    /// its parent and runs the structural, retarget and (if `check_seal`)
    /// eligibility checks.
    pub fn verify_header(&self, header: &Header, check_seal: bool) -> Result<(), Error> {
        if self.chain.header(&header.hash(), header.number()).is_some() {
            trace!(target: "engine", "header {} already known, skipping re-verification", header.hash());
            return Ok(());
        }
        let parent = self.parent_of(header)?;
        self.verify_header_with_parent(header, &parent, check_seal)
    }

    fn verify_header_with_parent(&self, header: &Header, parent: &Header, check_seal: bool) -> Result<(), Error> {
        verification::verify_basic(self.params(), header)?;
        verification::verify_family(header, parent)?;
        self.verify_base_target(header, parent)?;
        if check_seal {
            self.verify_seal_with_parent(header, parent)?;
        }
        Ok(())
    }

    /// Rejects genesis, then checks (in
    /// order) the block signature, the generation-signature chain, the
    /// retarget arithmetic, and finally the stake-weighted eligibility
    /// inequality — the only check that touches the stake oracle, kept
    /// last so the oracle is only ever consulted once every cheaper
    /// check has already passed.
    pub fn verify_seal(&self, header: &Header) -> Result<(), Error> {
        if header.number() == 0 {
            return Err(ErrorKind::UnknownBlock.into());
        }
        let parent = self.parent_of(header)?;
        self.verify_seal_with_parent(header, &parent)
    }

    fn verify_seal_with_parent(&self, header: &Header, parent: &Header) -> Result<(), Error> {
        if header.number() == 0 {
            return Err(ErrorKind::UnknownBlock.into());
        }

        let recovered = self.recover_signer(header)?;
        if recovered != *header.coinbase() {
            warn!(target: "engine", "block {} signature recovers to {:?}, not coinbase {:?}", header.number(), recovered, header.coinbase());
            return Err(ErrorKind::InvalidBlockSignature.into());
        }

        let expected_gen_sig = lottery::generation_signature(parent.generation_signature(), header.coinbase());
        if *header.generation_signature() != expected_gen_sig {
            return Err(ErrorKind::InvalidGenerationSignature(
                *header.generation_signature(),
                expected_gen_sig,
            )
            .into());
        }

        self.verify_base_target(header, parent)?;

        if header.timestamp() <= parent.timestamp() {
            return Err(ErrorKind::InvalidTimestamp(header.timestamp(), parent.timestamp()).into());
        }

        let hit_value = lottery::hit(parent.generation_signature(), header.coinbase());
        let stake = self.oracle.effective_balance(header.coinbase())?;
        let effective = lottery::effective_target(*parent.base_target(), stake);
        let elapsed = header.timestamp() - parent.timestamp();
        if !lottery::is_eligible(hit_value, effective, elapsed) {
            debug!(target: "engine", "block {} fails the eligibility inequality (stake {})", header.number(), stake);
            return Err(ErrorKind::InvalidHit.into());
        }
        Ok(())
    }

    /// Recomputes `base_target` and
    /// `difficulty` from `parent` and compares both for equality.
    fn verify_base_target(&self, header: &Header, parent: &Header) -> Result<(), Error> {
        let ancestry = self.retarget_ancestry(parent)?;
        let expected_base_target = retarget::calc_base_target(
            self.params(),
            ancestry.as_ref(),
            *parent.base_target(),
            parent.number(),
            header.timestamp(),
        );
        if *header.base_target() != expected_base_target {
            return Err(ErrorKind::InvalidBaseTarget(*header.base_target(), expected_base_target).into());
        }

        let expected_difficulty =
            retarget::calc_difficulty(*parent.base_target(), parent.timestamp(), header.timestamp());
        if *header.difficulty() != expected_difficulty {
            return Err(ErrorKind::InvalidDifficulty(*header.difficulty(), expected_difficulty).into());
        }
        Ok(())
    }

    /// Looks up the two ancestors before `parent` needed by the retarget
    /// rule, or `None` off the two-block retarget cycle.
    fn retarget_ancestry(&self, parent: &Header) -> Result<Option<RetargetAncestry>, Error> {
        if !(parent.number() > 2 && parent.number() % 2 == 0) {
            return Ok(None);
        }
        let grandparent = self
            .chain
            .header(parent.parent_hash(), parent.number() - 1)
            .ok_or_else(|| Error::from(ErrorKind::UnknownAncestor))?;
        let great_grandparent = self
            .chain
            .header(grandparent.parent_hash(), grandparent.number() - 1)
            .ok_or_else(|| Error::from(ErrorKind::UnknownAncestor))?;
        Ok(Some(RetargetAncestry {
            parent_base_target: *parent.base_target(),
            parent_number: parent.number(),
            grandparent_2_timestamp: great_grandparent.timestamp(),
        }))
    }

    fn parent_of(&self, header: &Header) -> Result<Header, Error> {
        let parent_number = header
            .number()
            .checked_sub(1)
            .ok_or_else(|| Error::from(ErrorKind::UnknownBlock))?;
        self.chain
            .header(header.parent_hash(), parent_number)
            .ok_or_else(|| Error::from(ErrorKind::UnknownAncestor))
    }

    /// Minter identity reconstruction: `ecrecover` the
    /// sealing hash against the header's `block_signature`, then derive
    /// the address as the low 20 bytes of `Keccak-256(pubkey[1:])`.
    fn recover_signer(&self, header: &Header) -> Result<Address, Error> {
        let raw = header.block_signature().as_slice();
        if raw.len() != 65 {
            return Err(ErrorKind::InvalidBlockSignature.into());
        }
        let mut bytes = [0u8; 65];
        bytes.copy_from_slice(raw);
        let signature = Signature::from(bytes);
        let message = Message::from(header.sealing_hash());
        let public = publickey::recover(&signature, &message)?;
        Ok(publickey::public_to_address(&public))
    }

    /// At most `max_uncles` entries,
    /// collected ancestry scanned `MAX_UNCLE_GENERATIONS` generations
    /// back, each uncle checked against duplication, ancestry and its own
    /// parent's position before being run through `verify_header_with_parent`.
    pub fn verify_uncles(&self, block_header: &Header, uncles: &[Header]) -> Result<(), Error> {
        let max_uncles = self.params().max_uncles;
        if uncles.len() > max_uncles {
            return Err(ErrorKind::TooManyUncles(uncles.len(), max_uncles).into());
        }

        let mut ancestors = HashSet::new();
        let mut ancestor_uncles = HashSet::new();
        let mut cursor_hash = *block_header.parent_hash();
        let mut cursor_number = block_header.number();
        for _ in 0..constants::MAX_UNCLE_GENERATIONS {
            if cursor_number == 0 {
                break;
            }
            cursor_number -= 1;
            let (header, unc) = match self.chain.block(&cursor_hash, cursor_number) {
                Some(v) => v,
                None => break,
            };
            ancestors.insert(cursor_hash);
            for u in &unc {
                ancestor_uncles.insert(u.hash());
            }
            cursor_hash = *header.parent_hash();
        }

        let mut seen = HashSet::new();
        for uncle in uncles {
            let uncle_hash = uncle.hash();
            if !seen.insert(uncle_hash) || ancestor_uncles.contains(&uncle_hash) {
                return Err(ErrorKind::DuplicateUncle(uncle_hash).into());
            }
            if ancestors.contains(&uncle_hash) {
                return Err(ErrorKind::UncleIsAncestor(uncle_hash).into());
            }
            if !ancestors.contains(uncle.parent_hash()) || uncle.parent_hash() == block_header.parent_hash() {
                return Err(ErrorKind::DanglingUncle(uncle_hash).into());
            }
            let uncle_parent_number = uncle.number().checked_sub(1).ok_or_else(|| Error::from(ErrorKind::UnknownAncestor))?;
            let uncle_parent = self
                .chain
                .header(uncle.parent_hash(), uncle_parent_number)
                .ok_or_else(|| Error::from(ErrorKind::UnknownAncestor))?;
            self.verify_header_with_parent(uncle, &uncle_parent, true)?;
        }
        Ok(())
    }

    /// The stake oracle is consulted
    /// twice by design — once to compute the earliest eligible timestamp
    /// before sleeping, once more immediately after, since the oracle's
    /// answer is free to change while the engine slept.
    fn hit_time(&self, header: &Header, parent: &Header) -> Result<(u64, U256, u64), Error> {
        let hit_value = lottery::hit(parent.generation_signature(), header.coinbase());
        let stake = self.oracle.effective_balance(header.coinbase())?;
        let effective = lottery::effective_target(*parent.base_target(), stake);
        let at = lottery::hit_time(parent.timestamp(), hit_value, effective);
        Ok((hit_value, effective, at))
    }

    /// Blocks (cooperatively, via `stop` and a
    /// timer) until the draft header's earliest eligible timestamp, then
    /// re-checks eligibility, stamps the generation signature, signs the
    /// sealing hash, and emits the completed header. Returns without
    /// emitting if `stop` fires first; reports `UnableToMineTime` on
    /// `errors` if eligibility no longer holds once the timer expires.
    pub fn seal(
        &self,
        mut header: Header,
        results: crossbeam_channel::Sender<Header>,
        stop: crossbeam_channel::Receiver<()>,
        errors: crossbeam_channel::Sender<Error>,
    ) -> Result<(), Error> {
        if header.number() == 0 {
            return Err(ErrorKind::UnknownBlock.into());
        }
        let parent = self.parent_of(&header)?;

        let (hit_value, _effective, hit_at) = self.hit_time(&header, &parent)?;
        let hit_at = hit_at.saturating_add(1);
        let wait = hit_at.saturating_sub(header.timestamp());
        let timeout = crossbeam_channel::after(Duration::from_secs(wait));

        crossbeam_channel::select! {
            recv(stop) -> _ => {
                debug!(target: "engine", "seal for block {} cancelled before hit-time", header.number());
                return Ok(());
            }
            recv(timeout) -> _ => {}
        }

        header.set_timestamp(hit_at);
        // `prepare` was run by the miner-driver against a provisional
        // timestamp; base_target/difficulty are a function of the final
        // timestamp, so they're recomputed here before signing.
        self.prepare(&mut header)?;

        let stake = self.oracle.effective_balance(header.coinbase())?;
        let effective = lottery::effective_target(*parent.base_target(), stake);
        let elapsed = header.timestamp() - parent.timestamp();
        if !lottery::is_eligible(hit_value, effective, elapsed) {
            let _ = errors.send(ErrorKind::UnableToMineTime.into());
            return Ok(());
        }

        header.set_generation_signature(lottery::generation_signature(
            parent.generation_signature(),
            header.coinbase(),
        ));

        let sealing_hash = header.sealing_hash();
        let signature = self.signer.sign(sealing_hash.as_bytes())?;
        header.set_block_signature(signature);

        let _ = results.send(header);
        Ok(())
    }
}

impl<C, O> IPos<C, O>
where
    C: ChainReader + 'static,
    O: StakeOracle + 'static,
{
    /// Verifies every header
    /// concurrently across up to `GOMAXPROCS` workers, each picking its
    /// parent from `headers[i-1]` when `headers[i-1].hash() ==
    /// headers[i].parent_hash()`, else from the chain store. Returns
    /// immediately with a receiver that yields results in input order
    /// regardless of completion order, and a handle that can cancel the
    /// batch while it is still running: verification happens on background
    /// worker threads, not before this call returns.
    pub fn verify_headers_batch(
        self: &Arc<Self>,
        headers: Vec<Header>,
        check_seal: Vec<bool>,
    ) -> (crossbeam_channel::Receiver<Result<(), Error>>, batch::BatchHandle) {
        let engine = self.clone();
        let siblings = headers.clone();
        let check_seal = Arc::new(check_seal);

        let verify_one = move |index: usize, header: &Header| -> Result<(), Error> {
            let parent = if index > 0 && siblings[index - 1].hash() == *header.parent_hash() {
                siblings[index - 1].clone()
            } else {
                engine.parent_of(header)?
            };
            let seal = check_seal.get(index).copied().unwrap_or(true);
            engine.verify_header_with_parent(header, &parent, seal)
        };

        batch::verify_headers_batch(headers, Arc::new(verify_one))
    }
}
