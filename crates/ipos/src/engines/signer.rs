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

//! Signer state: the authorized coinbase and the wallet-supplied signing
//! closure. Protected by a reader-writer
//! lock so `authorize` (writer) never blocks `seal` (reader) for longer
//! than it takes to snapshot both fields.

use crate::error::{Error, ErrorKind};
use ethereum_types::Address;
use parking_lot::RwLock;
use std::sync::Arc;

/// A signing closure supplied by the wallet layer: given the account to
/// sign for and the sealing-hash bytes, produce a 65-byte recoverable
/// signature. The mime-type parameter is passed as
/// an empty string by the engine and otherwise unused.
pub type SignFn = dyn Fn(Address, &str, &[u8]) -> Result<Vec<u8>, Error> + Send + Sync;

#[derive(Clone)]
struct Inner {
    account: Address,
    sign_fn: Option<Arc<SignFn>>,
}

impl Default for Inner {
    fn default() -> Self {
        Inner { account: Address::zero(), sign_fn: None }
    }
}

/// Holds the engine's authorized minting identity. `Default` starts
/// unauthorized (`sign` fails with `RequiresSigner`).
#[derive(Default)]
pub struct EngineSigner {
    inner: RwLock<Inner>,
}

impl EngineSigner {
    /// Install a new authorized account and signing closure, replacing
    /// whatever was there before.
    pub fn authorize(&self, account: Address, sign_fn: Arc<SignFn>) {
        let mut inner = self.inner.write();
        inner.account = account;
        inner.sign_fn = Some(sign_fn);
    }

    /// `true` if `authorize` has installed a signer.
    pub fn is_authorized(&self) -> bool {
        self.inner.read().sign_fn.is_some()
    }

    /// The currently authorized coinbase, if any.
    pub fn address(&self) -> Option<Address> {
        let inner = self.inner.read();
        inner.sign_fn.as_ref().map(|_| inner.account)
    }

    /// Sign `message` (the sealing-hash bytes) with the authorized
    /// account. Clones the `Arc` under the read lock and releases it
    /// before calling into the closure, so a concurrent `authorize` is
    /// never blocked by a slow signer.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        let (account, sign_fn) = {
            let inner = self.inner.read();
            match &inner.sign_fn {
                Some(f) => (inner.account, f.clone()),
                None => return Err(ErrorKind::RequiresSigner.into()),
            }
        };
        sign_fn(account, "", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_signer_rejects_signing() {
        let signer = EngineSigner::default();
        assert!(!signer.is_authorized());
        assert!(signer.sign(b"hash").is_err());
    }

    #[test]
    fn authorized_signer_delegates_to_closure() {
        let signer = EngineSigner::default();
        let account = Address::from_low_u64_be(7);
        signer.authorize(account, Arc::new(|addr, _mime, msg| {
            let mut sig = vec![0u8; 65];
            sig[..20].copy_from_slice(addr.as_bytes());
            sig[20] = msg.len() as u8;
            Ok(sig)
        }));

        assert!(signer.is_authorized());
        assert_eq!(signer.address(), Some(account));

        let sig = signer.sign(b"hello").unwrap();
        assert_eq!(&sig[..20], account.as_bytes());
        assert_eq!(sig[20], 5);
    }
}
