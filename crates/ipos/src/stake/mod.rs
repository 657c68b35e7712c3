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

//! The stake oracle: a read-only lookup of a minter's
//! effective (whole-unit) balance, reached through a fixed well-known
//! contract and a pluggable JSON-RPC/IPC transport. The socket-level
//! transport is an external collaborator, named here only by the trait it
//! must implement.

use crate::constants;
use crate::error::{Error, ErrorKind};
use ethereum_types::{Address, U256};
use keccak_hash::keccak;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A raw JSON-RPC transport: send a request body, get the response body
/// back. Deliberately ignorant of HTTP vs IPC framing — that belongs to
/// the node's networking layer, not the consensus engine.
pub trait RpcTransport: Send + Sync {
    /// Send `request` (a complete JSON-RPC request object) and return the
    /// raw response body.
    fn call(&self, request: &str) -> Result<String, Error>;
}

/// A minter's effective balance at the chain's current position. Zero
/// means "not eligible".
pub trait StakeOracle: Send + Sync {
    /// Look up `coinbase`'s whole-unit effective balance.
    fn effective_balance(&self, coinbase: &Address) -> Result<U256, Error>;
}

/// Dials a transport for a given endpoint string. Supplied by the caller;
/// the engine never constructs a socket itself.
pub type Dialer = dyn Fn(&str) -> Result<Arc<dyn RpcTransport>, Error> + Send + Sync;

/// Queries the mint-power contract over JSON-RPC `eth_call`. The
/// underlying transport is dialed at most once and cached behind a mutex,
/// mirroring the original's `dialRPC`/`ecClient` pattern.
pub struct RpcStakeOracle {
    endpoint: String,
    contract: Address,
    dial: Box<Dialer>,
    client: Mutex<Option<Arc<dyn RpcTransport>>>,
}

impl RpcStakeOracle {
    /// A new oracle targeting `endpoint`, using `dial` to establish the
    /// transport on first use. Accepts the `ipc:`/`rpc:` scheme prefixes
    /// verbatim; the prefix is stripped before
    /// being handed to `dial`.
    pub fn new(endpoint: String, dial: Box<Dialer>) -> Self {
        RpcStakeOracle {
            endpoint,
            contract: constants::ipos_contract_address(),
            dial,
            client: Mutex::new(None),
        }
    }

    fn transport(&self) -> Result<Arc<dyn RpcTransport>, Error> {
        let mut guard = self.client.lock();
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }
        let stripped = self
            .endpoint
            .strip_prefix("ipc:")
            .or_else(|| self.endpoint.strip_prefix("rpc:"))
            .unwrap_or(&self.endpoint);
        let client = (self.dial)(stripped)?;
        *guard = Some(client.clone());
        Ok(client)
    }

    fn call_data(&self, coinbase: &Address) -> Vec<u8> {
        let selector = &keccak(b"mintPower(address)".as_ref())[0..4];
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(selector);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(coinbase.as_bytes());
        data
    }
}

impl StakeOracle for RpcStakeOracle {
    fn effective_balance(&self, coinbase: &Address) -> Result<U256, Error> {
        let transport = self.transport()?;
        let data = self.call_data(coinbase);

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": format!("0x{:x}", self.contract),
                    "data": format!("0x{}", rustc_hex_encode(&data)),
                },
                "latest",
            ],
        })
        .to_string();

        let response = transport.call(&request)?;
        let value: serde_json::Value = serde_json::from_str(&response)
            .map_err(|e| Error::from(ErrorKind::StakeOracle(e.to_string())))?;

        let result = value
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::from(ErrorKind::StakeOracle("missing result field".into())))?;
        let hex = result.trim_start_matches("0x");
        let bytes = parse_hex(hex)
            .map_err(|e| Error::from(ErrorKind::StakeOracle(format!("bad hex result: {}", e))))?;

        let wei = U256::from_big_endian(&bytes);
        Ok(wei / U256::from(constants::STAKE_BASE_UNITS))
    }
}

fn rustc_hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn parse_hex(hex: &str) -> Result<Vec<u8>, String> {
    let hex = if hex.len() % 2 == 1 {
        format!("0{}", hex)
    } else {
        hex.to_string()
    };
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

/// A fixed-answer stake oracle for tests: returns whatever was configured
/// for an address, zero for anything unlisted.
#[derive(Default, Clone)]
pub struct StaticStakeOracle {
    balances: HashMap<Address, U256>,
}

impl StaticStakeOracle {
    /// An oracle with no configured balances (everyone ineligible).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `address`'s whole-unit effective balance.
    pub fn set(&mut self, address: Address, balance: U256) {
        self.balances.insert(address, balance);
    }
}

impl StakeOracle for StaticStakeOracle {
    fn effective_balance(&self, coinbase: &Address) -> Result<U256, Error> {
        Ok(self.balances.get(coinbase).copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_oracle_defaults_to_zero() {
        let oracle = StaticStakeOracle::new();
        let addr = Address::from_low_u64_be(42);
        assert_eq!(oracle.effective_balance(&addr).unwrap(), U256::zero());
    }

    #[test]
    fn static_oracle_returns_configured_balance() {
        let mut oracle = StaticStakeOracle::new();
        let addr = Address::from_low_u64_be(42);
        oracle.set(addr, U256::from(1_000));
        assert_eq!(oracle.effective_balance(&addr).unwrap(), U256::from(1_000));
    }

    struct EchoTransport {
        response: String,
    }

    impl RpcTransport for EchoTransport {
        fn call(&self, _request: &str) -> Result<String, Error> {
            Ok(self.response.clone())
        }
    }

    #[test]
    fn rpc_oracle_divides_down_to_whole_units() {
        // 5 * 10^18 wei-equivalent base units -> 5 whole units.
        let raw = U256::from(5) * U256::from(constants::STAKE_BASE_UNITS);
        let mut buf = [0u8; 32];
        raw.to_big_endian(&mut buf);
        let hex_result = format!("0x{}", rustc_hex_encode(&buf));
        let response = serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": hex_result }).to_string();

        let oracle = RpcStakeOracle::new(
            "rpc:http://localhost:8545".into(),
            Box::new(move |_endpoint| {
                Ok(Arc::new(EchoTransport {
                    response: response.clone(),
                }) as Arc<dyn RpcTransport>)
            }),
        );

        let addr = Address::from_low_u64_be(7);
        assert_eq!(oracle.effective_balance(&addr).unwrap(), U256::from(5));
    }

    #[test]
    fn rpc_oracle_caches_transport_across_calls() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dials = Arc::new(AtomicUsize::new(0));
        let dials_clone = dials.clone();
        let response =
            serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": "0x0" }).to_string();

        let oracle = RpcStakeOracle::new(
            "ipc:/tmp/ipos.ipc".into(),
            Box::new(move |_endpoint| {
                dials_clone.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(EchoTransport {
                    response: response.clone(),
                }) as Arc<dyn RpcTransport>)
            }),
        );

        let addr = Address::from_low_u64_be(9);
        oracle.effective_balance(&addr).unwrap();
        oracle.effective_balance(&addr).unwrap();
        assert_eq!(dials.load(Ordering::SeqCst), 1);
    }
}
