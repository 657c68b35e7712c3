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

//! Concurrent, order-preserving batch header verification.
//!
//! Mirrors the producer/worker/orderer shape of the original's
//! `VerifyHeaders`/`verifyHeaderWorker`: a fixed pool of workers pulls
//! `(index, header)` jobs off a channel and verifies each independently,
//! while a dedicated orderer thread buffers out-of-order completions and
//! forwards them to the caller strictly in input order. Workers and the
//! orderer are spawned and left running in the background; the function
//! returns the ordered-results receiver and a [`BatchHandle`] immediately,
//! so a caller holding the handle can call [`BatchHandle::cancel`] while
//! the batch is still in flight. Once cancelled, any job a worker has not
//! yet started returns [`crate::error::ErrorKind::Cancelled`], and the
//! orderer stops forwarding further results, matching "the orderer
//! terminates without emitting further results" once signalled.

use crate::error::{Error, ErrorKind};
use ipos_types::header::Header;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle to a batch still running in the background. Dropping it does
/// not cancel the batch; call [`BatchHandle::cancel`] explicitly.
pub struct BatchHandle {
    cancel: Arc<AtomicBool>,
}

impl BatchHandle {
    /// Request that any job not yet started return `Cancelled` instead of
    /// running, and that the orderer stop forwarding further results.
    /// Jobs already in progress finish normally but their results are
    /// no longer guaranteed to reach the caller.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// Verifies every header in `headers` against `verify_one`, using up to
/// `num_cpus::get()` worker threads. Returns a receiver that yields
/// results in the same order as `headers` regardless of which order the
/// workers finished in, plus a handle that can cancel the remaining work
/// while the batch is still running.
pub fn verify_headers_batch<V>(
    headers: Vec<Header>,
    verify_one: Arc<V>,
) -> (crossbeam_channel::Receiver<Result<(), Error>>, BatchHandle)
where
    V: Fn(usize, &Header) -> Result<(), Error> + Send + Sync + 'static,
{
    let total = headers.len();
    let cancel = Arc::new(AtomicBool::new(false));
    let handle = BatchHandle { cancel: cancel.clone() };
    let (ordered_tx, ordered_rx) = crossbeam_channel::unbounded();

    if total == 0 {
        return (ordered_rx, handle);
    }

    let workers = num_cpus::get().max(1).min(total);
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, Header)>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Result<(), Error>)>();

    for (index, header) in headers.into_iter().enumerate() {
        job_tx.send((index, header)).expect("receivers outlive this loop");
    }
    drop(job_tx);

    for _ in 0..workers {
        let job_rx = job_rx.clone();
        let result_tx = result_tx.clone();
        let verify_one = verify_one.clone();
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            while let Ok((index, header)) = job_rx.recv() {
                let result = if cancel.load(Ordering::SeqCst) {
                    Err(Error::from(ErrorKind::Cancelled))
                } else {
                    verify_one(index, &header)
                };
                if result_tx.send((index, result)).is_err() {
                    break;
                }
            }
        });
    }
    drop(result_tx);

    let orderer_cancel = cancel;
    std::thread::spawn(move || {
        let mut pending = HashMap::new();
        let mut next = 0usize;
        for (index, result) in result_rx.iter() {
            if orderer_cancel.load(Ordering::SeqCst) {
                return;
            }
            pending.insert(index, result);
            while let Some(result) = pending.remove(&next) {
                if orderer_cancel.load(Ordering::SeqCst) || ordered_tx.send(result).is_err() {
                    return;
                }
                next += 1;
            }
        }
    });

    (ordered_rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::Address;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn header(number: u64) -> Header {
        let mut h = Header::new();
        h.set_number(number);
        h.set_coinbase(Address::from_low_u64_be(number));
        h
    }

    #[test]
    fn results_preserve_input_order() {
        let headers: Vec<Header> = (0..50).map(header).collect();
        let (results_rx, _handle) = verify_headers_batch(
            headers.clone(),
            Arc::new(|_index: usize, h: &Header| {
                if h.number() % 7 == 0 {
                    Err(Error::from(ErrorKind::UnknownBlock))
                } else {
                    Ok(())
                }
            }),
        );
        let results: Vec<_> = results_rx.iter().collect();

        assert_eq!(results.len(), headers.len());
        for (i, result) in results.iter().enumerate() {
            let expected_err = (i as u64) % 7 == 0;
            assert_eq!(result.is_err(), expected_err, "index {}", i);
        }
    }

    #[test]
    fn every_header_is_visited_exactly_once() {
        let visited = Arc::new(AtomicUsize::new(0));
        let headers: Vec<Header> = (0..30).map(header).collect();
        let counter = visited.clone();
        let (results_rx, _handle) = verify_headers_batch(
            headers,
            Arc::new(move |_index: usize, _h: &Header| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        let results: Vec<_> = results_rx.iter().collect();
        assert_eq!(results.len(), 30);
        assert_eq!(visited.load(Ordering::SeqCst), 30);
    }

    #[test]
    fn empty_batch_returns_immediately() {
        let (results_rx, _handle) =
            verify_headers_batch(Vec::new(), Arc::new(|_index: usize, _: &Header| Ok(())));
        assert!(results_rx.iter().collect::<Vec<_>>().is_empty());
    }

    #[test]
    fn cancel_takes_effect_on_jobs_not_yet_started() {
        // Every call to `verify_one` blocks on `gate` until it's dropped, so
        // the first `workers` jobs stay parked mid-verification while the
        // remaining jobs sit unconsumed in the job queue. Cancelling before
        // dropping the gate proves jobs dequeued after that point never run.
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let visited = Arc::new(AtomicUsize::new(0));
        let visited_clone = visited.clone();
        let total = 256;
        let headers: Vec<Header> = (0..total).map(header).collect();

        let (results_rx, handle) = verify_headers_batch(
            headers.clone(),
            Arc::new(move |_index: usize, _h: &Header| {
                visited_clone.fetch_add(1, Ordering::SeqCst);
                let _ = gate_rx.recv();
                Ok(())
            }),
        );

        // Give the worker pool time to pick up and block on their first jobs.
        std::thread::sleep(Duration::from_millis(100));
        handle.cancel();
        drop(gate_tx);

        let results: Vec<_> = results_rx.iter().collect();
        assert_eq!(results.len(), total as usize);

        let visited_total = visited.load(Ordering::SeqCst);
        assert!(
            visited_total < total as usize,
            "cancellation should have stopped some jobs before they started, visited {}",
            visited_total
        );

        // Everything actually visited succeeds; everything dequeued after
        // cancellation was observed comes back `Cancelled`, and the split
        // between the two groups still respects input order.
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, visited_total);
        for (i, result) in results.iter().enumerate() {
            if i < visited_total {
                assert!(result.is_ok(), "index {} should have run", i);
            } else {
                assert!(matches!(result.as_ref().unwrap_err().kind(), ErrorKind::Cancelled), "index {} should be cancelled", i);
            }
        }
    }
}
