//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! C3: the in-flight ledger. An ordered map from connection offset to the completion
//! that settles once the server acks it. Keyed ascending by `im::OrdMap`, whose
//! structural sharing makes `snapshot()` an O(1) clone rather than a deep copy.

use crate::error::SegmentWriterError;
use bytes::Bytes;
use futures_intrusive::sync::ManualResetEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

#[derive(Clone)]
struct LedgerEntry {
    payload: Bytes,
    completion: Arc<Mutex<Option<oneshot::Sender<Result<(), SegmentWriterError>>>>>,
}

pub struct InflightLedger {
    entries: Mutex<im::OrdMap<i64, LedgerEntry>>,
    write_offset: Mutex<i64>,
    /// raised whenever the ledger is empty; sticky until the next `enqueue`.
    empty_signal: ManualResetEvent,
}

impl InflightLedger {
    pub fn new() -> Self {
        InflightLedger {
            entries: Mutex::new(im::OrdMap::new()),
            write_offset: Mutex::new(0),
            empty_signal: ManualResetEvent::new(true),
        }
    }

    /// Advances the write offset by `payload.len()` and inserts the new entry, keyed by
    /// the post-advance offset (I1: write offset == sum of payload lengths enqueued).
    pub fn enqueue(
        &self,
        payload: Bytes,
        completion: oneshot::Sender<Result<(), SegmentWriterError>>,
    ) -> i64 {
        let mut write_offset = self.write_offset.lock().unwrap();
        *write_offset += payload.len() as i64;
        let offset = *write_offset;
        drop(write_offset);

        let entry = LedgerEntry {
            payload,
            completion: Arc::new(Mutex::new(Some(completion))),
        };
        let mut entries = self.entries.lock().unwrap();
        entries.insert(offset, entry);
        self.empty_signal.reset();
        offset
    }

    /// Removes every entry with `offset <= level` and completes it with `Ok(())`.
    /// Raises the empty-signal if the ledger becomes empty (I4).
    pub fn ack_up_to(&self, level: i64) {
        let mut entries = self.entries.lock().unwrap();
        let to_drain: Vec<i64> = entries.keys().take_while(|&&k| k <= level).copied().collect();
        for offset in to_drain {
            if let Some(entry) = entries.remove(&offset) {
                if let Some(sender) = entry.completion.lock().unwrap().take() {
                    let _ = sender.send(Ok(()));
                }
            }
        }
        if entries.is_empty() {
            self.empty_signal.set();
        }
    }

    /// A consistent, ascending snapshot of `(offset, payload)` for retransmit. Cheap:
    /// `im::OrdMap::clone` shares structure with the live map.
    pub fn snapshot(&self) -> Vec<(i64, Bytes)> {
        let entries = self.entries.lock().unwrap().clone();
        entries.into_iter().map(|(k, v)| (k, v.payload)).collect()
    }

    /// Blocks until the ledger is empty. The signal is sticky: once raised it stays
    /// raised until the next `enqueue` resets it.
    pub async fn await_empty(&self) {
        self.empty_signal.wait().await;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Completes every outstanding handle with `error` and clears the map. Used on
    /// terminal close-with-error (sealed, invalid argument).
    pub fn fail_all(&self, error: SegmentWriterError) {
        let mut entries = self.entries.lock().unwrap();
        let drained = std::mem::replace(&mut *entries, im::OrdMap::new());
        drop(entries);
        for (_offset, entry) in drained {
            if let Some(sender) = entry.completion.lock().unwrap().take() {
                let _ = sender.send(Err(error.clone()));
            }
        }
        self.empty_signal.set();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn completion() -> (
        oneshot::Sender<Result<(), SegmentWriterError>>,
        oneshot::Receiver<Result<(), SegmentWriterError>>,
    ) {
        oneshot::channel()
    }

    #[test]
    fn enqueue_advances_offset_by_payload_length() {
        let ledger = InflightLedger::new();
        let (tx1, _rx1) = completion();
        let (tx2, _rx2) = completion();
        let (tx3, _rx3) = completion();
        assert_eq!(ledger.enqueue(Bytes::from(vec![0u8; 3]), tx1), 3);
        assert_eq!(ledger.enqueue(Bytes::from(vec![0u8; 5]), tx2), 8);
        assert_eq!(ledger.enqueue(Bytes::from(vec![0u8; 2]), tx3), 10);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn ack_up_to_drains_prefix_only() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let ledger = InflightLedger::new();
        let (tx1, rx1) = completion();
        let (tx2, rx2) = completion();
        let (tx3, rx3) = completion();
        ledger.enqueue(Bytes::from(vec![0u8; 3]), tx1);
        ledger.enqueue(Bytes::from(vec![0u8; 5]), tx2);
        ledger.enqueue(Bytes::from(vec![0u8; 2]), tx3);

        ledger.ack_up_to(8);
        assert_eq!(ledger.len(), 1);
        assert!(rt.block_on(rx1).unwrap().is_ok());
        assert!(rt.block_on(rx2).unwrap().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[test]
    fn empty_signal_is_sticky_until_next_enqueue() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let ledger = InflightLedger::new();
        // empty at construction: await_empty must not block.
        rt.block_on(ledger.await_empty());

        let (tx, _rx) = completion();
        ledger.enqueue(Bytes::from(vec![0u8; 4]), tx);
        ledger.ack_up_to(4);
        rt.block_on(ledger.await_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn fail_all_completes_every_outstanding_handle_with_error() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let ledger = InflightLedger::new();
        let (tx1, rx1) = completion();
        let (tx2, rx2) = completion();
        ledger.enqueue(Bytes::from(vec![0u8; 10]), tx1);
        ledger.enqueue(Bytes::from(vec![0u8; 10]), tx2);

        ledger.fail_all(SegmentWriterError::Sealed {
            segment: crate::shared::SegmentName::new("s1"),
        });
        assert!(ledger.is_empty());
        assert!(rt.block_on(rx1).unwrap().is_err());
        assert!(rt.block_on(rx2).unwrap().is_err());
    }

    #[test]
    fn zero_length_payload_does_not_advance_offset() {
        let ledger = InflightLedger::new();
        let (tx, _rx) = completion();
        let offset = ledger.enqueue(Bytes::new(), tx);
        assert_eq!(offset, 0);
    }
}
