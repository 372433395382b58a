//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! C4: the current connection handle, its readiness latch, and the last observed
//! failure. The ready-latch is a reusable manual-reset event: reset on every new
//! connect attempt, raised on both success and failure so waiters blocked in
//! `await_ready` always wake up, never hang.

use crate::connection::ClientConnection;
use crate::error::{ConnectionError, SegmentWriterError};
use crate::wire::Requests;
use futures_intrusive::sync::ManualResetEvent;
use std::sync::Mutex;

struct Inner {
    connection: Option<Box<dyn ClientConnection>>,
    last_error: Option<SegmentWriterError>,
}

pub struct ConnectionState {
    inner: Mutex<Inner>,
    ready_latch: ManualResetEvent,
}

impl ConnectionState {
    pub fn new() -> Self {
        ConnectionState {
            inner: Mutex::new(Inner {
                connection: None,
                last_error: None,
            }),
            ready_latch: ManualResetEvent::new(false),
        }
    }

    pub fn has_connection(&self) -> bool {
        self.inner.lock().unwrap().connection.is_some()
    }

    /// Resets the ready-latch, clears `last_error`, and stores the new connection.
    pub fn install_new(&self, connection: Box<dyn ClientConnection>) {
        self.ready_latch.reset();
        let mut inner = self.inner.lock().unwrap();
        inner.last_error = None;
        inner.connection = Some(connection);
    }

    /// Raises the ready-latch; callers blocked in `await_ready` observe the connection.
    pub fn mark_ready(&self) {
        self.ready_latch.set();
    }

    /// Records `error` if none is already recorded, captures and clears the current
    /// connection, then raises the ready-latch so waiters observe the failure. The
    /// captured connection is dropped after the lock is released.
    pub fn fail(&self, error: SegmentWriterError) {
        let captured = {
            let mut inner = self.inner.lock().unwrap();
            if inner.last_error.is_none() {
                inner.last_error = Some(error);
            }
            inner.connection.take()
        };
        self.ready_latch.set();
        drop(captured);
    }

    /// Blocks on the ready-latch; resolves once a connection is installed and ready, or
    /// the last recorded failure otherwise.
    pub async fn await_ready(&self) -> Result<(), SegmentWriterError> {
        self.ready_latch.wait().await;
        let inner = self.inner.lock().unwrap();
        if inner.connection.is_some() {
            Ok(())
        } else {
            Err(inner
                .last_error
                .clone()
                .unwrap_or(SegmentWriterError::Transport {
                    source: ConnectionError::Disconnected,
                }))
        }
    }

    /// Sends on the currently installed connection, if any.
    pub fn send(&self, command: Requests) -> Result<(), ConnectionError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.connection.as_mut() {
            Some(conn) => conn.send(command),
            None => Err(ConnectionError::Disconnected),
        }
    }

    /// Takes the connection unconditionally, for use by `close()`. Returns it to the
    /// caller to drop outside any lock.
    pub fn take_connection(&self) -> Option<Box<dyn ClientConnection>> {
        self.inner.lock().unwrap().connection.take()
    }

    pub fn last_error(&self) -> Option<SegmentWriterError> {
        self.inner.lock().unwrap().last_error.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::connection::{ConnectionFactory, MockConnectionFactory, MockType};
    use crate::shared::Endpoint;
    use tokio::sync::mpsc::channel;

    #[test]
    fn fail_raises_latch_so_waiters_observe_the_error() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let state = ConnectionState::new();
        state.fail(SegmentWriterError::Sealed {
            segment: crate::shared::SegmentName::new("s1"),
        });
        let result = rt.block_on(state.await_ready());
        assert!(result.is_err());
        assert!(!state.has_connection());
    }

    #[test]
    fn install_then_mark_ready_resolves_await_ready() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let state = ConnectionState::new();
        let factory = MockConnectionFactory::new(MockType::Happy);
        let (tx, _rx) = channel(8);
        let conn = rt
            .block_on(factory.establish(Endpoint::from("127.0.0.1:9090"), tx))
            .unwrap();
        state.install_new(conn);
        state.mark_ready();
        assert!(rt.block_on(state.await_ready()).is_ok());
    }
}
