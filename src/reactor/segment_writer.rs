//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! C5: the segment output stream, the core of this crate. A single background task
//! (spawned by [`SegmentOutputStream::new`]) owns a [`SegmentWriterCore`] and drains an
//! `mpsc` channel of [`Incoming`] messages; that single task is what serializes the
//! stream's public operations without holding a lock across an await point, the same
//! shape the reference client's `SegmentReactor::run`/`run_once` uses.

use crate::config::{ClientConfig, RetryPolicy};
use crate::connection::ConnectionFactory;
use crate::error::{ConnectionError, SegmentWriterError};
use crate::reactor::connection_state::ConnectionState;
use crate::reactor::event::{Incoming, PendingEvent, ServerReply};
use crate::reactor::ledger::InflightLedger;
use crate::reactor::reply_demux::{dispatch, ReplyHandler};
use crate::shared::{Endpoint, SegmentName, WriterId};
use crate::wire::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::oneshot;
use tracing::{debug, error, info, info_span, warn};
use tracing_futures::Instrument;

const CHANNEL_CAPACITY: usize = 100;

/// Public handle to an output stream. Cheap to clone; every clone shares the same
/// background task and therefore the same total order of operations.
#[derive(Clone)]
pub struct SegmentOutputStream {
    writer_id: WriterId,
    segment: SegmentName,
    sender: Sender<Incoming>,
}

impl SegmentOutputStream {
    pub(crate) fn new(
        segment: SegmentName,
        config: &ClientConfig,
        connection_factory: Arc<dyn ConnectionFactory>,
        runtime_handle: &Handle,
    ) -> Self {
        let writer_id = WriterId::random();
        let (sender, receiver) = channel(CHANNEL_CAPACITY);
        let core = SegmentWriterCore::new(
            writer_id,
            segment.clone(),
            config.endpoint.clone(),
            config.retry_policy,
            connection_factory,
            sender.clone(),
        );
        let span = info_span!("segment_writer", writer_id = %writer_id, segment = %segment);
        runtime_handle.spawn(SegmentWriterCore::run(core, receiver).instrument(span));
        SegmentOutputStream {
            writer_id,
            segment,
            sender,
        }
    }

    pub fn writer_id(&self) -> WriterId {
        self.writer_id
    }

    pub fn segment(&self) -> &SegmentName {
        &self.segment
    }

    /// Enqueues `payload` and returns a completion that resolves once the server has
    /// acknowledged this offset, or rejects with `Sealed`/`IllegalState`/etc. Returns as
    /// soon as the append is handed to the background task; it does not itself wait for
    /// durability.
    pub async fn write(
        &self,
        payload: Vec<u8>,
    ) -> oneshot::Receiver<Result<(), SegmentWriterError>> {
        let (tx, rx) = oneshot::channel();
        let event = PendingEvent::new(payload, tx);
        let mut sender = self.sender.clone();
        if sender.send(Incoming::Write(event)).await.is_err() {
            let (tx_error, rx_error) = oneshot::channel();
            let _ = tx_error.send(Err(SegmentWriterError::SendToProcessor));
            return rx_error;
        }
        rx
    }

    /// Returns once every completion enqueued strictly before this call has resolved.
    pub async fn flush(&self) -> Result<(), SegmentWriterError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .clone()
            .send(Incoming::Flush(tx))
            .await
            .map_err(|_| SegmentWriterError::SendToProcessor)?;
        rx.await.map_err(|_| SegmentWriterError::Interrupted)?
    }

    /// Idempotent-safe: drains the ledger and releases the connection.
    pub async fn close(&self) -> Result<(), SegmentWriterError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .clone()
            .send(Incoming::Close(tx))
            .await
            .map_err(|_| SegmentWriterError::SendToProcessor)?;
        rx.await.map_err(|_| SegmentWriterError::Interrupted)?
    }

    /// Not implemented in this version. The intended contract is flush, send
    /// `SealSegment`, await the server's reported final length.
    pub async fn seal(&self) -> Result<(), SegmentWriterError> {
        Err(SegmentWriterError::Unsupported {
            what: "seal".to_owned(),
        })
    }
}

/// The state actually driving the protocol; lives entirely on the background task, so
/// every field here is touched by exactly one task and needs no locking of its own (the
/// locking lives inside [`ConnectionState`] and [`InflightLedger`], which remain
/// independently synchronized so reply delivery and the task loop share them safely).
pub(crate) struct SegmentWriterCore {
    writer_id: WriterId,
    segment: SegmentName,
    endpoint: Endpoint,
    retry_policy: RetryPolicy,
    connection_factory: Arc<dyn ConnectionFactory>,
    connection_state: ConnectionState,
    ledger: InflightLedger,
    reply_sink: Sender<Incoming>,
    closed: bool,
    /// set once a `Sealed` or `InvalidArgument` reply is observed; terminal.
    terminal: Option<SegmentWriterError>,
}

impl SegmentWriterCore {
    fn new(
        writer_id: WriterId,
        segment: SegmentName,
        endpoint: Endpoint,
        retry_policy: RetryPolicy,
        connection_factory: Arc<dyn ConnectionFactory>,
        reply_sink: Sender<Incoming>,
    ) -> Self {
        SegmentWriterCore {
            writer_id,
            segment,
            endpoint,
            retry_policy,
            connection_factory,
            connection_state: ConnectionState::new(),
            ledger: InflightLedger::new(),
            reply_sink,
            closed: false,
            terminal: None,
        }
    }

    pub(crate) async fn run(mut core: SegmentWriterCore, mut receiver: Receiver<Incoming>) {
        // the initial connect's failure is suppressed here; it surfaces on the first
        // write or flush via `ensure_ready` instead.
        let _ = core.connect().await;
        info!("segment writer started");
        while let Some(incoming) = receiver.recv().await {
            match incoming {
                Incoming::Write(event) => {
                    core.write(event).await;
                }
                Incoming::Flush(ack) => {
                    let result = core.flush().await;
                    let _ = ack.send(result);
                }
                Incoming::Close(ack) => {
                    let result = core.close().await;
                    let _ = ack.send(result);
                }
                Incoming::ServerReply(server_reply) => {
                    if let Err(e) = dispatch(&mut core, server_reply.reply) {
                        error!("unexpected reply for writer {:?}: {:?}", core.writer_id, e);
                    }
                }
            }
        }
        info!("segment writer closed");
    }

    #[cfg(test)]
    pub(crate) fn pending_append_num(&self) -> usize {
        self.ledger.len()
    }

    /// Ensures a connection is already installed, establishing one if not. Does not
    /// itself block on readiness; see `ensure_ready`.
    async fn connect(&mut self) -> Result<(), SegmentWriterError> {
        if self.closed {
            return Err(SegmentWriterError::IllegalState {
                segment: self.segment.clone(),
            });
        }
        if self.connection_state.has_connection() {
            return Ok(());
        }
        match self
            .connection_factory
            .establish(self.endpoint.clone(), self.reply_sink.clone())
            .await
        {
            Ok(connection) => {
                self.connection_state.install_new(connection);
                let setup = Requests::SetupAppend(SetupAppendCommand {
                    writer_id: self.writer_id,
                    segment: self.segment.clone(),
                });
                if let Err(e) = self.connection_state.send(setup) {
                    warn!("failed to send setup append: {:?}", e);
                    self.connection_state.fail(transport_error(e));
                }
                Ok(())
            }
            Err(e) => {
                warn!("failed to establish connection: {:?}", e);
                self.connection_state.fail(transport_error(e));
                Ok(())
            }
        }
    }

    /// Bounded-retry connect: up to `retry_policy.max_attempts` attempts, sleeping
    /// `initial_delay_ms * multiplier^attempt` between them. `Sealed`/`InvalidArgument`
    /// propagate immediately without retry.
    async fn ensure_ready(&mut self) -> Result<(), SegmentWriterError> {
        if self.closed {
            return Err(SegmentWriterError::IllegalState {
                segment: self.segment.clone(),
            });
        }
        if let Some(terminal) = &self.terminal {
            return Err(terminal.clone());
        }

        let mut delay_ms = self.retry_policy.initial_delay_ms;
        for attempt in 1..=self.retry_policy.max_attempts {
            self.connect().await?;
            match self.connection_state.await_ready().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_sealed() => return Err(e),
                Err(SegmentWriterError::InvalidArgument { segment, reason }) => {
                    return Err(SegmentWriterError::InvalidArgument { segment, reason })
                }
                Err(e) => {
                    debug!("connect attempt {} failed: {:?}", attempt, e);
                    tokio::time::delay_for(Duration::from_millis(delay_ms)).await;
                    delay_ms *= self.retry_policy.multiplier;
                }
            }
        }
        warn!(
            "segment {} unavailable after {} attempts",
            self.segment, self.retry_policy.max_attempts
        );
        Err(SegmentWriterError::Unavailable {
            segment: self.segment.clone(),
            attempts: self.retry_policy.max_attempts,
        })
    }

    /// Attempts a reconnect and swallows the result; used after a mid-flight transport
    /// failure where the caller already decided not to propagate an error.
    async fn reconnect(&mut self) {
        if let Err(e) = self.ensure_ready().await {
            debug!("reconnect did not complete: {:?}", e);
        }
    }

    /// C5.write: acquires a ready connection, enqueues *before* sending so a send
    /// failure leaves the payload in the ledger for automatic retransmit.
    async fn write(&mut self, event: PendingEvent) {
        if self.closed {
            let _ = event.oneshot_sender.send(Err(SegmentWriterError::IllegalState {
                segment: self.segment.clone(),
            }));
            return;
        }
        if let Err(e) = self.ensure_ready().await {
            let _ = event.oneshot_sender.send(Err(e));
            return;
        }

        let offset = self.ledger.enqueue(event.payload.clone(), event.oneshot_sender);
        let append = Requests::AppendData(AppendDataCommand {
            writer_id: self.writer_id,
            connection_offset: offset,
            payload: event.payload,
        });
        if let Err(e) = self.connection_state.send(append) {
            warn!(
                "append send failed for writer {:?} offset {}: {:?}, reconnecting",
                self.writer_id, offset, e
            );
            self.connection_state.fail(transport_error(e));
            self.reconnect().await;
        }
    }

    /// C5.flush: no-op if the ledger is already empty (covers the sealed/closed path
    /// where `fail_all` already drained it); otherwise sends `KeepAlive` to prompt the
    /// server to emit pending acks, then waits for the ledger to drain.
    async fn flush(&mut self) -> Result<(), SegmentWriterError> {
        if self.ledger.is_empty() {
            return Ok(());
        }
        self.ensure_ready().await?;
        if let Err(e) = self.connection_state.send(Requests::KeepAlive) {
            warn!("keep-alive failed: {:?}, retransmit will recover", e);
            self.connection_state.fail(transport_error(e));
            self.reconnect().await;
        }
        self.ledger.await_empty().await;
        Ok(())
    }

    /// C5.close: rejects further writes, drains the ledger, releases the connection.
    async fn close(&mut self) -> Result<(), SegmentWriterError> {
        self.closed = true;
        self.flush().await?;
        if let Some(connection) = self.connection_state.take_connection() {
            drop(connection);
        }
        Ok(())
    }

    fn retransmit_ledger(&mut self) -> Result<(), ConnectionError> {
        for (offset, payload) in self.ledger.snapshot() {
            let append = Requests::AppendData(AppendDataCommand {
                writer_id: self.writer_id,
                connection_offset: offset,
                payload,
            });
            self.connection_state.send(append)?;
        }
        Ok(())
    }
}

fn transport_error(source: ConnectionError) -> SegmentWriterError {
    SegmentWriterError::Transport { source }
}

impl ReplyHandler for SegmentWriterCore {
    fn append_setup(&mut self, cmd: AppendSetupCommand) -> Result<(), SegmentWriterError> {
        self.ledger.ack_up_to(cmd.last_connection_offset_ack);
        match self.retransmit_ledger() {
            Ok(()) => {
                self.connection_state.mark_ready();
                debug!(
                    "writer {:?} ready, ack level {}",
                    self.writer_id, cmd.last_connection_offset_ack
                );
            }
            Err(e) => {
                warn!("retransmit failed for writer {:?}: {:?}", self.writer_id, e);
                self.connection_state.fail(transport_error(e));
            }
        }
        Ok(())
    }

    fn data_appended(&mut self, cmd: DataAppendedCommand) -> Result<(), SegmentWriterError> {
        debug!(
            "writer {:?} acked up to {}",
            self.writer_id, cmd.connection_offset_ack
        );
        self.ledger.ack_up_to(cmd.connection_offset_ack);
        Ok(())
    }

    fn segment_is_sealed(&mut self, cmd: SegmentIsSealedCommand) -> Result<(), SegmentWriterError> {
        info!("segment {} is sealed", cmd.segment);
        let err = SegmentWriterError::Sealed {
            segment: cmd.segment,
        };
        self.terminal = Some(err.clone());
        self.connection_state.fail(err.clone());
        self.ledger.fail_all(err);
        Ok(())
    }

    fn no_such_segment(&mut self, cmd: NoSuchSegmentCommand) -> Result<(), SegmentWriterError> {
        warn!("no such segment {}", cmd.segment);
        let err = SegmentWriterError::InvalidArgument {
            segment: cmd.segment,
            reason: "no such segment".to_owned(),
        };
        self.terminal = Some(err.clone());
        self.connection_state.fail(err.clone());
        self.ledger.fail_all(err);
        Ok(())
    }

    fn no_such_batch(&mut self, cmd: NoSuchBatchCommand) -> Result<(), SegmentWriterError> {
        warn!("no such batch on segment {}", cmd.segment);
        let err = SegmentWriterError::InvalidArgument {
            segment: cmd.segment,
            reason: "no such batch".to_owned(),
        };
        self.terminal = Some(err.clone());
        self.connection_state.fail(err.clone());
        self.ledger.fail_all(err);
        Ok(())
    }

    fn wrong_host(&mut self, cmd: WrongHostCommand) -> Result<(), SegmentWriterError> {
        warn!(
            "wrong host for segment {}, correct host is {}; redirection is unsupported in this version",
            cmd.segment, cmd.correct_host
        );
        self.connection_state.fail(transport_error(ConnectionError::Disconnected));
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::config::{ClientConfigBuilder, ConnectionType, RetryPolicy};
    use crate::connection::{MockConnectionFactory, MockType};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            initial_delay_ms: 1,
            max_attempts: 3,
            multiplier: 2,
        }
    }

    fn make_stream(mock_type: MockType, rt: &tokio::runtime::Runtime) -> SegmentOutputStream {
        let config = ClientConfigBuilder::default()
            .endpoint(Endpoint::from("127.0.0.1:9090"))
            .connection_type(ConnectionType::Mock)
            .retry_policy(fast_retry())
            .build()
            .unwrap();
        let factory: Arc<dyn ConnectionFactory> = Arc::new(MockConnectionFactory::new(mock_type));
        rt.enter(|| SegmentOutputStream::new(SegmentName::new("s1"), &config, factory, &Handle::current()))
    }

    #[test]
    fn happy_path_write_resolves_ok() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::Happy, &rt);
        let handle = rt.block_on(stream.write(vec![1, 2, 3]));
        let result = rt.block_on(handle).unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn flush_drains_after_ack() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::Happy, &rt);
        rt.block_on(stream.write(vec![1; 4]));
        let result = rt.block_on(stream.flush());
        assert!(result.is_ok());
    }

    #[test]
    fn sealed_fails_inflight_and_future_writes() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::SegmentIsSealed, &rt);
        let handle = rt.block_on(stream.write(vec![1; 4]));
        let result = rt.block_on(handle).unwrap();
        assert!(matches!(result, Err(SegmentWriterError::Sealed { .. })));

        let handle2 = rt.block_on(stream.write(vec![1; 4]));
        let result2 = rt.block_on(handle2).unwrap();
        assert!(matches!(result2, Err(SegmentWriterError::Sealed { .. })));

        // close still succeeds: the ledger was already drained by fail_all.
        let close_result = rt.block_on(stream.close());
        assert!(close_result.is_ok());
    }

    #[test]
    fn unavailable_after_retries_exhausted() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::Unavailable, &rt);
        let handle = rt.block_on(stream.write(vec![1; 4]));
        let result = rt.block_on(handle).unwrap();
        assert!(matches!(result, Err(SegmentWriterError::Unavailable { .. })));
    }

    #[test]
    fn wrong_host_retries_then_exhausts() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::WrongHost, &rt);
        let handle = rt.block_on(stream.write(vec![1; 4]));
        let result = rt.block_on(handle).unwrap();
        // WrongHost is treated as a transport fault that is retried and ultimately
        // exhausts the retry budget in this version (no redirect support).
        assert!(matches!(result, Err(SegmentWriterError::Unavailable { .. })));
    }

    #[test]
    fn linear_append_offsets_are_prefix_sums() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::Happy, &rt);
        let h1 = rt.block_on(stream.write(vec![0u8; 3]));
        let h2 = rt.block_on(stream.write(vec![0u8; 5]));
        let h3 = rt.block_on(stream.write(vec![0u8; 2]));
        assert!(rt.block_on(h1).unwrap().is_ok());
        assert!(rt.block_on(h2).unwrap().is_ok());
        assert!(rt.block_on(h3).unwrap().is_ok());
    }

    #[test]
    fn close_is_idempotent_safe_after_normal_use() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::Happy, &rt);
        rt.block_on(stream.write(vec![1, 2, 3]));
        assert!(rt.block_on(stream.close()).is_ok());
    }

    #[test]
    fn seal_is_unsupported() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::Happy, &rt);
        let result = rt.block_on(stream.seal());
        assert!(matches!(result, Err(SegmentWriterError::Unsupported { .. })));
    }

    #[test]
    fn handshake_catch_up_retransmits_only_the_unacked_remainder() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::DropsAfterTwoAppends, &rt);
        let h1 = rt.block_on(stream.write(vec![0u8; 3]));
        let h2 = rt.block_on(stream.write(vec![0u8; 5]));
        let h3 = rt.block_on(stream.write(vec![0u8; 2]));
        // offsets 3, 8, 10: the third append is the one that outlives the dropped
        // connection and gets retransmitted once the reconnect's `AppendSetup` reports
        // an ack level of 8.
        assert!(rt.block_on(h1).unwrap().is_ok());
        assert!(rt.block_on(h2).unwrap().is_ok());
        assert!(rt.block_on(h3).unwrap().is_ok());
    }

    #[test]
    fn zero_length_payload_still_acks() {
        let mut rt = tokio::runtime::Runtime::new().unwrap();
        let stream = make_stream(MockType::Happy, &rt);
        let handle = rt.block_on(stream.write(vec![]));
        let result = rt.block_on(handle).unwrap();
        assert!(result.is_ok());
    }
}
