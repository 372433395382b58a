//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! C1 (transport adapter) contract, plus C10, the in-memory stand-in used by tests and
//! by [`crate::config::ConnectionType::Mock`]. A real TCP/TLS transport is an external
//! collaborator and is not implemented here.

use crate::error::ConnectionError;
use crate::reactor::event::{Incoming, ServerReply};
use crate::shared::{Endpoint, SegmentName, WriterId};
use crate::wire::*;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::Sender;

/// A single logical connection to an `Endpoint`. `send` is non-blocking; `drop` is
/// idempotent and stops further reply delivery.
pub trait ClientConnection: Send {
    fn send(&mut self, command: Requests) -> Result<(), ConnectionError>;
    fn get_endpoint(&self) -> Endpoint;
}

/// Opens a [`ClientConnection`] and wires its replies to `sink`. Implemented once per
/// [`crate::config::ConnectionType`].
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn establish(
        &self,
        endpoint: Endpoint,
        sink: Sender<Incoming>,
    ) -> Result<Box<dyn ClientConnection>, ConnectionError>;
}

/// Scripted reply behavior for [`MockConnectionFactory`], mirroring the reference
/// client's `MockType` test fixture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockType {
    /// setup succeeds, every append is acked immediately.
    Happy,
    /// setup fails with `WrongHost`.
    WrongHost,
    /// setup succeeds, every append is replied to with `SegmentIsSealed`.
    SegmentIsSealed,
    /// `establish` itself always fails with a transport error.
    Unavailable,
    /// setup succeeds normally; the connection drops right after its second
    /// `AppendData`. The reconnect that follows succeeds and reports a nonzero
    /// `last_connection_offset_ack`, so `append_setup` acks the already-durable prefix
    /// and `retransmit_ledger` only resends what came after it.
    DropsAfterTwoAppends,
}

pub struct MockConnectionFactory {
    pub mock_type: MockType,
}

impl MockConnectionFactory {
    pub fn new(mock_type: MockType) -> Self {
        MockConnectionFactory { mock_type }
    }
}

/// Offset the scripted `DropsAfterTwoAppends` reconnect reports as already durable.
const CATCH_UP_ACK_OFFSET: i64 = 8;

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn establish(
        &self,
        endpoint: Endpoint,
        sink: Sender<Incoming>,
    ) -> Result<Box<dyn ClientConnection>, ConnectionError> {
        if self.mock_type == MockType::Unavailable {
            return Err(ConnectionError::Establish {
                endpoint: endpoint.to_string(),
                reason: "mock connection refused".to_owned(),
            });
        }
        Ok(Box::new(MockConnection {
            endpoint,
            sink,
            mock_type: self.mock_type,
            closed: Arc::new(AtomicI64::new(0)),
            append_count: Arc::new(AtomicI64::new(0)),
        }))
    }
}

struct MockConnection {
    endpoint: Endpoint,
    sink: Sender<Incoming>,
    mock_type: MockType,
    /// nonzero once `send` has observed a broken sink; purely diagnostic.
    closed: Arc<AtomicI64>,
    /// `AppendData` sends seen on this connection; used by `DropsAfterTwoAppends`.
    append_count: Arc<AtomicI64>,
}

impl ClientConnection for MockConnection {
    fn send(&mut self, command: Requests) -> Result<(), ConnectionError> {
        if self.closed.load(Ordering::SeqCst) != 0 {
            return Err(ConnectionError::Disconnected);
        }
        if self.mock_type == MockType::DropsAfterTwoAppends {
            if let Requests::AppendData(_) = &command {
                if self.append_count.fetch_add(1, Ordering::SeqCst) + 1 > 2 {
                    self.closed.store(1, Ordering::SeqCst);
                    return Err(ConnectionError::Disconnected);
                }
            }
        }
        let mut sink = self.sink.clone();
        let mock_type = self.mock_type;
        let segment = request_segment(&command);
        let writer_id = request_writer_id(&command);
        tokio::spawn(async move {
            if let Some(reply) = scripted_reply(mock_type, &command, segment, writer_id) {
                let _ = sink.send(Incoming::ServerReply(ServerReply { reply })).await;
            }
        });
        Ok(())
    }

    fn get_endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }
}

fn request_segment(command: &Requests) -> SegmentName {
    match command {
        Requests::CreateSegment(c) => c.segment.clone(),
        Requests::SetupAppend(c) => c.segment.clone(),
        Requests::AppendData(_) => SegmentName::new(""),
        Requests::KeepAlive => SegmentName::new(""),
        Requests::ReadSegment(c) => c.segment.clone(),
    }
}

fn request_writer_id(command: &Requests) -> Option<WriterId> {
    match command {
        Requests::SetupAppend(c) => Some(c.writer_id),
        Requests::AppendData(c) => Some(c.writer_id),
        _ => None,
    }
}

fn scripted_reply(
    mock_type: MockType,
    command: &Requests,
    segment: SegmentName,
    writer_id: Option<WriterId>,
) -> Option<Replies> {
    match command {
        Requests::CreateSegment(_) => Some(Replies::SegmentCreated(SegmentCreatedCommand { segment })),
        Requests::SetupAppend(_) => match mock_type {
            MockType::WrongHost => Some(Replies::WrongHost(WrongHostCommand {
                segment,
                correct_host: "other-host:9090".to_owned(),
            })),
            MockType::DropsAfterTwoAppends => Some(Replies::AppendSetup(AppendSetupCommand {
                writer_id: writer_id.expect("setup always carries a writer id"),
                segment,
                last_connection_offset_ack: CATCH_UP_ACK_OFFSET,
            })),
            _ => Some(Replies::AppendSetup(AppendSetupCommand {
                writer_id: writer_id.expect("setup always carries a writer id"),
                segment,
                last_connection_offset_ack: 0,
            })),
        },
        Requests::AppendData(cmd) => match mock_type {
            MockType::SegmentIsSealed => {
                Some(Replies::SegmentIsSealed(SegmentIsSealedCommand { segment }))
            }
            _ => Some(Replies::DataAppended(DataAppendedCommand {
                writer_id: writer_id.expect("append always carries a writer id"),
                connection_offset_ack: cmd.connection_offset,
            })),
        },
        Requests::KeepAlive => None,
        Requests::ReadSegment(cmd) => Some(Replies::SegmentRead(SegmentReadCommand {
            segment,
            offset: cmd.offset,
            data: vec![0u8; cmd.max_len as usize].into(),
            end_of_segment: false,
        })),
    }
}
