//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use crate::error::SegmentWriterError;
use crate::wire::Replies;
use bytes::Bytes;
use tokio::sync::oneshot;

/// One pending append: its payload and the completion it resolves once durable.
/// The wire codec is responsible for any fragmentation a payload needs; this crate
/// stays agnostic to payload size and never rejects a write on that basis.
pub struct PendingEvent {
    pub payload: Bytes,
    pub oneshot_sender: oneshot::Sender<Result<(), SegmentWriterError>>,
}

impl PendingEvent {
    pub fn new(
        payload: Vec<u8>,
        oneshot_sender: oneshot::Sender<Result<(), SegmentWriterError>>,
    ) -> Self {
        PendingEvent {
            payload: Bytes::from(payload),
            oneshot_sender,
        }
    }
}

/// A reply, already demultiplexed by transport source, queued for the owning stream's
/// background task to process in arrival order.
pub struct ServerReply {
    pub reply: Replies,
}

/// Messages delivered to a [`crate::reactor::segment_writer::SegmentOutputStream`]'s
/// background task. A single task draining this channel is what gives the stream's
/// public operations a total order without holding a lock across an await point.
pub enum Incoming {
    Write(PendingEvent),
    Flush(oneshot::Sender<Result<(), SegmentWriterError>>),
    Close(oneshot::Sender<Result<(), SegmentWriterError>>),
    ServerReply(ServerReply),
}
