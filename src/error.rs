//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use crate::shared::SegmentName;
use crate::wire::Replies;
use snafu::Snafu;

/// Transport-layer failures: connection establishment, send, or an unexpected drop.
#[derive(Debug, Snafu, Clone)]
pub enum ConnectionError {
    #[snafu(display("failed to establish connection to {}: {}", endpoint, reason))]
    Establish { endpoint: String, reason: String },
    #[snafu(display("send failed on a dropped or broken connection: {}", reason))]
    SendFailed { reason: String },
    #[snafu(display("connection was dropped"))]
    Disconnected,
}

/// Errors surfaced by [`crate::reactor::segment_writer::SegmentOutputStream`] and, by
/// extension, on every [`crate::reactor::ledger::PendingCompletion`].
#[derive(Debug, Snafu, Clone)]
pub enum SegmentWriterError {
    /// the segment has been sealed server-side; terminal for the stream.
    #[snafu(display("segment {} is sealed", segment))]
    Sealed { segment: SegmentName },

    /// server rejected the segment name or batch id; terminal.
    #[snafu(display("invalid argument for segment {}: {}", segment, reason))]
    InvalidArgument { segment: SegmentName, reason: String },

    /// connection broken or establish failed; recoverable by reconnect.
    #[snafu(display("transport error: {}", source))]
    Transport { source: ConnectionError },

    /// reconnect retries exhausted.
    #[snafu(display("segment {} unavailable after {} attempts", segment, attempts))]
    Unavailable { segment: SegmentName, attempts: u32 },

    /// the caller's wait was cancelled before it could observe a result.
    #[snafu(display("operation was interrupted"))]
    Interrupted,

    /// operation attempted on a stream that is already closed.
    #[snafu(display("illegal state: stream for segment {} is closed", segment))]
    IllegalState { segment: SegmentName },

    /// `seal`, `open_transaction_for_append`, and `WrongHost` redirection are not
    /// implemented in this version.
    #[snafu(display("unsupported operation: {}", what))]
    Unsupported { what: String },

    /// an unexpected reply was observed on a channel that should only ever see a
    /// fixed subset of [`Replies`].
    #[snafu(display("protocol violation: unexpected reply {:?}", reply))]
    ProtocolViolation { reply: Replies },

    /// the background task driving this stream has already exited.
    #[snafu(display("failed to send to the segment writer's internal task"))]
    SendToProcessor,
}

impl SegmentWriterError {
    pub fn is_sealed(&self) -> bool {
        matches!(self, SegmentWriterError::Sealed { .. })
    }
}

/// Errors from the client facade (C6): segment creation and stream construction.
#[derive(Debug, Snafu)]
pub enum ClientFactoryError {
    #[snafu(display("failed to create segment {}: {}", segment, source))]
    CreateSegment {
        segment: SegmentName,
        source: ConnectionError,
    },
    #[snafu(display("unexpected reply while creating segment {}: {:?}", segment, reply))]
    UnexpectedReply { segment: SegmentName, reply: Replies },
    #[snafu(display("{}", what))]
    Unsupported { what: String },
}
