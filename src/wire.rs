//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! Minimal request/reply command set this crate is written against. The real wire codec
//! (framing, serialization format, TLS) is an external collaborator; these types exist
//! only so the core protocol in [`crate::reactor::segment_writer`] has something concrete
//! to send and match on.

use crate::shared::{SegmentName, WriterId};
use bytes::Bytes;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requests {
    CreateSegment(CreateSegmentCommand),
    SetupAppend(SetupAppendCommand),
    AppendData(AppendDataCommand),
    KeepAlive,
    /// Declared alongside the append commands for completeness; issued by the read
    /// path, never by the output stream.
    ReadSegment(ReadSegmentCommand),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateSegmentCommand {
    pub segment: SegmentName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupAppendCommand {
    pub writer_id: WriterId,
    pub segment: SegmentName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendDataCommand {
    pub writer_id: WriterId,
    pub connection_offset: i64,
    pub payload: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadSegmentCommand {
    pub segment: SegmentName,
    pub offset: i64,
    pub max_len: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Replies {
    SegmentCreated(SegmentCreatedCommand),
    SegmentAlreadyExists(SegmentAlreadyExistsCommand),
    AppendSetup(AppendSetupCommand),
    DataAppended(DataAppendedCommand),
    SegmentIsSealed(SegmentIsSealedCommand),
    NoSuchSegment(NoSuchSegmentCommand),
    NoSuchBatch(NoSuchBatchCommand),
    WrongHost(WrongHostCommand),
    SegmentRead(SegmentReadCommand),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentCreatedCommand {
    pub segment: SegmentName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentAlreadyExistsCommand {
    pub segment: SegmentName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendSetupCommand {
    pub writer_id: WriterId,
    pub segment: SegmentName,
    /// the largest connection offset the server has durably committed for this writer.
    pub last_connection_offset_ack: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataAppendedCommand {
    pub writer_id: WriterId,
    pub connection_offset_ack: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentIsSealedCommand {
    pub segment: SegmentName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoSuchSegmentCommand {
    pub segment: SegmentName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoSuchBatchCommand {
    pub segment: SegmentName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrongHostCommand {
    pub segment: SegmentName,
    pub correct_host: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentReadCommand {
    pub segment: SegmentName,
    pub offset: i64,
    pub data: Bytes,
    pub end_of_segment: bool,
}
