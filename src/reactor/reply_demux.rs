//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! C2: a reply demultiplexer with one handler per [`Replies`] variant and a "failing"
//! default that turns any unhandled variant into a [`SegmentWriterError::ProtocolViolation`].
//! Implementers (here, just [`crate::reactor::segment_writer::SegmentOutputStream`])
//! override only the variants they expect to see.

use crate::error::SegmentWriterError;
use crate::wire::*;

pub trait ReplyHandler {
    fn wrong_host(&mut self, cmd: WrongHostCommand) -> Result<(), SegmentWriterError> {
        protocol_violation(Replies::WrongHost(cmd))
    }

    fn segment_is_sealed(&mut self, cmd: SegmentIsSealedCommand) -> Result<(), SegmentWriterError> {
        protocol_violation(Replies::SegmentIsSealed(cmd))
    }

    fn no_such_segment(&mut self, cmd: NoSuchSegmentCommand) -> Result<(), SegmentWriterError> {
        protocol_violation(Replies::NoSuchSegment(cmd))
    }

    fn no_such_batch(&mut self, cmd: NoSuchBatchCommand) -> Result<(), SegmentWriterError> {
        protocol_violation(Replies::NoSuchBatch(cmd))
    }

    fn segment_already_exists(
        &mut self,
        cmd: SegmentAlreadyExistsCommand,
    ) -> Result<(), SegmentWriterError> {
        protocol_violation(Replies::SegmentAlreadyExists(cmd))
    }

    fn segment_created(&mut self, cmd: SegmentCreatedCommand) -> Result<(), SegmentWriterError> {
        protocol_violation(Replies::SegmentCreated(cmd))
    }

    fn append_setup(&mut self, cmd: AppendSetupCommand) -> Result<(), SegmentWriterError> {
        protocol_violation(Replies::AppendSetup(cmd))
    }

    fn data_appended(&mut self, cmd: DataAppendedCommand) -> Result<(), SegmentWriterError> {
        protocol_violation(Replies::DataAppended(cmd))
    }
}

fn protocol_violation(reply: Replies) -> Result<(), SegmentWriterError> {
    Err(SegmentWriterError::ProtocolViolation { reply })
}

/// Dispatches one decoded reply to the matching handler method, including replies this
/// crate declares only for completeness (`SegmentRead`) which fall through to the
/// protocol-violation default since no handler here overrides them.
pub fn dispatch(handler: &mut impl ReplyHandler, reply: Replies) -> Result<(), SegmentWriterError> {
    match reply {
        Replies::WrongHost(cmd) => handler.wrong_host(cmd),
        Replies::SegmentIsSealed(cmd) => handler.segment_is_sealed(cmd),
        Replies::NoSuchSegment(cmd) => handler.no_such_segment(cmd),
        Replies::NoSuchBatch(cmd) => handler.no_such_batch(cmd),
        Replies::SegmentAlreadyExists(cmd) => handler.segment_already_exists(cmd),
        Replies::SegmentCreated(cmd) => handler.segment_created(cmd),
        Replies::AppendSetup(cmd) => handler.append_setup(cmd),
        Replies::DataAppended(cmd) => handler.data_appended(cmd),
        other => protocol_violation(other),
    }
}
