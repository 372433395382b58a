//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! C11: a minimal sequential reader, carried only so [`crate::client_factory::ClientFactory::open_for_read`]
//! has a concrete return type. The read path is out of scope for this repo: no
//! sealed-aware retry, no prefetching, no truncation tracking. Every call dials a
//! fresh one-shot connection, mirroring `create_segment` rather than the
//! reactor-backed append path.

use crate::connection::ConnectionFactory;
use crate::error::{ClientFactoryError, ConnectionError};
use crate::reactor::event::Incoming;
use crate::shared::{Endpoint, SegmentName};
use crate::wire::*;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::channel;

/// A single-segment sequential reader. Not thread-safe: `read_at` takes `&mut self`
/// because it advances nothing on its own (the caller tracks its own cursor) but
/// mutates nothing shared either; the `&mut` only documents that two concurrent reads
/// from the same handle would race on the one-shot reply channel below.
pub struct SegmentInputStream {
    segment: SegmentName,
    endpoint: Endpoint,
    connection_factory: Arc<dyn ConnectionFactory>,
    runtime_handle: Handle,
}

impl SegmentInputStream {
    pub(crate) fn new(
        segment: SegmentName,
        endpoint: Endpoint,
        connection_factory: Arc<dyn ConnectionFactory>,
        runtime_handle: Handle,
    ) -> Self {
        SegmentInputStream {
            segment,
            endpoint,
            connection_factory,
            runtime_handle,
        }
    }

    pub fn segment(&self) -> &SegmentName {
        &self.segment
    }

    /// Reads up to `max_len` bytes starting at `offset`. Returns the raw `SegmentRead`
    /// reply; the caller is responsible for noticing `end_of_segment` and for any
    /// retry around a truncated or sealed segment (none of that is implemented here).
    pub async fn read_at(&self, offset: i64, max_len: i32) -> Result<SegmentReadCommand, ClientFactoryError> {
        let (sink, mut receiver) = channel(1);
        let mut connection = self
            .connection_factory
            .establish(self.endpoint.clone(), sink)
            .await
            .map_err(|source| ClientFactoryError::CreateSegment {
                segment: self.segment.clone(),
                source,
            })?;
        connection
            .send(Requests::ReadSegment(ReadSegmentCommand {
                segment: self.segment.clone(),
                offset,
                max_len,
            }))
            .map_err(|source| ClientFactoryError::CreateSegment {
                segment: self.segment.clone(),
                source,
            })?;
        let incoming = receiver.recv().await;
        drop(connection);
        match incoming {
            Some(Incoming::ServerReply(server_reply)) => match server_reply.reply {
                Replies::SegmentRead(cmd) => Ok(cmd),
                other => Err(ClientFactoryError::UnexpectedReply {
                    segment: self.segment.clone(),
                    reply: other,
                }),
            },
            _ => Err(ClientFactoryError::CreateSegment {
                segment: self.segment.clone(),
                source: ConnectionError::Disconnected,
            }),
        }
    }

    pub fn runtime_handle(&self) -> &Handle {
        &self.runtime_handle
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::connection::MockConnectionFactory;
    use crate::connection::MockType;

    #[test]
    fn carries_the_segment_it_was_opened_for() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let factory: Arc<dyn ConnectionFactory> = Arc::new(MockConnectionFactory::new(MockType::Happy));
        let input = SegmentInputStream::new(
            SegmentName::new("s1"),
            Endpoint::from("127.0.0.1:9090"),
            factory,
            rt.handle().clone(),
        );
        assert_eq!(input.segment().as_str(), "s1");
    }

    #[test]
    fn read_at_resolves_with_the_requested_offset() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let factory: Arc<dyn ConnectionFactory> = Arc::new(MockConnectionFactory::new(MockType::Happy));
        let input = SegmentInputStream::new(
            SegmentName::new("s1"),
            Endpoint::from("127.0.0.1:9090"),
            factory,
            rt.handle().clone(),
        );
        let result = rt.block_on(input.read_at(10, 4)).unwrap();
        assert_eq!(result.offset, 10);
        assert_eq!(result.data.len(), 4);
        assert!(!result.end_of_segment);
    }
}
