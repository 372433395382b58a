//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use segment_stream_client::client_factory::ClientFactory;
use segment_stream_client::config::{ClientConfigBuilder, ConnectionType};
use segment_stream_client::connection::MockType;
use segment_stream_client::error::SegmentWriterError;
use segment_stream_client::shared::Endpoint;

fn factory_with(mock_type: MockType) -> ClientFactory {
    let config = ClientConfigBuilder::default()
        .endpoint(Endpoint::from("127.0.0.1:9090"))
        .connection_type(ConnectionType::Mock)
        .mock_type(mock_type)
        .build()
        .expect("valid config");
    ClientFactory::new(config)
}

/// Scenario 1: create new segment.
#[test]
fn create_new_segment_returns_true() {
    let factory = factory_with(MockType::Happy);
    let handle = factory.get_runtime_handle();
    let created = handle.block_on(factory.create_segment("s1")).expect("create_segment");
    assert!(created);
}

/// Scenario 2: linear append. Three writes of 3/5/2 bytes each resolve `ok`; the mock
/// transport acks every append immediately at its own offset, so offsets 3, 8, 10 each
/// drain in turn.
#[test]
fn linear_append_all_three_writes_resolve_ok() {
    let factory = factory_with(MockType::Happy);
    let handle = factory.get_runtime_handle();
    let stream = factory.open_for_append("s1");

    let h1 = handle.block_on(stream.write(vec![0u8; 3]));
    let h2 = handle.block_on(stream.write(vec![0u8; 5]));
    let h3 = handle.block_on(stream.write(vec![0u8; 2]));

    assert!(handle.block_on(h1).unwrap().is_ok());
    assert!(handle.block_on(h2).unwrap().is_ok());
    assert!(handle.block_on(h3).unwrap().is_ok());
}

/// Scenario 6: flush with in-flight. After a write, `flush()` returns once the server
/// has acked, leaving the ledger empty.
#[test]
fn flush_returns_once_ledger_is_drained() {
    let factory = factory_with(MockType::Happy);
    let handle = factory.get_runtime_handle();
    let stream = factory.open_for_append("s1");

    let completion = handle.block_on(stream.write(vec![1u8; 4]));
    handle.block_on(stream.flush()).expect("flush");
    assert!(handle.block_on(completion).unwrap().is_ok());
}

/// Boundary test: a zero-length payload does not advance the offset but is still
/// acked as a no-op.
#[test]
fn zero_length_payload_still_resolves_ok() {
    let factory = factory_with(MockType::Happy);
    let handle = factory.get_runtime_handle();
    let stream = factory.open_for_append("s1");

    let completion = handle.block_on(stream.write(vec![]));
    assert!(handle.block_on(completion).unwrap().is_ok());
}

/// Scenario 5 (sealed mid-flight), driven end-to-end through the facade: every
/// write fails `Sealed`, and `close()` still succeeds.
#[test]
fn sealed_segment_fails_writes_but_close_still_succeeds() {
    let factory = factory_with(MockType::SegmentIsSealed);
    let handle = factory.get_runtime_handle();
    let stream = factory.open_for_append("s1");

    let completion = handle.block_on(stream.write(vec![1u8; 4]));
    let result = handle.block_on(completion).unwrap();
    assert!(matches!(result, Err(SegmentWriterError::Sealed { .. })));
    assert!(handle.block_on(stream.close()).is_ok());
}

/// Scenario 4 (reconnect storm): `establish` always fails, so writes exhaust the
/// retry budget and surface `Unavailable` rather than hanging forever.
#[test]
fn unavailable_transport_surfaces_unavailable_not_a_hang() {
    let factory = factory_with(MockType::Unavailable);
    let handle = factory.get_runtime_handle();
    let stream = factory.open_for_append("s1");

    let completion = handle.block_on(stream.write(vec![1u8; 4]));
    let result = handle.block_on(completion).unwrap();
    assert!(matches!(result, Err(SegmentWriterError::Unavailable { .. })));
}

/// `open_transaction_for_append` is unimplemented in this version.
#[test]
fn transactional_append_is_unsupported() {
    use segment_stream_client::shared::TransactionId;

    let factory = factory_with(MockType::Happy);
    let result = factory.open_transaction_for_append("s1", TransactionId(1));
    assert!(result.is_err());
}
