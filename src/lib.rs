//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

pub mod client_factory;
pub mod config;
pub mod connection;
pub mod error;
pub mod input_stream;
pub mod reactor;
pub mod shared;
pub mod wire;

pub use client_factory::ClientFactory;
pub use config::{ClientConfig, ClientConfigBuilder, ConnectionType, RetryPolicy};
pub use error::SegmentWriterError;
pub use input_stream::SegmentInputStream;
pub use reactor::segment_writer::SegmentOutputStream;
pub use shared::{Endpoint, SegmentName, WriterId};

use uuid::Uuid;

pub(crate) fn get_random_u128() -> u128 {
    Uuid::new_v4().as_u128()
}

/// Monotonically-ish increasing id used to correlate a request with its reply in logs.
/// Not used for dedup or ordering; the wire layer that is out of scope for this repo is
/// responsible for any request id the real protocol needs.
pub(crate) fn get_request_id() -> i64 {
    Uuid::new_v4().as_u128() as i64
}
