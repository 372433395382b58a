//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

use crate::connection::MockType;
use crate::shared::Endpoint;

/// How the output stream dials its `endpoint`. `Tcp` is a placeholder for the real
/// transport (an external collaborator, see crate docs); only `Mock` is wired to a
/// working [`crate::connection::ConnectionFactory`] in this repo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionType {
    Tcp,
    Mock,
}

/// The bounded-retry schedule `ensure_ready` follows: `initial_delay_ms`, multiplied by
/// `multiplier` on each of up to `max_attempts` attempts, producing a 1/10/100/1000/10000 ms
/// backoff with the defaults below. Exposed as fields (rather than hardcoded) so tests can
/// shrink the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay_ms: u64,
    pub max_attempts: u32,
    pub multiplier: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_delay_ms: 1,
            max_attempts: 5,
            multiplier: 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub connection_type: ConnectionType,
    pub retry_policy: RetryPolicy,
    /// scripted reply behavior when `connection_type` is [`ConnectionType::Mock`];
    /// ignored otherwise. Defaults to [`MockType::Happy`], matching the reference
    /// client's `mock(true)` builder call defaulting to a working loopback transport.
    pub mock_type: MockType,
}

#[derive(Clone, Debug, Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<Endpoint>,
    connection_type: Option<ConnectionType>,
    retry_policy: Option<RetryPolicy>,
    mock_type: Option<MockType>,
}

impl ClientConfigBuilder {
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = Some(connection_type);
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    pub fn mock_type(mut self, mock_type: MockType) -> Self {
        self.mock_type = Some(mock_type);
        self
    }

    pub fn build(self) -> Result<ClientConfig, &'static str> {
        Ok(ClientConfig {
            endpoint: self.endpoint.ok_or("endpoint is required")?,
            connection_type: self.connection_type.unwrap_or(ConnectionType::Tcp),
            retry_policy: self.retry_policy.unwrap_or_default(),
            mock_type: self.mock_type.unwrap_or(MockType::Happy),
        })
    }
}
