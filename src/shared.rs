//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! Identifier types shared across the public surface. Kept deliberately small: the
//! real directory/host-resolution subsystem that would normally mint [`Endpoint`]s
//! from a segment name is an external collaborator (see the crate-level docs).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The server hosting a segment. Immutable once a stream is built against it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(addr: impl Into<String>) -> Self {
        Endpoint(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Endpoint(s.to_owned())
    }
}

/// UTF-8 name identifying a segment. Immutable once a stream is built against it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentName(String);

impl SegmentName {
    pub fn new(name: impl Into<String>) -> Self {
        SegmentName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SegmentName {
    fn from(s: &str) -> Self {
        SegmentName(s.to_owned())
    }
}

impl From<String> for SegmentName {
    fn from(s: String) -> Self {
        SegmentName(s)
    }
}

/// A UUID minted by the client when an output stream is constructed. Identifies this
/// writer to the server so it can track per-writer ack levels and dedup retransmits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WriterId(pub u128);

impl WriterId {
    pub fn random() -> Self {
        WriterId(crate::get_random_u128())
    }
}

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// A transaction id, minted by the server. Carried only so `open_transaction_for_append`
/// has a concrete parameter type; transactional append is unimplemented (see DESIGN.md).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u128);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}
