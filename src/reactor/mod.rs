//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! The reactor: the background task (C5) and the pieces it stitches together
//! (C2 reply demux, C3 ledger, C4 connection state).

pub(crate) mod connection_state;
pub(crate) mod event;
pub(crate) mod ledger;
pub(crate) mod reply_demux;
pub mod segment_writer;
