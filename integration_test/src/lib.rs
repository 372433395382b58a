//
// Copyright (c) Dell Inc., or its subsidiaries. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//

//! End-to-end scenarios driven purely through the public facade, against the
//! in-memory mock transport. These complement, rather than repeat, the in-crate unit
//! tests colocated with each reactor component.

pub mod scenarios;
