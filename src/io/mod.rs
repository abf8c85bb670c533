// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! I/O providers for running a [`Server`](crate::server::Server).
//!
//! The [`Server`](crate::server::Server) answers messages without
//! doing any network I/O itself. An I/O provider receives messages
//! from the operating system, passes them to the server, and sends back
//! the responses. [`BlockingIoProvider`] does so with blocking sockets
//! and a fixed set of worker threads.

mod blocking;
pub mod socket;

pub use blocking::{BlockingIoConfig, BlockingIoProvider};
