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

//! Quickroot is an authoritative DNS server built to answer for the
//! root zone at high query rates.
//!
//! Rather than walking a zone database per query, Quickroot renders
//! every response it could give ahead of time. A zone file is parsed
//! into a [`zone::Zone`], and for each name in the zone an
//! [`answer::AnswerSet`] is built holding the finished wire-format
//! answers for every supported response shape. The answers are kept in
//! an [`index::ZoneIndex`], which is published atomically through an
//! [`index::SharedIndex`] so that reloads never block queries.
//!
//! At query time, [`server::Server`] runs a narrow classifier over the
//! incoming message, looks the name up in the index, picks an answer,
//! patches the compression pointers for the query's actual name length,
//! and hands the I/O layer two slices to send with scatter-gather I/O.
//! The [`io`] module provides a thread-based I/O provider, and
//! [`loader`] keeps the index fresh as the zone file changes.

pub mod answer;
pub mod class;
pub mod index;
pub mod io;
pub mod loader;
pub mod message;
pub mod name;
pub mod rr;
pub mod server;
pub mod thread;
pub mod zone;
pub mod zone_file;
mod util;

#[cfg(test)]
mod fixtures;
