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

//! The query-answering logic of the server.
//!
//! The [`Server`] structure is the heart of this module. It is
//! independent of any network I/O: an I/O provider hands it received
//! messages through [`Server::handle_message`] and sends back whatever
//! [`Response`] it produces.

use std::sync::Arc;

use log::trace;

use crate::answer::{Flavor, Shape};
use crate::index::{SharedIndex, ZoneIndex};
use crate::message::constants::{MAX_MESSAGE_SIZE, MIN_UDP_PAYLOAD_SIZE};
use crate::message::Rcode;

mod query;
mod response;

pub use response::Response;

////////////////////////////////////////////////////////////////////////
// SERVER                                                             //
////////////////////////////////////////////////////////////////////////

/// An authoritative DNS server for a single zone, abstracted from any
/// underlying network I/O provider.
///
/// A `Server` answers from whatever [`ZoneIndex`] is currently
/// published in its [`SharedIndex`]. Each message is answered from a
/// single index generation, even if a new one is published while the
/// message is being handled.
pub struct Server {
    index: Arc<SharedIndex>,
}

impl Server {
    /// Creates a new `Server` answering from `index`.
    pub fn new(index: Arc<SharedIndex>) -> Self {
        Self { index }
    }

    /// Returns the index the `Server` answers from.
    pub fn index(&self) -> &Arc<SharedIndex> {
        &self.index
    }

    /// Handles a received DNS message. This is the API through which
    /// I/O providers submit messages.
    ///
    /// Returns `None` if the message does not merit a response (it is
    /// too short to be a query, or it is a response itself). Otherwise
    /// the returned [`Response`] borrows from `context`, which is
    /// expected to be reused for every message a worker handles.
    pub fn handle_message<'c>(
        &self,
        message: &[u8],
        transport: Transport,
        context: &'c mut Context,
    ) -> Option<Response<'c>> {
        let query = query::classify(message)?;
        context.index = self.index.snapshot();
        let Context {
            index,
            head,
            scratch,
        } = context;

        if query.rcode != Rcode::NoError {
            trace!("Query {:#06x} is malformed: {}.", query.id, query.rcode);
            return Some(response::error(&query, message, query.rcode, head));
        }
        let index = match index.as_deref() {
            Some(index) => index,
            None => return Some(response::error(&query, message, Rcode::ServFail, head)),
        };
        let (depth, key) = match query.locate(index.apex()) {
            Some(located) => located,
            None => return Some(response::error(&query, message, Rcode::Refused, head)),
        };

        let (set, matched) = index.lookup(key);
        let shape = Shape::select(matched, depth, query.qtype);
        let flavor = Flavor::from_do_bit(query.edns.map_or(false, |edns| edns.dnssec_ok));
        let limit = match transport {
            Transport::Tcp => MAX_MESSAGE_SIZE,
            Transport::Udp => query
                .edns
                .map_or(MIN_UDP_PAYLOAD_SIZE, |edns| edns.udp_payload_size)
                as usize,
        };
        trace!(
            "Query {:#06x} for type {} is answered as {:?}/{:?}.",
            query.id,
            query.qtype,
            shape,
            flavor,
        );
        Some(response::answer(
            &query,
            message,
            set.get(shape, flavor),
            shape.rcode(),
            limit,
            head,
            scratch,
        ))
    }
}

/// The transport over which a message was received.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Transport {
    Tcp,
    Udp,
}

////////////////////////////////////////////////////////////////////////
// MESSAGE-HANDLING CONTEXT                                           //
////////////////////////////////////////////////////////////////////////

/// Per-worker state for [`Server::handle_message`].
///
/// The `Context` keeps the index snapshot in use alive and owns the
/// buffers a [`Response`] is assembled in, so that handling a message
/// allocates nothing once the buffers have grown to size.
#[derive(Debug, Default)]
pub struct Context {
    index: Option<Arc<ZoneIndex>>,
    head: Vec<u8>,
    scratch: Vec<u8>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
