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

//! Assembly of response messages.
//!
//! A response is sent as two parts: a head, written per query into the
//! worker's [`Context`](super::Context), and a body, which is usually a
//! precomputed [`Answer`] that is sent without being copied.

use super::query::Query;
use crate::answer::{opt_record, Answer};
use crate::message::constants::*;
use crate::message::Rcode;

/// A response message, ready to be sent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Response<'a> {
    /// The message is `head` followed by `body`.
    Parts { head: &'a [u8], body: &'a [u8] },
}

impl<'a> Response<'a> {
    /// Returns the header and question section.
    pub fn head(&self) -> &'a [u8] {
        match *self {
            Self::Parts { head, .. } => head,
        }
    }

    /// Returns everything after the question section.
    pub fn body(&self) -> &'a [u8] {
        match *self {
            Self::Parts { body, .. } => body,
        }
    }

    /// Returns the parts in order, for scatter-gather output.
    pub fn parts(&self) -> [&'a [u8]; 2] {
        [self.head(), self.body()]
    }

    /// Returns the length of the whole message.
    pub fn len(&self) -> usize {
        self.head().len() + self.body().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the message into one buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        [self.head(), self.body()].concat()
    }
}

/// Builds the response that carries `answer`. The result is truncated
/// if it is longer than `limit`.
pub(super) fn answer<'a>(
    query: &Query,
    message: &[u8],
    answer: &'a Answer,
    rcode: Rcode,
    limit: usize,
    head: &'a mut Vec<u8>,
    scratch: &'a mut Vec<u8>,
) -> Response<'a> {
    let body = answer.relocate(query.question_len() as u16, scratch);
    let (body, arcount) = if query.edns.is_some() {
        (body, answer.arcount())
    } else {
        (&body[..body.len() - OPT_RR_SIZE], answer.arcount() - 1)
    };

    let mut flags = flags(query, rcode, answer.is_authoritative());
    if query.question_end + body.len() <= limit {
        let counts = [answer.ancount(), answer.nscount(), arcount];
        write_head(head, query, message, flags, counts);
        return Response::Parts {
            head: head.as_slice(),
            body,
        };
    }

    flags |= TC_FLAG;
    let opt: &[u8] = if query.edns.is_some() {
        &body[body.len() - OPT_RR_SIZE..]
    } else {
        &[]
    };
    write_head(head, query, message, flags, [0, 0, (!opt.is_empty()) as u16]);
    Response::Parts {
        head: head.as_slice(),
        body: opt,
    }
}

/// Builds a response that carries no records apart from an OPT record,
/// which is included when the query had one.
pub(super) fn error<'a>(
    query: &Query,
    message: &[u8],
    rcode: Rcode,
    head: &'a mut Vec<u8>,
) -> Response<'a> {
    let flags = flags(query, rcode, false);
    let arcount = query.edns.is_some() as u16;
    write_head(head, query, message, flags, [0, 0, arcount]);
    if let Some(edns) = query.edns {
        head.extend_from_slice(&opt_record(edns.dnssec_ok, rcode.extended_bits()));
    }
    Response::Parts {
        head: head.as_slice(),
        body: &[],
    }
}

fn flags(query: &Query, rcode: Rcode, authoritative: bool) -> u16 {
    let mut flags = (query.flags & ECHOED_FLAGS) | QR_FLAG | rcode.header_bits();
    if authoritative {
        flags |= AA_FLAG;
    }
    flags
}

/// Writes the header and the echoed question into `head`.
fn write_head(head: &mut Vec<u8>, query: &Query, message: &[u8], flags: u16, counts: [u16; 3]) {
    head.clear();
    head.extend_from_slice(&query.id.to_be_bytes());
    head.extend_from_slice(&flags.to_be_bytes());
    head.extend_from_slice(&(query.has_question() as u16).to_be_bytes());
    for count in counts {
        head.extend_from_slice(&count.to_be_bytes());
    }
    head.extend_from_slice(&message[HEADER_SIZE..query.question_end]);
}
