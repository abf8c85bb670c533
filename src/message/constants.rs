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

//! Constants related to DNS messages.
//!
//! Header flags are given as masks over the 16-bit big-endian flags
//! field that follows the message ID.

pub const HEADER_SIZE: usize = 12;
pub const ID_START: usize = 0;
pub const FLAGS_START: usize = 2;
pub const QDCOUNT_START: usize = 4;
pub const ANCOUNT_START: usize = 6;
pub const NSCOUNT_START: usize = 8;
pub const ARCOUNT_START: usize = 10;

pub const QR_FLAG: u16 = 0x8000;
pub const OPCODE_MASK: u16 = 0x7800;
pub const OPCODE_SHIFT: usize = 11;
pub const AA_FLAG: u16 = 0x0400;
pub const TC_FLAG: u16 = 0x0200;
pub const RD_FLAG: u16 = 0x0100;
pub const CD_FLAG: u16 = 0x0010;
pub const RCODE_MASK: u16 = 0x000f;

/// The flags copied from a query into its response: RD (RFC 1035
/// § 4.1.1) and CD (RFC 4035 § 3.1.6).
pub const ECHOED_FLAGS: u16 = RD_FLAG | CD_FLAG;

/// The opcode of a standard query.
pub const OPCODE_QUERY: u16 = 0;

/// The largest offset a compression pointer can hold.
pub const POINTER_MAX: usize = 16383;

/// The shortest possible query: a header plus a question for the root.
pub const MIN_QUERY_SIZE: usize = HEADER_SIZE + 1 + 2 + 2;

/// The size of an OPT pseudo-record with a root owner and no options.
pub const OPT_RR_SIZE: usize = 11;

/// The UDP payload size every client may assume (RFC 1035 § 4.2.1).
pub const MIN_UDP_PAYLOAD_SIZE: u16 = 512;

/// The UDP payload size this server advertises in its OPT records.
pub const EDNS_UDP_PAYLOAD_SIZE: u16 = 1480;

/// The DO ("DNSSEC OK") bit of the EDNS flags (RFC 3225).
pub const EDNS_DO_FLAG: u16 = 0x8000;

/// The largest DNS message, bounded by the TCP length prefix.
pub const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;
