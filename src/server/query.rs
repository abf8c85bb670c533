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

//! Classification of received messages.
//!
//! Queries are never fully decoded. [`classify`] walks the header, the
//! single question, and an optional OPT record just far enough to
//! decide what to answer, and leaves anything it does not understand
//! to be reported through the response code.

use arrayvec::ArrayVec;

use crate::class::Class;
use crate::message::constants::*;
use crate::message::Rcode;
use crate::name::{Name, MAX_WIRE_LEN};
use crate::rr::Type;

/// The most labels a name of [`MAX_WIRE_LEN`] octets can have,
/// counting the null label.
const MAX_LABELS: usize = MAX_WIRE_LEN / 2 + 1;

////////////////////////////////////////////////////////////////////////
// QUERIES                                                            //
////////////////////////////////////////////////////////////////////////

/// What the server needs to know about a received query.
#[derive(Debug)]
pub(super) struct Query {
    pub id: u16,
    pub flags: u16,
    pub rcode: Rcode,

    /// The offset just past the question, or [`HEADER_SIZE`] if the
    /// question could not be parsed.
    pub question_end: usize,

    /// The QNAME in lowercased wire form.
    qname: ArrayVec<u8, MAX_WIRE_LEN>,
    label_starts: ArrayVec<u8, MAX_LABELS>,

    pub qtype: Type,
    pub edns: Option<Edns>,
}

/// The EDNS parameters of a query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct Edns {
    pub udp_payload_size: u16,
    pub dnssec_ok: bool,
}

impl Query {
    fn new(id: u16, flags: u16) -> Self {
        Self {
            id,
            flags,
            rcode: Rcode::NoError,
            question_end: HEADER_SIZE,
            qname: ArrayVec::new(),
            label_starts: ArrayVec::new(),
            qtype: Type::from(0),
            edns: None,
        }
    }

    /// Returns whether the question was parsed far enough to be echoed.
    pub fn has_question(&self) -> bool {
        self.question_end > HEADER_SIZE
    }

    /// Returns the length of the question section.
    pub fn question_len(&self) -> usize {
        self.question_end - HEADER_SIZE
    }

    /// Returns the lowercased QNAME in wire form.
    pub fn qname(&self) -> &[u8] {
        &self.qname
    }

    /// Places the QNAME relative to `apex`, which must be lowercased.
    /// Returns the number of labels the QNAME has below `apex` along
    /// with the label just below `apex` (empty for the apex itself), or
    /// `None` if the QNAME is not within `apex`.
    pub fn locate(&self, apex: &Name) -> Option<(usize, &[u8])> {
        let depth = self.label_starts.len().checked_sub(apex.len())?;
        let apex_start = self.label_starts[depth] as usize;
        if &self.qname[apex_start..] != apex.wire_repr() {
            return None;
        }
        let key = match depth {
            0 => &[][..],
            _ => &self.qname[self.label_starts[depth - 1] as usize + 1..apex_start],
        };
        Some((depth, key))
    }

    /// Reads everything after the header. On failure, the error is the
    /// RCODE of the response; whatever was read up to that point stays
    /// recorded.
    fn parse(&mut self, message: &[u8]) -> Result<(), Rcode> {
        let count = |start: usize| u16::from_be_bytes([message[start], message[start + 1]]);
        let arcount = count(ARCOUNT_START);
        if self.flags & RCODE_MASK != 0
            || count(QDCOUNT_START) != 1
            || count(ANCOUNT_START) != 0
            || count(NSCOUNT_START) != 0
            || arcount > 1
        {
            return Err(Rcode::FormErr);
        }
        if (self.flags & OPCODE_MASK) >> OPCODE_SHIFT != OPCODE_QUERY {
            return Err(Rcode::NotImp);
        }

        let mut cursor = HEADER_SIZE;
        self.read_qname(message, &mut cursor)?;
        let fixed = message.get(cursor..cursor + 4).ok_or(Rcode::FormErr)?;
        self.qtype = Type::from(u16::from_be_bytes([fixed[0], fixed[1]]));
        let qclass = Class::from(u16::from_be_bytes([fixed[2], fixed[3]]));
        cursor += 4;
        self.question_end = cursor;

        if arcount == 1 {
            self.read_opt(message, &mut cursor)?;
        }
        if cursor != message.len() || qclass != Class::IN {
            return Err(Rcode::FormErr);
        }
        Ok(())
    }

    fn read_qname(&mut self, message: &[u8], cursor: &mut usize) -> Result<(), Rcode> {
        loop {
            let len = *message.get(*cursor).ok_or(Rcode::FormErr)? as usize;
            if len & 0xc0 != 0 || self.qname.len() + 1 + len > MAX_WIRE_LEN {
                return Err(Rcode::FormErr);
            }
            let label = message
                .get(*cursor + 1..*cursor + 1 + len)
                .ok_or(Rcode::FormErr)?;
            self.label_starts.push(self.qname.len() as u8);
            self.qname.push(len as u8);
            self.qname.extend(label.iter().map(u8::to_ascii_lowercase));
            *cursor += 1 + len;
            if len == 0 {
                return Ok(());
            }
        }
    }

    fn read_opt(&mut self, message: &[u8], cursor: &mut usize) -> Result<(), Rcode> {
        let rr = message
            .get(*cursor..*cursor + OPT_RR_SIZE)
            .ok_or(Rcode::FormErr)?;
        let field = |start: usize| u16::from_be_bytes([rr[start], rr[start + 1]]);
        if rr[0] != 0 || Type::from(field(1)) != Type::OPT {
            return Err(Rcode::FormErr);
        }
        let end = *cursor + OPT_RR_SIZE + field(9) as usize;
        if end > message.len() {
            return Err(Rcode::FormErr);
        }
        *cursor = end;

        self.edns = Some(Edns {
            udp_payload_size: field(3).max(MIN_UDP_PAYLOAD_SIZE),
            dnssec_ok: field(7) & EDNS_DO_FLAG != 0,
        });
        if rr[6] != 0 {
            return Err(Rcode::BadVers);
        }
        Ok(())
    }
}

/// Classifies a received message. Returns `None` if it does not merit
/// any response at all.
pub(super) fn classify(message: &[u8]) -> Option<Query> {
    if message.len() < MIN_QUERY_SIZE {
        return None;
    }
    let flags = u16::from_be_bytes([message[FLAGS_START], message[FLAGS_START + 1]]);
    if flags & QR_FLAG != 0 {
        return None;
    }
    let id = u16::from_be_bytes([message[ID_START], message[ID_START + 1]]);
    let mut query = Query::new(id, flags);
    if let Err(rcode) = query.parse(message) {
        query.rcode = rcode;
    }
    Some(query)
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a query for `qname` with the given header fields and
    /// trailing records.
    fn build_query(flags: u16, counts: [u16; 4], question: &[u8], rest: &[u8]) -> Vec<u8> {
        let mut message = vec![0xab, 0xcd];
        message.extend_from_slice(&flags.to_be_bytes());
        for count in counts {
            message.extend_from_slice(&count.to_be_bytes());
        }
        message.extend_from_slice(question);
        message.extend_from_slice(rest);
        message
    }

    const NET_DS: &[u8] = b"\x03NeT\x00\x00\x2b\x00\x01";
    const OPT_DO: &[u8] = b"\x00\x00\x29\x10\x00\x00\x00\x80\x00\x00\x00";

    #[test]
    fn short_messages_and_responses_are_dropped() {
        let message = build_query(0, [1, 0, 0, 0], NET_DS, b"");
        for len in 0..MIN_QUERY_SIZE {
            assert!(classify(&message[..len]).is_none());
        }
        let response = build_query(QR_FLAG, [1, 0, 0, 0], NET_DS, b"");
        assert!(classify(&response).is_none());
    }

    #[test]
    fn well_formed_query_is_classified() {
        let message = build_query(RD_FLAG, [1, 0, 0, 1], NET_DS, OPT_DO);
        let query = classify(&message).unwrap();
        assert_eq!(query.id, 0xabcd);
        assert_eq!(query.rcode, Rcode::NoError);
        assert_eq!(query.question_len(), NET_DS.len());
        assert_eq!(query.qname(), b"\x03net\x00");
        assert_eq!(query.qtype, Type::DS);
        assert_eq!(
            query.edns,
            Some(Edns {
                udp_payload_size: 4096,
                dnssec_ok: true,
            })
        );
    }

    #[test]
    fn locate_finds_key_below_apex() {
        let message = build_query(0, [1, 0, 0, 0], b"\x03www\x07Example\x03com\x00\x00\x01\x00\x01", b"");
        let query = classify(&message).unwrap();
        assert_eq!(query.locate(Name::root()), Some((3, &b"com"[..])));
        let com: Name = "com.".parse().unwrap();
        assert_eq!(query.locate(&com), Some((2, &b"example"[..])));
        let org: Name = "org.".parse().unwrap();
        assert_eq!(query.locate(&org), None);
        let deeper: Name = "a.www.example.com.".parse().unwrap();
        assert_eq!(query.locate(&deeper), None);

        let message = query_for_root();
        let query = classify(&message).unwrap();
        assert_eq!(query.locate(Name::root()), Some((0, &b""[..])));
    }

    fn query_for_root() -> Vec<u8> {
        build_query(0, [1, 0, 0, 0], b"\x00\x00\x02\x00\x01", b"")
    }

    #[test]
    fn bad_header_is_formerr() {
        for (flags, counts) in [
            (0x0001, [1, 0, 0, 0]),
            (0, [0, 0, 0, 0]),
            (0, [2, 0, 0, 0]),
            (0, [1, 1, 0, 0]),
            (0, [1, 0, 1, 0]),
            (0, [1, 0, 0, 2]),
        ] {
            let message = build_query(flags, counts, NET_DS, b"");
            let query = classify(&message).unwrap();
            assert_eq!(query.rcode, Rcode::FormErr);
            assert!(!query.has_question());
        }
    }

    #[test]
    fn other_opcodes_are_notimp() {
        let message = build_query(2 << OPCODE_SHIFT, [1, 0, 0, 0], NET_DS, b"");
        let query = classify(&message).unwrap();
        assert_eq!(query.rcode, Rcode::NotImp);
        assert!(!query.has_question());
    }

    #[test]
    fn malformed_qname_is_formerr() {
        for question in [
            &b"\xc0\x0c\x00\x01\x00\x01"[..],
            b"\x40abc\x00\x00\x01\x00\x01",
            // Past the minimum query size, but the label runs off the end.
            b"\x10abcdefghijk",
        ] {
            let message = build_query(0, [1, 0, 0, 0], question, b"");
            let query = classify(&message).unwrap();
            assert_eq!(query.rcode, Rcode::FormErr);
            assert!(!query.has_question());
        }

        let mut long = Vec::new();
        for _ in 0..4 {
            long.push(63);
            long.extend_from_slice(&[b'a'; 63]);
        }
        long.extend_from_slice(b"\x00\x00\x01\x00\x01");
        let message = build_query(0, [1, 0, 0, 0], &long, b"");
        assert_eq!(classify(&message).unwrap().rcode, Rcode::FormErr);
    }

    #[test]
    fn question_is_kept_after_later_errors() {
        let message = build_query(0, [1, 0, 0, 0], NET_DS, b"\x00");
        let query = classify(&message).unwrap();
        assert_eq!(query.rcode, Rcode::FormErr);
        assert_eq!(query.question_len(), NET_DS.len());

        let message = build_query(0, [1, 0, 0, 0], b"\x03net\x00\x00\x2b\x00\x03", b"");
        let query = classify(&message).unwrap();
        assert_eq!(query.rcode, Rcode::FormErr);
        assert!(query.has_question());

        let message = build_query(0, [1, 0, 0, 0], b"\x03net\x00\x00\x2b\x00", b"");
        let query = classify(&message).unwrap();
        assert_eq!(query.rcode, Rcode::FormErr);
        assert!(!query.has_question());
    }

    #[test]
    fn opt_is_checked() {
        let not_root = b"\x01a\x00\x00\x29\x10\x00\x00\x00\x00\x00\x00\x00";
        let message = build_query(0, [1, 0, 0, 1], NET_DS, not_root);
        assert_eq!(classify(&message).unwrap().rcode, Rcode::FormErr);

        let not_opt = b"\x00\x00\x01\x00\x01\x00\x00\x00\x00\x00\x04\x7f\x00\x00\x01";
        let message = build_query(0, [1, 0, 0, 1], NET_DS, not_opt);
        assert_eq!(classify(&message).unwrap().rcode, Rcode::FormErr);

        let overlong = b"\x00\x00\x29\x10\x00\x00\x00\x00\x00\x00\x04\x00";
        let message = build_query(0, [1, 0, 0, 1], NET_DS, overlong);
        assert_eq!(classify(&message).unwrap().rcode, Rcode::FormErr);

        let with_option = b"\x00\x00\x29\x10\x00\x00\x00\x00\x00\x00\x04\x00\x0a\x00\x00";
        let message = build_query(0, [1, 0, 0, 1], NET_DS, with_option);
        assert_eq!(classify(&message).unwrap().rcode, Rcode::NoError);
    }

    #[test]
    fn small_payload_size_is_clamped() {
        let message = build_query(0, [1, 0, 0, 1], NET_DS, b"\x00\x00\x29\x00\x10\x00\x00\x00\x00\x00\x00");
        let edns = classify(&message).unwrap().edns.unwrap();
        assert_eq!(edns.udp_payload_size, MIN_UDP_PAYLOAD_SIZE);
        assert!(!edns.dnssec_ok);
    }

    #[test]
    fn unknown_edns_version_is_badvers() {
        let message = build_query(0, [1, 0, 0, 1], NET_DS, b"\x00\x00\x29\x10\x00\x00\x01\x80\x00\x00\x00");
        let query = classify(&message).unwrap();
        assert_eq!(query.rcode, Rcode::BadVers);
        assert!(query.edns.unwrap().dnssec_ok);
        assert!(query.has_question());
    }
}
