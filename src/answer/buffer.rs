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

//! Implementation of the [`Answer`] buffer.

use lazy_static::lazy_static;

use super::encoder::Encoder;
use super::{Error, Result};
use crate::message::constants::{
    EDNS_DO_FLAG, EDNS_UDP_PAYLOAD_SIZE, MAX_MESSAGE_SIZE, OPT_RR_SIZE, POINTER_MAX,
};
use crate::name::Name;
use crate::rr::{Rrset, Type};

/// The records of a response, after its question, in wire format.
///
/// An `Answer` holds the answer, authority, and additional sections,
/// followed by an OPT record advertising this server's EDNS
/// parameters. The OPT record is counted in [`Answer::arcount`]; for
/// clients that did not use EDNS the response builder leaves it off.
///
/// Compression pointers inside the buffer assume a question of
/// [`Answer::fix_offset`] octets. [`Answer::relocate`] produces a copy
/// adjusted for a question of a different length.
#[derive(Debug)]
pub struct Answer {
    octets: Box<[u8]>,
    ancount: u16,
    nscount: u16,
    arcount: u16,
    authoritative: bool,
    dnssec: bool,
    compressed: bool,
    sites: Box<[u16]>,
    fix_offset: u16,
}

lazy_static! {
    static ref EMPTY: Answer = Answer {
        octets: opt_record(false, 0).into(),
        ancount: 0,
        nscount: 0,
        arcount: 1,
        authoritative: false,
        dnssec: false,
        compressed: false,
        sites: Box::new([]),
        fix_offset: 5,
    };
}

/// Returns the OPT record placed at the end of every [`Answer`]. Error
/// responses use it too, with the upper bits of their RCODE.
pub(crate) fn opt_record(dnssec: bool, extended_rcode: u8) -> [u8; OPT_RR_SIZE] {
    let [type_high, type_low] = u16::from(Type::OPT).to_be_bytes();
    let [size_high, size_low] = EDNS_UDP_PAYLOAD_SIZE.to_be_bytes();
    let flags = if dnssec { EDNS_DO_FLAG } else { 0 };
    let [flags_high, flags_low] = flags.to_be_bytes();
    [
        0, type_high, type_low, size_high, size_low, extended_rcode, 0, flags_high, flags_low, 0, 0,
    ]
}

/// The records of the three sections of an [`Answer`], as (owner,
/// RRset) pairs.
#[derive(Default)]
pub(super) struct Sections<'a> {
    pub answer: Vec<(&'a Name, &'a Rrset)>,
    pub authority: Vec<(&'a Name, &'a Rrset)>,
    pub additional: Vec<(&'a Name, &'a Rrset)>,

    /// Whether RRSIGs are written after the RRsets they cover.
    pub signatures: bool,
}

impl Answer {
    /// Builds an `Answer` for a question about `owner`. `dnssec` sets
    /// the DO bit of the OPT record; whether signatures are included is
    /// up to `sections`.
    pub(super) fn build(
        owner: &Name,
        sections: Sections,
        authoritative: bool,
        dnssec: bool,
        compress: bool,
    ) -> Result<Self> {
        let too_long = || Error::TooLong {
            owner: owner.clone(),
        };
        let mut encoder = Encoder::new(owner, compress);
        let ancount = encoder.encode_section(&sections.answer, sections.signatures)?;
        let nscount = encoder.encode_section(&sections.authority, sections.signatures)?;
        let arcount = encoder.encode_section(&sections.additional, sections.signatures)?;
        let (mut octets, sites, fix_offset) = encoder.finish();

        octets.reserve_exact(OPT_RR_SIZE);
        octets.extend_from_slice(&opt_record(dnssec, 0));
        if octets.len() + fix_offset as usize + 12 > MAX_MESSAGE_SIZE {
            return Err(too_long());
        }

        Self::from_parts(
            octets.into_boxed_slice(),
            [ancount, nscount, arcount.checked_add(1).ok_or_else(too_long)?],
            authoritative,
            dnssec,
            compress,
            sites.into_boxed_slice(),
            fix_offset,
        )
        .ok_or_else(too_long)
    }

    /// Assembles an `Answer`, checking that every relocation site is a
    /// whole pointer inside the buffer.
    fn from_parts(
        octets: Box<[u8]>,
        [ancount, nscount, arcount]: [u16; 3],
        authoritative: bool,
        dnssec: bool,
        compressed: bool,
        sites: Box<[u16]>,
        fix_offset: u16,
    ) -> Option<Self> {
        if sites.iter().any(|&site| site as usize + 1 >= octets.len()) {
            return None;
        }
        Some(Self {
            octets,
            ancount,
            nscount,
            arcount,
            authoritative,
            dnssec,
            compressed,
            sites,
            fix_offset,
        })
    }

    /// Returns the process-wide empty `Answer`, which has no records
    /// other than the OPT record.
    pub fn empty() -> &'static Answer {
        &EMPTY
    }

    /// Returns the buffer's octets as built.
    pub fn octets(&self) -> &[u8] {
        &self.octets
    }

    pub fn ancount(&self) -> u16 {
        self.ancount
    }

    pub fn nscount(&self) -> u16 {
        self.nscount
    }

    /// Returns the additional-section count, including the OPT record.
    pub fn arcount(&self) -> u16 {
        self.arcount
    }

    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    pub fn is_dnssec(&self) -> bool {
        self.dnssec
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Returns the question-section length the buffer was built for.
    pub fn fix_offset(&self) -> u16 {
        self.fix_offset
    }

    /// Returns the offsets of the compression pointers in the buffer.
    pub fn relocation_sites(&self) -> &[u16] {
        &self.sites
    }

    /// Returns the buffer's octets as they must appear after a question
    /// section of `real_offset` octets.
    ///
    /// When nothing needs to move, this is the buffer itself. Otherwise
    /// the buffer is copied into `scratch` and every compression
    /// pointer is shifted by the difference between `real_offset` and
    /// [`Answer::fix_offset`].
    pub fn relocate<'a>(&'a self, real_offset: u16, scratch: &'a mut Vec<u8>) -> &'a [u8] {
        if !self.compressed || real_offset == self.fix_offset || self.sites.is_empty() {
            return &self.octets;
        }

        let delta = real_offset as i32 - self.fix_offset as i32;
        scratch.clear();
        scratch.extend_from_slice(&self.octets);
        for &site in self.sites.iter() {
            let site = site as usize;
            let pointer = u16::from_be_bytes([scratch[site], scratch[site + 1]]);
            let offset = (pointer & POINTER_MAX as u16) as i32 + delta;
            let pointer = 0xc000 | (offset as u16 & POINTER_MAX as u16);
            scratch[site..site + 2].copy_from_slice(&pointer.to_be_bytes());
        }
        scratch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::Ttl;

    fn ns_rrset(targets: &[&str]) -> Rrset {
        let mut rrset = Rrset::new(Type::NS, Class::IN, Ttl::from(172800));
        for target in targets {
            let target: Name = target.parse().unwrap();
            rrset.push_rdata(target.wire_repr().try_into().unwrap());
        }
        rrset
    }

    #[test]
    fn empty_answer_holds_only_opt() {
        let empty = Answer::empty();
        assert_eq!(empty.octets(), b"\x00\x00\x29\x05\xc8\x00\x00\x00\x00\x00\x00");
        assert_eq!((empty.ancount(), empty.nscount(), empty.arcount()), (0, 0, 1));
        assert!(!empty.is_authoritative());
        assert!(std::ptr::eq(empty, Answer::empty()));
    }

    #[test]
    fn opt_carries_do_bit() {
        let answer = Answer::build(Name::root(), Sections::default(), true, true, true).unwrap();
        assert_eq!(&answer.octets()[7..9], b"\x80\x00");
        assert!(answer.is_dnssec());
        assert!(answer.is_authoritative());
    }

    #[test]
    fn relocation_fast_path_returns_original() {
        let owner: Name = "example.".parse().unwrap();
        let ns = ns_rrset(&["ns.example."]);
        let sections = Sections {
            authority: vec![(&owner, &ns)],
            ..Default::default()
        };
        let answer = Answer::build(&owner, sections, false, false, true).unwrap();
        assert!(!answer.relocation_sites().is_empty());
        let mut scratch = Vec::new();
        let relocated = answer.relocate(answer.fix_offset(), &mut scratch);
        assert!(std::ptr::eq(relocated, answer.octets()));
    }

    #[test]
    fn relocation_shifts_every_pointer() {
        let owner: Name = "example.".parse().unwrap();
        let ns = ns_rrset(&["ns1.example.", "ns2.example."]);
        let sections = Sections {
            authority: vec![(&owner, &ns)],
            ..Default::default()
        };
        let answer = Answer::build(&owner, sections, false, false, true).unwrap();

        // A question for www.example. is four octets longer.
        let mut scratch = Vec::new();
        let relocated = answer.relocate(answer.fix_offset() + 4, &mut scratch).to_vec();
        assert_eq!(relocated.len(), answer.octets().len());
        for &site in answer.relocation_sites() {
            let site = site as usize;
            let before = u16::from_be_bytes([answer.octets()[site], answer.octets()[site + 1]]);
            let after = u16::from_be_bytes([relocated[site], relocated[site + 1]]);
            assert_eq!(after, before + 4);
        }

        // And the result decodes properly behind such a question.
        let mut message = b"\x00\x00\x84\x00\x00\x01\x00\x00\x00\x02\x00\x01".to_vec();
        message.extend_from_slice(b"\x03www\x07example\x00\x00\x01\x00\x01");
        message.extend_from_slice(&relocated);
        let mut reader = crate::message::Reader::try_from(message.as_slice()).unwrap();
        reader.read_question().unwrap();
        let rrs = reader.read_all_rrs().unwrap();
        assert_eq!(rrs[0].owner, owner);
        assert_eq!(
            rrs[1].rdata.octets(),
            b"\x03ns2\x07example\x00"
        );
    }

    #[test]
    fn uncompressed_answer_is_never_copied() {
        let owner: Name = "example.".parse().unwrap();
        let ns = ns_rrset(&["ns.example."]);
        let sections = Sections {
            authority: vec![(&owner, &ns)],
            ..Default::default()
        };
        let answer = Answer::build(&owner, sections, true, false, false).unwrap();
        assert!(answer.relocation_sites().is_empty());
        let mut scratch = Vec::new();
        let relocated = answer.relocate(100, &mut scratch);
        assert!(std::ptr::eq(relocated, answer.octets()));
    }
}
