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

//! Implementation of the [`Reader`] type to read on-the-wire DNS
//! messages.
//!
//! The query path never uses this; queries are classified by the much
//! narrower parser in [`crate::server`]. The `Reader` decodes whole
//! messages, following compression pointers, which makes it the tool
//! for checking what the server actually sends.

use std::fmt;

use super::constants::*;
use super::Rcode;
use crate::class::Class;
use crate::name::{self, Name};
use crate::rr::rdata::{Rdata, ReadRdataError};
use crate::rr::{Ttl, Type};

////////////////////////////////////////////////////////////////////////
// READER                                                             //
////////////////////////////////////////////////////////////////////////

/// A "frame" around a buffer containing a DNS message that enables
/// reading the message data.
///
/// A `Reader` is constructed using its [`TryFrom`] implementation,
/// which fails unless the buffer holds at least a full header. Header
/// fields can be read at any time. Questions and records are read
/// sequentially through [`Reader::read_question`] and
/// [`Reader::read_rr`], which advance a cursor that starts right after
/// the header.
#[derive(Eq, PartialEq)]
pub struct Reader<'a> {
    octets: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn header_u16(&self, start: usize) -> u16 {
        u16::from_be_bytes([self.octets[start], self.octets[start + 1]])
    }

    /// Returns the 16-bit ID of the message.
    pub fn id(&self) -> u16 {
        self.header_u16(ID_START)
    }

    /// Returns the raw flags field.
    pub fn flags(&self) -> u16 {
        self.header_u16(FLAGS_START)
    }

    /// Returns whether the QR (query response) bit is set.
    pub fn qr(&self) -> bool {
        self.flags() & QR_FLAG != 0
    }

    /// Returns the message's opcode.
    pub fn opcode(&self) -> u16 {
        (self.flags() & OPCODE_MASK) >> OPCODE_SHIFT
    }

    /// Returns whether the AA (authoritative answer) bit is set.
    pub fn aa(&self) -> bool {
        self.flags() & AA_FLAG != 0
    }

    /// Returns whether the TC (truncation) bit is set.
    pub fn tc(&self) -> bool {
        self.flags() & TC_FLAG != 0
    }

    /// Returns whether the RD (recursion desired) bit is set.
    pub fn rd(&self) -> bool {
        self.flags() & RD_FLAG != 0
    }

    /// Returns whether the CD (checking disabled) bit is set.
    pub fn cd(&self) -> bool {
        self.flags() & CD_FLAG != 0
    }

    /// Returns the four-bit RCODE from the header.
    pub fn rcode(&self) -> Rcode {
        Rcode::from(self.flags() & RCODE_MASK)
    }

    pub fn qdcount(&self) -> u16 {
        self.header_u16(QDCOUNT_START)
    }

    pub fn ancount(&self) -> u16 {
        self.header_u16(ANCOUNT_START)
    }

    pub fn nscount(&self) -> u16 {
        self.header_u16(NSCOUNT_START)
    }

    pub fn arcount(&self) -> u16 {
        self.header_u16(ARCOUNT_START)
    }

    /// Reads a [`Question`] starting at the current cursor. The cursor
    /// is not changed on failure.
    pub fn read_question(&mut self) -> Result<Question> {
        let (qname, qname_len) =
            Name::try_from_compressed(self.octets, self.cursor).map_err(Error::InvalidOwner)?;
        let qname_end = self.cursor + qname_len;
        let qtype = read_u16(self.octets, qname_end)?.into();
        let qclass = read_u16(self.octets, qname_end + 2)?.into();
        self.cursor = qname_end + 4;
        Ok(Question {
            qname,
            qtype,
            qclass,
        })
    }

    /// Reads a resource record at the current cursor. The cursor is not
    /// changed on failure.
    pub fn read_rr(&mut self) -> Result<ReadRr> {
        let (owner, owner_len) =
            Name::try_from_compressed(self.octets, self.cursor).map_err(Error::InvalidOwner)?;
        let owner_end = self.cursor + owner_len;
        let rr_type = read_u16(self.octets, owner_end)?.into();
        let class = read_u16(self.octets, owner_end + 2)?.into();
        let raw_ttl = read_u32(self.octets, owner_end + 4)?;
        let rdlength = read_u16(self.octets, owner_end + 8)?;
        let rdata = Rdata::read(rr_type, self.octets, owner_end + 10, rdlength)?;
        self.cursor = owner_end + 10 + rdlength as usize;
        Ok(ReadRr {
            owner,
            rr_type,
            class,
            ttl: Ttl::from(raw_ttl),
            raw_ttl,
            rdata,
        })
    }

    /// Reads every remaining record, in order.
    pub fn read_all_rrs(&mut self) -> Result<Vec<ReadRr>> {
        let mut rrs = Vec::new();
        while !self.at_eom() {
            rrs.push(self.read_rr()?);
        }
        Ok(rrs)
    }

    /// Returns whether the `Reader`'s cursor has reached the end of the
    /// message.
    pub fn at_eom(&self) -> bool {
        self.cursor >= self.octets.len()
    }
}

impl<'a> TryFrom<&'a [u8]> for Reader<'a> {
    type Error = Error;

    fn try_from(octets: &'a [u8]) -> Result<Self> {
        if octets.len() >= HEADER_SIZE {
            Ok(Self {
                octets,
                cursor: HEADER_SIZE,
            })
        } else {
            Err(Error::HeaderTooShort)
        }
    }
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Reader")
            .field("id", &self.id())
            .field("flags", &format_args!("{:#06x}", self.flags()))
            .field("rcode", &self.rcode())
            .field("qdcount", &self.qdcount())
            .field("ancount", &self.ancount())
            .field("nscount", &self.nscount())
            .field("arcount", &self.arcount())
            .field("cursor", &self.cursor)
            .finish()
    }
}

fn read_u16(octets: &[u8], start: usize) -> Result<u16> {
    match octets.get(start..start + 2) {
        Some(&[a, b]) => Ok(u16::from_be_bytes([a, b])),
        _ => Err(Error::UnexpectedEomInField),
    }
}

fn read_u32(octets: &[u8], start: usize) -> Result<u32> {
    match octets.get(start..start + 4) {
        Some(&[a, b, c, d]) => Ok(u32::from_be_bytes([a, b, c, d])),
        _ => Err(Error::UnexpectedEomInField),
    }
}

////////////////////////////////////////////////////////////////////////
// QUESTIONS AND RECORDS                                              //
////////////////////////////////////////////////////////////////////////

/// A question as returned by [`Reader::read_question`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Question {
    pub qname: Name,
    pub qtype: Type,
    pub qclass: Class,
}

/// A record as returned by [`Reader::read_rr`]. For OPT records the
/// TTL field carries EDNS data, so the raw 32-bit value is kept too.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadRr {
    pub owner: Name,
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    pub raw_ttl: u32,
    pub rdata: Rdata,
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that a [`Question`] or resource record could not
/// be read.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    HeaderTooShort,
    UnexpectedEomInField,
    InvalidOwner(name::Error),
    InvalidRdata(ReadRdataError),
}

impl From<ReadRdataError> for Error {
    fn from(err: ReadRdataError) -> Self {
        Self::InvalidRdata(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::HeaderTooShort => f.write_str("header too short"),
            Self::UnexpectedEomInField => f.write_str("unexpected end of message in field"),
            Self::InvalidOwner(err) => write!(f, "invalid owner: {}", err),
            Self::InvalidRdata(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

/// The type returned by fallible [`Reader`] methods.
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// A reply to a query for example.com. IN NS to a recursive server,
    /// captured on January 7, 2022.
    const EXAMPLE_COM_NS_MESSAGE: &[u8] =
        b"\xe2\xd7\x81\x80\x00\x01\x00\x02\x00\x00\x00\x01\x07\x65\x78\x61\
          \x6d\x70\x6c\x65\x03\x63\x6f\x6d\x00\x00\x02\x00\x01\xc0\x0c\x00\
          \x02\x00\x01\x00\x01\x50\xa2\x00\x14\x01\x61\x0c\x69\x61\x6e\x61\
          \x2d\x73\x65\x72\x76\x65\x72\x73\x03\x6e\x65\x74\x00\xc0\x0c\x00\
          \x02\x00\x01\x00\x01\x50\xa2\x00\x04\x01\x62\xc0\x2b\x00\x00\x29\
          \x10\x00\x00\x00\x00\x00\x00\x00";

    #[test]
    fn reader_decodes_compressed_response() {
        let mut reader = Reader::try_from(EXAMPLE_COM_NS_MESSAGE).unwrap();
        let qname: Name = "example.com.".parse().unwrap();

        assert_eq!(reader.id(), 0xe2d7);
        assert!(reader.qr());
        assert_eq!(reader.opcode(), OPCODE_QUERY);
        assert!(!reader.aa());
        assert!(!reader.tc());
        assert!(reader.rd());
        assert_eq!(reader.rcode(), Rcode::NoError);
        assert_eq!(
            (reader.qdcount(), reader.ancount(), reader.nscount(), reader.arcount()),
            (1, 2, 0, 1)
        );

        let question = reader.read_question().unwrap();
        assert_eq!(question.qname, qname);
        assert_eq!(question.qtype, Type::NS);
        assert_eq!(question.qclass, Class::IN);

        let rrs = reader.read_all_rrs().unwrap();
        assert_eq!(rrs.len(), 3);
        assert_eq!(rrs[0].owner, qname);
        assert_eq!(rrs[0].ttl, Ttl::from(86178));
        assert_eq!(
            rrs[1].rdata.octets(),
            b"\x01b\x0ciana-servers\x03net\x00"
        );
        assert_eq!(rrs[2].rr_type, Type::OPT);
        assert_eq!(rrs[2].class, Class::from(4096));
        assert!(rrs[2].rdata.is_empty());
        assert!(reader.at_eom());
    }

    #[test]
    fn reader_constructor_rejects_short_message() {
        for size in 0..HEADER_SIZE {
            let buf = vec![0; size];
            assert_eq!(Reader::try_from(buf.as_slice()), Err(Error::HeaderTooShort));
        }
    }
}
