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

//! Implementation of the [`Rcode`] type.

use std::fmt;

/// A response code, possibly extended.
///
/// [RFC 1035 § 4.1.1] defines a four-bit RCODE field in the header.
/// EDNS(0) ([RFC 6891 § 6.1.3]) adds eight more significant bits in the
/// OPT record, which is how [`Rcode::BadVers`] is expressed. Only the
/// codes this server sends are named.
///
/// [RFC 1035 § 4.1.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-4.1.1
/// [RFC 6891 § 6.1.3]: https://datatracker.ietf.org/doc/html/rfc6891#section-6.1.3
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    BadVers,
    Other(u16),
}

impl Rcode {
    /// The four bits that go in the message header.
    pub fn header_bits(self) -> u16 {
        u16::from(self) & 0x0f
    }

    /// The eight bits that go in the OPT record's extended RCODE field.
    pub fn extended_bits(self) -> u8 {
        (u16::from(self) >> 4) as u8
    }

    /// Returns whether this code needs an OPT record to be expressed.
    pub fn is_extended(self) -> bool {
        self.extended_bits() != 0
    }

    /// Rebuilds an `Rcode` from its header and OPT parts.
    pub fn from_parts(header_bits: u16, extended_bits: u8) -> Self {
        Self::from(((extended_bits as u16) << 4) | (header_bits & 0x0f))
    }
}

impl From<u16> for Rcode {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NxDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            16 => Self::BadVers,
            other => Self::Other(other),
        }
    }
}

impl From<Rcode> for u16 {
    fn from(value: Rcode) -> Self {
        match value {
            Rcode::NoError => 0,
            Rcode::FormErr => 1,
            Rcode::ServFail => 2,
            Rcode::NxDomain => 3,
            Rcode::NotImp => 4,
            Rcode::Refused => 5,
            Rcode::BadVers => 16,
            Rcode::Other(value) => value,
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::NoError => f.write_str("NOERROR"),
            Self::FormErr => f.write_str("FORMERR"),
            Self::ServFail => f.write_str("SERVFAIL"),
            Self::NxDomain => f.write_str("NXDOMAIN"),
            Self::NotImp => f.write_str("NOTIMP"),
            Self::Refused => f.write_str("REFUSED"),
            Self::BadVers => f.write_str("BADVERS"),
            Self::Other(value) => write!(f, "RCODE{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badvers_splits_across_header_and_opt() {
        assert_eq!(Rcode::BadVers.header_bits(), 0);
        assert_eq!(Rcode::BadVers.extended_bits(), 1);
        assert!(Rcode::BadVers.is_extended());
        assert_eq!(Rcode::from_parts(0, 1), Rcode::BadVers);
    }

    #[test]
    fn plain_rcodes_fit_in_header() {
        for rcode in [Rcode::NoError, Rcode::FormErr, Rcode::NxDomain, Rcode::Refused] {
            assert!(!rcode.is_extended());
            assert_eq!(Rcode::from_parts(rcode.header_bits(), 0), rcode);
        }
    }
}
