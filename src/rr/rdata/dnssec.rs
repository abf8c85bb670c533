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

//! Helpers for the DNSSEC RR types of [RFC 4034]: DNSKEY, RRSIG, NSEC,
//! and DS. Signatures are never computed here; they are read from zone
//! files and served as-is.
//!
//! [RFC 4034]: https://datatracker.ietf.org/doc/html/rfc4034

use std::collections::BTreeSet;

use super::{Rdata, ReadRdataError};
use crate::name::Name;
use crate::rr::Type;

/// The offset of the signer's name in RRSIG RDATA: type covered (2),
/// algorithm (1), labels (1), original TTL (4), expiration (4),
/// inception (4), and key tag (2).
pub const RRSIG_SIGNER_OFFSET: usize = 18;

/// The offset of the digest in DS RDATA: key tag (2), algorithm (1),
/// and digest type (1).
pub const DS_DIGEST_OFFSET: usize = 4;

pub(super) fn validate_ds(rdata: &Rdata) -> Result<(), ReadRdataError> {
    if rdata.len() > DS_DIGEST_OFFSET {
        Ok(())
    } else {
        Err(ReadRdataError::Other)
    }
}

pub(super) fn validate_dnskey(rdata: &Rdata) -> Result<(), ReadRdataError> {
    // Flags (2), protocol (1) which must be 3, algorithm (1), key.
    match rdata.octets() {
        [_, _, 3, _, _, ..] => Ok(()),
        _ => Err(ReadRdataError::Other),
    }
}

pub(super) fn validate_rrsig(rdata: &Rdata) -> Result<(), ReadRdataError> {
    let octets = rdata.octets();
    if octets.len() <= RRSIG_SIGNER_OFFSET {
        return Err(ReadRdataError::UnexpectedEom);
    }
    let signer_len = Name::validate_uncompressed(&octets[RRSIG_SIGNER_OFFSET..])?;
    if octets.len() > RRSIG_SIGNER_OFFSET + signer_len {
        Ok(())
    } else {
        Err(ReadRdataError::Other)
    }
}

pub(super) fn validate_nsec(rdata: &Rdata) -> Result<(), ReadRdataError> {
    let octets = rdata.octets();
    let next_len = Name::validate_uncompressed(octets)?;
    validate_type_bitmap(&octets[next_len..])
}

/// Validates an [RFC 4034 § 4.1.2] type bitmap: a sequence of windows,
/// each with a window number, a length from 1 to 32, and that many
/// octets of bitmap. Windows must be in increasing order.
///
/// [RFC 4034 § 4.1.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-4.1.2
fn validate_type_bitmap(mut bitmap: &[u8]) -> Result<(), ReadRdataError> {
    let mut last_window = None;
    while !bitmap.is_empty() {
        let (window, len) = match bitmap {
            [window, len, ..] => (*window, *len as usize),
            _ => return Err(ReadRdataError::UnexpectedEom),
        };
        if !(1..=32).contains(&len) || last_window.map_or(false, |last| window <= last) {
            return Err(ReadRdataError::Other);
        }
        if bitmap.len() < 2 + len {
            return Err(ReadRdataError::UnexpectedEom);
        }
        last_window = Some(window);
        bitmap = &bitmap[2 + len..];
    }
    Ok(())
}

impl Rdata {
    /// Returns the type covered by this RRSIG RDATA, or `None` if it is
    /// too short to be RRSIG RDATA.
    pub fn rrsig_type_covered(&self) -> Option<Type> {
        match self.octets() {
            [high, low, ..] => Some(Type::from(u16::from_be_bytes([*high, *low]))),
            _ => None,
        }
    }
}

/// Builds an NSEC type bitmap from individual types.
#[derive(Debug, Default)]
pub struct TypeBitmapBuilder {
    types: BTreeSet<u16>,
}

impl TypeBitmapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rr_type: Type) {
        self.types.insert(rr_type.into());
    }

    /// Appends the encoded bitmap to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        let mut types = self.types.iter().copied().peekable();
        while let Some(&first) = types.peek() {
            let window = (first >> 8) as u8;
            let mut bits = [0u8; 32];
            let mut len = 0;
            while let Some(&value) = types.peek() {
                if (value >> 8) as u8 != window {
                    break;
                }
                let low = (value & 0xff) as usize;
                bits[low / 8] |= 0x80 >> (low % 8);
                len = low / 8 + 1;
                types.next();
            }
            buf.push(window);
            buf.push(len as u8);
            buf.extend_from_slice(&bits[..len]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_bitmap_matches_rfc4034_example() {
        // RFC 4034 § 4.3: A MX RRSIG NSEC TYPE1234.
        let mut builder = TypeBitmapBuilder::new();
        for rr_type in [Type::A, Type::MX, Type::RRSIG, Type::NSEC, Type::from(1234)] {
            builder.add(rr_type);
        }
        let mut buf = Vec::new();
        builder.write_to(&mut buf);
        let mut expected = vec![0x00, 0x06, 0x40, 0x01, 0x00, 0x00, 0x00, 0x03];
        expected.extend_from_slice(&[0x04, 0x1b]);
        expected.extend_from_slice(&[0; 26]);
        expected.push(0x20);
        assert_eq!(buf, expected);
        assert_eq!(validate_type_bitmap(&buf), Ok(()));
    }

    #[test]
    fn bad_type_bitmaps_are_rejected() {
        assert_eq!(validate_type_bitmap(&[0]), Err(ReadRdataError::UnexpectedEom));
        assert_eq!(validate_type_bitmap(&[0, 0]), Err(ReadRdataError::Other));
        assert_eq!(
            validate_type_bitmap(&[1, 1, 0xff, 0, 1, 0xff]),
            Err(ReadRdataError::Other)
        );
        assert_eq!(validate_type_bitmap(&[0, 2, 0xff]), Err(ReadRdataError::UnexpectedEom));
    }

    #[test]
    fn rrsig_type_covered_works() {
        let mut octets = vec![0, 2];
        octets.extend_from_slice(&[0; RRSIG_SIGNER_OFFSET - 2]);
        octets.extend_from_slice(b"\x00sig");
        let rrsig = Rdata::try_from(octets).unwrap();
        assert_eq!(rrsig.validate(Type::RRSIG), Ok(()));
        assert_eq!(rrsig.rrsig_type_covered(), Some(Type::NS));
    }
}
