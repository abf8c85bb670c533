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

//! Implementation of the [`Rdata`] type and DNS RDATA processing.

use std::fmt::{self, Write};

use super::Type;
use crate::name::{self, Name};

mod dnssec;
mod std13;
pub use dnssec::{TypeBitmapBuilder, DS_DIGEST_OFFSET, RRSIG_SIGNER_OFFSET};
pub use std13::serialize_soa;

////////////////////////////////////////////////////////////////////////
// RDATA TYPE                                                         //
////////////////////////////////////////////////////////////////////////

/// Owned record RDATA in its uncompressed on-the-wire form.
///
/// The RDATA of a record is limited to 65,535 octets, and an `Rdata`
/// can only be constructed if the data respects that limit.
#[derive(Clone, Eq, PartialEq)]
pub struct Rdata {
    octets: Box<[u8]>,
}

impl Rdata {
    /// Returns the underlying octet slice.
    pub fn octets(&self) -> &[u8] {
        &self.octets
    }

    /// Returns the length of the [`Rdata`].
    pub fn len(&self) -> usize {
        self.octets.len()
    }

    /// Returns whether the [`Rdata`] is empty.
    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    /// Determines whether this [`Rdata`] is equal to another, assuming
    /// that both are of type `rr_type`.
    ///
    /// [RFC 3597 § 6] has RDATA of new types compared bitwise, so only
    /// the RFC 1035 types that embed domain names compare those names
    /// case-insensitively. Malformed RDATA falls back to bitwise
    /// comparison.
    ///
    /// [RFC 3597 § 6]: https://datatracker.ietf.org/doc/html/rfc3597#section-6
    pub fn equals(&self, other: &Self, rr_type: Type) -> bool {
        if !rr_type.allows_rdata_compression() {
            return self.octets == other.octets;
        }
        let ours: Result<Vec<_>, _> = self.components(rr_type).collect();
        let theirs: Result<Vec<_>, _> = other.components(rr_type).collect();
        match (ours, theirs) {
            (Ok(ours), Ok(theirs)) => {
                ours.len() == theirs.len()
                    && ours.iter().zip(theirs.iter()).all(|pair| match pair {
                        (Component::CompressibleName(a), Component::CompressibleName(b)) => {
                            a.eq_ignore_ascii_case(b)
                        }
                        (a, b) => a.octets() == b.octets(),
                    })
            }
            _ => self.octets == other.octets,
        }
    }

    /// Validates an [`Rdata`], assuming that it is of type `rr_type`.
    /// Types without embedded structure that this server relies on
    /// validate successfully.
    pub fn validate(&self, rr_type: Type) -> Result<(), ReadRdataError> {
        match rr_type {
            Type::A => std13::validate_fixed_len(self, 4),
            Type::AAAA => std13::validate_fixed_len(self, 16),
            Type::SOA => std13::validate_soa(self),
            Type::DS => dnssec::validate_ds(self),
            Type::DNSKEY => dnssec::validate_dnskey(self),
            Type::RRSIG => dnssec::validate_rrsig(self),
            Type::NSEC => dnssec::validate_nsec(self),
            _ => {
                // Walking the components checks every embedded name.
                for component in self.components(rr_type) {
                    component?;
                }
                Ok(())
            }
        }
    }

    /// Reads RDATA of type `rr_type` and length `rdlength` starting at
    /// `message[cursor]`, decompressing embedded names that
    /// [RFC 3597 § 4] allows to be compressed. This is the receiving
    /// side of the encoder in [`crate::answer`].
    ///
    /// [RFC 3597 § 4]: https://datatracker.ietf.org/doc/html/rfc3597#section-4
    pub fn read(
        rr_type: Type,
        message: &[u8],
        cursor: usize,
        rdlength: u16,
    ) -> Result<Self, ReadRdataError> {
        let end = cursor + rdlength as usize;
        let raw = message
            .get(cursor..end)
            .ok_or(ReadRdataError::UnexpectedEom)?;
        if !rr_type.allows_rdata_compression() {
            return Ok(Self { octets: raw.into() });
        }

        let mut octets = Vec::with_capacity(raw.len());
        let mut position = cursor;
        for step in layout_for(rr_type) {
            match *step {
                ComponentType::CompressibleName => {
                    let (name, len) = Name::try_from_compressed(&message[..end], position)?;
                    octets.extend_from_slice(name.wire_repr());
                    position += len;
                }
                ComponentType::UncompressibleName => {
                    let len = Name::validate_uncompressed(&message[position..end])?;
                    octets.extend_from_slice(&message[position..position + len]);
                    position += len;
                }
                ComponentType::FixedLen(len) => {
                    let fixed = message
                        .get(position..position + len)
                        .filter(|_| position + len <= end)
                        .ok_or(ReadRdataError::UnexpectedEom)?;
                    octets.extend_from_slice(fixed);
                    position += len;
                }
            }
        }
        if position > end {
            return Err(ReadRdataError::UnexpectedEom);
        }
        octets.extend_from_slice(&message[position..end]);
        Ok(Self::try_from(octets)?)
    }

    /// Returns an iterator over this `Rdata`'s [`Component`]s, assuming
    /// that it is of type `rr_type`.
    pub fn components(&self, rr_type: Type) -> Components {
        Components {
            types: layout_for(rr_type),
            rdata: &self.octets,
        }
    }

    /// Returns the domain names embedded in this `Rdata` (compressible
    /// or not), skipping malformed data.
    pub fn names(&self, rr_type: Type) -> impl Iterator<Item = Name> + '_ {
        self.components(rr_type).filter_map(|component| match component {
            Ok(Component::CompressibleName(wire)) | Ok(Component::UncompressibleName(wire)) => {
                Name::try_from_uncompressed_all(wire).ok()
            }
            _ => None,
        })
    }
}

impl TryFrom<Vec<u8>> for Rdata {
    type Error = RdataTooLongError;

    fn try_from(vec: Vec<u8>) -> Result<Self, Self::Error> {
        if vec.len() > u16::MAX as usize {
            Err(RdataTooLongError)
        } else {
            Ok(Self {
                octets: vec.into_boxed_slice(),
            })
        }
    }
}

impl TryFrom<&[u8]> for Rdata {
    type Error = RdataTooLongError;

    fn try_from(octets: &[u8]) -> Result<Self, Self::Error> {
        octets.to_vec().try_into()
    }
}

impl AsRef<[u8]> for Rdata {
    fn as_ref(&self) -> &[u8] {
        &self.octets
    }
}

/// `Rdata` is displayed in the RFC 3597 format for RDATA of unknown
/// type.
impl fmt::Display for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\\# {}", self.len())?;
        if !self.is_empty() {
            f.write_char(' ')?;
            for octet in self.octets.iter() {
                write!(f, "{:02x}", octet)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Rdata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

////////////////////////////////////////////////////////////////////////
// COMPONENTS                                                         //
////////////////////////////////////////////////////////////////////////

/// A component of an [`Rdata`] classified for DNS compression.
///
/// For DNS compression, RDATA breaks down into
///
/// 1. embedded domain names that may be compressed per [RFC 3597 § 4],
/// 2. embedded domain names that may *not* be compressed, and
/// 3. all other data.
///
/// Names are given in uncompressed wire form, borrowed from the
/// [`Rdata`].
///
/// [RFC 3597 § 4]: https://datatracker.ietf.org/doc/html/rfc3597#section-4
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Component<'a> {
    CompressibleName(&'a [u8]),
    UncompressibleName(&'a [u8]),
    Other(&'a [u8]),
}

impl<'a> Component<'a> {
    /// Returns the octets of the component, whatever its kind.
    pub fn octets(&self) -> &'a [u8] {
        match *self {
            Self::CompressibleName(octets)
            | Self::UncompressibleName(octets)
            | Self::Other(octets) => octets,
        }
    }
}

/// Specifies (for [`Components::next`]) how to parse the next
/// [`Component`] of an [`Rdata`].
#[derive(Copy, Clone, Debug)]
enum ComponentType {
    CompressibleName,
    UncompressibleName,
    FixedLen(usize),
}

/// Returns the component layout of RDATA of type `rr_type`. Anything
/// after the listed components is a single [`Component::Other`].
fn layout_for(rr_type: Type) -> &'static [ComponentType] {
    use ComponentType::*;
    match rr_type {
        Type::NS
        | Type::MD
        | Type::MF
        | Type::CNAME
        | Type::MB
        | Type::MG
        | Type::MR
        | Type::PTR => &[CompressibleName],
        Type::SOA | Type::MINFO => &[CompressibleName, CompressibleName],
        Type::MX => &[FixedLen(2), CompressibleName],
        Type::SRV => &[FixedLen(6), UncompressibleName],
        Type::RRSIG => &[FixedLen(RRSIG_SIGNER_OFFSET), UncompressibleName],
        Type::NSEC => &[UncompressibleName],
        _ => &[],
    }
}

/// An iterator over the [`Component`]s of an [`Rdata`]. See
/// [`Rdata::components`].
pub struct Components<'a> {
    types: &'static [ComponentType],
    rdata: &'a [u8],
}

impl<'a> Iterator for Components<'a> {
    type Item = Result<Component<'a>, ReadRdataError>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some((next_type, remaining_types)) = self.types.split_first() else {
            if self.rdata.is_empty() {
                return None;
            }
            let component = Component::Other(self.rdata);
            self.rdata = &[];
            return Some(Ok(component));
        };

        let len = match *next_type {
            ComponentType::CompressibleName | ComponentType::UncompressibleName => {
                match Name::validate_uncompressed(self.rdata) {
                    Ok(len) => len,
                    Err(e) => {
                        self.types = &[];
                        self.rdata = &[];
                        return Some(Err(e.into()));
                    }
                }
            }
            ComponentType::FixedLen(len) if len <= self.rdata.len() => len,
            ComponentType::FixedLen(_) => {
                self.types = &[];
                self.rdata = &[];
                return Some(Err(ReadRdataError::UnexpectedEom));
            }
        };

        let (octets, remaining) = self.rdata.split_at(len);
        self.types = remaining_types;
        self.rdata = remaining;
        Some(Ok(match *next_type {
            ComponentType::CompressibleName => Component::CompressibleName(octets),
            ComponentType::UncompressibleName => Component::UncompressibleName(octets),
            ComponentType::FixedLen(_) => Component::Other(octets),
        }))
    }
}

////////////////////////////////////////////////////////////////////////
// ERRORS                                                             //
////////////////////////////////////////////////////////////////////////

/// An error signaling that RDATA is longer than 65,535 octets.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RdataTooLongError;

impl fmt::Display for RdataTooLongError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("RDATA is too long")
    }
}

impl std::error::Error for RdataTooLongError {}

/// An error signaling that RDATA could not be
/// read/decompressed/validated.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReadRdataError {
    InvalidName(name::Error),
    TooLong,
    UnexpectedEom,
    Other,
}

impl fmt::Display for ReadRdataError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "invalid embedded domain name: {}", err),
            Self::TooLong => f.write_str("RDATA is too long"),
            Self::UnexpectedEom => f.write_str("unexpected end of RDATA"),
            Self::Other => f.write_str("invalid RDATA"),
        }
    }
}

impl std::error::Error for ReadRdataError {}

impl From<name::Error> for ReadRdataError {
    fn from(err: name::Error) -> Self {
        Self::InvalidName(err)
    }
}

impl From<RdataTooLongError> for ReadRdataError {
    fn from(_: RdataTooLongError) -> Self {
        Self::TooLong
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn rdata(octets: &[u8]) -> Rdata {
        octets.try_into().unwrap()
    }

    #[test]
    fn rdata_constructor_rejects_long_data() {
        assert!(Rdata::try_from(vec![0; u16::MAX as usize]).is_ok());
        assert_eq!(
            Rdata::try_from(vec![0; u16::MAX as usize + 1]),
            Err(RdataTooLongError)
        );
    }

    #[test]
    fn mx_components_work() {
        let mx = rdata(b"\x00\x0a\x04mail\x07example\x00");
        let components: Vec<_> = mx.components(Type::MX).map(Result::unwrap).collect();
        assert_eq!(
            components,
            [
                Component::Other(b"\x00\x0a"),
                Component::CompressibleName(b"\x04mail\x07example\x00"),
            ]
        );
    }

    #[test]
    fn rrsig_signer_is_uncompressible() {
        let mut octets = vec![0; RRSIG_SIGNER_OFFSET];
        octets.extend_from_slice(b"\x00signature");
        let rrsig = rdata(&octets);
        let components: Vec<_> = rrsig.components(Type::RRSIG).map(Result::unwrap).collect();
        assert_eq!(components.len(), 3);
        assert_eq!(components[1], Component::UncompressibleName(b"\x00"));
        assert_eq!(components[2], Component::Other(b"signature"));
    }

    #[test]
    fn truncated_components_are_errors() {
        let mx = rdata(b"\x00");
        let mut components = mx.components(Type::MX);
        assert_eq!(components.next(), Some(Err(ReadRdataError::UnexpectedEom)));
        assert_eq!(components.next(), None);
    }

    #[test]
    fn equals_ignores_case_only_in_compressible_names() {
        let a = rdata(b"\x02ns\x07example\x00");
        let b = rdata(b"\x02NS\x07EXAMPLE\x00");
        assert!(a.equals(&b, Type::NS));
        assert!(!a.equals(&b, Type::NSEC));
    }

    #[test]
    fn read_decompresses_names() {
        let message = b"\x07example\x00\x00\x0a\x04mail\xc0\x00";
        let mx = Rdata::read(Type::MX, message, 9, 9).unwrap();
        assert_eq!(mx.octets(), b"\x00\x0a\x04mail\x07example\x00");
    }

    #[test]
    fn read_rejects_short_messages() {
        assert_eq!(
            Rdata::read(Type::A, &[0; 4], 2, 4),
            Err(ReadRdataError::UnexpectedEom)
        );
    }

    #[test]
    fn names_lists_embedded_names() {
        let soa = rdata(b"\x01a\x00\x01b\x00\x00\x00\x00\x01\x00\x00\x00\x02\x00\x00\x00\x03\x00\x00\x00\x04\x00\x00\x00\x05");
        let names: Vec<Name> = soa.names(Type::SOA).collect();
        assert_eq!(names, ["a.".parse::<Name>().unwrap(), "b.".parse().unwrap()]);
    }
}
