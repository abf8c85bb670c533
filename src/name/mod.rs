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

//! Implementation of data structures related to domain names.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::str::FromStr;

use lazy_static::lazy_static;

mod builder;
mod error;
mod wire;
pub use builder::NameBuilder;
pub use error::Error;

/// The maximum number of labels in a domain name.
const MAX_N_LABELS: usize = 128;

/// The maximum length of the uncompressed on-the-wire representation of
/// a domain name.
pub const MAX_WIRE_LEN: usize = 255;

/// The maximum length of a label in a domain name (not including the
/// octet that provides the length).
const MAX_LABEL_LEN: usize = 63;

lazy_static! {
    static ref ROOT: Name = Name {
        wire: Box::new([0]),
        n_labels: 1,
    };
}

////////////////////////////////////////////////////////////////////////
// NAME STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A domain name.
///
/// A `Name` owns the uncompressed on-the-wire representation of the
/// name ([RFC 1035 § 3.1]) and remembers how many labels it has,
/// counting the terminal null label. (So the root has one label.)
/// Every `Name` is fully qualified; the builder and parsers in this
/// module refuse to produce anything else.
///
/// Comparison and hashing are ASCII-case-insensitive, and the [`Ord`]
/// implementation is the DNSSEC canonical ordering.
///
/// `Name`s are constructed
///
/// * through the [`FromStr`] implementation;
/// * through a [`NameBuilder`];
/// * from uncompressed on-the-wire names through
///   [`Name::try_from_uncompressed`] and
///   [`Name::try_from_uncompressed_all`]; and
/// * from compressed on-the-wire names through
///   [`Name::try_from_compressed`].
///
/// [RFC 1035 § 3.1]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.1
#[derive(Clone)]
pub struct Name {
    wire: Box<[u8]>,
    n_labels: u8,
}

#[allow(clippy::len_without_is_empty)] // A domain name is never empty!
impl Name {
    /// Creates a `Name` from a wire representation that the caller has
    /// already validated.
    fn from_validated(wire: &[u8], n_labels: usize) -> Self {
        Self {
            wire: wire.into(),
            n_labels: n_labels as u8,
        }
    }

    /// Returns a reference to a `Name` representing the DNS root, `.`.
    pub fn root() -> &'static Name {
        &ROOT
    }

    /// Returns whether the `Name` is the DNS root `.`.
    pub fn is_root(&self) -> bool {
        self.n_labels == 1
    }

    /// Returns the number of labels in this `Name`, including the null
    /// label.
    pub fn len(&self) -> usize {
        self.n_labels as usize
    }

    /// Returns an iterator over the labels of this `Name`. The null
    /// label is the last item produced.
    pub fn labels(&self) -> Labels {
        Labels {
            wire: &self.wire,
            remaining: self.len(),
        }
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// `Name`.
    pub fn wire_repr(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the (uncompressed) on-the-wire representation of the
    /// `Name` starting with the `n`-th label. If `n == self.len()`,
    /// this returns an empty slice; if `n > self.len()`, this panics.
    pub fn wire_repr_from(&self, n: usize) -> &[u8] {
        assert!(n <= self.len(), "label index out of range");
        let mut offset = 0;
        for _ in 0..n {
            offset += self.wire[offset] as usize + 1;
        }
        &self.wire[offset..]
    }

    /// Returns whether this `Name` is equal to or a subdomain of
    /// `other`.
    pub fn eq_or_subdomain_of(&self, other: &Name) -> bool {
        self.len() >= other.len()
            && self
                .wire_repr_from(self.len() - other.len())
                .eq_ignore_ascii_case(other.wire_repr())
    }

    /// Returns the superdomain obtained by skipping the first `skip`
    /// labels of the `Name`, or `None` if there aren't enough labels.
    pub fn superdomain(&self, skip: usize) -> Option<Name> {
        if skip < self.len() {
            Some(Self::from_validated(
                self.wire_repr_from(skip),
                self.len() - skip,
            ))
        } else {
            None
        }
    }

    /// Returns the first label of the `Name` (the null label if this
    /// is the root).
    pub fn first_label(&self) -> &[u8] {
        let len = self.wire[0] as usize;
        &self.wire[1..1 + len]
    }

    /// Makes all ASCII letters in this `Name` lowercase.
    ///
    /// This is provided with [RFC 4034 § 6.2] (DNSSEC canonical RR
    /// form) in mind.
    ///
    /// [RFC 4034 § 6.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.2
    pub fn make_ascii_lowercase(&mut self) {
        // Length octets are never above 63, so they are unaffected.
        self.wire.make_ascii_lowercase();
    }

    /// Returns a lowercase copy of this `Name`.
    pub fn to_ascii_lowercase(&self) -> Name {
        let mut lowercase = self.clone();
        lowercase.make_ascii_lowercase();
        lowercase
    }

    /// Tries to parse a compressed name present at index `start` of the
    /// provided buffer. Pointers are followed; indices given in
    /// pointers are treated as equivalent to indices in `octets` (so
    /// generally one will pass an entire DNS message in `octets`). Two
    /// things are returned on success:
    ///
    /// * the new `Name`; and
    /// * the number of contiguous octets read at `start`, that is, the
    ///   number of octets to skip to reach the next field of the
    ///   message.
    pub fn try_from_compressed(octets: &[u8], start: usize) -> Result<(Self, usize), Error> {
        wire::parse_compressed_name(octets, start)
    }

    /// Tries to parse an uncompressed name present at the start of the
    /// provided buffer. The name need not occupy the entire buffer;
    /// extra data is ignored. If the name is valid, it is returned
    /// along with its length in octets.
    pub fn try_from_uncompressed(octets: &[u8]) -> Result<(Self, usize), Error> {
        wire::parse_uncompressed_name(octets, false)
    }

    /// Like [`Name::try_from_uncompressed`], but in addition fails if
    /// there is extra data in the buffer after the name.
    pub fn try_from_uncompressed_all(octets: &[u8]) -> Result<Self, Error> {
        wire::parse_uncompressed_name(octets, true).map(|(name, _)| name)
    }

    /// Validates an uncompressed name present at the start of the
    /// provided buffer without allocating, returning its length.
    pub fn validate_uncompressed(octets: &[u8]) -> Result<usize, Error> {
        wire::validate_uncompressed_name(octets, false)
    }

    /// Like [`Name::validate_uncompressed`], but fails if there is
    /// extra data after the name.
    pub fn validate_uncompressed_all(octets: &[u8]) -> Result<(), Error> {
        wire::validate_uncompressed_name(octets, true).and(Ok(()))
    }
}

/// Writes a single label in presentation format, escaping as described
/// in [RFC 4343 § 2.1].
///
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
pub fn fmt_label(label: &[u8], f: &mut fmt::Formatter) -> fmt::Result {
    for &octet in label {
        if octet == b'.' || octet == b'\\' {
            write!(f, "\\{}", octet as char)?;
        } else if octet.is_ascii_graphic() {
            write!(f, "{}", octet as char)?;
        } else {
            write!(f, "\\{:03}", octet)?;
        }
    }
    Ok(())
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for label in self.labels() {
            if !label.is_empty() {
                fmt_label(label, f)?;
                f.write_str(".")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}

/// In accordance with RFC 1034 § 3.1 (clarified by RFC 4343),
/// comparison of `Name`s is ASCII-case-insensitive.
impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.n_labels == other.n_labels && self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for octet in self.wire.iter() {
            state.write_u8(octet.to_ascii_lowercase());
        }
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The [`Ord`] implementation for `Name` employs DNSSEC's canonical
/// ordering of domain names. Per [RFC 4034 § 6.1], `Name`s are ordered
/// as strings of labels read from right to left, and labels as
/// lowercased, left-justified octet strings.
///
/// [RFC 4034 § 6.1]: https://datatracker.ietf.org/doc/html/rfc4034#section-6.1
impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.labels()
            .rev()
            .zip(other.labels().rev())
            .map(|(a, b)| cmp_labels(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| self.len().cmp(&other.len()))
    }
}

/// Compares two labels in canonical order.
pub fn cmp_labels(a: &[u8], b: &[u8]) -> Ordering {
    a.iter()
        .map(u8::to_ascii_lowercase)
        .cmp(b.iter().map(u8::to_ascii_lowercase))
}

////////////////////////////////////////////////////////////////////////
// ITERATION OVER A NAME'S LABELS                                     //
////////////////////////////////////////////////////////////////////////

/// An iterator over the labels of a [`Name`], produced by
/// [`Name::labels`]. Each label is given without its length octet.
#[derive(Clone, Debug)]
pub struct Labels<'a> {
    wire: &'a [u8],
    remaining: usize,
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let len = self.wire[0] as usize;
        let label = &self.wire[1..1 + len];
        self.wire = &self.wire[1 + len..];
        self.remaining -= 1;
        Some(label)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Labels<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        // Walk to the last remaining label. Names are short, so the
        // linear scan is fine.
        let mut offset = 0;
        for _ in 1..self.remaining {
            offset += self.wire[offset] as usize + 1;
        }
        let len = self.wire[offset] as usize;
        let label = &self.wire[offset + 1..offset + 1 + len];
        self.wire = &self.wire[..offset];
        self.remaining -= 1;
        Some(label)
    }
}

impl ExactSizeIterator for Labels<'_> {}

impl FusedIterator for Labels<'_> {}

////////////////////////////////////////////////////////////////////////
// PARSING OF NAMES FROM RUST STRINGS                                 //
////////////////////////////////////////////////////////////////////////

/// Allows for conversion of a Rust [`str`] into a [`Name`]. The passed
/// string must be strictly ASCII and fully qualified. Escape sequences
/// as defined by [RFC 4343 § 2.1] are supported.
///
/// [RFC 4343 § 2.1]: https://datatracker.ietf.org/doc/html/rfc4343#section-2.1
impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::StrEmpty);
        } else if s == "." {
            return Ok(Name::root().clone());
        }

        let mut builder = NameBuilder::new();
        push_text(&mut builder, s.as_bytes())?;
        builder.finish()
    }
}

/// Pushes the presentation-format text `text` (escapes and all) into a
/// [`NameBuilder`]. Each unescaped `.` starts a new label.
pub(crate) fn push_text(builder: &mut NameBuilder, text: &[u8]) -> Result<(), Error> {
    let mut remaining = text;
    while let Some(&octet) = remaining.first() {
        if octet == b'\\' {
            let (value, consumed) = parse_escape(&remaining[1..])?;
            builder.try_push(value)?;
            remaining = &remaining[consumed + 1..];
        } else if octet == b'.' {
            builder.next_label()?;
            remaining = &remaining[1..];
        } else if !octet.is_ascii() {
            return Err(Error::StrNotAscii);
        } else {
            builder.try_push(octet)?;
            remaining = &remaining[1..];
        }
    }
    Ok(())
}

/// Parses an escape sequence. We expect `remaining_octets` to start
/// with the octet immediately *after* the backslash that introduces the
/// escape sequence.
pub(crate) fn parse_escape(remaining_octets: &[u8]) -> Result<(u8, usize), Error> {
    match remaining_octets {
        [] => Err(Error::InvalidEscape),
        [a, rest @ ..] if a.is_ascii_digit() => match rest {
            [b, c, ..] if b.is_ascii_digit() && c.is_ascii_digit() => {
                let value =
                    100 * (a - b'0') as usize + 10 * (b - b'0') as usize + (c - b'0') as usize;
                u8::try_from(value)
                    .map(|value| (value, 3))
                    .or(Err(Error::InvalidEscape))
            }
            _ => Err(Error::InvalidEscape),
        },
        [other, ..] => Ok((*other, 1)),
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
