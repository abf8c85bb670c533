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

//! Implementation of the [`NameBuilder`] structure.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_N_LABELS, MAX_WIRE_LEN};

/// A facility to build [`Name`]s octet by octet.
///
/// The `NameBuilder` keeps the on-the-wire representation in a
/// fixed-size buffer long enough for any valid name, so building on
/// the stack needs only one heap allocation, when the name is
/// finished.
///
/// A new `NameBuilder` starts with a single null label; finishing it
/// right away yields the root:
///
/// ```
/// use quickroot::name::{Name, NameBuilder};
/// assert_eq!(&NameBuilder::new().finish().unwrap(), Name::root());
/// ```
///
/// [`NameBuilder::try_push`] and [`NameBuilder::try_push_slice`] add
/// octets to the current label, and [`NameBuilder::next_label`] starts
/// a new one. [`NameBuilder::finish_with_suffix`] completes a relative
/// name with an origin.
pub struct NameBuilder {
    wire_repr: ArrayVec<u8, MAX_WIRE_LEN>,
    n_labels: usize,
    label_start: usize,
    label_len: u8,
}

impl NameBuilder {
    /// Constructs a new `NameBuilder`, which initially contains a
    /// single null label.
    pub fn new() -> Self {
        let mut wire_repr = ArrayVec::new();
        wire_repr.push(0);
        Self {
            wire_repr,
            n_labels: 1,
            label_start: 0,
            label_len: 0,
        }
    }

    /// Determines whether the name currently stored in the
    /// `NameBuilder` ends with the null label.
    pub fn is_fully_qualified(&self) -> bool {
        self.label_len == 0
    }

    /// Tries to add the given octet to the current label. In the error
    /// case, the `NameBuilder`'s state remains unchanged.
    pub fn try_push(&mut self, octet: u8) -> Result<(), Error> {
        if self.label_len as usize >= MAX_LABEL_LEN {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_push(octet).is_ok() {
            self.label_len += 1;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Tries to add the given slice to the current label. In the error
    /// case, the `NameBuilder`'s state remains unchanged.
    pub fn try_push_slice(&mut self, octets: &[u8]) -> Result<(), Error> {
        if self.label_len as usize + octets.len() > MAX_LABEL_LEN {
            Err(Error::LabelTooLong)
        } else if self.wire_repr.try_extend_from_slice(octets).is_ok() {
            self.label_len += octets.len() as u8;
            Ok(())
        } else {
            Err(Error::NameTooLong)
        }
    }

    /// Finishes the current label and starts a new one. Only the last
    /// label of a name may be null, so this fails if the current label
    /// is empty.
    pub fn next_label(&mut self) -> Result<(), Error> {
        if self.is_fully_qualified() {
            Err(Error::NullNonTerminal)
        } else if self.wire_repr.is_full() || self.n_labels >= MAX_N_LABELS {
            Err(Error::NameTooLong)
        } else {
            self.wire_repr[self.label_start] = self.label_len;
            self.label_start = self.wire_repr.len();
            self.label_len = 0;
            self.n_labels += 1;
            self.wire_repr.push(0);
            Ok(())
        }
    }

    /// Finishes the construction of the domain name. Since the last
    /// label of a domain name must be null, this fails if that is not
    /// the case.
    pub fn finish(self) -> Result<Name, Error> {
        if self.is_fully_qualified() {
            Ok(Name::from_validated(&self.wire_repr, self.n_labels))
        } else {
            Err(Error::NonNullTerminal)
        }
    }

    /// Finishes the current label and then appends the labels of
    /// `suffix`. This fails if the current label is null or if the
    /// result would be too long.
    pub fn finish_with_suffix(mut self, suffix: &Name) -> Result<Name, Error> {
        if self.is_fully_qualified() {
            return Err(Error::NullNonTerminal);
        }
        self.wire_repr[self.label_start] = self.label_len;
        self.wire_repr
            .try_extend_from_slice(suffix.wire_repr())
            .or(Err(Error::NameTooLong))?;
        let n_labels = self.n_labels + suffix.len();
        if n_labels > MAX_N_LABELS {
            return Err(Error::NameTooLong);
        }
        Ok(Name::from_validated(&self.wire_repr, n_labels))
    }
}

impl Default for NameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namebuilder_works() {
        let mut builder = NameBuilder::new();
        for c in b"example".iter() {
            builder.try_push(*c).unwrap();
        }
        builder.next_label().unwrap();
        builder.try_push_slice(b"test").unwrap();
        builder.next_label().unwrap();
        let name = builder.finish().unwrap();
        assert_eq!(name, "example.test.".parse().unwrap());
        assert_eq!(name.len(), 3);
    }

    #[test]
    fn namebuilder_works_with_suffix() {
        let mut builder = NameBuilder::new();
        let suffix: Name = "test.".parse().unwrap();
        builder.try_push_slice(b"example").unwrap();
        let name = builder.finish_with_suffix(&suffix).unwrap();
        assert_eq!(name, "example.test.".parse().unwrap());
        assert_eq!(name.len(), 3);
    }

    #[test]
    fn finish_rejects_non_fqdn() {
        let mut builder = NameBuilder::new();
        builder.try_push(b'x').unwrap();
        assert_eq!(builder.finish(), Err(Error::NonNullTerminal));
    }

    #[test]
    fn try_push_rejects_long_label() {
        let mut builder = NameBuilder::new();
        builder.try_push_slice(&[b'x'; MAX_LABEL_LEN]).unwrap();
        assert_eq!(builder.try_push(b'x'), Err(Error::LabelTooLong));
    }

    #[test]
    fn next_label_rejects_long_name() {
        let mut builder = NameBuilder::new();
        for _ in 0..MAX_N_LABELS - 2 {
            builder.try_push(b'x').unwrap();
            builder.next_label().unwrap();
        }

        // Two octets remain after the current length octet: room for a
        // one-octet label and the null label, but not for a two-octet
        // label.
        builder.try_push_slice(b"xx").unwrap();
        assert_eq!(builder.next_label(), Err(Error::NameTooLong));
    }
}
