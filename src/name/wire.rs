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

//! Parsing and validation of on-the-wire names.

use arrayvec::ArrayVec;

use super::{Error, Name, MAX_LABEL_LEN, MAX_WIRE_LEN};

////////////////////////////////////////////////////////////////////////
// UNCOMPRESSED NAMES                                                 //
////////////////////////////////////////////////////////////////////////

/// Walks an uncompressed name at the start of `octets`, returning its
/// length and label count. With `use_all`, the name must fill the
/// buffer.
fn scan_uncompressed(octets: &[u8], use_all: bool) -> Result<(usize, usize), Error> {
    let mut offset = 0;
    let mut n_labels = 0;
    loop {
        let label_len = *octets.get(offset).ok_or(Error::UnexpectedEom)? as usize;
        if label_len > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        }
        offset += label_len + 1;
        n_labels += 1;
        if offset > MAX_WIRE_LEN {
            return Err(Error::NameTooLong);
        } else if label_len == 0 {
            break;
        }
    }

    if offset > octets.len() {
        Err(Error::UnexpectedEom)
    } else if use_all && offset < octets.len() {
        Err(Error::ExtraData)
    } else {
        Ok((offset, n_labels))
    }
}

/// The implementation of [`Name::try_from_uncompressed`] and
/// [`Name::try_from_uncompressed_all`].
pub fn parse_uncompressed_name(octets: &[u8], use_all: bool) -> Result<(Name, usize), Error> {
    let (len, n_labels) = scan_uncompressed(octets, use_all)?;
    Ok((Name::from_validated(&octets[..len], n_labels), len))
}

/// The implementation of [`Name::validate_uncompressed`] and
/// [`Name::validate_uncompressed_all`].
pub fn validate_uncompressed_name(octets: &[u8], use_all: bool) -> Result<usize, Error> {
    scan_uncompressed(octets, use_all).map(|(len, _)| len)
}

////////////////////////////////////////////////////////////////////////
// COMPRESSED NAMES                                                   //
////////////////////////////////////////////////////////////////////////

/// Parses a compressed name starting at index `start` of `octets`,
/// following pointers. Pointers must point strictly before the chunk
/// that contains them, which rules out loops.
pub fn parse_compressed_name(octets: &[u8], start: usize) -> Result<(Name, usize), Error> {
    let mut wire_repr = ArrayVec::<u8, MAX_WIRE_LEN>::new();
    let mut n_labels = 0;
    let mut chunk_start = start;
    let mut index = start;
    let mut first_chunk_len = None;

    loop {
        let len = *octets.get(index).ok_or(Error::UnexpectedEom)?;
        if len & 0xc0 == 0xc0 {
            let low = *octets.get(index + 1).ok_or(Error::UnexpectedEom)?;
            let pointer = (u16::from_be_bytes([len, low]) & 0x3fff) as usize;
            if pointer >= chunk_start {
                return Err(Error::InvalidPointer);
            }
            if first_chunk_len.is_none() {
                first_chunk_len = Some(index + 2 - start);
            }
            chunk_start = pointer;
            index = pointer;
        } else if len as usize > MAX_LABEL_LEN {
            return Err(Error::LabelTooLong);
        } else {
            let end = index + len as usize + 1;
            let label = octets.get(index..end).ok_or(Error::UnexpectedEom)?;
            wire_repr
                .try_extend_from_slice(label)
                .or(Err(Error::NameTooLong))?;
            n_labels += 1;
            index = end;
            if len == 0 {
                break;
            }
        }
    }

    // Without pointers, the name ends where the walk ended.
    let consumed = first_chunk_len.unwrap_or_else(|| index - start);
    Ok((Name::from_validated(&wire_repr, n_labels), consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uncompressed_works() {
        let (name, len) = parse_uncompressed_name(b"\x07example\x04test\x00junk", false).unwrap();
        assert_eq!(len, 14);
        assert_eq!(name, "example.test.".parse().unwrap());
    }

    #[test]
    fn parse_uncompressed_rejects_bad_names() {
        assert_eq!(
            parse_uncompressed_name(b"\x07example\x04test\x00junk", true).unwrap_err(),
            Error::ExtraData
        );
        assert_eq!(
            parse_uncompressed_name(b"\x07example\x04te", false).unwrap_err(),
            Error::UnexpectedEom
        );
        assert_eq!(
            parse_uncompressed_name(b"\x40", false).unwrap_err(),
            Error::LabelTooLong
        );
        assert_eq!(
            validate_uncompressed_name(&[1; 300], false).unwrap_err(),
            Error::NameTooLong
        );
    }

    #[test]
    fn parse_compressed_follows_pointers() {
        let message = b"\x04test\x00\x07example\xc0\x00\x03www\xc0\x06";
        let (name, len) = parse_compressed_name(message, 16).unwrap();
        assert_eq!(name, "www.example.test.".parse().unwrap());
        assert_eq!(name.len(), 4);
        assert_eq!(len, 6);
    }

    #[test]
    fn parse_compressed_stops_after_first_pointer() {
        let message = b"\x07example\x04test\x00\x03ns1\xc0\x00\x00\x02";
        let (name, len) = parse_compressed_name(message, 14).unwrap();
        assert_eq!(name, "ns1.example.test.".parse().unwrap());
        assert_eq!(len, 6);

        let (name, len) = parse_compressed_name(b"\x00\xc0\x00", 1).unwrap();
        assert!(name.is_root());
        assert_eq!(len, 2);
    }

    #[test]
    fn parse_compressed_without_pointers_consumes_whole_name() {
        let (name, len) = parse_compressed_name(b"\xff\x03com\x00\x00\x01", 1).unwrap();
        assert_eq!(name, "com.".parse().unwrap());
        assert_eq!(len, 5);
    }

    #[test]
    fn parse_compressed_rejects_forward_pointers() {
        let message = b"\x03www\xc0\x00";
        assert_eq!(
            parse_compressed_name(message, 0).unwrap_err(),
            Error::InvalidPointer
        );
    }
}
