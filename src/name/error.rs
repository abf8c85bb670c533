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

//! Implementation of the [`Error`] type for name-related errors.

use std::fmt;

/// Errors that arise while building or parsing a [`Name`](super::Name).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    /// Extra data followed an uncompressed name that should have filled
    /// the whole buffer.
    ExtraData,
    InvalidEscape,
    /// A compression pointer did not point strictly backward.
    InvalidPointer,
    LabelTooLong,
    NameTooLong,
    NonNullTerminal,
    NullNonTerminal,
    StrEmpty,
    StrNotAscii,
    UnexpectedEom,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Self::ExtraData => "extra data after name",
            Self::InvalidEscape => "invalid escape sequence",
            Self::InvalidPointer => "invalid compression pointer",
            Self::LabelTooLong => "label is longer than 63 octets",
            Self::NameTooLong => "name is longer than 255 octets on the wire",
            Self::NonNullTerminal => "name is not fully qualified",
            Self::NullNonTerminal => "empty label inside name",
            Self::StrEmpty => "empty name",
            Self::StrNotAscii => "name is not ASCII",
            Self::UnexpectedEom => "unexpected end of message in name",
        })
    }
}

impl std::error::Error for Error {}
