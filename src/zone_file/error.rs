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

//! Error types for zone file parsing.
//!
//! Syntax errors are recorded as an [`ErrorKind`] value plus the
//! position of the offending field, so that calling code can produce
//! consistent messages without allocating strings.

use std::fmt;
use std::io;

use crate::name;
use crate::rr::rdata::ReadRdataError;

/// Represents errors that may occur during zone file parsing.
#[derive(Debug)]
pub enum Error {
    /// I/O errors encountered while reading a zone file.
    Io(io::Error),

    /// Syntax errors.
    Syntax(ErrorDetails),
}

impl Error {
    pub(super) fn new(position: Position, kind: ErrorKind) -> Self {
        Self::Syntax(ErrorDetails { position, kind })
    }

    /// Returns the kind of syntax error, if this is one.
    pub fn kind(&self) -> Option<&ErrorKind> {
        match self {
            Self::Io(_) => None,
            Self::Syntax(details) => Some(&details.kind),
        }
    }
}

impl From<io::Error> for Error {
    fn from(io_error: io::Error) -> Self {
        Self::Io(io_error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(io_error) => write!(f, "I/O error: {}", io_error),
            Self::Syntax(details) => details.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(io_error) => Some(io_error),
            Self::Syntax(_) => None,
        }
    }
}

/// A result type for zone file parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// A position in a zone file. Both fields count from one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Provides information about the position and kind of zone file syntax
/// errors.
#[derive(Debug)]
pub struct ErrorDetails {
    pub(super) position: Position,
    pub(super) kind: ErrorKind,
}

impl ErrorDetails {
    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at line {} column {}",
            self.kind, self.position.line, self.position.column,
        )
    }
}

/// Kinds of zone file syntax errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    AtWhenOriginNotSet,
    CharacterStringTooLong,
    EmptyOwnerWithNoPrevious,
    EofBeforeCloseParen,
    EofInEscape,
    EofInQuotedString,
    ExpectedField(&'static str),
    ExpectedType,
    IncludeNotSupported,
    InvalidBase64,
    InvalidEscape,
    InvalidField(&'static str),
    InvalidHex,
    InvalidName(name::Error),
    InvalidRdata(ReadRdataError),
    InvalidTime,
    InvalidTtl(&'static str),
    InvalidType(&'static str),
    NestedParens,
    OmittedTtlWithNoDefaultOrPrevious,
    OptNotAllowed,
    PqdnWhenOriginNotSet,
    RdataLengthMismatch,
    TrailingFields,
    UnknownDirective,
    UnmatchedCloseParen,
    UnsupportedType(crate::rr::Type),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AtWhenOriginNotSet => f.write_str("cannot use @ when no origin is set"),
            Self::CharacterStringTooLong => f.write_str("<character-string> is too long"),
            Self::EmptyOwnerWithNoPrevious => {
                f.write_str("the owner cannot be empty when no previous owner is available")
            }
            Self::EofBeforeCloseParen => {
                f.write_str("reached end of file before close parenthesis")
            }
            Self::EofInEscape => f.write_str("reached end of line in escape sequence"),
            Self::EofInQuotedString => f.write_str("reached end of line in quoted string"),
            Self::ExpectedField(what) => write!(f, "expected {}", what),
            Self::ExpectedType => f.write_str("expected an RR type"),
            Self::IncludeNotSupported => f.write_str("$INCLUDE is not supported"),
            Self::InvalidBase64 => f.write_str("invalid base64 data"),
            Self::InvalidEscape => f.write_str("invalid escape sequence"),
            Self::InvalidField(what) => write!(f, "invalid {}", what),
            Self::InvalidHex => f.write_str("invalid hexadecimal data"),
            Self::InvalidName(err) => write!(f, "invalid name: {}", err),
            Self::InvalidRdata(err) => write!(f, "invalid RDATA: {}", err),
            Self::InvalidTime => f.write_str("invalid signature time"),
            Self::InvalidTtl(err) => write!(f, "invalid TTL: {}", err),
            Self::InvalidType(err) => write!(f, "invalid type: {}", err),
            Self::NestedParens => f.write_str("nested parentheses"),
            Self::OmittedTtlWithNoDefaultOrPrevious => {
                f.write_str("TTL omitted with no default TTL or previous TTL available")
            }
            Self::OptNotAllowed => f.write_str("OPT records are not allowed in zone files"),
            Self::PqdnWhenOriginNotSet => {
                f.write_str("cannot use a partially qualified domain name when no origin is set")
            }
            Self::RdataLengthMismatch => f.write_str("\\# length does not match the data"),
            Self::TrailingFields => f.write_str("unexpected fields at end of record"),
            Self::UnknownDirective => f.write_str("unknown directive"),
            Self::UnmatchedCloseParen => f.write_str("unmatched close parenthesis"),
            Self::UnsupportedType(rr_type) => write!(
                f,
                "no presentation format known for {}; use the \\# generic format",
                rr_type
            ),
        }
    }
}

impl From<name::Error> for ErrorKind {
    fn from(err: name::Error) -> Self {
        Self::InvalidName(err)
    }
}

impl From<ReadRdataError> for ErrorKind {
    fn from(err: ReadRdataError) -> Self {
        Self::InvalidRdata(err)
    }
}
