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

//! Error types for zone construction and loading.

use std::fmt;
use std::io;

use super::ValidationIssue;
use crate::rr::RrsetListAddError;
use crate::zone_file;

/// Errors that arise when adding a record to a [`Zone`](super::Zone).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Error {
    NotInZone,
    ClassMismatch,
    InvalidSignature,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::NotInZone => f.write_str("the record's owner is not within the zone"),
            Self::ClassMismatch => {
                f.write_str("the record's class does not match the zone's class")
            }
            Self::InvalidSignature => f.write_str("the RRSIG record does not name a covered type"),
        }
    }
}

impl From<RrsetListAddError> for Error {
    fn from(error: RrsetListAddError) -> Self {
        match error {
            RrsetListAddError::ClassMismatch => Self::ClassMismatch,
            RrsetListAddError::InvalidSignature => Self::InvalidSignature,
        }
    }
}

impl std::error::Error for Error {}

/// Errors that cause loading a zone from a file to fail.
#[derive(Debug)]
pub enum LoadError {
    Io(io::Error),
    Parse(zone_file::Error),
    Add { line: usize, error: Error },
    Invalid(ValidationIssue),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read the zone file: {}", err),
            Self::Parse(err) => write!(f, "failed to parse the zone file: {}", err),
            Self::Add { line, error } => write!(f, "record at line {}: {}", line, error),
            Self::Invalid(issue) => write!(f, "the zone is invalid: {}", issue),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Add { error, .. } => Some(error),
            Self::Invalid(_) => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<zone_file::Error> for LoadError {
    fn from(err: zone_file::Error) -> Self {
        Self::Parse(err)
    }
}
