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

//! Precomputed answers.
//!
//! Everything a response contains after its question section is built
//! here, once, when a zone is loaded: each owner name in the zone index
//! gets an [`AnswerSet`] holding an [`Answer`] for every [`Shape`] of
//! response it can produce, in both the [`Flavor::Plain`] and
//! [`Flavor::Signed`] forms. At query time the server only has to pick
//! one and copy it out, adjusting compression pointers if the question
//! name is longer than the owner (see [`Answer::relocate`]).

use std::fmt;

use crate::name::Name;
use crate::rr::Type;

mod buffer;
mod encoder;
mod set;
mod shape;
pub use buffer::Answer;
pub(crate) use buffer::opt_record;
pub use set::AnswerSet;
pub use shape::{Flavor, Shape};

/// Errors that arise when building [`Answer`]s.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A record's RDATA could not be split into components.
    InvalidRdata { owner: Name, rr_type: Type },

    /// The answer would not fit in a DNS message.
    TooLong { owner: Name },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidRdata { owner, rr_type } => {
                write!(f, "invalid RDATA in {} {} record", owner, rr_type)
            }
            Self::TooLong { owner } => {
                write!(f, "an answer for {} does not fit in a DNS message", owner)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
