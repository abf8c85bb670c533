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

//! Parsing of the [RFC 1035 § 5] zone file format.
//!
//! This module provides the [`Parser`] structure, which accepts a
//! stream implementing the [`BufRead`] trait. It can subsequently be
//! iterated over to read DNS records stored in [RFC 1035 § 5] format.
//! `$ORIGIN` and `$TTL` directives are processed internally; `$INCLUDE`
//! is reported as an error, since a zone is always loaded from a single
//! file.
//!
//! Errors (which may be I/O errors or syntax errors) are reported
//! through the [`Error`] type. Iteration ends and parsing cannot be
//! continued after an error is returned.
//!
//! ```
//! use quickroot::rr::Type;
//! use quickroot::zone_file::Parser;
//!
//! const ZONE_FILE: &[u8] = br#"
//! $ORIGIN .
//! $TTL 86400
//! @   IN SOA a.root-servers.net. nstld.verisign-grs.com. (
//!     2024010100  ; SERIAL
//!     1800        ; REFRESH
//!     900         ; RETRY
//!     604800      ; EXPIRE
//!     86400       ; MINIMUM
//! )
//!     IN NS a.root-servers.net.
//! com. 172800 NS a.gtld-servers.net.
//! "#;
//!
//! let mut parser = Parser::new(ZONE_FILE);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::SOA);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::NS);
//! assert_eq!(parser.next().unwrap().unwrap().rr_type, Type::NS);
//! assert!(parser.next().is_none());
//! ```
//!
//! # A note about the implementation
//!
//! Escape sequences do not mean the same thing everywhere in a zone
//! file. An escaped `.` in a domain name is part of a label, while
//! [RFC 3597 § 5] introduces a special token `\#` which is not
//! equivalent to a "regular" `#`. The lexer therefore only splits lines
//! into fields (handling comments, quotes, and parentheses) and leaves
//! escapes in place; each field is decoded once the parser knows what
//! it holds.
//!
//! [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
//! [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5

use std::io::BufRead;

use crate::class::Class;
use crate::name::Name;
use crate::rr::{Rdata, Ttl, Type};

pub mod error;
mod lexer;
mod rdata;

use error::{ErrorKind, Position};
pub use error::{Error, Result};
use lexer::{Entry, Field, Lexer};

////////////////////////////////////////////////////////////////////////
// STRUCTURES                                                         //
////////////////////////////////////////////////////////////////////////

/// A parser for [RFC 1035 § 5] DNS zone files.
///
/// See the [module-level documentation](`self`) for details and example
/// usage.
///
/// [RFC 1035 § 5]: https://datatracker.ietf.org/doc/html/rfc1035#section-5
pub struct Parser<S> {
    error: bool,
    lexer: Lexer<S>,
    context: Context,
}

/// Tracks the parse context of a [`Parser`].
///
/// An `@` symbol is shorthand for the current origin (set with
/// `$ORIGIN`), and partially qualified domain names are interpreted
/// relative to the origin. Omitted TTLs take the value of the last
/// `$TTL` directive, or failing that the previous record's TTL. Omitted
/// classes default to the previous record's class (or IN for the first
/// record), and omitted owners to the previous owner.
#[derive(Clone, Default)]
struct Context {
    origin: Option<Name>,
    previous_owner: Option<Name>,
    previous_ttl: Option<Ttl>,
    previous_class: Option<Class>,
    default_ttl: Option<Ttl>,
}

/// Parsed resource record data.
#[derive(Clone, Debug)]
pub struct ParsedRr {
    pub line: usize,
    pub owner: Name,
    pub ttl: Ttl,
    pub class: Class,
    pub rr_type: Type,
    pub rdata: Rdata,
}

////////////////////////////////////////////////////////////////////////
// PARSER CONSTRUCTION AND ITERATION                                  //
////////////////////////////////////////////////////////////////////////

impl<S: BufRead> Parser<S> {
    /// Creates a new [`Parser`] to read a zone file from the provided
    /// stream.
    pub fn new(stream: S) -> Self {
        Self {
            error: false,
            lexer: Lexer::new(stream),
            context: Context::default(),
        }
    }

    /// Sets the initial origin, as if the file began with an `$ORIGIN`
    /// directive.
    pub fn with_origin(mut self, origin: Name) -> Self {
        self.context.origin = Some(origin);
        self
    }

    /// Reads entries until one holds a record.
    fn parse_until_record(&mut self) -> Result<Option<ParsedRr>> {
        while let Some(entry) = self.lexer.next_entry()? {
            let is_directive = !entry.blank_owner
                && entry.fields.first().map_or(false, |f| {
                    !f.quoted && f.text.first() == Some(&b'$')
                });
            if is_directive {
                self.parse_directive(&entry)?;
            } else {
                return self.parse_record(&entry).map(Some);
            }
        }
        Ok(None)
    }
}

impl<S: BufRead> Iterator for Parser<S> {
    type Item = Result<ParsedRr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error {
            // Internal state is not guaranteed to be consistent after
            // an error, so stop here.
            return None;
        }

        match self.parse_until_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.error = true;
                Some(Err(e))
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////
// DIRECTIVES                                                         //
////////////////////////////////////////////////////////////////////////

impl<S: BufRead> Parser<S> {
    fn parse_directive(&mut self, entry: &Entry) -> Result<()> {
        let (directive, arguments) = entry.fields.split_first().ok_or_else(|| {
            Error::new(
                Position {
                    line: entry.line,
                    column: 1,
                },
                ErrorKind::UnknownDirective,
            )
        })?;
        let end = end_of(entry);

        if directive.text.eq_ignore_ascii_case(b"$ORIGIN") {
            let field = single_argument(arguments, end, "origin")?;
            let origin = rdata::parse_name(field, self.context.origin.as_ref())?;
            self.context.origin = Some(origin);
        } else if directive.text.eq_ignore_ascii_case(b"$TTL") {
            let field = single_argument(arguments, end, "TTL")?;
            self.context.default_ttl = Some(parse_ttl(field)?);
        } else if directive.text.eq_ignore_ascii_case(b"$INCLUDE") {
            return Err(directive.error(ErrorKind::IncludeNotSupported));
        } else {
            return Err(directive.error(ErrorKind::UnknownDirective));
        }
        Ok(())
    }
}

fn single_argument<'a>(
    arguments: &'a [Field],
    end: Position,
    what: &'static str,
) -> Result<&'a Field> {
    match arguments {
        [field] => Ok(field),
        [] => Err(Error::new(end, ErrorKind::ExpectedField(what))),
        [_, extra, ..] => Err(extra.error(ErrorKind::TrailingFields)),
    }
}

////////////////////////////////////////////////////////////////////////
// RECORDS                                                            //
////////////////////////////////////////////////////////////////////////

impl<S: BufRead> Parser<S> {
    fn parse_record(&mut self, entry: &Entry) -> Result<ParsedRr> {
        let end = end_of(entry);
        let mut fields = entry.fields.as_slice();

        let owner = if entry.blank_owner {
            self.context.previous_owner.clone().ok_or_else(|| {
                Error::new(
                    Position {
                        line: entry.line,
                        column: 1,
                    },
                    ErrorKind::EmptyOwnerWithNoPrevious,
                )
            })?
        } else {
            let (field, rest) = fields
                .split_first()
                .ok_or_else(|| Error::new(end, ErrorKind::ExpectedField("owner")))?;
            fields = rest;
            rdata::parse_name(field, self.context.origin.as_ref())?
        };

        // The TTL and class may each be omitted and may come in either
        // order.
        let mut ttl = None;
        let mut class = None;
        while let Some((field, rest)) = fields.split_first() {
            if ttl.is_none() && field.text.first().map_or(false, u8::is_ascii_digit) {
                ttl = Some(parse_ttl(field)?);
            } else if let (None, Some(parsed)) = (class, parse_class(field)) {
                class = Some(parsed);
            } else {
                break;
            }
            fields = rest;
        }

        let (type_field, rdata_fields) = fields
            .split_first()
            .ok_or_else(|| Error::new(end, ErrorKind::ExpectedType))?;
        let rr_type: Type = type_field
            .as_str()
            .ok_or(ErrorKind::InvalidType("not ASCII"))
            .and_then(|text| text.parse().map_err(ErrorKind::InvalidType))
            .map_err(|kind| type_field.error(kind))?;
        if rr_type == Type::OPT {
            return Err(type_field.error(ErrorKind::OptNotAllowed));
        }

        let ttl = ttl
            .or(self.context.default_ttl)
            .or(self.context.previous_ttl)
            .ok_or_else(|| type_field.error(ErrorKind::OmittedTtlWithNoDefaultOrPrevious))?;
        let class = class.or(self.context.previous_class).unwrap_or(Class::IN);

        let rdata = rdata::parse_rdata(rr_type, rdata_fields, end, self.context.origin.as_ref())?;
        rdata
            .validate(rr_type)
            .map_err(|err| type_field.error(ErrorKind::InvalidRdata(err)))?;

        self.context.previous_owner = Some(owner.clone());
        self.context.previous_ttl = Some(ttl);
        self.context.previous_class = Some(class);
        Ok(ParsedRr {
            line: entry.line,
            owner,
            ttl,
            class,
            rr_type,
            rdata,
        })
    }
}

fn parse_ttl(field: &Field) -> Result<Ttl> {
    field
        .as_str()
        .ok_or("not ASCII")
        .and_then(str::parse)
        .map_err(|err| field.error(ErrorKind::InvalidTtl(err)))
}

fn parse_class(field: &Field) -> Option<Class> {
    if field.quoted {
        None
    } else {
        field.as_str()?.parse().ok()
    }
}

/// Returns the position just past the last field of `entry`.
fn end_of(entry: &Entry) -> Position {
    entry.fields.last().map_or(
        Position {
            line: entry.line,
            column: 1,
        },
        |field| Position {
            line: field.position.line,
            column: field.position.column + field.text.len(),
        },
    )
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
