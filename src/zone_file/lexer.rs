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

//! Splitting of zone files into logical lines of fields.
//!
//! Zone files are line-based, but parentheses can extend a line, and a
//! line beginning with whitespace has an implicit owner. The [`Lexer`]
//! takes care of both, along with comments and quoting, and produces
//! [`Entry`] values. Escape sequences are left in place (backslash
//! included), since how they are interpreted depends on the field: an
//! escaped `.` in a domain name is not a label separator, but `\#` at
//! the start of RDATA is a token of its own.

use std::io::BufRead;

use super::error::{Error, ErrorKind, Position, Result};

/// One logical line of a zone file.
#[derive(Debug)]
pub struct Entry {
    /// The line on which the entry starts.
    pub line: usize,

    /// Whether the line started with whitespace (so that the owner is
    /// omitted).
    pub blank_owner: bool,

    pub fields: Vec<Field>,
}

/// A single field of an [`Entry`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field {
    /// The text of the field with quotes removed and escapes intact.
    pub text: Vec<u8>,
    pub quoted: bool,
    pub position: Position,
}

impl Field {
    /// Returns the field text as a `&str` if it is ASCII.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.text).ok().filter(|s| s.is_ascii())
    }
}

/// Reads [`Entry`] values from a zone file.
pub struct Lexer<S> {
    stream: S,
    line: usize,
    buf: Vec<u8>,
}

impl<S: BufRead> Lexer<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Reads the next non-empty logical line, or `None` at the end of
    /// the file.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        let mut entry: Option<Entry> = None;
        let mut in_parens = false;

        loop {
            self.buf.clear();
            if self.stream.read_until(b'\n', &mut self.buf)? == 0 {
                if in_parens {
                    return Err(self.error_here(1, ErrorKind::EofBeforeCloseParen));
                }
                return Ok(entry.filter(|entry| !entry.fields.is_empty()));
            }
            self.line += 1;

            let current = entry.get_or_insert_with(|| Entry {
                line: self.line,
                blank_owner: matches!(self.buf.first(), Some(b' ' | b'\t')),
                fields: Vec::new(),
            });
            in_parens = scan_line(&self.buf, self.line, in_parens, &mut current.fields)?;

            if !in_parens {
                if current.fields.is_empty() {
                    // A blank or comment-only line.
                    entry = None;
                } else {
                    break;
                }
            }
        }

        // The loop only breaks once the entry is complete.
        Ok(entry)
    }

    fn error_here(&self, column: usize, kind: ErrorKind) -> Error {
        Error::new(
            Position {
                line: self.line.max(1),
                column,
            },
            kind,
        )
    }
}

/// Splits one physical line into fields, appending them to `fields`.
/// Returns whether the line ends inside parentheses.
fn scan_line(
    octets: &[u8],
    line: usize,
    mut in_parens: bool,
    fields: &mut Vec<Field>,
) -> Result<bool> {
    let error = |index: usize, kind| {
        Error::new(
            Position {
                line,
                column: index + 1,
            },
            kind,
        )
    };
    let mut current: Option<Field> = None;
    let mut index = 0;

    while index < octets.len() {
        let octet = octets[index];
        match octet {
            b' ' | b'\t' | b'\r' | b'\n' => fields.extend(current.take()),
            b';' => {
                fields.extend(current.take());
                break;
            }
            b'(' => {
                fields.extend(current.take());
                if in_parens {
                    return Err(error(index, ErrorKind::NestedParens));
                }
                in_parens = true;
            }
            b')' => {
                fields.extend(current.take());
                if !in_parens {
                    return Err(error(index, ErrorKind::UnmatchedCloseParen));
                }
                in_parens = false;
            }
            b'"' => {
                fields.extend(current.take());
                let start = index;
                let mut text = Vec::new();
                index += 1;
                loop {
                    match octets.get(index) {
                        None | Some(b'\n') => {
                            return Err(error(start, ErrorKind::EofInQuotedString))
                        }
                        Some(b'"') => break,
                        Some(b'\\') => {
                            let escaped = octets
                                .get(index + 1)
                                .filter(|&&o| o != b'\n')
                                .ok_or_else(|| error(index, ErrorKind::EofInEscape))?;
                            text.extend_from_slice(&[b'\\', *escaped]);
                            index += 2;
                        }
                        Some(&other) => {
                            text.push(other);
                            index += 1;
                        }
                    }
                }
                fields.push(Field {
                    text,
                    quoted: true,
                    position: Position {
                        line,
                        column: start + 1,
                    },
                });
            }
            _ => {
                let field = current.get_or_insert_with(|| Field {
                    text: Vec::new(),
                    quoted: false,
                    position: Position {
                        line,
                        column: index + 1,
                    },
                });
                field.text.push(octet);
                if octet == b'\\' {
                    let escaped = octets
                        .get(index + 1)
                        .filter(|&&o| o != b'\n' && o != b'\r')
                        .ok_or_else(|| error(index, ErrorKind::EofInEscape))?;
                    field.text.push(*escaped);
                    index += 1;
                }
            }
        }
        index += 1;
    }

    fields.extend(current.take());
    Ok(in_parens)
}

/// Decodes the escape sequences in field text: `\DDD` gives the octet
/// with that decimal value and `\X` gives `X` itself.
pub fn unescape(text: &[u8]) -> std::result::Result<Vec<u8>, ErrorKind> {
    let mut octets = Vec::with_capacity(text.len());
    let mut remaining = text;
    while let Some((&octet, rest)) = remaining.split_first() {
        if octet == b'\\' {
            let (value, consumed) =
                crate::name::parse_escape(rest).or(Err(ErrorKind::InvalidEscape))?;
            octets.push(value);
            remaining = &rest[consumed..];
        } else {
            octets.push(octet);
            remaining = rest;
        }
    }
    Ok(octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(data: &[u8]) -> Result<Vec<Entry>> {
        let mut lexer = Lexer::new(data);
        let mut entries = Vec::new();
        while let Some(entry) = lexer.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    fn texts(entry: &Entry) -> Vec<&[u8]> {
        entry.fields.iter().map(|f| f.text.as_slice()).collect()
    }

    #[test]
    fn lexer_splits_fields_and_skips_comments() {
        let entries = entries(b"; header\n\nexample. 3600 IN NS a.example. ; c\n").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].line, 3);
        assert!(!entries[0].blank_owner);
        assert_eq!(
            texts(&entries[0]),
            [&b"example."[..], b"3600", b"IN", b"NS", b"a.example."]
        );
    }

    #[test]
    fn lexer_joins_parenthesized_lines() {
        let entries = entries(b"@ SOA a. b. (\n 1 ; serial\n 2 3 4 5 )\n\tNS a.\n").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(texts(&entries[0]).len(), 9);
        assert_eq!(entries[1].line, 4);
        assert!(entries[1].blank_owner);
    }

    #[test]
    fn lexer_handles_quotes_and_escapes() {
        let entries = entries(b"a TXT \"hello world\" x\\ y \"q\\\"\"\n").unwrap();
        let fields = &entries[0].fields;
        assert_eq!(fields[2].text, b"hello world");
        assert!(fields[2].quoted);
        assert_eq!(fields[3].text, b"x\\ y");
        assert_eq!(fields[4].text, b"q\\\"");
    }

    #[test]
    fn lexer_reports_paren_errors() {
        assert_eq!(
            entries(b"a ( (\n").unwrap_err().kind(),
            Some(&ErrorKind::NestedParens)
        );
        assert_eq!(
            entries(b"a )\n").unwrap_err().kind(),
            Some(&ErrorKind::UnmatchedCloseParen)
        );
        assert_eq!(
            entries(b"a (\n b\n").unwrap_err().kind(),
            Some(&ErrorKind::EofBeforeCloseParen)
        );
    }

    #[test]
    fn unescape_works() {
        assert_eq!(unescape(b"a\\.b\\065").unwrap(), b"a.bA");
        assert_eq!(unescape(b"\\25"), Err(ErrorKind::InvalidEscape));
    }
}
