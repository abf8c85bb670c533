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

//! Crate-private utilities.

/// A wrapper around [`str`] references whose [`PartialEq`] and [`Eq`]
/// implementations are ASCII-case-insensitive.
pub struct Caseless<'a>(pub &'a str);

impl PartialEq for Caseless<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(other.0)
    }
}

impl Eq for Caseless<'_> {}

/// Converts an ASCII hexadecimal digit to its numeric value, or
/// [`None`] if `digit` is not a hex digit.
pub fn ascii_hex_digit_to_nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

/// Parses `text` as a mnemonic from `table` (case-insensitively) or as
/// the RFC 3597 generic form `<prefix><decimal>`.
pub fn parse_mnemonic(
    text: &str,
    table: &[(&str, u16)],
    prefix: &str,
) -> Result<u16, &'static str> {
    if let Some((_, value)) = table
        .iter()
        .find(|(mnemonic, _)| Caseless(mnemonic) == Caseless(text))
    {
        return Ok(*value);
    }
    match text.get(..prefix.len()) {
        Some(start) if start.eq_ignore_ascii_case(prefix) => text[prefix.len()..]
            .parse()
            .or(Err("value is not a valid unsigned 16-bit integer")),
        _ => Err("unknown mnemonic"),
    }
}

/// Defines a `u16` newtype with named constants, a mnemonic table, and
/// [`Display`](std::fmt::Display)/[`FromStr`](std::str::FromStr)
/// implementations that fall back to the RFC 3597 § 5 generic form.
macro_rules! mnemonic_u16 {
    (
        $(#[$meta:meta])*
        pub struct $name:ident, prefix $prefix:literal {
            $($(#[$cmeta:meta])* $constant:ident = $value:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
        pub struct $name(u16);

        impl $name {
            $($(#[$cmeta])* pub const $constant: Self = Self($value);)*

            const MNEMONICS: &'static [(&'static str, u16)] =
                &[$((stringify!($constant), $value),)*];
        }

        impl From<u16> for $name {
            fn from(raw: u16) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u16 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = &'static str;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                $crate::util::parse_mnemonic(text, Self::MNEMONICS, $prefix).map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match Self::MNEMONICS.iter().find(|(_, value)| *value == self.0) {
                    Some((mnemonic, _)) => f.write_str(mnemonic),
                    None => write!(f, "{}{}", $prefix, self.0),
                }
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{self}")
            }
        }
    };
}

pub(crate) use mnemonic_u16;
