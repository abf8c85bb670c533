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

//! Provides the [`Ttl`] structure for DNS RR TTLs.

use std::fmt;
use std::str::FromStr;

/// The time to live (TTL) of a DNS record.
///
/// [RFC 2181 § 8] clarified that TTL values are unsigned integers
/// between 0 and 2³¹ - 1, inclusive, and that a value received with
/// the most significant bit set is interpreted as zero. `Ttl::from(u32)`
/// implements that rule, so every `Ttl` fits in 31 bits.
///
/// [RFC 2181 § 8]: https://datatracker.ietf.org/doc/html/rfc2181#section-8
#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Ttl(u32);

impl From<u32> for Ttl {
    fn from(raw: u32) -> Self {
        if raw > i32::MAX as u32 {
            Self(0)
        } else {
            Self(raw)
        }
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

/// Parses a TTL as written in zone files: either a plain number of
/// seconds, or a sequence of numbers each followed by a BIND-style unit
/// (`w`, `d`, `h`, `m`, `s`, case-insensitive), as in `1h30m`. Values
/// outside the RFC 2181 range are rejected rather than clamped.
impl FromStr for Ttl {
    type Err = &'static str;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.is_empty() {
            return Err("empty TTL");
        }

        let mut total: u64 = 0;
        let mut current: Option<u64> = None;
        for c in text.chars() {
            if let Some(digit) = c.to_digit(10) {
                let value = current.unwrap_or(0) * 10 + digit as u64;
                if value > i32::MAX as u64 {
                    return Err("TTL is too large");
                }
                current = Some(value);
            } else {
                let multiplier = match c.to_ascii_lowercase() {
                    'w' => 604_800,
                    'd' => 86_400,
                    'h' => 3_600,
                    'm' => 60,
                    's' => 1,
                    _ => return Err("invalid character in TTL"),
                };
                total += current.take().ok_or("TTL unit without a value")? * multiplier;
            }
        }
        total += current.unwrap_or(0);

        if total > i32::MAX as u64 {
            Err("TTL is too large")
        } else {
            Ok(Self(total as u32))
        }
    }
}

impl fmt::Debug for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
