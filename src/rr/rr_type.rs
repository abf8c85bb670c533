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

//! Provides the [`Type`] structure for DNS RR types.

use crate::util::mnemonic_u16;

mnemonic_u16! {
    /// The RR type of a DNS record (or the QTYPE of a question).
    ///
    /// Constants are provided for the types this server reads from zone
    /// files or inspects in queries; anything else is still
    /// representable and is displayed in the RFC 3597 `TYPE<n>` form.
    pub struct Type, prefix "TYPE" {
        A = 1,
        NS = 2,
        MD = 3,
        MF = 4,
        CNAME = 5,
        SOA = 6,
        MB = 7,
        MG = 8,
        MR = 9,
        NULL = 10,
        PTR = 12,
        HINFO = 13,
        MINFO = 14,
        MX = 15,
        TXT = 16,
        AAAA = 28,
        SRV = 33,
        OPT = 41,
        DS = 43,
        RRSIG = 46,
        NSEC = 47,
        DNSKEY = 48,
        ZONEMD = 63,
        AXFR = 252,
        /// QTYPE `*` (RFC 1035 § 3.2.3).
        ANY = 255,
    }
}

impl Type {
    /// Returns whether domain names in RDATA of this type may be
    /// compressed, per the list of well-known types in
    /// [RFC 3597 § 4].
    ///
    /// [RFC 3597 § 4]: https://datatracker.ietf.org/doc/html/rfc3597#section-4
    pub fn allows_rdata_compression(self) -> bool {
        matches!(
            self,
            Self::NS
                | Self::MD
                | Self::MF
                | Self::CNAME
                | Self::SOA
                | Self::MB
                | Self::MG
                | Self::MR
                | Self::PTR
                | Self::MINFO
                | Self::MX
        )
    }
}
