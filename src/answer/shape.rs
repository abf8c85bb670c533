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

//! The kinds of precomputed answers.

use crate::message::Rcode;
use crate::rr::Type;

/// The shape of a response: which records go in which section.
///
/// The `Root*` shapes answer questions about the zone apex itself.
/// The others answer questions at or below a delegation, or about
/// names that do not exist.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Shape {
    RootSoa,
    RootNs,
    RootDnskey,
    RootNsec,
    RootAny,
    RootNodata,
    TldDs,
    TldReferral,
    Nxdomain,
}

impl Shape {
    pub const COUNT: usize = 9;

    pub const ALL: [Shape; Self::COUNT] = [
        Self::RootSoa,
        Self::RootNs,
        Self::RootDnskey,
        Self::RootNsec,
        Self::RootAny,
        Self::RootNodata,
        Self::TldDs,
        Self::TldReferral,
        Self::Nxdomain,
    ];

    /// Chooses the shape of the response to a question.
    ///
    /// `matched` tells whether the zone index has the question's key;
    /// `depth` is the number of labels of the QNAME below the apex.
    pub fn select(matched: bool, depth: usize, qtype: Type) -> Self {
        if !matched {
            return Self::Nxdomain;
        }
        match depth {
            0 => match qtype {
                Type::SOA => Self::RootSoa,
                Type::NS => Self::RootNs,
                Type::NSEC => Self::RootNsec,
                Type::DNSKEY => Self::RootDnskey,
                Type::ANY => Self::RootAny,
                _ => Self::RootNodata,
            },
            1 if qtype == Type::DS => Self::TldDs,
            _ => Self::TldReferral,
        }
    }

    /// Returns whether only the apex has answers of this shape.
    pub fn is_root(self) -> bool {
        matches!(
            self,
            Self::RootSoa
                | Self::RootNs
                | Self::RootDnskey
                | Self::RootNsec
                | Self::RootAny
                | Self::RootNodata
        )
    }

    /// Returns the RCODE of responses of this shape.
    pub fn rcode(self) -> Rcode {
        if self == Self::Nxdomain {
            Rcode::NxDomain
        } else {
            Rcode::NoError
        }
    }

    pub(super) fn index(self) -> usize {
        self as usize
    }
}

/// Whether a response includes DNSSEC records.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Flavor {
    Plain,
    Signed,
}

impl Flavor {
    pub const ALL: [Flavor; 2] = [Self::Plain, Self::Signed];

    /// Returns the flavor a query asks for through its DO bit.
    pub fn from_do_bit(dnssec_ok: bool) -> Self {
        if dnssec_ok {
            Self::Signed
        } else {
            Self::Plain
        }
    }

    pub fn is_signed(self) -> bool {
        self == Self::Signed
    }

    pub(super) fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_total() {
        let qtypes = [
            Type::A,
            Type::NS,
            Type::SOA,
            Type::DS,
            Type::NSEC,
            Type::DNSKEY,
            Type::ANY,
            Type::from(65280),
        ];
        for matched in [false, true] {
            for depth in 0..4 {
                for qtype in qtypes {
                    let shape = Shape::select(matched, depth, qtype);
                    assert_eq!(!matched, shape == Shape::Nxdomain);
                    assert_eq!(matched && depth == 0, shape.is_root());
                }
            }
        }
    }

    #[test]
    fn select_works_at_apex() {
        assert_eq!(Shape::select(true, 0, Type::SOA), Shape::RootSoa);
        assert_eq!(Shape::select(true, 0, Type::NS), Shape::RootNs);
        assert_eq!(Shape::select(true, 0, Type::NSEC), Shape::RootNsec);
        assert_eq!(Shape::select(true, 0, Type::DNSKEY), Shape::RootDnskey);
        assert_eq!(Shape::select(true, 0, Type::ANY), Shape::RootAny);
        assert_eq!(Shape::select(true, 0, Type::A), Shape::RootNodata);
        assert_eq!(Shape::select(true, 0, Type::DS), Shape::RootNodata);
    }

    #[test]
    fn select_works_below_apex() {
        assert_eq!(Shape::select(true, 1, Type::DS), Shape::TldDs);
        assert_eq!(Shape::select(true, 1, Type::A), Shape::TldReferral);
        assert_eq!(Shape::select(true, 2, Type::DS), Shape::TldReferral);
        assert_eq!(Shape::select(false, 1, Type::DS), Shape::Nxdomain);
    }

    #[test]
    fn indices_are_dense() {
        for (i, shape) in Shape::ALL.into_iter().enumerate() {
            assert_eq!(shape.index(), i);
        }
        assert_eq!(Flavor::from_do_bit(true).index(), 1);
        assert_eq!(Shape::Nxdomain.rcode(), Rcode::NxDomain);
        assert_eq!(Shape::TldReferral.rcode(), Rcode::NoError);
    }
}
