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

//! Implementation of zone validation, to detect semantic errors and
//! warnings in a loaded zone.
//!
//! [RFC 1035 § 5.2] (corrected by [Erratum 5626]) indicates that a zone
//! file should be checked for semantic errors in addition to syntactic
//! errors. The checks implemented by [`Zone::finish`] are:
//!
//! 1. Exactly one SOA record must be present at the zone apex.
//! 2. At least one NS record must be present at the zone apex.
//! 3. In-zone nameservers referenced by NS records should have A or
//!    AAAA records, so that referrals carry glue (warning only).
//! 4. RRSIG records should cover an RRset that is present (warning
//!    only).
//!
//! Records of a class other than the zone's and records outside the
//! zone are caught earlier, by [`Zone::add`].
//!
//! [RFC 1035 § 5.2]: https://datatracker.ietf.org/doc/html/rfc1035#section-5.2
//! [Erratum 5626]: https://www.rfc-editor.org/errata/eid5626

use std::fmt;

use crate::name::Name;
use crate::rr::Type;

use super::{NodeKind, Zone};

/// Indicates a semantic error or warning found in a loaded zone.
#[derive(Debug, Eq, PartialEq)]
pub enum ValidationIssue {
    MissingApexSoa,
    TooManyApexSoas,
    MissingApexNs,
    MissingNsAddress(Name),
    OrphanedSignature(Name, Type),
}

impl ValidationIssue {
    /// Returns whether the `ValidationIssue` represents a (fatal)
    /// error. Otherwise, it is a warning.
    pub fn is_error(&self) -> bool {
        matches!(
            *self,
            Self::MissingApexSoa | Self::TooManyApexSoas | Self::MissingApexNs
        )
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MissingApexSoa => f.write_str("the zone is missing an SOA record"),
            Self::TooManyApexSoas => {
                f.write_str("the zone has too many SOA records (precisely one is needed)")
            }
            Self::MissingApexNs => f.write_str("the zone is missing an NS record"),
            Self::MissingNsAddress(nsdname) => write!(
                f,
                "the in-zone nameserver {} is missing an address",
                nsdname
            ),
            Self::OrphanedSignature(owner, rr_type) => write!(
                f,
                "{} has an RRSIG covering {} but no {} records",
                owner, rr_type, rr_type
            ),
        }
    }
}

impl Zone {
    pub(super) fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        match self.rrset(Self::APEX, Type::SOA).map(|soa| soa.rdatas().len()) {
            None => issues.push(ValidationIssue::MissingApexSoa),
            Some(1) => (),
            Some(_) => issues.push(ValidationIssue::TooManyApexSoas),
        }
        if self.rrset(Self::APEX, Type::NS).is_none() {
            issues.push(ValidationIssue::MissingApexNs);
        }

        for id in self.nodes() {
            let node = &self.nodes[id.0];
            if matches!(node.kind, NodeKind::Apex | NodeKind::Delegation) {
                self.check_ns_addresses(id, &mut issues);
            }
            for rr_type in node.rrsets.orphaned_signatures() {
                issues.push(ValidationIssue::OrphanedSignature(node.name.clone(), rr_type));
            }
        }
        issues
    }

    fn check_ns_addresses(&self, id: super::NodeId, issues: &mut Vec<ValidationIssue>) {
        let ns = match self.rrset(id, Type::NS) {
            Some(ns) => ns,
            None => return,
        };
        for target in ns.rdatas().iter().flat_map(|rdata| rdata.names(Type::NS)) {
            if !target.eq_or_subdomain_of(self.apex()) {
                continue;
            }
            let has_address = self.node(&target).map_or(false, |target_id| {
                self.rrset(target_id, Type::A).is_some()
                    || self.rrset(target_id, Type::AAAA).is_some()
            });
            let issue = ValidationIssue::MissingNsAddress(target);
            if !has_address && !issues.contains(&issue) {
                issues.push(issue);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::rr::{Rdata, Ttl};

    fn zone_with(records: &[(&str, Type, &[u8])]) -> Zone {
        let mut zone = Zone::new(Name::root().clone(), Class::IN);
        for (owner, rr_type, octets) in records {
            let rdata = Rdata::try_from(*octets).unwrap();
            zone.add(&owner.parse().unwrap(), *rr_type, Class::IN, Ttl::from(1), rdata)
                .unwrap();
        }
        zone
    }

    const SOA: &[u8] = b"\x00\x00\x00\x00\x00\x01\x00\x00\x00\x02\x00\x00\x00\x03\x00\x00\x00\x04\x00\x00\x00\x05";

    #[test]
    fn missing_apex_records_are_errors() {
        let issues = zone_with(&[]).finish();
        assert_eq!(
            issues,
            [ValidationIssue::MissingApexSoa, ValidationIssue::MissingApexNs]
        );
        assert!(issues.iter().all(ValidationIssue::is_error));
    }

    #[test]
    fn missing_ns_address_is_a_warning() {
        let issues = zone_with(&[
            (".", Type::SOA, SOA),
            (".", Type::NS, b"\x02ns\x03tld\x00"),
            ("tld.", Type::NS, b"\x02ns\x03tld\x00"),
        ])
        .finish();
        assert_eq!(
            issues,
            [ValidationIssue::MissingNsAddress("ns.tld.".parse().unwrap())]
        );
        assert!(!issues[0].is_error());
    }

    #[test]
    fn orphaned_signature_is_reported() {
        let mut rrsig = u16::from(Type::DS).to_be_bytes().to_vec();
        rrsig.extend_from_slice(&[0; 16]);
        rrsig.extend_from_slice(b"\x00sig");
        let issues = zone_with(&[
            (".", Type::SOA, SOA),
            (".", Type::NS, b"\x02ns\x00"),
            ("ns.", Type::A, &[127, 0, 0, 1]),
            ("tld.", Type::RRSIG, &rrsig),
        ])
        .finish();
        assert_eq!(
            issues,
            [ValidationIssue::OrphanedSignature("tld.".parse().unwrap(), Type::DS)]
        );
    }
}
