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

//! Implementation of the in-memory zone tree that answers are built
//! from.
//!
//! A [`Zone`] is an arena of nodes, one per owner name that has
//! records, addressed by [`NodeId`]. Nodes are found by name through a
//! case-insensitive hash map; there are no parent or child pointers,
//! since the answer builder only ever needs to go from a name to its
//! records (an NS target to its addresses, for instance).
//!
//! `Zone`s are constructed with [`Zone::new`], filled with
//! [`Zone::add`], and completed with [`Zone::finish`], which works out
//! which nodes are delegations or glue and validates the result.
//! [`Zone::load_from_path`] does all three from a zone file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;

use crate::class::Class;
use crate::name::Name;
use crate::rr::{Rdata, Rrset, RrsetList, Ttl, Type};
use crate::zone_file::Parser;

mod error;
mod validation;
pub use error::{Error, LoadError};
pub use validation::ValidationIssue;

////////////////////////////////////////////////////////////////////////
// ZONE STRUCTURE                                                     //
////////////////////////////////////////////////////////////////////////

/// A DNS zone loaded into memory.
#[derive(Debug)]
pub struct Zone {
    class: Class,
    nodes: Vec<Node>,
    by_name: HashMap<Name, NodeId>,
}

/// Identifies a node of a [`Zone`]. The apex is always
/// [`Zone::APEX`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeId(usize);

/// What a node is, relative to the zone's authoritative data. This is
/// only meaningful once [`Zone::finish`] has run.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NodeKind {
    Apex,
    Authoritative,

    /// A non-apex node that owns NS records: a zone cut.
    Delegation,

    /// A node below a zone cut. Its addresses are only served as glue.
    Glue,
}

#[derive(Debug)]
struct Node {
    name: Name,
    kind: NodeKind,
    rrsets: RrsetList,
}

impl Zone {
    pub const APEX: NodeId = NodeId(0);

    /// Creates a new, empty `Zone` with the given apex and class.
    pub fn new(apex: Name, class: Class) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert(apex.clone(), Self::APEX);
        Self {
            class,
            nodes: vec![Node {
                name: apex,
                kind: NodeKind::Apex,
                rrsets: RrsetList::new(),
            }],
            by_name,
        }
    }

    /// Returns the zone's apex name.
    pub fn apex(&self) -> &Name {
        &self.nodes[Self::APEX.0].name
    }

    pub fn class(&self) -> Class {
        self.class
    }

    /// Adds a record to the `Zone`.
    ///
    /// RRSIG records are attached to the RRset they cover. Duplicate
    /// records are dropped, and a record whose TTL differs from the
    /// rest of its RRset takes the RRset's TTL (with a warning).
    ///
    /// This fails if the owner is not within the zone, if the class
    /// does not match the zone, or if an RRSIG is malformed. The `Zone`
    /// should not be used further in that case.
    pub fn add(
        &mut self,
        owner: &Name,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
        rdata: Rdata,
    ) -> Result<(), Error> {
        if !owner.eq_or_subdomain_of(self.apex()) {
            return Err(Error::NotInZone);
        }
        if class != self.class {
            return Err(Error::ClassMismatch);
        }

        let id = self.get_or_create_node(owner);
        let rrsets = &mut self.nodes[id.0].rrsets;
        if rr_type == Type::RRSIG {
            rrsets.add_signature(class, ttl, rdata)?;
        } else if !rrsets.add(rr_type, class, ttl, rdata)? {
            warn!(
                "{} {}: TTL {} differs from the rest of the RRset; using the first TTL",
                owner,
                rr_type,
                u32::from(ttl),
            );
        }
        Ok(())
    }

    fn get_or_create_node(&mut self, name: &Name) -> NodeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.clone(),
            kind: NodeKind::Authoritative,
            rrsets: RrsetList::new(),
        });
        self.by_name.insert(name.clone(), id);
        id
    }

    /// Classifies every node as authoritative, a delegation, or glue,
    /// and then validates the zone. See the `validation` module for the
    /// checks performed.
    pub fn finish(&mut self) -> Vec<ValidationIssue> {
        let apex_len = self.apex().len();
        for index in 1..self.nodes.len() {
            let name = &self.nodes[index].name;
            let below_cut = (1..name.len() - apex_len)
                .filter_map(|skip| name.superdomain(skip))
                .filter_map(|ancestor| self.by_name.get(&ancestor))
                .any(|&ancestor| ancestor != Self::APEX && self.has_ns(ancestor));
            self.nodes[index].kind = if below_cut {
                NodeKind::Glue
            } else if self.has_ns(NodeId(index)) {
                NodeKind::Delegation
            } else {
                NodeKind::Authoritative
            };
        }
        self.validate()
    }

    fn has_ns(&self, id: NodeId) -> bool {
        self.nodes[id.0].rrsets.lookup(Type::NS).is_some()
    }
}

////////////////////////////////////////////////////////////////////////
// LOADING FROM ZONE FILES                                            //
////////////////////////////////////////////////////////////////////////

impl Zone {
    /// Reads a zone with apex `origin` from a zone file, finishes it,
    /// and logs any validation warnings. Validation errors fail the
    /// load.
    pub fn load_from_path(path: &Path, origin: &Name) -> Result<Self, LoadError> {
        let file = File::open(path)?;
        Self::load_from_reader(BufReader::new(file), origin)
    }

    /// Like [`Zone::load_from_path`], but reads from any stream.
    pub fn load_from_reader<R: BufRead>(reader: R, origin: &Name) -> Result<Self, LoadError> {
        let mut zone = Self::new(origin.clone(), Class::IN);
        for record in Parser::new(reader).with_origin(origin.clone()) {
            let record = record?;
            zone.add(
                &record.owner,
                record.rr_type,
                record.class,
                record.ttl,
                record.rdata,
            )
            .map_err(|error| LoadError::Add {
                line: record.line,
                error,
            })?;
        }

        let mut fatal = None;
        for issue in zone.finish() {
            if issue.is_error() {
                fatal.get_or_insert(issue);
            } else {
                warn!("zone {}: {}", origin, issue);
            }
        }
        match fatal {
            Some(issue) => Err(LoadError::Invalid(issue)),
            None => Ok(zone),
        }
    }
}

////////////////////////////////////////////////////////////////////////
// ACCESS                                                             //
////////////////////////////////////////////////////////////////////////

impl Zone {
    /// Finds the node for `name`, if it owns records.
    pub fn node(&self, name: &Name) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Returns an iterator over every node, apex first.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn name(&self, id: NodeId) -> &Name {
        &self.nodes[id.0].name
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    /// Returns the RRset of type `rr_type` at a node, if present.
    pub fn rrset(&self, id: NodeId, rr_type: Type) -> Option<&Rrset> {
        self.nodes[id.0].rrsets.lookup(rr_type)
    }

    /// Returns the NSEC RRset at a node, if present.
    pub fn nsec(&self, id: NodeId) -> Option<&Rrset> {
        self.rrset(id, Type::NSEC)
    }

    /// Returns the SOA serial, if the apex has an SOA record.
    pub fn soa_serial(&self) -> Option<u32> {
        self.rrset(Self::APEX, Type::SOA)?
            .rdatas()
            .first()?
            .soa_serial()
    }

    /// Returns the address RRsets for the targets of the NS records at
    /// a node: for each target in NS order, its A and then its AAAA
    /// RRset, wherever in the zone the target lives. Targets with no
    /// addresses in the zone are skipped.
    pub fn glue_for(&self, id: NodeId) -> Vec<(&Name, &Rrset)> {
        let mut glue = Vec::new();
        let ns = match self.rrset(id, Type::NS) {
            Some(ns) => ns,
            None => return glue,
        };
        for target in ns.rdatas().iter().flat_map(|rdata| rdata.names(Type::NS)) {
            if let Some(target_id) = self.node(&target) {
                for rr_type in [Type::A, Type::AAAA] {
                    if let Some(rrset) = self.rrset(target_id, rr_type) {
                        glue.push((self.name(target_id), rrset));
                    }
                }
            }
        }
        glue
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;
    use crate::fixtures::{self, ROOT_ZONE};

    lazy_static! {
        static ref APEX: Name = "quickroot.test.".parse().unwrap();
        static ref OUTSIDE: Name = "other.test.".parse().unwrap();
        static ref LOCALHOST: Rdata = (&[127, 0, 0, 1][..]).try_into().unwrap();
    }

    fn new_zone() -> Zone {
        Zone::new(APEX.clone(), Class::IN)
    }

    #[test]
    fn add_rejects_mismatched_class() {
        let mut zone = new_zone();
        assert_eq!(
            zone.add(&APEX, Type::A, Class::CH, Ttl::from(3600), LOCALHOST.clone()),
            Err(Error::ClassMismatch)
        );
    }

    #[test]
    fn add_rejects_owner_outside_of_zone() {
        let mut zone = new_zone();
        assert_eq!(
            zone.add(&OUTSIDE, Type::A, Class::IN, Ttl::from(3600), LOCALHOST.clone()),
            Err(Error::NotInZone)
        );
    }

    #[test]
    fn add_keeps_first_ttl_and_drops_duplicates() {
        let mut zone = new_zone();
        zone.add(&APEX, Type::A, Class::IN, Ttl::from(3600), LOCALHOST.clone())
            .unwrap();
        zone.add(&APEX, Type::A, Class::IN, Ttl::from(7200), LOCALHOST.clone())
            .unwrap();
        let rrset = zone.rrset(Zone::APEX, Type::A).unwrap();
        assert_eq!(rrset.ttl, Ttl::from(3600));
        assert_eq!(rrset.rdatas().len(), 1);
    }

    #[test]
    fn node_lookup_ignores_case() {
        let mut zone = new_zone();
        let name: Name = "Host.QuickRoot.Test.".parse().unwrap();
        zone.add(&name, Type::A, Class::IN, Ttl::from(1), LOCALHOST.clone())
            .unwrap();
        let id = zone.node(&"host.quickroot.test.".parse().unwrap()).unwrap();
        assert_eq!(zone.name(id), &name);
        assert!(zone.rrset(id, Type::A).is_some());
    }

    #[test]
    fn finish_classifies_nodes() {
        let zone = &*ROOT_ZONE;
        let kind = |name: &str| zone.kind(zone.node(&name.parse().unwrap()).unwrap());
        assert_eq!(kind("."), NodeKind::Apex);
        assert_eq!(kind("com."), NodeKind::Delegation);
        assert_eq!(kind("ns1.aaa."), NodeKind::Glue);
        assert_eq!(kind("a.gtld-servers.net."), NodeKind::Glue);
    }

    #[test]
    fn glue_for_follows_ns_order() {
        let zone = &*ROOT_ZONE;
        let com = zone.node(&"com.".parse().unwrap()).unwrap();
        let glue: Vec<_> = zone
            .glue_for(com)
            .into_iter()
            .map(|(name, rrset)| (name.to_string(), rrset.rr_type))
            .collect();
        assert_eq!(
            glue,
            [
                ("a.gtld-servers.net.".to_owned(), Type::A),
                ("a.gtld-servers.net.".to_owned(), Type::AAAA),
                ("b.gtld-servers.net.".to_owned(), Type::A),
            ]
        );
    }

    #[test]
    fn signatures_are_attached_to_covered_rrsets() {
        let zone = &*ROOT_ZONE;
        assert_eq!(zone.rrset(Zone::APEX, Type::SOA).unwrap().signatures().len(), 1);
        assert_eq!(zone.nsec(Zone::APEX).unwrap().signatures().len(), 1);
        assert!(zone.rrset(Zone::APEX, Type::RRSIG).is_none());
        assert_eq!(zone.soa_serial(), Some(2024010100));
    }

    #[test]
    fn load_rejects_zone_without_soa() {
        let result = Zone::load_from_reader(
            &b". 518400 NS a.root-servers.net.\n"[..],
            Name::root(),
        );
        assert!(matches!(
            result,
            Err(LoadError::Invalid(ValidationIssue::MissingApexSoa))
        ));
    }

    #[test]
    fn load_reports_record_line_on_add_failure() {
        let text = fixtures::ROOT_ZONE_TEXT.to_owned() + "x. 1 CH A 192.0.2.1\n";
        match Zone::load_from_reader(text.as_bytes(), Name::root()) {
            Err(LoadError::Add { line, error }) => {
                assert_eq!(error, Error::ClassMismatch);
                assert_eq!(line, text.lines().count());
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }
}
