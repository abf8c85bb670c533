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

//! Implementation of [`AnswerSet`], the precomputed answers for one
//! owner name.

use super::buffer::{Answer, Sections};
use super::{Flavor, Result, Shape};
use crate::name::Name;
use crate::rr::{Rrset, Type};
use crate::zone::{NodeId, Zone};

/// Every [`Answer`] that can be given for one owner name in the zone
/// index, indexed by [`Flavor`] and [`Shape`].
#[derive(Debug, Default)]
pub struct AnswerSet {
    answers: [[Option<Answer>; Shape::COUNT]; 2],
}

impl AnswerSet {
    /// Builds the answers for node `id` of `zone`. The apex gets every
    /// shape; other nodes get the [`Shape::TldDs`],
    /// [`Shape::TldReferral`], and [`Shape::Nxdomain`] shapes. When
    /// `compress` is false, no answer uses name compression.
    pub fn build(zone: &Zone, id: NodeId, compress: bool) -> Result<Self> {
        let mut set = Self::default();
        let recipes = Recipes { zone, id };
        for flavor in Flavor::ALL {
            for shape in Shape::ALL {
                if shape.is_root() && id != Zone::APEX {
                    continue;
                }
                let recipe = recipes.recipe(shape, flavor);
                let answer = Answer::build(
                    zone.name(id),
                    recipe.sections,
                    recipe.authoritative,
                    flavor.is_signed(),
                    compress && recipe.compress,
                )?;
                set.answers[flavor.index()][shape.index()] = Some(answer);
            }
        }
        Ok(set)
    }

    /// Returns the answer of the given shape and flavor, or the empty
    /// answer if there is none.
    pub fn get(&self, shape: Shape, flavor: Flavor) -> &Answer {
        self.answers[flavor.index()][shape.index()]
            .as_ref()
            .unwrap_or_else(|| Answer::empty())
    }
}

////////////////////////////////////////////////////////////////////////
// RECIPES                                                            //
////////////////////////////////////////////////////////////////////////

struct Recipe<'a> {
    sections: Sections<'a>,
    authoritative: bool,
    compress: bool,
}

struct Recipes<'a> {
    zone: &'a Zone,
    id: NodeId,
}

impl<'a> Recipes<'a> {
    /// Returns what goes into the answer of `shape` and `flavor`.
    fn recipe(&self, shape: Shape, flavor: Flavor) -> Recipe<'a> {
        let signed = flavor.is_signed();
        let apex = Zone::APEX;
        let owner = self.id;
        let mut recipe = Recipe {
            sections: Sections {
                signatures: signed,
                ..Default::default()
            },
            authoritative: true,
            compress: true,
        };
        let sections = &mut recipe.sections;

        match shape {
            Shape::RootSoa => {
                self.push(&mut sections.answer, apex, Type::SOA);
                self.push(&mut sections.authority, apex, Type::NS);
                sections.additional = self.zone.glue_for(apex);
            }
            Shape::RootNs => {
                self.push(&mut sections.answer, apex, Type::NS);
                sections.additional = self.zone.glue_for(apex);
            }
            Shape::RootDnskey => self.push(&mut sections.answer, apex, Type::DNSKEY),
            Shape::RootNsec => {
                self.push(&mut sections.answer, apex, Type::NSEC);
                self.push(&mut sections.authority, apex, Type::NS);
                sections.additional = self.zone.glue_for(apex);
            }
            Shape::RootAny => {
                for rr_type in [Type::SOA, Type::NS, Type::NSEC, Type::DNSKEY] {
                    self.push(&mut sections.answer, apex, rr_type);
                }
                sections.additional = self.zone.glue_for(apex);
                sections.signatures = true;
            }
            Shape::RootNodata => {
                self.push(&mut sections.authority, apex, Type::SOA);
                recipe.compress = !signed;
            }
            Shape::TldDs => {
                if self.zone.rrset(owner, Type::DS).is_some() {
                    self.push(&mut sections.answer, owner, Type::DS);
                } else {
                    self.push(&mut sections.authority, apex, Type::SOA);
                    if signed {
                        self.push(&mut sections.authority, owner, Type::NSEC);
                    }
                }
            }
            Shape::TldReferral => {
                self.push(&mut sections.authority, owner, Type::NS);
                if signed {
                    self.push(&mut sections.authority, owner, Type::DS);
                }
                sections.additional = self.zone.glue_for(owner);
                recipe.authoritative = false;
            }
            Shape::Nxdomain => {
                self.push(&mut sections.authority, apex, Type::SOA);
                if signed {
                    self.push(&mut sections.authority, owner, Type::NSEC);
                    if owner != apex {
                        self.push(&mut sections.authority, apex, Type::NSEC);
                    }
                }
                recipe.compress = false;
            }
        }
        recipe
    }

    /// Appends the RRset of type `rr_type` at `id` to `section`, if the
    /// zone has one.
    fn push(&self, section: &mut Vec<(&'a Name, &'a Rrset)>, id: NodeId, rr_type: Type) {
        if let Some(rrset) = self.zone.rrset(id, rr_type) {
            section.push((self.zone.name(id), rrset));
        }
    }
}

#[cfg(test)]
mod tests {
    use lazy_static::lazy_static;

    use super::*;
    use crate::fixtures::ROOT_ZONE;
    use crate::message::{ReadRr, Reader};

    lazy_static! {
        static ref APEX_SET: AnswerSet = AnswerSet::build(&ROOT_ZONE, Zone::APEX, true).unwrap();
    }

    fn set_for(name: &str) -> AnswerSet {
        let id = ROOT_ZONE.node(&name.parse().unwrap()).unwrap();
        AnswerSet::build(&ROOT_ZONE, id, true).unwrap()
    }

    /// Decodes an answer behind a question for `qname`, returning the
    /// records of each section.
    fn decode(answer: &Answer, qname: &str) -> [Vec<ReadRr>; 3] {
        let qname: Name = qname.parse().unwrap();
        let mut message = vec![0, 0, 0x84, 0, 0, 1];
        for count in [answer.ancount(), answer.nscount(), answer.arcount()] {
            message.extend_from_slice(&count.to_be_bytes());
        }
        message.extend_from_slice(qname.wire_repr());
        message.extend_from_slice(&[0, 1, 0, 1]);
        let mut scratch = Vec::new();
        let real_offset = qname.wire_repr().len() as u16 + 4;
        message.extend_from_slice(answer.relocate(real_offset, &mut scratch));

        let mut reader = Reader::try_from(message.as_slice()).unwrap();
        reader.read_question().unwrap();
        let mut rrs = reader.read_all_rrs().unwrap().into_iter();
        let an = rrs.by_ref().take(answer.ancount() as usize).collect();
        let ns = rrs.by_ref().take(answer.nscount() as usize).collect();
        let ar = rrs.collect();
        [an, ns, ar]
    }

    fn types(rrs: &[ReadRr]) -> Vec<Type> {
        rrs.iter().map(|rr| rr.rr_type).collect()
    }

    #[test]
    fn root_ns_carries_glue() {
        let [an, ns, ar] = decode(APEX_SET.get(Shape::RootNs, Flavor::Plain), ".");
        assert_eq!(types(&an), [Type::NS, Type::NS]);
        assert!(ns.is_empty());
        assert_eq!(types(&ar), [Type::A, Type::AAAA, Type::A, Type::OPT]);
        assert_eq!(ar[0].owner, "a.root-servers.net.".parse::<Name>().unwrap());
        assert_eq!(ar[3].raw_ttl, 0);
    }

    #[test]
    fn signed_root_soa_carries_signatures() {
        let answer = APEX_SET.get(Shape::RootSoa, Flavor::Signed);
        assert!(answer.is_authoritative());
        let [an, ns, ar] = decode(answer, ".");
        assert_eq!(types(&an), [Type::SOA, Type::RRSIG]);
        assert_eq!(types(&ns), [Type::NS, Type::NS, Type::RRSIG]);
        assert_eq!(ar.last().unwrap().raw_ttl, 0x8000);
    }

    #[test]
    fn root_any_is_always_signed() {
        for flavor in Flavor::ALL {
            let answer = APEX_SET.get(Shape::RootAny, flavor);
            assert_eq!(answer.is_dnssec(), flavor.is_signed());
            let [an, _, _] = decode(answer, ".");
            assert_eq!(
                types(&an),
                [
                    Type::SOA,
                    Type::RRSIG,
                    Type::NS,
                    Type::NS,
                    Type::RRSIG,
                    Type::NSEC,
                    Type::RRSIG,
                    Type::DNSKEY,
                    Type::RRSIG,
                ]
            );
        }
    }

    #[test]
    fn root_nodata_has_soa_in_authority() {
        for flavor in Flavor::ALL {
            let answer = APEX_SET.get(Shape::RootNodata, flavor);
            let [an, ns, _] = decode(answer, ".");
            assert!(an.is_empty());
            assert_eq!(ns[0].rr_type, Type::SOA);
            assert_eq!(ns.len(), if flavor.is_signed() { 2 } else { 1 });
        }
        assert!(!APEX_SET
            .get(Shape::RootNodata, Flavor::Signed)
            .is_compressed());
    }

    #[test]
    fn tld_ds_answers_with_ds_when_present() {
        let set = set_for("net.");
        let [an, ns, _] = decode(set.get(Shape::TldDs, Flavor::Signed), "net.");
        assert_eq!(types(&an), [Type::DS, Type::RRSIG]);
        assert!(ns.is_empty());
        let [an, _, _] = decode(set.get(Shape::TldDs, Flavor::Plain), "NET.");
        assert_eq!(types(&an), [Type::DS]);
    }

    #[test]
    fn tld_ds_without_ds_proves_absence() {
        let set = set_for("example.");
        let [an, ns, _] = decode(set.get(Shape::TldDs, Flavor::Signed), "example.");
        assert!(an.is_empty());
        assert_eq!(types(&ns), [Type::SOA, Type::RRSIG, Type::NSEC, Type::RRSIG]);
        assert_eq!(ns[2].owner, "example.".parse::<Name>().unwrap());
        let [_, ns, _] = decode(set.get(Shape::TldDs, Flavor::Plain), "example.");
        assert_eq!(types(&ns), [Type::SOA]);
    }

    #[test]
    fn referral_is_not_authoritative() {
        let set = set_for("net.");
        let plain = set.get(Shape::TldReferral, Flavor::Plain);
        assert!(!plain.is_authoritative());
        let [an, ns, ar] = decode(plain, "www.example.net.");
        assert!(an.is_empty());
        assert_eq!(types(&ns), [Type::NS]);
        assert_eq!(types(&ar), [Type::A, Type::AAAA, Type::OPT]);
        assert_eq!(ns[0].owner, "net.".parse::<Name>().unwrap());

        let [_, ns, _] = decode(set.get(Shape::TldReferral, Flavor::Signed), "net.");
        assert_eq!(types(&ns), [Type::NS, Type::DS, Type::RRSIG]);
    }

    #[test]
    fn in_bailiwick_glue_is_included() {
        let set = set_for("aaa.");
        let [_, _, ar] = decode(set.get(Shape::TldReferral, Flavor::Plain), "x.aaa.");
        assert_eq!(types(&ar), [Type::A, Type::OPT]);
        assert_eq!(ar[0].owner, "ns1.aaa.".parse::<Name>().unwrap());
    }

    #[test]
    fn nxdomain_is_uncompressed_and_signed_with_both_nsecs() {
        let set = set_for("net.");
        let plain = set.get(Shape::Nxdomain, Flavor::Plain);
        assert!(!plain.is_compressed());
        assert!(plain.relocation_sites().is_empty());
        let [_, ns, _] = decode(plain, "zzzz.");
        assert_eq!(types(&ns), [Type::SOA]);

        let [_, ns, _] = decode(set.get(Shape::Nxdomain, Flavor::Signed), "zzzz.");
        assert_eq!(
            types(&ns),
            [Type::SOA, Type::RRSIG, Type::NSEC, Type::RRSIG, Type::NSEC, Type::RRSIG]
        );
        assert_eq!(ns[2].owner, "net.".parse::<Name>().unwrap());
        assert_eq!(ns[4].owner, *Name::root());
    }

    #[test]
    fn apex_nxdomain_has_single_nsec() {
        let [_, ns, _] = decode(APEX_SET.get(Shape::Nxdomain, Flavor::Signed), "a.");
        assert_eq!(types(&ns), [Type::SOA, Type::RRSIG, Type::NSEC, Type::RRSIG]);
    }

    #[test]
    fn delegations_have_no_root_answers() {
        let set = set_for("com.");
        let empty = set.get(Shape::RootSoa, Flavor::Plain);
        assert!(std::ptr::eq(empty, Answer::empty()));
    }

    #[test]
    fn disabling_compression_applies_everywhere() {
        let set = AnswerSet::build(&ROOT_ZONE, Zone::APEX, false).unwrap();
        for flavor in Flavor::ALL {
            for shape in Shape::ALL {
                assert!(set.get(shape, flavor).relocation_sites().is_empty());
            }
        }
    }
    #[test]
    fn compression_shrinks_answers_with_repeated_names() {
        let apex_plain = AnswerSet::build(&ROOT_ZONE, Zone::APEX, false).unwrap();
        let net_id = ROOT_ZONE.node(&"net.".parse().unwrap()).unwrap();
        let net = set_for("net.");
        let net_plain = AnswerSet::build(&ROOT_ZONE, net_id, false).unwrap();
        let cases = [
            (&*APEX_SET, &apex_plain, Shape::RootNs, "."),
            (&*APEX_SET, &apex_plain, Shape::RootSoa, "."),
            (&net, &net_plain, Shape::TldReferral, "www.net."),
        ];
        for (compressed_set, plain_set, shape, qname) in cases {
            for flavor in Flavor::ALL {
                let compressed = compressed_set.get(shape, flavor);
                let plain = plain_set.get(shape, flavor);
                assert!(compressed.is_compressed());
                assert!(
                    compressed.octets().len() < plain.octets().len(),
                    "{:?}/{:?}: {} >= {}",
                    shape,
                    flavor,
                    compressed.octets().len(),
                    plain.octets().len()
                );
                assert_eq!(decode(compressed, qname), decode(plain, qname));
            }
        }
    }
}
