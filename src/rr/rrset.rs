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

//! Implementation of RRset-related data structures and types.

use std::fmt;

use super::{Rdata, Ttl, Type};
use crate::class::Class;

////////////////////////////////////////////////////////////////////////
// RRSETS                                                             //
////////////////////////////////////////////////////////////////////////

/// A resource record set together with the RRSIG records covering it.
///
/// [RFC 2181 § 5] defines an RRset as a group of records with the same
/// owner, class, and type, all with the same TTL. The owner is not
/// stored here but kept by whatever holds the `Rrset`.
///
/// DNSSEC signatures are kept with the RRset they cover rather than in
/// an RRset of type RRSIG, since every answer that includes an RRset in
/// signed form needs exactly its signatures right after it.
///
/// [RFC 2181 § 5]: https://datatracker.ietf.org/doc/html/rfc2181#section-5
#[derive(Clone, Debug)]
pub struct Rrset {
    pub rr_type: Type,
    pub class: Class,
    pub ttl: Ttl,
    rdatas: Vec<Rdata>,
    signatures: Vec<Signature>,
}

/// An RRSIG record covering an [`Rrset`]. RRSIGs keep their own TTL.
#[derive(Clone, Debug)]
pub struct Signature {
    pub ttl: Ttl,
    pub rdata: Rdata,
}

impl Rrset {
    /// Creates a new [`Rrset`] with the given RR type, class, and TTL.
    /// It will initially contain no record data.
    pub fn new(rr_type: Type, class: Class, ttl: Ttl) -> Self {
        Self {
            rr_type,
            class,
            ttl,
            rdatas: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Adds an [`Rdata`] to this [`Rrset`]. Following the behavior of
    /// other nameservers, [`Rdata`] that is already present is silently
    /// discarded.
    pub fn push_rdata(&mut self, rdata: Rdata) {
        if !self
            .rdatas
            .iter()
            .any(|existing| existing.equals(&rdata, self.rr_type))
        {
            self.rdatas.push(rdata);
        }
    }

    /// Adds an RRSIG covering this [`Rrset`]; duplicates are discarded.
    pub fn push_signature(&mut self, ttl: Ttl, rdata: Rdata) {
        if !self.signatures.iter().any(|existing| existing.rdata == rdata) {
            self.signatures.push(Signature { ttl, rdata });
        }
    }

    /// Returns the [`Rdata`] of the records in this `Rrset`.
    pub fn rdatas(&self) -> &[Rdata] {
        &self.rdatas
    }

    /// Returns the RRSIGs covering this `Rrset`.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Returns whether this `Rrset` holds no records. (An `Rrset` may
    /// hold only signatures while a zone is being read, if RRSIGs come
    /// before the records they cover.)
    pub fn is_empty(&self) -> bool {
        self.rdatas.is_empty()
    }
}

////////////////////////////////////////////////////////////////////////
// RRSET LISTS                                                        //
////////////////////////////////////////////////////////////////////////

/// All of the [`Rrset`]s at one node of a zone. Records are added with
/// [`RrsetList::add`] and [`RrsetList::add_signature`]; the [`Rrset`]s
/// themselves are managed internally, sorted by type.
#[derive(Clone, Debug, Default)]
pub struct RrsetList {
    rrsets: Vec<Rrset>,
}

impl RrsetList {
    /// Returns a new, empty [`RrsetList`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a resource record to the [`RrsetList`].
    ///
    /// This fails if the [`Class`] of the new record does not match the
    /// rest of the list. A TTL differing from the rest of the record's
    /// [`Rrset`] is not an error: [RFC 2181 § 5.2] deprecates such
    /// RRsets, and the TTL of the first record wins. The caller learns
    /// of the mismatch through the return value so it can warn.
    ///
    /// [RFC 2181 § 5.2]: https://datatracker.ietf.org/doc/html/rfc2181#section-5.2
    pub fn add(
        &mut self,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
        rdata: Rdata,
    ) -> Result<bool, RrsetListAddError> {
        let rrset = self.entry(rr_type, class, ttl)?;
        let ttl_matches = rrset.is_empty() || rrset.ttl == ttl;
        if rrset.is_empty() {
            rrset.ttl = ttl;
        }
        rrset.push_rdata(rdata);
        Ok(ttl_matches)
    }

    /// Adds an RRSIG record to the [`Rrset`] of the type it covers,
    /// creating that [`Rrset`] (empty) if necessary.
    pub fn add_signature(
        &mut self,
        class: Class,
        ttl: Ttl,
        rdata: Rdata,
    ) -> Result<(), RrsetListAddError> {
        let covered = rdata
            .rrsig_type_covered()
            .ok_or(RrsetListAddError::InvalidSignature)?;
        self.entry(covered, class, ttl)?.push_signature(ttl, rdata);
        Ok(())
    }

    /// Returns the [`Rrset`] of type `rr_type`, creating it if needed.
    fn entry(
        &mut self,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
    ) -> Result<&mut Rrset, RrsetListAddError> {
        if self.rrsets.first().map_or(false, |first| first.class != class) {
            return Err(RrsetListAddError::ClassMismatch);
        }
        let index = match self.rrsets.binary_search_by_key(&rr_type, |r| r.rr_type) {
            Ok(index) => index,
            Err(index) => {
                self.rrsets.insert(index, Rrset::new(rr_type, class, ttl));
                index
            }
        };
        Ok(&mut self.rrsets[index])
    }

    /// Looks up the [`Rrset`] of type `rr_type` in the [`RrsetList`].
    /// [`Rrset`]s holding only signatures are not returned.
    pub fn lookup(&self, rr_type: Type) -> Option<&Rrset> {
        self.rrsets
            .binary_search_by_key(&rr_type, |r| r.rr_type)
            .ok()
            .map(|index| &self.rrsets[index])
            .filter(|rrset| !rrset.is_empty())
    }

    /// Returns an iterator over the non-empty [`Rrset`]s of the list.
    pub fn iter(&self) -> impl Iterator<Item = &Rrset> {
        self.rrsets.iter().filter(|rrset| !rrset.is_empty())
    }

    /// Returns the types whose signatures have no records to cover.
    pub fn orphaned_signatures(&self) -> impl Iterator<Item = Type> + '_ {
        self.rrsets
            .iter()
            .filter(|rrset| rrset.is_empty())
            .map(|rrset| rrset.rr_type)
    }

    /// Returns whether the `RrsetList` has no records.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// An error signaling that a record cannot be added to an [`RrsetList`].
#[derive(Debug, Eq, PartialEq)]
pub enum RrsetListAddError {
    /// The record's [`Class`] differs from the rest of the list.
    ClassMismatch,

    /// An RRSIG record is too short to name the type it covers.
    InvalidSignature,
}

impl fmt::Display for RrsetListAddError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::ClassMismatch => f.write_str("CLASS mismatch"),
            Self::InvalidSignature => f.write_str("RRSIG does not name a covered type"),
        }
    }
}

impl std::error::Error for RrsetListAddError {}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::rdata::RRSIG_SIGNER_OFFSET;

    fn rdata(octets: &[u8]) -> Rdata {
        octets.try_into().unwrap()
    }

    fn rrsig_covering(rr_type: Type) -> Rdata {
        let mut octets = u16::from(rr_type).to_be_bytes().to_vec();
        octets.resize(RRSIG_SIGNER_OFFSET, 0);
        octets.extend_from_slice(b"\x00sig");
        octets.try_into().unwrap()
    }

    #[test]
    fn rrset_list_groups_by_type_and_discards_duplicates() {
        let mut list = RrsetList::new();
        let ttl = Ttl::from(3600);
        list.add(Type::A, Class::IN, ttl, rdata(&[127, 0, 0, 1])).unwrap();
        list.add(Type::A, Class::IN, ttl, rdata(&[127, 0, 0, 1])).unwrap();
        list.add(Type::A, Class::IN, ttl, rdata(&[127, 0, 0, 2])).unwrap();
        list.add(Type::NS, Class::IN, ttl, rdata(b"\x00")).unwrap();
        assert_eq!(list.lookup(Type::A).unwrap().rdatas().len(), 2);
        assert_eq!(list.lookup(Type::NS).unwrap().rdatas().len(), 1);
        assert!(list.lookup(Type::AAAA).is_none());
    }

    #[test]
    fn rrset_list_rejects_class_mismatch() {
        let mut list = RrsetList::new();
        list.add(Type::A, Class::IN, Ttl::from(1), rdata(&[0; 4])).unwrap();
        assert_eq!(
            list.add(Type::A, Class::CH, Ttl::from(1), rdata(&[0; 4])),
            Err(RrsetListAddError::ClassMismatch)
        );
    }

    #[test]
    fn first_ttl_wins() {
        let mut list = RrsetList::new();
        assert_eq!(list.add(Type::A, Class::IN, Ttl::from(10), rdata(&[0; 4])), Ok(true));
        assert_eq!(list.add(Type::A, Class::IN, Ttl::from(20), rdata(&[1; 4])), Ok(false));
        assert_eq!(list.lookup(Type::A).unwrap().ttl, Ttl::from(10));
    }

    #[test]
    fn signatures_attach_to_covered_rrset_in_any_order() {
        let mut list = RrsetList::new();
        let ttl = Ttl::from(86400);
        list.add_signature(Class::IN, ttl, rrsig_covering(Type::NS)).unwrap();
        assert!(list.lookup(Type::NS).is_none());
        assert_eq!(list.orphaned_signatures().collect::<Vec<_>>(), [Type::NS]);
        list.add(Type::NS, Class::IN, Ttl::from(518400), rdata(b"\x00")).unwrap();
        let ns = list.lookup(Type::NS).unwrap();
        assert_eq!(ns.ttl, Ttl::from(518400));
        assert_eq!(ns.signatures().len(), 1);
        assert_eq!(ns.signatures()[0].ttl, ttl);
        assert_eq!(list.orphaned_signatures().count(), 0);
    }
}
