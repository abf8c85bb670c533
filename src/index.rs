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

//! The zone index, which maps question names to precomputed answers.
//!
//! A [`ZoneIndex`] is built from a finished [`Zone`] and never changes
//! afterwards. Reloading a zone means building a new index and
//! publishing it through a [`SharedIndex`], which swaps it in
//! atomically: a query sees either the old index or the new one, never
//! a mix.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use log::warn;

use crate::answer::{self, AnswerSet};
use crate::name::Name;
use crate::zone::{NodeKind, Zone};

////////////////////////////////////////////////////////////////////////
// ZONE INDEX                                                         //
////////////////////////////////////////////////////////////////////////

/// Precomputed answers for every name of a zone that a question can
/// be about.
///
/// Answers are keyed by the lowercased label just below the apex (for
/// the root zone, the TLD); the apex itself has the empty key. Lookups
/// that miss fall back to the closest preceding key in byte order,
/// whose NSEC record covers the missing name.
#[derive(Debug)]
pub struct ZoneIndex {
    apex: Name,
    serial: Option<u32>,
    apex_set: Arc<AnswerSet>,
    exact: HashMap<Box<[u8]>, Arc<AnswerSet>>,
    ordered: BTreeMap<Box<[u8]>, Arc<AnswerSet>>,
}

impl ZoneIndex {
    /// Builds the index for a finished zone. Nodes more than one label
    /// below the apex cannot be the subject of an answer unless they
    /// are glue, so they are left out with a warning.
    pub fn build(zone: &Zone, compress: bool) -> Result<Self, answer::Error> {
        let apex_len = zone.apex().len();
        let apex_set = Arc::new(AnswerSet::build(zone, Zone::APEX, compress)?);
        let mut exact = HashMap::new();
        let mut ordered = BTreeMap::new();
        exact.insert(Box::default(), apex_set.clone());
        ordered.insert(Box::<[u8]>::default(), apex_set.clone());

        for id in zone.nodes() {
            let name = zone.name(id);
            match zone.kind(id) {
                NodeKind::Apex | NodeKind::Glue => continue,
                _ if name.len() > apex_len + 1 => {
                    warn!("{} is too deep below the apex to be answered; skipping", name);
                    continue;
                }
                NodeKind::Authoritative => {
                    warn!("{} has no NS records; referrals for it will be empty", name)
                }
                NodeKind::Delegation => (),
            }
            let set = Arc::new(AnswerSet::build(zone, id, compress)?);
            let key: Box<[u8]> = name.first_label().to_ascii_lowercase().into();
            exact.insert(key.clone(), set.clone());
            ordered.insert(key, set);
        }

        Ok(Self {
            apex: zone.apex().to_ascii_lowercase(),
            serial: zone.soa_serial(),
            apex_set,
            exact,
            ordered,
        })
    }

    /// Returns the apex of the indexed zone, lowercased.
    pub fn apex(&self) -> &Name {
        &self.apex
    }

    /// Returns the SOA serial of the indexed zone.
    pub fn serial(&self) -> Option<u32> {
        self.serial
    }

    /// Returns the number of keys in the index, the apex included.
    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// Looks up the answers for `key`, which must already be
    /// lowercased. The second value tells whether the key was found;
    /// if not, the answers are those of the greatest smaller key.
    pub fn lookup(&self, key: &[u8]) -> (&AnswerSet, bool) {
        if let Some(set) = self.exact.get(key) {
            return (set, true);
        }
        let predecessor = self
            .ordered
            .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(key)))
            .next_back()
            .map_or(&self.apex_set, |(_, set)| set);
        (predecessor, false)
    }
}

////////////////////////////////////////////////////////////////////////
// PUBLICATION                                                        //
////////////////////////////////////////////////////////////////////////

/// The currently published [`ZoneIndex`], if any, shared between the
/// zone loader and the query workers.
#[derive(Debug, Default)]
pub struct SharedIndex {
    current: ArcSwapOption<ZoneIndex>,
}

impl SharedIndex {
    /// Creates a `SharedIndex` with nothing published.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the published index. Queries already holding the old
    /// index finish with it.
    pub fn publish(&self, index: ZoneIndex) {
        self.current.store(Some(Arc::new(index)));
    }

    /// Returns the published index, if any.
    pub fn snapshot(&self) -> Option<Arc<ZoneIndex>> {
        self.current.load_full()
    }
}

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////
