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

//! Serialization of records into answer buffers, with name
//! compression.

use std::collections::HashMap;

use super::{Error, Result};
use crate::class::Class;
use crate::message::constants::{HEADER_SIZE, MAX_MESSAGE_SIZE, POINTER_MAX};
use crate::name::{Name, MAX_WIRE_LEN};
use crate::rr::rdata::Component;
use crate::rr::{Rdata, Rrset, Ttl, Type};

/// Writes records into a growing buffer that will later be placed
/// right after a question for `owner`.
///
/// Compression pointers are computed as if the question name were
/// exactly the owner, so the question section is `fix_offset` octets
/// long. The position of every pointer written is recorded so that the
/// buffer can be relocated behind a longer question.
pub(super) struct Encoder {
    buf: Vec<u8>,
    table: Option<HashMap<Name, u16>>,
    fix_offset: u16,
    sites: Vec<u16>,
}

impl Encoder {
    /// Creates an `Encoder` for answers owned by `owner`. When
    /// `compress` is false, names are always written in full.
    pub fn new(owner: &Name, compress: bool) -> Self {
        let fix_offset = owner.wire_repr().len() as u16 + 4;
        let table = compress.then(|| {
            let mut table = HashMap::new();
            if !owner.is_root() {
                table.insert(owner.to_ascii_lowercase(), HEADER_SIZE as u16);
            }
            table
        });
        Self {
            buf: Vec::new(),
            table,
            fix_offset,
            sites: Vec::new(),
        }
    }

    /// Writes a domain name, compressing it if possible.
    pub fn encode_name(&mut self, name: &Name) {
        let table = match self.table.as_mut() {
            Some(table) => table,
            None => {
                self.buf.extend_from_slice(name.wire_repr());
                return;
            }
        };

        for (skip, label) in name.labels().enumerate() {
            if label.is_empty() {
                self.buf.push(0);
                return;
            }
            // The loop only reaches non-null labels, so the suffix
            // exists.
            let suffix = match name.superdomain(skip) {
                Some(suffix) => suffix.to_ascii_lowercase(),
                None => break,
            };
            let position = self.buf.len();
            if let Some(&offset) = table.get(&suffix) {
                self.sites.push(position as u16);
                self.buf.extend_from_slice(&(0xc000 | offset).to_be_bytes());
                return;
            }
            let real = position + HEADER_SIZE + self.fix_offset as usize;
            if real < POINTER_MAX + 1 - MAX_WIRE_LEN {
                table.insert(suffix, real as u16);
            }
            self.buf.push(label.len() as u8);
            self.buf.extend_from_slice(label);
        }
    }

    /// Writes one resource record. Names in the RDATA are compressed
    /// only where RFC 3597 § 4 allows it.
    pub fn encode_rr(
        &mut self,
        owner: &Name,
        rr_type: Type,
        class: Class,
        ttl: Ttl,
        rdata: &Rdata,
    ) -> Result<()> {
        self.encode_name(owner);
        self.buf.extend_from_slice(&u16::from(rr_type).to_be_bytes());
        self.buf.extend_from_slice(&u16::from(class).to_be_bytes());
        self.buf.extend_from_slice(&u32::from(ttl).to_be_bytes());
        let rdlength_start = self.buf.len();
        self.buf.extend_from_slice(&[0, 0]);

        for component in rdata.components(rr_type) {
            let component = component.map_err(|_| Error::InvalidRdata {
                owner: owner.clone(),
                rr_type,
            })?;
            match component {
                Component::CompressibleName(wire) => {
                    let name = Name::try_from_uncompressed_all(wire).map_err(|_| {
                        Error::InvalidRdata {
                            owner: owner.clone(),
                            rr_type,
                        }
                    })?;
                    self.encode_name(&name);
                }
                Component::UncompressibleName(octets) | Component::Other(octets) => {
                    self.buf.extend_from_slice(octets)
                }
            }
        }

        let rdlength = self.buf.len() - rdlength_start - 2;
        if self.buf.len() > MAX_MESSAGE_SIZE {
            return Err(Error::TooLong {
                owner: owner.clone(),
            });
        }
        self.buf[rdlength_start..rdlength_start + 2]
            .copy_from_slice(&(rdlength as u16).to_be_bytes());
        Ok(())
    }

    /// Writes the records of `rrset`, followed by its RRSIGs when
    /// `signatures` is set. Returns the number of records written.
    pub fn encode_rrset(&mut self, owner: &Name, rrset: &Rrset, signatures: bool) -> Result<u16> {
        let mut count = 0;
        for rdata in rrset.rdatas() {
            self.encode_rr(owner, rrset.rr_type, rrset.class, rrset.ttl, rdata)?;
            count += 1;
        }
        if signatures {
            for signature in rrset.signatures() {
                self.encode_rr(
                    owner,
                    Type::RRSIG,
                    rrset.class,
                    signature.ttl,
                    &signature.rdata,
                )?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Writes a list of RRsets as one section, returning the number of
    /// records written.
    pub fn encode_section(
        &mut self,
        section: &[(&Name, &Rrset)],
        signatures: bool,
    ) -> Result<u16> {
        let mut count: u16 = 0;
        for (owner, rrset) in section {
            count = count.saturating_add(self.encode_rrset(owner, rrset, signatures)?);
        }
        Ok(count)
    }

    /// Drops the compression table and returns the encoded octets, the
    /// relocation sites, and the nominal question length.
    pub fn finish(self) -> (Vec<u8>, Vec<u16>, u16) {
        (self.buf, self.sites, self.fix_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Name {
        text.parse().unwrap()
    }

    #[test]
    fn owner_is_seeded_at_question_offset() {
        let owner = name("example.");
        let mut encoder = Encoder::new(&owner, true);
        encoder.encode_name(&name("ns.EXAMPLE."));
        let (octets, sites, fix_offset) = encoder.finish();
        assert_eq!(fix_offset, 13);
        assert_eq!(octets, b"\x02ns\xc0\x0c");
        assert_eq!(sites, [3]);
    }

    #[test]
    fn root_owner_has_minimal_question() {
        let mut encoder = Encoder::new(Name::root(), true);
        encoder.encode_name(Name::root());
        encoder.encode_name(&name("a.root-servers.net."));
        encoder.encode_name(&name("b.root-servers.net."));
        let (octets, sites, fix_offset) = encoder.finish();
        assert_eq!(fix_offset, 5);
        // The first name lands at 12 + 5 + 1 = 18, and its suffix one
        // label later at 20.
        assert_eq!(
            octets,
            b"\x00\x01a\x0croot-servers\x03net\x00\x01b\xc0\x14"
        );
        assert_eq!(sites, [octets.len() as u16 - 2]);
    }

    #[test]
    fn uncompressed_encoder_writes_names_in_full() {
        let owner = name("example.");
        let mut encoder = Encoder::new(&owner, false);
        encoder.encode_name(&owner);
        encoder.encode_name(&owner);
        let (octets, sites, _) = encoder.finish();
        assert_eq!(octets, b"\x07example\x00\x07example\x00");
        assert!(sites.is_empty());
    }

    #[test]
    fn rdata_names_are_compressed_only_for_well_known_types() {
        let owner = name("example.");
        let mut encoder = Encoder::new(&owner, true);
        let ns: Rdata = (&b"\x02ns\x07example\x00"[..]).try_into().unwrap();
        let nsec: Rdata = (&b"\x07example\x00\x00\x01\x40"[..]).try_into().unwrap();
        encoder
            .encode_rr(&owner, Type::NS, Class::IN, Ttl::from(60), &ns)
            .unwrap();
        encoder
            .encode_rr(&owner, Type::NSEC, Class::IN, Ttl::from(60), &nsec)
            .unwrap();
        let (octets, sites, _) = encoder.finish();
        assert_eq!(
            octets,
            b"\xc0\x0c\x00\x02\x00\x01\x00\x00\x00\x3c\x00\x05\x02ns\xc0\x0c\
              \xc0\x0c\x00\x2f\x00\x01\x00\x00\x00\x3c\x00\x0c\x07example\x00\x00\x01\x40"
        );
        assert_eq!(sites, [0, 15, 17]);
    }

    #[test]
    fn signatures_are_written_only_when_requested() {
        let owner = name("example.");
        let mut rrset = Rrset::new(Type::A, Class::IN, Ttl::from(1));
        rrset.push_rdata((&[192, 0, 2, 1][..]).try_into().unwrap());
        let mut rrsig = u16::from(Type::A).to_be_bytes().to_vec();
        rrsig.extend_from_slice(&[0; 16]);
        rrsig.extend_from_slice(b"\x00sig");
        rrset.push_signature(Ttl::from(1), rrsig.try_into().unwrap());

        let mut encoder = Encoder::new(&owner, true);
        assert_eq!(encoder.encode_rrset(&owner, &rrset, false).unwrap(), 1);
        assert_eq!(encoder.encode_rrset(&owner, &rrset, true).unwrap(), 2);
    }
}
