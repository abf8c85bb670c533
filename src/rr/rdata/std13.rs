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

//! Helpers for the RR types from the original DNS specification, STD 13
//! ([RFC 1034] and [RFC 1035]).
//!
//! [RFC 1034]: https://datatracker.ietf.org/doc/html/rfc1034
//! [RFC 1035]: https://datatracker.ietf.org/doc/html/rfc1035

use super::{Rdata, ReadRdataError};
use crate::name::Name;

/// Checks that `rdata` is exactly `len` octets long (A and AAAA).
pub(super) fn validate_fixed_len(rdata: &Rdata, len: usize) -> Result<(), ReadRdataError> {
    if rdata.len() == len {
        Ok(())
    } else {
        Err(ReadRdataError::Other)
    }
}

/// Checks whether `rdata` is a valid serialized SOA record.
pub(super) fn validate_soa(rdata: &Rdata) -> Result<(), ReadRdataError> {
    let octets = rdata.octets();
    let mname_len = Name::validate_uncompressed(octets)?;
    let rname_len = Name::validate_uncompressed(&octets[mname_len..])?;
    if octets.len() == 20 + mname_len + rname_len {
        Ok(())
    } else {
        Err(ReadRdataError::Other)
    }
}

/// Serializes an SOA record into the provided buffer.
///
/// [RFC 1035 § 3.3.13] does not say whether REFRESH, RETRY, and EXPIRE
/// are signed; like other nameservers we treat them as unsigned.
///
/// [RFC 1035 § 3.3.13]: https://datatracker.ietf.org/doc/html/rfc1035#section-3.3.13
pub fn serialize_soa(mname: &Name, rname: &Name, fields: [u32; 5], buf: &mut Vec<u8>) {
    buf.reserve(20 + mname.wire_repr().len() + rname.wire_repr().len());
    buf.extend_from_slice(mname.wire_repr());
    buf.extend_from_slice(rname.wire_repr());
    for field in fields {
        buf.extend_from_slice(&field.to_be_bytes());
    }
}

impl Rdata {
    /// Returns the SERIAL field, assuming this is valid SOA RDATA.
    pub fn soa_serial(&self) -> Option<u32> {
        let octets = self.octets();
        let start = octets.len().checked_sub(20)?;
        Some(u32::from_be_bytes(octets[start..start + 4].try_into().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rr::Type;

    #[test]
    fn soa_round_trips() {
        let mname: Name = "a.root-servers.net.".parse().unwrap();
        let rname: Name = "nstld.verisign-grs.com.".parse().unwrap();
        let mut buf = Vec::new();
        serialize_soa(&mname, &rname, [2024010100, 1800, 900, 604800, 86400], &mut buf);
        let soa = Rdata::try_from(buf).unwrap();
        assert_eq!(soa.validate(Type::SOA), Ok(()));
        assert_eq!(soa.soa_serial(), Some(2024010100));
    }

    #[test]
    fn short_soa_is_invalid() {
        let soa = Rdata::try_from(&b"\x00\x00\x00\x00"[..]).unwrap();
        assert_eq!(soa.validate(Type::SOA), Err(ReadRdataError::Other));
    }
}
