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

//! Parsing of RDATA presentation formats.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use base64::Engine;

use super::error::{Error, ErrorKind, Position, Result};
use super::lexer::{unescape, Field};
use crate::name::{self, Name, NameBuilder};
use crate::rr::rdata::{Rdata, TypeBitmapBuilder};
use crate::rr::Type;
use crate::util::ascii_hex_digit_to_nibble;

/// Parses the RDATA `fields` of a record of type `rr_type`. `end` is
/// where missing fields are reported.
pub(super) fn parse_rdata(
    rr_type: Type,
    fields: &[Field],
    end: Position,
    origin: Option<&Name>,
) -> Result<Rdata> {
    let mut fields = Fields { fields, end };
    if fields.peek_generic() {
        return parse_generic(fields);
    }

    let mut octets = Vec::new();
    match rr_type {
        Type::A => {
            let address: Ipv4Addr = fields.parse("IPv4 address")?;
            octets.extend_from_slice(&address.octets());
        }
        Type::AAAA => {
            let address: Ipv6Addr = fields.parse("IPv6 address")?;
            octets.extend_from_slice(&address.octets());
        }
        Type::NS | Type::CNAME | Type::PTR | Type::MD | Type::MF | Type::MB | Type::MG
        | Type::MR => {
            fields.name(origin, &mut octets)?;
        }
        Type::SOA => {
            fields.name(origin, &mut octets)?;
            fields.name(origin, &mut octets)?;
            let serial: u32 = fields.parse("serial")?;
            octets.extend_from_slice(&serial.to_be_bytes());
            for what in ["refresh", "retry", "expire", "minimum"] {
                let field = fields.next(what)?;
                let value = field
                    .as_str()
                    .and_then(|text| crate::rr::Ttl::from_str(text).ok())
                    .ok_or_else(|| field.error(ErrorKind::InvalidField(what)))?;
                octets.extend_from_slice(&u32::from(value).to_be_bytes());
            }
        }
        Type::MX => {
            let preference: u16 = fields.parse("preference")?;
            octets.extend_from_slice(&preference.to_be_bytes());
            fields.name(origin, &mut octets)?;
        }
        Type::TXT => {
            fields.character_string(&mut octets)?;
            while !fields.fields.is_empty() {
                fields.character_string(&mut octets)?;
            }
        }
        Type::HINFO => {
            fields.character_string(&mut octets)?;
            fields.character_string(&mut octets)?;
        }
        Type::SRV => {
            for what in ["priority", "weight", "port"] {
                let value: u16 = fields.parse(what)?;
                octets.extend_from_slice(&value.to_be_bytes());
            }
            fields.name(origin, &mut octets)?;
        }
        Type::DS => {
            let key_tag: u16 = fields.parse("key tag")?;
            octets.extend_from_slice(&key_tag.to_be_bytes());
            octets.push(fields.parse("algorithm")?);
            octets.push(fields.parse("digest type")?);
            fields.hex_rest(&mut octets)?;
        }
        Type::DNSKEY => {
            let flags: u16 = fields.parse("flags")?;
            octets.extend_from_slice(&flags.to_be_bytes());
            octets.push(fields.parse("protocol")?);
            octets.push(fields.parse("algorithm")?);
            fields.base64_rest(&mut octets)?;
        }
        Type::RRSIG => {
            let field = fields.next("type covered")?;
            let covered: Type = field
                .as_str()
                .ok_or(ErrorKind::InvalidType("not ASCII"))
                .and_then(|text| text.parse().map_err(ErrorKind::InvalidType))
                .map_err(|kind| field.error(kind))?;
            octets.extend_from_slice(&u16::from(covered).to_be_bytes());
            octets.push(fields.parse("algorithm")?);
            octets.push(fields.parse("labels")?);
            let original_ttl: u32 = fields.parse("original TTL")?;
            octets.extend_from_slice(&original_ttl.to_be_bytes());
            for what in ["signature expiration", "signature inception"] {
                let field = fields.next(what)?;
                let time = field
                    .as_str()
                    .and_then(parse_signature_time)
                    .ok_or_else(|| field.error(ErrorKind::InvalidTime))?;
                octets.extend_from_slice(&time.to_be_bytes());
            }
            let key_tag: u16 = fields.parse("key tag")?;
            octets.extend_from_slice(&key_tag.to_be_bytes());
            fields.name(origin, &mut octets)?;
            fields.base64_rest(&mut octets)?;
        }
        Type::NSEC => {
            fields.name(origin, &mut octets)?;
            let mut bitmap = TypeBitmapBuilder::new();
            for field in fields.rest() {
                let rr_type: Type = field
                    .as_str()
                    .ok_or(ErrorKind::InvalidType("not ASCII"))
                    .and_then(|text| text.parse().map_err(ErrorKind::InvalidType))
                    .map_err(|kind| field.error(kind))?;
                bitmap.add(rr_type);
            }
            bitmap.write_to(&mut octets);
        }
        Type::ZONEMD => {
            let serial: u32 = fields.parse("serial")?;
            octets.extend_from_slice(&serial.to_be_bytes());
            octets.push(fields.parse("scheme")?);
            octets.push(fields.parse("hash algorithm")?);
            fields.hex_rest(&mut octets)?;
        }
        Type::OPT => return Err(Error::new(end, ErrorKind::OptNotAllowed)),
        _ => return Err(Error::new(end, ErrorKind::UnsupportedType(rr_type))),
    }

    fields.finish()?;
    Rdata::try_from(octets).or(Err(Error::new(
        end,
        ErrorKind::InvalidRdata(crate::rr::rdata::ReadRdataError::TooLong),
    )))
}

/// Parses the [RFC 3597 § 5] generic RDATA format, `\# <length> <hex>`.
///
/// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
fn parse_generic(mut fields: Fields) -> Result<Rdata> {
    fields.next("\\#")?;
    let length_field = fields.next("RDATA length")?;
    let length: u16 = fields_parse(length_field, "RDATA length")?;
    let mut octets = Vec::with_capacity(length as usize);
    if length > 0 {
        fields.hex_rest(&mut octets)?;
    }
    if octets.len() != length as usize {
        return Err(length_field.error(ErrorKind::RdataLengthMismatch));
    }
    fields.finish()?;
    Rdata::try_from(octets).or(Err(length_field.error(ErrorKind::RdataLengthMismatch)))
}

////////////////////////////////////////////////////////////////////////
// FIELD ACCESS                                                       //
////////////////////////////////////////////////////////////////////////

struct Fields<'a> {
    fields: &'a [Field],
    end: Position,
}

impl<'a> Fields<'a> {
    fn peek_generic(&self) -> bool {
        matches!(self.fields.first(), Some(field) if !field.quoted && field.text == b"\\#")
    }

    fn next(&mut self, what: &'static str) -> Result<&'a Field> {
        let (first, rest) = self
            .fields
            .split_first()
            .ok_or_else(|| Error::new(self.end, ErrorKind::ExpectedField(what)))?;
        self.fields = rest;
        Ok(first)
    }

    fn rest(&mut self) -> &'a [Field] {
        std::mem::take(&mut self.fields)
    }

    fn parse<T: FromStr>(&mut self, what: &'static str) -> Result<T> {
        let field = self.next(what)?;
        fields_parse(field, what)
    }

    fn name(&mut self, origin: Option<&Name>, buf: &mut Vec<u8>) -> Result<()> {
        let field = self.next("domain name")?;
        buf.extend_from_slice(parse_name(field, origin)?.wire_repr());
        Ok(())
    }

    fn character_string(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let field = self.next("character string")?;
        let octets = unescape(&field.text).map_err(|kind| field.error(kind))?;
        let len = u8::try_from(octets.len())
            .map_err(|_| field.error(ErrorKind::CharacterStringTooLong))?;
        buf.push(len);
        buf.extend_from_slice(&octets);
        Ok(())
    }

    fn hex_rest(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let fields = self.rest();
        if fields.is_empty() {
            return Err(Error::new(self.end, ErrorKind::ExpectedField("hex data")));
        }
        let mut high: Option<(u8, &Field)> = None;
        for field in fields {
            for &digit in &field.text {
                let nibble =
                    ascii_hex_digit_to_nibble(digit).ok_or_else(|| field.error(ErrorKind::InvalidHex))?;
                match high.take() {
                    Some((high, _)) => buf.push(high << 4 | nibble),
                    None => high = Some((nibble, field)),
                }
            }
        }
        match high {
            Some((_, field)) => Err(field.error(ErrorKind::InvalidHex)),
            None => Ok(()),
        }
    }

    fn base64_rest(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let fields = self.rest();
        let first = fields
            .first()
            .ok_or_else(|| Error::new(self.end, ErrorKind::ExpectedField("base64 data")))?;
        let text: Vec<u8> = fields.iter().flat_map(|f| f.text.iter().copied()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(text)
            .or(Err(first.error(ErrorKind::InvalidBase64)))?;
        buf.extend_from_slice(&decoded);
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self.fields.first() {
            Some(field) => Err(field.error(ErrorKind::TrailingFields)),
            None => Ok(()),
        }
    }
}

fn fields_parse<T: FromStr>(field: &Field, what: &'static str) -> Result<T> {
    field
        .as_str()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| field.error(ErrorKind::InvalidField(what)))
}

impl Field {
    pub(super) fn error(&self, kind: ErrorKind) -> Error {
        Error::new(self.position, kind)
    }
}

////////////////////////////////////////////////////////////////////////
// DOMAIN NAMES AND TIMES                                             //
////////////////////////////////////////////////////////////////////////

/// Parses a domain name field. Names not ending in an unescaped `.` are
/// relative to `origin`, and `@` stands for `origin` itself.
pub(super) fn parse_name(field: &Field, origin: Option<&Name>) -> Result<Name> {
    if !field.quoted && field.text == b"@" {
        return origin
            .cloned()
            .ok_or_else(|| field.error(ErrorKind::AtWhenOriginNotSet));
    } else if field.text == b"." {
        return Ok(Name::root().clone());
    }

    let invalid = |err: name::Error| field.error(ErrorKind::InvalidName(err));
    let mut builder = NameBuilder::new();
    name::push_text(&mut builder, &field.text).map_err(invalid)?;
    if builder.is_fully_qualified() {
        builder.finish().map_err(invalid)
    } else {
        let origin = origin.ok_or_else(|| field.error(ErrorKind::PqdnWhenOriginNotSet))?;
        builder.finish_with_suffix(origin).map_err(invalid)
    }
}

/// Parses an RRSIG signature time, which is either a plain number of
/// seconds or a `YYYYMMDDHHmmSS` UTC timestamp ([RFC 4034 § 3.2]). The
/// field is 32 bits wide, so timestamps are taken modulo 2³².
///
/// [RFC 4034 § 3.2]: https://datatracker.ietf.org/doc/html/rfc4034#section-3.2
fn parse_signature_time(text: &str) -> Option<u32> {
    if text.len() != 14 {
        return text.parse().ok();
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let part = |range: std::ops::Range<usize>| text[range].parse::<u32>().ok();
    let year = part(0..4)?;
    let month = part(4..6)?;
    let day = part(6..8)?;
    let hour = part(8..10)?;
    let minute = part(10..12)?;
    let second = part(12..14)?;
    if year < 1970
        || !(1..=12).contains(&month)
        || !(1..=31).contains(&day)
        || hour > 23
        || minute > 59
        || second > 60
    {
        return None;
    }
    let days = days_from_civil(year as i64, month, day);
    let seconds = days * 86400 + (hour * 3600 + minute * 60 + second) as i64;
    Some(seconds as u64 as u32)
}

/// Returns the number of days between 1970-01-01 and the given date in
/// the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let month_from_march = (month as i64 + 9) % 12;
    let day_of_year = (153 * month_from_march + 2) / 5 + day as i64 - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone_file::lexer::Lexer;

    fn rdata(rr_type: Type, text: &str) -> Result<Rdata> {
        let entry = Lexer::new(text.as_bytes()).next_entry()?.unwrap();
        let origin: Name = "example.".parse().unwrap();
        parse_rdata(
            rr_type,
            &entry.fields,
            Position { line: 1, column: 1 },
            Some(&origin),
        )
    }

    #[test]
    fn address_types_work() {
        assert_eq!(rdata(Type::A, "192.0.2.1").unwrap().octets(), b"\xc0\x00\x02\x01");
        assert_eq!(rdata(Type::AAAA, "::1").unwrap().len(), 16);
        assert!(rdata(Type::A, "300.0.0.1").is_err());
    }

    #[test]
    fn names_are_completed_with_origin() {
        assert_eq!(rdata(Type::NS, "ns1").unwrap().octets(), b"\x03ns1\x07example\x00");
        assert_eq!(rdata(Type::NS, "@").unwrap().octets(), b"\x07example\x00");
        assert_eq!(rdata(Type::NS, "a.test.").unwrap().octets(), b"\x01a\x04test\x00");
    }

    #[test]
    fn soa_accepts_ttl_units() {
        let soa = rdata(Type::SOA, "ns1 admin 7 1h 15m 1w 1d").unwrap();
        assert_eq!(soa.validate(Type::SOA), Ok(()));
        assert_eq!(soa.soa_serial(), Some(7));
        assert!(soa.octets().ends_with(&[0, 0, 0x0e, 0x10, 0, 0, 3, 0x84, 0, 9, 0x3a, 0x80, 0, 1, 0x51, 0x80]));
    }

    #[test]
    fn txt_works() {
        let txt = rdata(Type::TXT, "\"hello world\" abc").unwrap();
        assert_eq!(txt.octets(), b"\x0bhello world\x03abc");
        let long = format!("\"{}\"", "a".repeat(256));
        assert_eq!(
            rdata(Type::TXT, &long).unwrap_err().kind(),
            Some(&ErrorKind::CharacterStringTooLong)
        );
    }

    #[test]
    fn ds_and_dnskey_work() {
        let ds = rdata(Type::DS, "20326 8 2 E06D44B8 0A").unwrap();
        assert_eq!(ds.octets(), b"\x4f\x66\x08\x02\xe0\x6d\x44\xb8\x0a");
        let dnskey = rdata(Type::DNSKEY, "257 3 8 AwEA AQ==").unwrap();
        assert_eq!(dnskey.octets(), b"\x01\x01\x03\x08\x03\x01\x00\x01");
        assert_eq!(
            rdata(Type::DNSKEY, "257 3 8 !!!!").unwrap_err().kind(),
            Some(&ErrorKind::InvalidBase64)
        );
    }

    #[test]
    fn rrsig_works() {
        let rrsig = rdata(
            Type::RRSIG,
            "NS 8 0 518400 20240101000000 1704067200 12345 . AAAA",
        )
        .unwrap();
        assert_eq!(rrsig.validate(Type::RRSIG), Ok(()));
        assert_eq!(rrsig.rrsig_type_covered(), Some(Type::NS));
        assert_eq!(&rrsig.octets()[8..12], &1_704_067_200u32.to_be_bytes());
        assert_eq!(&rrsig.octets()[12..16], &1_704_067_200u32.to_be_bytes());
    }

    #[test]
    fn nsec_works() {
        let nsec = rdata(Type::NSEC, "host.example.com. A MX RRSIG NSEC TYPE1234").unwrap();
        assert_eq!(
            nsec.octets(),
            b"\x04host\x07example\x03com\x00\
              \x00\x06\x40\x01\x00\x00\x00\x03\
              \x04\x1b\x00\x00\x00\x00\x00\x00\
              \x00\x00\x00\x00\x00\x00\x00\x00\
              \x00\x00\x00\x00\x00\x00\x00\x00\
              \x00\x00\x00\x00\x20"
        );
    }

    #[test]
    fn zonemd_works() {
        let zonemd = rdata(Type::ZONEMD, "2024010100 1 1 ( abcd )").unwrap();
        assert_eq!(zonemd.octets(), b"\x78\xa3\xf1\x74\x01\x01\xab\xcd");
    }

    #[test]
    fn generic_format_works() {
        assert_eq!(rdata(Type::from(65280), "\\# 2 abcd").unwrap().octets(), b"\xab\xcd");
        assert!(rdata(Type::from(65280), "\\# 0").unwrap().is_empty());
        assert_eq!(
            rdata(Type::from(65280), "\\# 3 abcd").unwrap_err().kind(),
            Some(&ErrorKind::RdataLengthMismatch)
        );
    }

    #[test]
    fn unknown_type_without_generic_format_is_rejected() {
        assert_eq!(
            rdata(Type::from(65280), "abcd").unwrap_err().kind(),
            Some(&ErrorKind::UnsupportedType(Type::from(65280)))
        );
    }

    #[test]
    fn trailing_fields_are_rejected() {
        assert_eq!(
            rdata(Type::A, "192.0.2.1 extra").unwrap_err().kind(),
            Some(&ErrorKind::TrailingFields)
        );
    }

    #[test]
    fn signature_times_work() {
        assert_eq!(parse_signature_time("19700101000000"), Some(0));
        assert_eq!(parse_signature_time("20240229120000"), Some(1_709_208_000));
        assert_eq!(parse_signature_time("12345"), Some(12345));
        assert_eq!(parse_signature_time("20241301000000"), None);
    }
}
