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

//! Shared test fixtures: a small signed root zone.

use lazy_static::lazy_static;

use crate::name::Name;
use crate::zone::Zone;

/// A miniature root zone with one signed delegation (`net.`), one
/// delegation with a DS record and in-bailiwick glue (`aaa.`), and two
/// delegations without DS records (`com.` and `example.`).
pub const ROOT_ZONE_TEXT: &str = "\
$ORIGIN .
$TTL 86400
@ SOA a.root-servers.net. nstld.verisign-grs.com. 2024010100 1800 900 604800 86400
@ RRSIG SOA 8 0 86400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
@ 518400 NS a.root-servers.net.
@ 518400 NS b.root-servers.net.
@ 518400 RRSIG NS 8 0 518400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
@ 172800 DNSKEY 257 3 8 AwEAAQ==
@ 172800 RRSIG DNSKEY 8 0 172800 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
@ NSEC aaa. NS SOA RRSIG NSEC DNSKEY
@ RRSIG NSEC 8 0 86400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
aaa. 172800 NS ns1.aaa.
aaa. DS 12345 8 2 (
    0123456789abcdef0123456789abcdef
    0123456789abcdef0123456789abcdef )
aaa. RRSIG DS 8 1 86400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
aaa. NSEC com. NS DS RRSIG NSEC
aaa. RRSIG NSEC 8 1 86400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
ns1.aaa. 172800 A 192.0.2.1
com. 172800 NS a.gtld-servers.net.
com. 172800 NS b.gtld-servers.net.
com. NSEC example. NS RRSIG NSEC
com. RRSIG NSEC 8 1 86400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
example. 172800 NS ns.example.
example. NSEC net. NS RRSIG NSEC
example. RRSIG NSEC 8 1 86400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
ns.example. 172800 A 192.0.2.53
ns.example. 172800 AAAA 2001:db8::53
net. 172800 NS a.gtld-servers.net.
net. DS 35886 8 2 (
    fedcba9876543210fedcba9876543210
    fedcba9876543210fedcba9876543210 )
net. RRSIG DS 8 1 86400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
net. NSEC . NS DS RRSIG NSEC
net. RRSIG NSEC 8 1 86400 20240201000000 20240101000000 20326 . c2lnbmF0dXJl
a.gtld-servers.net. 172800 A 192.5.6.30
a.gtld-servers.net. 172800 AAAA 2001:503:a83e::2:30
b.gtld-servers.net. 172800 A 192.33.14.30
a.root-servers.net. 518400 A 198.41.0.4
a.root-servers.net. 518400 AAAA 2001:503:ba3e::2:30
b.root-servers.net. 518400 A 170.247.170.2
";

lazy_static! {
    pub static ref ROOT_ZONE: Zone =
        Zone::load_from_reader(ROOT_ZONE_TEXT.as_bytes(), Name::root()).unwrap();
}
