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

//! Implementation of the [`Class`] type for DNS classes.

use crate::util::mnemonic_u16;

mnemonic_u16! {
    /// A DNS class. The only class this server answers for is
    /// [`IN`](Class::IN); the others exist so that zone files and
    /// queries naming them can be recognized and rejected.
    pub struct Class, prefix "CLASS" {
        IN = 1,
        CH = 3,
        HS = 4,
        /// QCLASS `*` (RFC 1035 § 3.2.5).
        ANY = 255,
    }
}

#[cfg(test)]
mod tests {
    use super::Class;

    #[test]
    fn displays_according_to_rfc3597() {
        assert_eq!(Class::IN.to_string(), "IN");
        assert_eq!(Class::from(0xff00).to_string(), "CLASS65280");
    }

    #[test]
    fn parses_according_to_rfc3597() {
        assert_eq!("in".parse::<Class>(), Ok(Class::IN));
        assert_eq!("CLASS1".parse::<Class>(), Ok(Class::IN));
        assert_eq!(u16::from("CLASS65280".parse::<Class>().unwrap()), 65280);
        assert!("CLASSX".parse::<Class>().is_err());
        assert!("XY".parse::<Class>().is_err());
    }
}
