//! Fixed 16-byte opaque identifiers: `Uuid`, `Ul`, `PackKey` (§3).
//!
//! `Uuid` and `Ul` round-trip through three textual forms: bare 32-hex-char,
//! `urn:uuid:` (hyphens optional), and `urn:smpte:ul:` (dot-separated).
//! Grounded on `original_source/src/UUID/UUID.h` and
//! `original_source/src/AuxData/AuxData.h`'s `UL::SetFromString`.

use crate::error::Error;
use std::fmt;

const URN_UUID_PREFIX: &str = "urn:uuid:";
const URN_UL_PREFIX: &str = "urn:smpte:ul:";

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

fn parse_hex32(hex: &str) -> Option<[u8; 16]> {
    if hex.len() != 32 {
        return None;
    }
    let bytes = hex.as_bytes();
    let mut out = [0u8; 16];
    for i in 0..16 {
        let hi = hex_nibble(bytes[i * 2])?;
        let lo = hex_nibble(bytes[i * 2 + 1])?;
        out[i] = (hi << 4) | lo;
    }
    Some(out)
}

fn to_hex32(data: &[u8; 16]) -> String {
    let mut s = String::with_capacity(32);
    for b in data {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

fn to_hex32_upper(data: &[u8; 16]) -> String {
    let mut s = String::with_capacity(32);
    for b in data {
        s.push_str(&format!("{b:02X}"));
    }
    s
}

macro_rules! fixed16 {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub [u8; 16]);

        impl $name {
            #[must_use]
            pub const fn from_bytes(data: [u8; 16]) -> Self {
                Self(data)
            }

            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            #[must_use]
            pub fn is_nil(&self) -> bool {
                self.0 == [0u8; 16]
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), to_hex32(&self.0))
            }
        }
    };
}

fixed16!(Uuid);
fixed16!(Ul);
fixed16!(PackKey);

impl Uuid {
    /// Parses a bare 32-hex-char string or a `urn:uuid:` form (with or
    /// without hyphens).
    pub fn parse(text: &str) -> Result<Self, Error> {
        if let Some(rest) = text.strip_prefix(URN_UUID_PREFIX) {
            let stripped: String = rest.chars().filter(|c| *c != '-').collect();
            return parse_hex32(&stripped)
                .map(Self)
                .ok_or_else(|| Error::Configuration(format!("invalid UUID text {text:?}")));
        }
        let stripped: String = text.chars().filter(|c| *c != '-').collect();
        parse_hex32(&stripped)
            .map(Self)
            .ok_or_else(|| Error::Configuration(format!("invalid UUID text {text:?}")))
    }

    #[must_use]
    pub fn to_urn(&self) -> String {
        let hex = to_hex32(&self.0);
        format!(
            "urn:uuid:{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

impl Ul {
    /// Parses a bare 32-hex-char string or a dotted `urn:smpte:ul:` form.
    pub fn parse(text: &str) -> Result<Self, Error> {
        if let Some(rest) = text.strip_prefix(URN_UL_PREFIX) {
            let stripped: String = rest.chars().filter(|c| *c != '.').collect();
            return parse_hex32(&stripped)
                .map(Self)
                .ok_or_else(|| Error::Configuration(format!("invalid UL text {text:?}")));
        }
        parse_hex32(text)
            .map(Self)
            .ok_or_else(|| Error::Configuration(format!("invalid UL text {text:?}")))
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        to_hex32(&self.0)
    }

    /// Uppercase form, for contexts that require it verbatim (e.g. the
    /// `coding_UL` query parameter in the aux-data HTTP request path, §4.8).
    #[must_use]
    pub fn to_hex_upper(&self) -> String {
        to_hex32_upper(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_round_trips_bare_hex() {
        let hex = "0102030405060708090a0b0c0d0e0f10";
        let id = Uuid::parse(hex).unwrap();
        assert_eq!(to_hex32(id.as_bytes()), hex);
    }

    #[test]
    fn uuid_round_trips_urn_dashed_and_undashed() {
        let dashed = "urn:uuid:01020304-0506-0708-090a-0b0c0d0e0f10";
        let undashed = "urn:uuid:0102030405060708090a0b0c0d0e0f10";
        assert_eq!(Uuid::parse(dashed).unwrap(), Uuid::parse(undashed).unwrap());
        assert_eq!(Uuid::parse(dashed).unwrap().to_urn(), dashed);
    }

    #[test]
    fn ul_round_trips_dotted_urn() {
        let dotted = "urn:smpte:ul:060e.2b34.0401.010d.0101.0101.0200.0000";
        let ul = Ul::parse(dotted).unwrap();
        assert_eq!(ul.to_hex(), "060e2b340401010d0101010102000000");
    }

    #[test]
    fn invalid_text_is_rejected() {
        assert!(Uuid::parse("not-a-uuid").is_err());
        assert!(Ul::parse("too-short").is_err());
    }
}
