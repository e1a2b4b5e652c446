//! `MessageHeader`: the 20-byte fixed header every DCS message starts with
//! (§4.10) — an 11-byte constant prefix, `kind1`/`kind2`, three reserved
//! bytes, then a BER4 payload length.
//!
//! Grounded on `original_source/src/commands/DCS_Message.h`'s
//! `MessageHeader` and its `Write`/`Read` in `DCS_Message.cpp`.

use crate::error::CodecError;
use dcsync_core::wire::{Reader, Writer};

pub const HEADER_SIZE: usize = 20;

const FIXED_PREFIX: [u8; 11] =
    [0x06, 0x0E, 0x2B, 0x34, 0x02, 0x05, 0x01, 0x01, 0x02, 0x07, 0x02];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub kind1: u8,
    pub kind2: u8,
    pub length: u32,
}

impl MessageHeader {
    #[must_use]
    pub const fn new(kind1: u8, kind2: u8, length: u32) -> Self {
        Self { kind1, kind2, length }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_bytes(&FIXED_PREFIX);
        w.write_u8(self.kind1);
        w.write_u8(self.kind2);
        w.write_u8(0);
        w.write_u8(0);
        w.write_u8(0);
        // A payload never exceeds BER4's 24-bit range in this protocol;
        // fall back to the maximum representable length rather than panic.
        let clamped = self.length.min(0x00FF_FFFF);
        w.write_ber4(clamped).expect("clamped to BER4 range");
    }

    /// # Errors
    /// Returns [`CodecError::WrongHeaderPrefix`] if the fixed prefix bytes
    /// don't match, or a wire error on a truncated read.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let mut prefix = [0u8; 11];
        for byte in &mut prefix {
            *byte = r.read_u8()?;
        }
        if prefix != FIXED_PREFIX {
            return Err(CodecError::WrongHeaderPrefix);
        }
        let kind1 = r.read_u8()?;
        let kind2 = r.read_u8()?;
        let _reserved = (r.read_u8()?, r.read_u8()?, r.read_u8()?);
        let length = r.read_ber4()?;
        Ok(Self { kind1, kind2, length })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let header = MessageHeader::new(0x02, 0x06, 37);
        let mut w = Writer::new();
        header.encode(&mut w);
        let buf = w.into_inner();
        assert_eq!(buf.len(), HEADER_SIZE);
        let mut r = Reader::new(&buf);
        assert_eq!(MessageHeader::decode(&mut r).unwrap(), header);
    }

    #[test]
    fn rejects_a_wrong_prefix() {
        let buf = [0u8; HEADER_SIZE];
        let mut r = Reader::new(&buf);
        assert!(matches!(MessageHeader::decode(&mut r), Err(CodecError::WrongHeaderPrefix)));
    }
}
