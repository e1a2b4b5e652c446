//! `ResponseKey` and `StatusResponse`, the KLV-shaped trailer every DCS
//! response (and some server-pushed messages) ends with (§4.10).
//!
//! Grounded on `original_source/src/commands/DCS_Message.h`'s
//! `ResponseKey` enum and `KLV`/`StatusResponse` typedef.

use crate::error::CodecError;
use dcsync_core::wire::{Reader, Writer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKey {
    Successful,
    Failed,
    Invalid,
    Busy,
    LeaseTimeout,
    PlayoutIdMismatch,
    GeneralError,
    RecoverableError,
    RplError,
    ResourceError,
    Processing,
}

impl ResponseKey {
    const fn to_byte(self) -> i8 {
        match self {
            Self::Successful => 0,
            Self::Failed => 1,
            Self::Invalid => 2,
            Self::Busy => 3,
            Self::LeaseTimeout => 4,
            Self::PlayoutIdMismatch => 5,
            Self::GeneralError => 6,
            Self::RecoverableError => 7,
            Self::RplError => 8,
            Self::ResourceError => 9,
            Self::Processing => 10,
        }
    }

    const fn from_byte(byte: i8) -> Option<Self> {
        Some(match byte {
            0 => Self::Successful,
            1 => Self::Failed,
            2 => Self::Invalid,
            3 => Self::Busy,
            4 => Self::LeaseTimeout,
            5 => Self::PlayoutIdMismatch,
            6 => Self::GeneralError,
            7 => Self::RecoverableError,
            8 => Self::RplError,
            9 => Self::ResourceError,
            10 => Self::Processing,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub key: ResponseKey,
    pub text: String,
}

impl StatusResponse {
    #[must_use]
    pub fn new(key: ResponseKey, text: impl Into<String>) -> Self {
        Self { key, text: text.into() }
    }

    #[must_use]
    pub fn ok() -> Self {
        Self::new(ResponseKey::Successful, String::new())
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_i8(self.key.to_byte());
        let bytes = self.text.as_bytes();
        w.write_ber4(bytes.len() as u32).expect("DCS status text never exceeds BER4 range");
        w.write_bytes(bytes);
    }

    /// # Errors
    /// Returns [`CodecError`] on an unrecognized key byte, a truncated
    /// read, or invalid UTF-8 in the text.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let byte = r.read_i8()?;
        let key = ResponseKey::from_byte(byte)
            .ok_or(CodecError::UnknownResponseKey { byte })?;
        let len = r.read_ber4()? as usize;
        let text = String::from_utf8(r.read_bytes(len)?.to_vec())?;
        Ok(Self { key, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_text() {
        let status = StatusResponse::new(ResponseKey::LeaseTimeout, "lease expired");
        let mut w = Writer::new();
        status.encode(&mut w);
        let buf = w.into_inner();
        let mut r = Reader::new(&buf);
        assert_eq!(StatusResponse::decode(&mut r).unwrap(), status);
    }

    #[test]
    fn rejects_an_unknown_key_byte() {
        let buf = [99u8, 0x83, 0, 0, 0];
        let mut r = Reader::new(&buf);
        assert!(matches!(
            StatusResponse::decode(&mut r),
            Err(CodecError::UnknownResponseKey { byte: 99 })
        ));
    }
}
