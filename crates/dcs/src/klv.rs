//! `TimelineExtension`, the generic key/BER4-length/text KLV carried in a
//! list on `UpdateTimelineRequest` (§4.10). Same wire shape as
//! `StatusResponse` but a distinct key space (opaque extension tags
//! rather than `ResponseKey`), per `original_source`'s separate typedef.

use crate::error::CodecError;
use dcsync_core::wire::{Reader, Writer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineExtension {
    pub key: u8,
    pub text: String,
}

impl TimelineExtension {
    #[must_use]
    pub fn new(key: u8, text: impl Into<String>) -> Self {
        Self { key, text: text.into() }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_u8(self.key);
        let bytes = self.text.as_bytes();
        w.write_ber4(bytes.len() as u32).expect("timeline extension text never exceeds BER4 range");
        w.write_bytes(bytes);
    }

    /// # Errors
    /// Returns [`CodecError`] on a truncated read or invalid UTF-8 text.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let key = r.read_u8()?;
        let len = r.read_ber4()? as usize;
        let text = String::from_utf8(r.read_bytes(len)?.to_vec())?;
        Ok(Self { key, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let ext = TimelineExtension::new(5, "vendor-tag");
        let mut w = Writer::new();
        ext.encode(&mut w);
        let buf = w.into_inner();
        let mut r = Reader::new(&buf);
        assert_eq!(TimelineExtension::decode(&mut r).unwrap(), ext);
    }
}
