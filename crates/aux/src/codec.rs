//! `AuxDataBlockTransferHeader` and `AuxDataBlock` wire records (§4.7).
//!
//! Both records share the same shape: a constant 16-byte pack key, a BER5
//! length covering everything after it, then fixed fields. Grounded on
//! `original_source/src/AuxData/AuxData.cpp`'s `AuxDataBlockTransferHeader`
//! and `AuxDataBlock` `read`/`write`, field for field, including the two
//! distinct pack key constants.

use crate::error::CodecError;
use dcsync_core::ids::{PackKey, Ul};
use dcsync_core::wire::{Reader, Writer};

pub const TRANSFER_HEADER_PACK_KEY: PackKey = PackKey::from_bytes([
    0x06, 0x0E, 0x2B, 0x34, 0x02, 0x7F, 0x01, 0x01, 0x0C, 0x03, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00,
]);

pub const AUX_DATA_BLOCK_PACK_KEY: PackKey = PackKey::from_bytes([
    0x06, 0x0E, 0x2B, 0x34, 0x02, 0x7F, 0x01, 0x01, 0x0C, 0x03, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00,
]);

fn expect_pack_key(r: &mut Reader<'_>, expected: PackKey) -> Result<(), CodecError> {
    let found = PackKey::from_bytes(r.read_array16()?);
    if found != expected {
        return Err(CodecError::WrongPackKey { expected, found });
    }
    Ok(())
}

/// Prefixes the caller's GET response (or prepended transfer header) body
/// with `count` edit units starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxDataBlockTransferHeader {
    pub edit_unit_range_start_index: u32,
    pub edit_unit_range_count: u32,
}

impl AuxDataBlockTransferHeader {
    #[must_use]
    pub const fn new(edit_unit_range_start_index: u32, edit_unit_range_count: u32) -> Self {
        Self { edit_unit_range_start_index, edit_unit_range_count }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_array16(TRANSFER_HEADER_PACK_KEY.as_bytes());
        w.write_ber5(8);
        w.write_u32(self.edit_unit_range_start_index);
        w.write_u32(self.edit_unit_range_count);
    }

    /// # Errors
    /// Returns [`CodecError`] on a wrong pack key, a truncated read, or a
    /// declared length that does not match the eight bytes actually read.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        expect_pack_key(r, TRANSFER_HEADER_PACK_KEY)?;
        let declared = r.read_ber5()?;
        let start_pos = r.position();
        let edit_unit_range_start_index = r.read_u32()?;
        let edit_unit_range_count = r.read_u32()?;
        let consumed = (r.position() - start_pos) as u32;
        if consumed != declared {
            return Err(CodecError::LengthMismatch { declared, consumed });
        }
        Ok(Self { edit_unit_range_start_index, edit_unit_range_count })
    }
}

/// One edit unit's worth of raw aux-data essence, wrapped with enough
/// context (edit index, rate, essence-coding UL) for the validator and
/// processor to place it on the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxDataBlock {
    pub edit_unit_index: u32,
    pub edit_rate_num: i32,
    pub edit_rate_den: i32,
    pub source_data_essence_coding_ul: Ul,
    pub source_data_item: Vec<u8>,
    pub source_cryptographic_context: Vec<u8>,
}

impl AuxDataBlock {
    fn body_len(&self) -> u32 {
        4 + 4
            + 4
            + 16
            + 8
            + self.source_data_item.len() as u32
            + 8
            + self.source_cryptographic_context.len() as u32
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_array16(AUX_DATA_BLOCK_PACK_KEY.as_bytes());
        w.write_ber5(self.body_len());
        w.write_u32(self.edit_unit_index);
        w.write_i32(self.edit_rate_num);
        w.write_i32(self.edit_rate_den);
        w.write_array16(self.source_data_essence_coding_ul.as_bytes());
        w.write_u64(self.source_data_item.len() as u64);
        w.write_bytes(&self.source_data_item);
        w.write_u64(self.source_cryptographic_context.len() as u64);
        w.write_bytes(&self.source_cryptographic_context);
    }

    /// # Errors
    /// Returns [`CodecError`] on a wrong pack key, a truncated read, or a
    /// declared length that does not match the body actually read.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        expect_pack_key(r, AUX_DATA_BLOCK_PACK_KEY)?;
        let declared = r.read_ber5()?;
        let start_pos = r.position();

        let edit_unit_index = r.read_u32()?;
        let edit_rate_num = r.read_i32()?;
        let edit_rate_den = r.read_i32()?;
        let source_data_essence_coding_ul = Ul::from_bytes(r.read_array16()?);

        let source_data_len = r.read_u64()? as usize;
        let source_data_item = r.read_bytes(source_data_len)?.to_vec();

        let crypt_len = r.read_u64()? as usize;
        let source_cryptographic_context = r.read_bytes(crypt_len)?.to_vec();

        let consumed = (r.position() - start_pos) as u32;
        if consumed != declared {
            return Err(CodecError::LengthMismatch { declared, consumed });
        }

        Ok(Self {
            edit_unit_index,
            edit_rate_num,
            edit_rate_den,
            source_data_essence_coding_ul,
            source_data_item,
            source_cryptographic_context,
        })
    }
}
