//! A minimal [`EssenceReader`] implementation reading raw fixed-size
//! records straight from disk. MXF essence parsing is explicitly out of
//! scope (§1) and left to whatever reader a real deployment injects; this
//! is the simplest thing that satisfies the trait for a running server.

use dcsync_aux::EssenceReader;
use dcsync_show::Asset;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Mutex;

/// Reads `record_len` bytes at offset `edit_unit_index * record_len` from
/// `asset.path`, under the assumption that the file holds one fixed-size
/// record per edit unit back to back (true of a raw PCM or KLV-unwrapped
/// capture, not of a full MXF file).
pub struct RawFileEssenceReader {
    record_len: u64,
    open: Mutex<()>,
}

impl RawFileEssenceReader {
    #[must_use]
    pub const fn new(record_len: u64) -> Self {
        Self { record_len, open: Mutex::new(()) }
    }
}

impl EssenceReader for RawFileEssenceReader {
    fn read_edit_unit(&self, asset: &Asset, edit_unit_index: u32) -> std::io::Result<Vec<u8>> {
        let _serialize = self.open.lock().expect("essence reader lock poisoned");
        let path: PathBuf = asset.path.clone();
        let mut file = File::open(&path)?;
        let offset = u64::from(edit_unit_index) * self.record_len;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; self.record_len as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcsync_core::editrate::EditRate;
    use dcsync_core::ids::Uuid;
    use dcsync_show::AssetBuilder;

    #[test]
    fn reads_the_record_at_the_expected_offset() {
        let path = std::env::temp_dir().join(format!("dcsync-essence-test-{}", std::process::id()));
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();

        let asset = AssetBuilder::new(dcsync_show::AssetType::AuxData, Uuid::from_bytes([1; 16]))
            .edit_rate(EditRate::FPS_24)
            .duration(10)
            .path(&path)
            .build();

        let reader = RawFileEssenceReader::new(2);
        assert_eq!(reader.read_edit_unit(&asset, 0).unwrap(), vec![0, 1]);
        assert_eq!(reader.read_edit_unit(&asset, 2).unwrap(), vec![4, 5]);

        std::fs::remove_file(&path).ok();
    }
}
