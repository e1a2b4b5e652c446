//! `Asset`: one file reference inside a `Reel` (§3).

use dcsync_core::editrate::EditRate;
use dcsync_core::ids::{Ul, Uuid};
use std::path::PathBuf;

/// Which of a reel's three asset slots this asset fills; an asset of an
/// unrecognized kind is accepted during parsing upstream but dropped
/// before it reaches a `Reel` (`AssetType::Unknown` is never stored).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    Unknown,
    MainPicture,
    MainSound,
    AuxData,
}

/// One timeline-bearing asset (a main picture, main sound, or aux-data
/// track). `start_frame` is assigned by [`crate::Show::add_cpl_to_end_of_timeline`]
/// when the owning CPL is appended to a show's timeline; it is left at
/// `0` on assets built standalone.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub kind: AssetType,
    pub id: Uuid,
    pub edit_rate: EditRate,
    pub frame_rate: EditRate,
    pub start_frame: i32,
    pub intrinsic_duration: i32,
    pub entry_point: i32,
    pub duration: i32,
    pub data_essence_coding_ul: Option<Ul>,
    pub path: PathBuf,
    pub volume_index: i32,
    pub offset: i32,
    pub length: i32,
}

impl Asset {
    /// `start_frame + duration - 1`, only defined while `duration > 0`.
    #[must_use]
    pub fn end_frame(&self) -> Option<i32> {
        (self.duration > 0).then(|| self.start_frame + self.duration - 1)
    }
}

/// Fluent builder for an [`Asset`]; `start_frame` is not settable here
/// since it is a timeline-assembly concern, not an asset property.
#[derive(Debug, Clone)]
pub struct AssetBuilder {
    kind: AssetType,
    id: Uuid,
    edit_rate: EditRate,
    frame_rate: EditRate,
    intrinsic_duration: i32,
    entry_point: i32,
    duration: i32,
    data_essence_coding_ul: Option<Ul>,
    path: PathBuf,
    volume_index: i32,
    offset: i32,
    length: i32,
}

impl Default for AssetBuilder {
    fn default() -> Self {
        Self {
            kind: AssetType::Unknown,
            id: Uuid::from_bytes([0; 16]),
            edit_rate: EditRate::FPS_24,
            frame_rate: EditRate::FPS_24,
            intrinsic_duration: 0,
            entry_point: 0,
            duration: 0,
            data_essence_coding_ul: None,
            path: PathBuf::new(),
            volume_index: 0,
            offset: 0,
            length: 0,
        }
    }
}

impl AssetBuilder {
    #[must_use]
    pub fn new(kind: AssetType, id: Uuid) -> Self {
        Self { kind, id, ..Self::default() }
    }

    #[must_use]
    pub fn edit_rate(mut self, rate: EditRate) -> Self {
        self.edit_rate = rate;
        self
    }

    #[must_use]
    pub fn frame_rate(mut self, rate: EditRate) -> Self {
        self.frame_rate = rate;
        self
    }

    #[must_use]
    pub fn intrinsic_duration(mut self, v: i32) -> Self {
        self.intrinsic_duration = v;
        self
    }

    #[must_use]
    pub fn entry_point(mut self, v: i32) -> Self {
        self.entry_point = v;
        self
    }

    #[must_use]
    pub fn duration(mut self, v: i32) -> Self {
        self.duration = v;
        self
    }

    #[must_use]
    pub fn data_essence_coding_ul(mut self, ul: Ul) -> Self {
        self.data_essence_coding_ul = Some(ul);
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn volume_index(mut self, v: i32) -> Self {
        self.volume_index = v;
        self
    }

    #[must_use]
    pub fn offset(mut self, v: i32) -> Self {
        self.offset = v;
        self
    }

    #[must_use]
    pub fn length(mut self, v: i32) -> Self {
        self.length = v;
        self
    }

    #[must_use]
    pub fn build(self) -> Asset {
        Asset {
            kind: self.kind,
            id: self.id,
            edit_rate: self.edit_rate,
            frame_rate: self.frame_rate,
            start_frame: 0,
            intrinsic_duration: self.intrinsic_duration,
            entry_point: self.entry_point,
            duration: self.duration,
            data_essence_coding_ul: self.data_essence_coding_ul,
            path: self.path,
            volume_index: self.volume_index,
            offset: self.offset,
            length: self.length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_frame_is_none_for_zero_duration() {
        let asset = AssetBuilder::new(AssetType::MainPicture, Uuid::from_bytes([1; 16])).build();
        assert_eq!(asset.end_frame(), None);
    }

    #[test]
    fn end_frame_is_inclusive() {
        let mut asset =
            AssetBuilder::new(AssetType::MainPicture, Uuid::from_bytes([1; 16])).duration(240).build();
        asset.start_frame = 100;
        assert_eq!(asset.end_frame(), Some(339));
    }
}
