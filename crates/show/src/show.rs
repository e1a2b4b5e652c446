//! `Show`: an ordered sequence of [`Cpl`]s forming one playable timeline (§3).

use crate::asset::AssetType;
use crate::cpl::Cpl;
use dcsync_core::editrate::EditRate;
use dcsync_core::ids::Uuid;
use std::path::PathBuf;

/// Per-frame identifiers and timing an emitter needs to build a sync
/// packet (§4.2, §4.5): the picture/sound/CPL UUIDs in play plus the
/// edit rate that frame was authored at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub primary_picture_track_file_uuid: Uuid,
    pub primary_sound_track_file_uuid: Uuid,
    pub composition_playlist_uuid: Uuid,
    pub edit_rate: EditRate,
}

/// A show's playable timeline: CPLs appended in playback order, each
/// asset assigned a `startFrame` by accumulating main-picture durations
/// as CPLs are appended.
pub struct Show {
    sample_rate: u32,
    timeline: Vec<Cpl>,
    number_of_frames: i32,
}

impl Show {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, timeline: Vec::new(), number_of_frames: 0 }
    }

    /// Appends `cpl` to the end of the timeline, assigning `start_frame`
    /// to every asset in every reel by walking the reels in order and
    /// accumulating each reel's main-picture duration. A reel with no
    /// main picture does not advance the timeline.
    pub fn add_cpl_to_end_of_timeline(&mut self, mut cpl: Cpl) -> bool {
        let mut cursor = self.number_of_frames;

        for reel in &mut cpl.reels {
            if let Some(asset) = &mut reel.main_picture {
                asset.start_frame = cursor;
            }
            if let Some(asset) = &mut reel.main_sound {
                asset.start_frame = cursor;
            }
            if let Some(asset) = &mut reel.aux_data {
                asset.start_frame = cursor;
            }
            let advance = reel.main_picture.as_ref().map_or(0, |a| a.duration.max(0));
            cursor += advance;
        }

        self.number_of_frames = cursor;
        self.timeline.push(cpl);
        true
    }

    #[must_use]
    pub fn length_in_frames(&self) -> i32 {
        self.number_of_frames
    }

    /// The largest per-edit-unit sample count among all main-picture
    /// assets in the show — the frame that takes the most wall-clock
    /// time to present (a 24 fps frame outlasts a 30 fps one).
    #[must_use]
    pub fn longest_frame_length(&self) -> u32 {
        self.timeline
            .iter()
            .flat_map(|cpl| &cpl.reels)
            .filter_map(|reel| reel.main_picture.as_ref())
            .map(|asset| asset.edit_rate.samples_per_edit_unit(self.sample_rate))
            .max()
            .unwrap_or(0)
    }

    /// The asset of `kind` whose `[start_frame, end_frame]` range covers
    /// `frame`, searching reels in timeline order.
    #[must_use]
    pub fn asset_for_frame(&self, frame: i32, kind: AssetType) -> Option<&crate::asset::Asset> {
        self.timeline.iter().flat_map(|cpl| &cpl.reels).find_map(|reel| {
            let asset = match kind {
                AssetType::MainPicture => reel.main_picture.as_ref(),
                AssetType::MainSound => reel.main_sound.as_ref(),
                AssetType::AuxData => reel.aux_data.as_ref(),
                AssetType::Unknown => None,
            }?;
            let end = asset.end_frame().unwrap_or(asset.start_frame);
            (frame >= asset.start_frame && frame <= end).then_some(asset)
        })
    }

    #[must_use]
    pub fn asset_range_for_frame(&self, frame: i32, kind: AssetType) -> Option<(i32, i32)> {
        let asset = self.asset_for_frame(frame, kind)?;
        Some((asset.start_frame, asset.end_frame().unwrap_or(asset.start_frame)))
    }

    #[must_use]
    pub fn data_file_path(&self, frame: i32, kind: AssetType) -> Option<PathBuf> {
        self.asset_for_frame(frame, kind).map(|asset| asset.path.clone())
    }

    #[must_use]
    pub fn asset_frame_info(&self, frame: i32) -> Option<FrameInfo> {
        let cpl = self.timeline.iter().find(|cpl| {
            cpl.reels.iter().any(|reel| {
                reel.main_picture.as_ref().is_some_and(|asset| {
                    let end = asset.end_frame().unwrap_or(asset.start_frame);
                    frame >= asset.start_frame && frame <= end
                })
            })
        })?;
        let reel = cpl.reels.iter().find(|reel| {
            reel.main_picture.as_ref().is_some_and(|asset| {
                let end = asset.end_frame().unwrap_or(asset.start_frame);
                frame >= asset.start_frame && frame <= end
            })
        })?;
        let picture = reel.main_picture.as_ref()?;
        Some(FrameInfo {
            primary_picture_track_file_uuid: picture.id,
            primary_sound_track_file_uuid: reel.main_sound.as_ref().map_or_else(
                || Uuid::from_bytes([0; 16]),
                |a| a.id,
            ),
            composition_playlist_uuid: cpl.id,
            edit_rate: picture.edit_rate,
        })
    }
}
