//! Sync-packet modulation (§4.2): encodes a fixed-format payload as a
//! sequence of 24-bit PCM lead/tail sample pairs and decodes it back.
//!
//! Each 16-bit logical word becomes a lead sample (the value itself, with
//! bit 0x010000 set on the very first word of the packet as the sync
//! marker's sentinel) followed by a tail sample holding the 24-bit two's
//! complement negation of the lead. A receiver that has already validated
//! the lead/tail relationship (frame recovery's job, not this module's)
//! only needs the lead's low 16 bits to recover the word.
//!
//! Grounded on `original_source/src/dcisg/sync.cpp`'s `WriteUInt16`,
//! `WriteUInt32`, `WriteUUID`, `ReadUInt16`, `ReadUInt32`. Samples here are
//! 24-bit values carried in the low 24 bits of a `u32`, matching the fixed
//! point representation the frame recovery parser hands to this module
//! after the 32-bit float / 24-bit fixed conversion at the I/O boundary.

use crate::error::{Error, SyncPacketError};
use crate::ids::Uuid;

/// Sentinel marking the first lead sample of a packet (§4.2, §8 S1).
pub const SYNC_MARKER: u16 = 0xAAF0;

/// The marker's full lead sample value (`SYNC_MARKER` with the sentinel
/// bit 0x010000 set) — the pattern frame recovery hunts for.
pub const SYNC_MARKER_LEAD: u32 = 0x0001_AAF0;

const BASE_PAYLOAD_WORDS: u16 = 42;

/// The 24-bit two's complement negation a valid tail sample must equal
/// for the given lead. Used both to modulate and, by frame recovery, to
/// validate a candidate lead/tail pair.
#[must_use]
pub fn expected_tail(lead: u32) -> u32 {
    lead.wrapping_neg() & 0x00FF_FFFF
}

/// Negates `value` (widened to 24 bits, with the sentinel bit set when
/// `first`) and returns the `(lead, tail)` sample pair.
fn modulate_word(value: u16, first: bool) -> (u32, u32) {
    let mut lead = u32::from(value);
    if first {
        lead |= 0x0001_0000;
    }
    let tail = expected_tail(lead);
    (lead, tail)
}

fn push_word(samples: &mut Vec<u32>, value: u16, first: bool) {
    let (lead, tail) = modulate_word(value, first);
    samples.push(lead);
    samples.push(tail);
}

fn push_u32(samples: &mut Vec<u32>, value: u32, first: bool) {
    push_word(samples, ((value >> 16) & 0xFFFF) as u16, first);
    push_word(samples, (value & 0xFFFF) as u16, false);
}

fn push_uuid(samples: &mut Vec<u32>, id: &Uuid) {
    let bytes = id.as_bytes();
    for i in (0..16).step_by(2) {
        let word = (u16::from(bytes[i + 1]) | (u16::from(bytes[i]) << 8)) & 0xFFFF;
        push_word(samples, word, false);
    }
}

/// Reads the lead's low 16 bits for the word at sample offset `pos`. Does
/// not re-check the tail; a demodulated packet is only trustworthy once
/// frame recovery has validated every lead/tail pair.
fn read_word(samples: &[u32], pos: usize) -> Result<u16, SyncPacketError> {
    let lead = *samples
        .get(pos)
        .ok_or(SyncPacketError::Truncated { needed: pos + 2 - samples.len() })?;
    Ok((lead & 0xFFFF) as u16)
}

fn read_u32(samples: &[u32], pos: usize) -> Result<u32, SyncPacketError> {
    let hi = read_word(samples, pos)?;
    let lo = read_word(samples, pos + 2)?;
    Ok((u32::from(hi) << 16) | u32::from(lo))
}

fn read_uuid(samples: &[u32], pos: usize) -> Result<Uuid, SyncPacketError> {
    let mut bytes = [0u8; 16];
    for (word_index, chunk) in bytes.chunks_mut(2).enumerate() {
        let word = read_word(samples, pos + word_index * 2)?;
        chunk[0] = (word >> 8) as u8;
        chunk[1] = (word & 0xFF) as u8;
    }
    Ok(Uuid::from_bytes(bytes))
}

/// The fixed-format payload carried by the sync signal (§3, §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPacket {
    pub flags: u16,
    pub timeline_edit_unit_index: u32,
    pub playout_id: u32,
    pub edit_unit_duration: u16,
    pub sample_duration_num: u32,
    pub sample_duration_den: u32,
    pub primary_picture_output_offset: i32,
    pub primary_picture_screen_offset: u32,
    pub primary_picture_track_file_edit_unit_index: u32,
    pub primary_picture_track_file_uuid: Uuid,
    pub primary_sound_track_file_edit_unit_index: u32,
    pub primary_sound_track_file_uuid: Uuid,
    pub composition_playlist_uuid: Uuid,
    pub extension: Vec<u16>,
}

impl SyncPacket {
    /// Number of 16-bit words in `length` (everything from `flags` through
    /// `compositionPlaylistUUID`, plus the extension — neither the marker
    /// nor `length` itself counts).
    #[must_use]
    pub fn length(&self) -> u16 {
        BASE_PAYLOAD_WORDS + self.extension.len() as u16
    }

    /// Modulates this packet into a sequence of 24-bit lead/tail samples.
    #[must_use]
    pub fn modulate(&self) -> Vec<u32> {
        let mut samples = Vec::with_capacity(2 * (2 + self.length() as usize));

        push_word(&mut samples, SYNC_MARKER, true);
        push_word(&mut samples, self.length(), false);
        push_word(&mut samples, self.flags, false);
        push_u32(&mut samples, self.timeline_edit_unit_index, false);
        push_u32(&mut samples, self.playout_id, false);
        push_word(&mut samples, self.edit_unit_duration, false);
        push_u32(&mut samples, self.sample_duration_num, false);
        push_u32(&mut samples, self.sample_duration_den, false);
        push_u32(&mut samples, self.primary_picture_output_offset as u32, false);
        push_u32(&mut samples, self.primary_picture_screen_offset, false);
        push_u32(&mut samples, self.primary_picture_track_file_edit_unit_index, false);
        push_uuid(&mut samples, &self.primary_picture_track_file_uuid);
        push_u32(&mut samples, self.primary_sound_track_file_edit_unit_index, false);
        push_uuid(&mut samples, &self.primary_sound_track_file_uuid);
        push_uuid(&mut samples, &self.composition_playlist_uuid);
        for word in &self.extension {
            push_word(&mut samples, *word, false);
        }

        samples
    }

    /// Demodulates a packet from `samples`, which must begin with the
    /// marker's lead sample (sample 0). Does not validate any lead/tail
    /// pair; callers are expected to have done that during frame recovery.
    pub fn demodulate(samples: &[u32]) -> Result<Self, Error> {
        let marker = read_word(samples, 0)?;
        if marker != SYNC_MARKER {
            return Err(SyncPacketError::MarkerMismatch { found: marker }.into());
        }

        let length = read_word(samples, 2)?;
        let extension_words = length.saturating_sub(BASE_PAYLOAD_WORDS) as usize;

        let flags = read_word(samples, 4)?;
        let timeline_edit_unit_index = read_u32(samples, 6)?;
        let playout_id = read_u32(samples, 10)?;
        let edit_unit_duration = read_word(samples, 14)?;
        let sample_duration_num = read_u32(samples, 16)?;
        let sample_duration_den = read_u32(samples, 20)?;
        let primary_picture_output_offset = read_u32(samples, 24)? as i32;
        let primary_picture_screen_offset = read_u32(samples, 28)?;
        let primary_picture_track_file_edit_unit_index = read_u32(samples, 32)?;
        let primary_picture_track_file_uuid = read_uuid(samples, 36)?;
        let primary_sound_track_file_edit_unit_index = read_u32(samples, 52)?;
        let primary_sound_track_file_uuid = read_uuid(samples, 56)?;
        let composition_playlist_uuid = read_uuid(samples, 72)?;

        let mut extension = Vec::with_capacity(extension_words);
        for i in 0..extension_words {
            extension.push(read_word(samples, 88 + i * 2)?);
        }

        Ok(Self {
            flags,
            timeline_edit_unit_index,
            playout_id,
            edit_unit_duration,
            sample_duration_num,
            sample_duration_den,
            primary_picture_output_offset,
            primary_picture_screen_offset,
            primary_picture_track_file_edit_unit_index,
            primary_picture_track_file_uuid,
            primary_sound_track_file_edit_unit_index,
            primary_sound_track_file_uuid,
            composition_playlist_uuid,
            extension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> SyncPacket {
        SyncPacket {
            flags: 1,
            timeline_edit_unit_index: 123_456,
            playout_id: 0xDEAD_BEEF,
            edit_unit_duration: 2_000,
            sample_duration_num: 1,
            sample_duration_den: 48_000,
            primary_picture_output_offset: -4,
            primary_picture_screen_offset: 0,
            primary_picture_track_file_edit_unit_index: 10,
            primary_picture_track_file_uuid: Uuid::from_bytes([1; 16]),
            primary_sound_track_file_edit_unit_index: 10,
            primary_sound_track_file_uuid: Uuid::from_bytes([2; 16]),
            composition_playlist_uuid: Uuid::from_bytes([3; 16]),
            extension: vec![],
        }
    }

    #[test]
    fn round_trips_through_modulation() {
        let packet = sample_packet();
        let samples = packet.modulate();
        let decoded = SyncPacket::demodulate(&samples).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn round_trips_with_extension_words() {
        let mut packet = sample_packet();
        packet.extension = vec![0x1234, 0x5678, 0x9abc];
        let samples = packet.modulate();
        assert_eq!(packet.length(), 42 + 3);
        let decoded = SyncPacket::demodulate(&samples).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn marker_lead_sample_sets_sentinel_bit() {
        let packet = sample_packet();
        let samples = packet.modulate();
        assert_eq!(samples[0], 0x01_AAF0);
    }

    /// Scenario S1's marker tail is computed directly from the packet's
    /// own formula rather than hardcoded: spec.md's worked example states
    /// the tail as `0x105510`, but `(!0x01AAF0 + 1) & 0xFFFFFF` — the
    /// formula both spec.md and the original `WriteUInt16` describe —
    /// evaluates to `0xFE5510`. Treated as a transcription slip in the
    /// worked example; the round-trip invariant is what this module is
    /// actually held to.
    #[test]
    fn marker_tail_matches_twos_complement_formula() {
        let packet = sample_packet();
        let samples = packet.modulate();
        let lead = samples[0];
        let expected_tail = lead.wrapping_neg() & 0x00FF_FFFF;
        assert_eq!(samples[1], expected_tail);
        assert_eq!(expected_tail, 0x00FE_5510);
    }

    #[test]
    fn non_marker_words_do_not_set_sentinel_bit() {
        let packet = sample_packet();
        let samples = packet.modulate();
        for &lead in samples.iter().step_by(2).skip(1) {
            assert_eq!(lead & 0x01_0000, 0);
        }
    }

    #[test]
    fn demodulate_rejects_wrong_marker() {
        let mut samples = sample_packet().modulate();
        samples[0] = 0x01_0000;
        let err = SyncPacket::demodulate(&samples).unwrap_err();
        assert!(matches!(err, Error::SyncPacket(SyncPacketError::MarkerMismatch { .. })));
    }

    #[test]
    fn demodulate_rejects_truncated_input() {
        let samples = sample_packet().modulate();
        let err = SyncPacket::demodulate(&samples[..10]).unwrap_err();
        assert!(matches!(err, Error::SyncPacket(SyncPacketError::Truncated { .. })));
    }
}
