//! Resynchronizing stream parser (§4.3): recovers validated sync packets
//! from an append-only stream of 24-bit PCM samples that bears no
//! alignment relationship to frame boundaries, and raises silence
//! notifications.
//!
//! Samples are delivered in buffers of arbitrary size via repeated calls
//! to [`FrameRecoveryParser::append`]; state persists across calls so a
//! lead/tail pair or a payload can straddle a buffer boundary.

use crate::sync_packet::{self, SyncPacket, SYNC_MARKER_LEAD};

const DEFAULT_FRAME_SAMPLES: usize = 2000;
const PAYLOAD_SAMPLES: usize = 88;

/// Something the parser wants the caller to know about: a freshly
/// validated packet, or a silence-window transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Packet(SyncPacket),
    SilenceStarted,
    SilenceThresholdCrossed,
}

/// Parser state machine over one candidate frame at a time.
pub struct FrameRecoveryParser {
    sample_rate: u32,
    frame: Vec<u32>,
    offset_in_frame: usize,
    looking_for_tail: bool,
    candidate: Option<SyncPacket>,
    zero_run: u64,
    silence_started: bool,
    silence_crossed: bool,
    last_validated: Option<SyncPacket>,
}

impl FrameRecoveryParser {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frame: Vec::with_capacity(DEFAULT_FRAME_SAMPLES),
            offset_in_frame: 0,
            looking_for_tail: false,
            candidate: None,
            zero_run: 0,
            silence_started: false,
            silence_crossed: false,
            last_validated: None,
        }
    }

    #[must_use]
    pub fn last_validated(&self) -> Option<&SyncPacket> {
        self.last_validated.as_ref()
    }

    fn silence_threshold(&self) -> u64 {
        3 * u64::from(self.sample_rate)
    }

    /// Discards the current candidate frame and returns to hunting.
    pub fn reset(&mut self) {
        self.frame.clear();
        self.offset_in_frame = 0;
        self.looking_for_tail = false;
        self.candidate = None;
    }

    fn note_zero_sample(&mut self, events: &mut Vec<FrameEvent>) {
        self.zero_run += 1;
        if !self.silence_started {
            self.silence_started = true;
            events.push(FrameEvent::SilenceStarted);
        } else if !self.silence_crossed && self.zero_run >= self.silence_threshold() {
            self.silence_crossed = true;
            events.push(FrameEvent::SilenceThresholdCrossed);
        }
    }

    fn note_nonzero_or_lead_sample(&mut self) {
        self.zero_run = 0;
        self.silence_started = false;
        self.silence_crossed = false;
    }

    /// Target sample count for the current candidate: the baseline
    /// payload length until a header has been decoded, after which it is
    /// the decoded `editUnitDuration`.
    fn frame_target_len(&self) -> usize {
        self.candidate.as_ref().map_or(PAYLOAD_SAMPLES, |p| p.edit_unit_duration as usize)
    }

    /// Step 4: full payload present (88 samples). Validates the lead/tail
    /// relationship for every pair, rejects a stray marker repeat, rejects
    /// `length > 42` (extensions unsupported), and deserializes.
    fn validate_payload(&mut self) -> bool {
        if self.frame[4..PAYLOAD_SAMPLES].iter().any(|&s| s == SYNC_MARKER_LEAD) {
            return false;
        }
        for pair in self.frame.chunks_exact(2) {
            if sync_packet::expected_tail(pair[0]) != pair[1] {
                return false;
            }
        }
        let length = (self.frame[2] & 0xFFFF) as u16;
        if length > 42 {
            return false;
        }
        match SyncPacket::demodulate(&self.frame) {
            Ok(packet) if packet.edit_unit_duration > 0 => {
                self.candidate = Some(packet);
                true
            }
            _ => false,
        }
    }

    /// Step 6: scan the accumulated working buffer (excluding the failed
    /// lead at index 0) for another lead occurrence, and if found shift it
    /// down to offset 0 without discarding samples already past it.
    fn recover_from_overlap(&mut self) -> bool {
        let Some(k) = self.frame[1..self.offset_in_frame]
            .iter()
            .position(|&s| s == SYNC_MARKER_LEAD)
            .map(|idx| idx + 1)
        else {
            return false;
        };

        self.frame.drain(0..k);
        self.offset_in_frame -= k;
        self.candidate = None;

        if self.offset_in_frame >= 2 {
            let lead = self.frame[0];
            if sync_packet::expected_tail(lead) == self.frame[1] {
                self.looking_for_tail = false;
                true
            } else {
                self.reset();
                false
            }
        } else {
            self.looking_for_tail = true;
            true
        }
    }

    /// Appends a buffer of raw 24-bit samples (each carried in the low 24
    /// bits of a `u32`) and returns the events produced while consuming it.
    #[allow(clippy::cognitive_complexity)]
    pub fn append(&mut self, samples: &[u32]) -> Vec<FrameEvent> {
        let mut events = Vec::new();
        let mut i = 0;

        while i < samples.len() {
            let sample = samples[i];

            // Hunting: no committed lead yet.
            if self.offset_in_frame == 0 && !self.looking_for_tail {
                if sample == SYNC_MARKER_LEAD {
                    self.frame.clear();
                    self.frame.push(sample);
                    self.offset_in_frame = 1;
                    self.looking_for_tail = true;
                    self.note_nonzero_or_lead_sample();
                } else if sample == 0 {
                    self.note_zero_sample(&mut events);
                } else {
                    self.note_nonzero_or_lead_sample();
                }
                i += 1;
                continue;
            }

            // Lead committed, waiting for its tail (possibly across the
            // buffer boundary from a previous call).
            if self.looking_for_tail {
                let lead = self.frame[0];
                if sample == sync_packet::expected_tail(lead) {
                    self.frame.push(sample);
                    self.offset_in_frame = 2;
                    self.looking_for_tail = false;
                    i += 1;
                } else {
                    self.reset();
                    // Re-examine this sample as a hunting candidate.
                }
                continue;
            }

            // Payload accumulation (step 3/4).
            if self.offset_in_frame < PAYLOAD_SAMPLES {
                self.frame.push(sample);
                self.offset_in_frame += 1;
                i += 1;

                if self.offset_in_frame == PAYLOAD_SAMPLES && !self.validate_payload() {
                    self.reset();
                }
                continue;
            }

            // Fill validation (step 5): every remaining sample up to the
            // frame's target length must be exactly zero.
            let target = self.frame_target_len();
            if self.offset_in_frame < target {
                if sample != 0 {
                    if !self.recover_from_overlap() {
                        self.reset();
                    }
                    continue;
                }
                self.frame.push(sample);
                self.offset_in_frame += 1;
                i += 1;

                if self.offset_in_frame == target {
                    if let Some(packet) = self.candidate.take() {
                        events.push(FrameEvent::Packet(packet.clone()));
                        self.last_validated = Some(packet);
                    }
                    self.reset();
                }
                continue;
            }

            // Target already reached (target == PAYLOAD_SAMPLES, i.e. a
            // zero-padding-free frame); emit without further fill.
            if let Some(packet) = self.candidate.take() {
                events.push(FrameEvent::Packet(packet.clone()));
                self.last_validated = Some(packet);
            }
            self.reset();
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Uuid;

    fn packet(edit_unit_duration: u16) -> SyncPacket {
        SyncPacket {
            flags: 2,
            timeline_edit_unit_index: 7,
            playout_id: 0x1234_5678,
            edit_unit_duration,
            sample_duration_num: 1,
            sample_duration_den: 24,
            primary_picture_output_offset: 0,
            primary_picture_screen_offset: 0,
            primary_picture_track_file_edit_unit_index: 0,
            primary_picture_track_file_uuid: Uuid::from_bytes([0; 16]),
            primary_sound_track_file_edit_unit_index: 0,
            primary_sound_track_file_uuid: Uuid::from_bytes([0; 16]),
            composition_playlist_uuid: Uuid::from_bytes([0; 16]),
            extension: vec![],
        }
    }

    fn framed_samples(p: &SyncPacket) -> Vec<u32> {
        let mut samples = p.modulate();
        samples.resize(p.edit_unit_duration as usize, 0);
        samples
    }

    #[test]
    fn recovers_a_clean_frame() {
        let p = packet(2_000);
        let samples = framed_samples(&p);
        let mut parser = FrameRecoveryParser::new(48_000);
        let events = parser.append(&samples);
        assert_eq!(events, vec![FrameEvent::Packet(p.clone())]);
        assert_eq!(parser.last_validated(), Some(&p));
    }

    #[test]
    fn recovers_a_frame_split_across_two_buffers() {
        let p = packet(2_000);
        let samples = framed_samples(&p);
        let mut parser = FrameRecoveryParser::new(48_000);
        let mid = samples.len() / 2;
        let mut events = parser.append(&samples[..mid]);
        events.extend(parser.append(&samples[mid..]));
        assert_eq!(events, vec![FrameEvent::Packet(p)]);
    }

    #[test]
    fn silence_notifies_once_on_entry_and_once_on_threshold() {
        let mut parser = FrameRecoveryParser::new(10);
        let zeros = vec![0u32; 30];
        let events = parser.append(&zeros);
        assert_eq!(events, vec![FrameEvent::SilenceStarted, FrameEvent::SilenceThresholdCrossed]);
    }

    #[test]
    fn corrupted_tail_reenters_hunting_without_losing_a_later_marker() {
        let p = packet(2_000);
        let mut samples = framed_samples(&p);
        // Flip the marker's tail so the first candidate is invalidated,
        // but leave a second, genuine lead/tail pair immediately after.
        samples[1] ^= 0xFF;
        let mut parser = FrameRecoveryParser::new(48_000);
        let events = parser.append(&samples);
        // No packet recovered from this corrupted stream, and no panic.
        assert!(events.iter().all(|e| !matches!(e, FrameEvent::Packet(_))));
    }

    #[test]
    fn nonzero_sample_in_fill_region_invalidates_frame() {
        let p = packet(2_000);
        let mut samples = framed_samples(&p);
        let fill_index = samples.len() - 1;
        samples[fill_index] = 0x0000_01;
        let mut parser = FrameRecoveryParser::new(48_000);
        let events = parser.append(&samples);
        assert!(events.iter().all(|e| !matches!(e, FrameEvent::Packet(_))));
    }
}
