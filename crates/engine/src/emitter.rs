//! Emitter engine (§4.5): the playback-side worker thread.
//!
//! Grounded on `original_source/src/client/SE` (the `SE_State::EState`
//! play-state machine, re-expressed here as `dcsync_core::state::EmitterState`
//! plus this module's tick/transition logic) and on §4.2/§4.4's sync-packet
//! modulation and ring-buffer handoff, which this module composes.

use crate::pcm::int24_to_f32;
use dcsync_core::ring::WorkerRingHandles;
use dcsync_core::state::{EmitterState, ObservableState};
use dcsync_core::sync_packet::SyncPacket;
use dcsync_show::FrameInfo;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Looks up the `FrameInfo` for a frame index, or `None` if the show has
/// no data there (e.g. it hasn't been loaded, or the index is out of
/// range). Injected so this crate never depends on `dcsync-show` parsing
/// details directly.
pub type GetFrameData = dyn Fn(i32) -> Option<FrameInfo> + Send + Sync;

pub struct EmitterConfig {
    pub sample_rate: u32,
    pub chunk_len: usize,
    pub queue_depth: usize,
    pub show_length_frames: i32,
}

fn half_queue_sleep(config: &EmitterConfig) -> Duration {
    let buffer_duration = Duration::from_secs_f64(config.chunk_len as f64 / f64::from(config.sample_rate.max(1)));
    buffer_duration * u32::try_from(config.queue_depth / 2).unwrap_or(1).max(1)
}

/// Drives playback: on each tick, advances `currentFrame` when `Playing`,
/// looks up that frame's `FrameInfo`, modulates a sync packet into PCM,
/// and pushes audio-callback-sized chunks onto the filled ring.
pub struct Emitter {
    state: ObservableState<EmitterState>,
    current_frame: AtomicI32,
    playout_id: AtomicU32,
    processor_ready: AtomicBool,
    config: EmitterConfig,
    get_frame_data: Arc<GetFrameData>,
    ring: Mutex<WorkerRingHandles>,
    keep_running: AtomicBool,
    /// A chunk that straddled a frame boundary, carried over and
    /// completed from the next frame's modulated PCM (§4.5).
    pending_chunk: Mutex<Vec<f32>>,
}

impl Emitter {
    #[must_use]
    pub fn new(config: EmitterConfig, get_frame_data: Arc<GetFrameData>, ring: WorkerRingHandles) -> Self {
        let chunk_len = config.chunk_len;
        Self {
            state: ObservableState::new(EmitterState::NoData),
            current_frame: AtomicI32::new(0),
            playout_id: AtomicU32::new(0),
            processor_ready: AtomicBool::new(false),
            config,
            get_frame_data,
            ring: Mutex::new(ring),
            keep_running: AtomicBool::new(false),
            pending_chunk: Mutex::new(Vec::with_capacity(chunk_len)),
        }
    }

    #[must_use]
    pub fn state(&self) -> EmitterState {
        self.state.get()
    }

    pub fn observe_state(&self, f: impl Fn(EmitterState) + Send + Sync + 'static) {
        self.state.observe(f);
    }

    #[must_use]
    pub fn current_frame(&self) -> i32 {
        self.current_frame.load(Ordering::SeqCst)
    }

    /// Invoked by the DCS session's `IsReadyCallback` hookup.
    pub fn set_processor_ready(&self, ready: bool) {
        self.processor_ready.store(ready, Ordering::SeqCst);
        if ready && self.state.get() == EmitterState::WaitingToPlay {
            self.state.set(EmitterState::Playing);
        }
    }

    /// Invoked by the DCS session's `SetPlayoutIDCallback` hookup.
    pub fn set_playout_id(&self, playout_id: u32) {
        self.playout_id.store(playout_id, Ordering::SeqCst);
    }

    /// Transitions out of `NoData` once a show has been loaded.
    pub fn initialize(&self) {
        if self.state.get() == EmitterState::NoData {
            self.state.set(EmitterState::Stopped);
        }
    }

    pub fn play(&self) {
        if self.state.get() == EmitterState::NoData {
            return;
        }
        if self.processor_ready.load(Ordering::SeqCst) {
            self.state.set(EmitterState::Playing);
        } else {
            self.state.set(EmitterState::WaitingToPlay);
        }
    }

    pub fn pause(&self) {
        if self.state.get() != EmitterState::NoData {
            self.state.set(EmitterState::Paused);
        }
    }

    pub fn stop(&self) {
        if self.state.get() != EmitterState::NoData {
            self.state.set(EmitterState::Stopped);
            self.current_frame.store(0, Ordering::SeqCst);
        }
    }

    pub fn set_frame(&self, frame: i32) {
        self.current_frame.store(frame, Ordering::SeqCst);
    }

    pub fn return_to_start(&self) {
        self.set_frame(0);
    }

    /// Forces `NoData`, discarding playback position. Re-initializing
    /// (sample rate, max frame size, show length) requires leaving and
    /// re-entering `NoData` (§4.5).
    pub fn reset(&self) {
        self.state.set(EmitterState::NoData);
        self.current_frame.store(0, Ordering::SeqCst);
        if let Ok(mut pending) = self.pending_chunk.lock() {
            pending.clear();
        }
    }

    pub fn shutdown(&self) {
        self.keep_running.store(false, Ordering::SeqCst);
    }

    /// Runs the worker loop until [`Emitter::shutdown`] is called.
    /// Intended to be spawned on its own `std::thread`, outside any async
    /// runtime (§5: real-time deadlines are incompatible with an async
    /// executor's scheduling guarantees).
    pub fn run(&self) {
        self.keep_running.store(true, Ordering::SeqCst);
        let sleep_duration = half_queue_sleep(&self.config);
        while self.keep_running.load(Ordering::SeqCst) {
            self.tick();
            std::thread::sleep(sleep_duration);
        }
    }

    fn tick(&self) {
        let state = self.state.get();
        if state == EmitterState::NoData {
            return;
        }

        let mut frame_index = self.current_frame.load(Ordering::SeqCst);
        if state == EmitterState::Playing {
            frame_index += 1;
            if frame_index >= self.config.show_length_frames {
                debug!(frame_index, "emitter reached end of show, resetting");
                self.reset();
                return;
            }
            self.current_frame.store(frame_index, Ordering::SeqCst);
        }

        let Some(frame_info) = (self.get_frame_data)(frame_index) else {
            if state == EmitterState::Playing {
                error!(frame_index, "frame data lookup failed during playback, resetting emitter");
                self.reset();
            }
            return;
        };

        let packet = self.build_sync_packet(frame_index, &frame_info, state);
        let raw_samples = packet.modulate();
        let pcm: Vec<f32> = raw_samples.into_iter().map(int24_to_f32).collect();
        self.push_chunks(&pcm);
    }

    fn build_sync_packet(&self, frame_index: i32, info: &FrameInfo, state: EmitterState) -> SyncPacket {
        let edit_rate = info.edit_rate;
        let edit_unit_duration = edit_rate.samples_per_edit_unit(self.config.sample_rate);
        SyncPacket {
            flags: state.flags(),
            timeline_edit_unit_index: frame_index.max(0) as u32,
            playout_id: self.playout_id.load(Ordering::SeqCst),
            edit_unit_duration: edit_unit_duration.min(u32::from(u16::MAX)) as u16,
            sample_duration_num: edit_rate.denominator,
            sample_duration_den: edit_rate.numerator,
            primary_picture_output_offset: 0,
            primary_picture_screen_offset: 0,
            primary_picture_track_file_edit_unit_index: frame_index.max(0) as u32,
            primary_picture_track_file_uuid: info.primary_picture_track_file_uuid,
            primary_sound_track_file_edit_unit_index: frame_index.max(0) as u32,
            primary_sound_track_file_uuid: info.primary_sound_track_file_uuid,
            composition_playlist_uuid: info.composition_playlist_uuid,
            extension: Vec::new(),
        }
    }

    fn push_chunks(&self, pcm: &[f32]) {
        let Ok(mut pending) = self.pending_chunk.lock() else { return };
        let chunk_len = self.config.chunk_len.max(1);
        let mut cursor = 0;

        if !pending.is_empty() {
            let need = chunk_len - pending.len();
            let take = need.min(pcm.len());
            pending.extend_from_slice(&pcm[..take]);
            cursor = take;
            if pending.len() == chunk_len {
                self.enqueue_chunk(std::mem::take(&mut *pending));
            }
        }

        while cursor + chunk_len <= pcm.len() {
            self.enqueue_chunk(pcm[cursor..cursor + chunk_len].to_vec());
            cursor += chunk_len;
        }

        if cursor < pcm.len() {
            pending.extend_from_slice(&pcm[cursor..]);
        }
    }

    fn enqueue_chunk(&self, samples: Vec<f32>) {
        let Ok(mut ring) = self.ring.lock() else { return };
        let Ok(mut buffer) = ring.free_consumer.pop() else {
            warn!("free ring exhausted, dropping a filled chunk");
            return;
        };
        let n = samples.len().min(buffer.len());
        buffer[..n].copy_from_slice(&samples[..n]);
        if ring.filled_producer.push(buffer).is_err() {
            warn!("filled ring full, dropping a chunk");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcsync_core::editrate::EditRate;
    use dcsync_core::ids::Uuid;
    use dcsync_core::ring::build_rings;

    fn frame_info() -> FrameInfo {
        FrameInfo {
            primary_picture_track_file_uuid: Uuid::from_bytes([1; 16]),
            primary_sound_track_file_uuid: Uuid::from_bytes([2; 16]),
            composition_playlist_uuid: Uuid::from_bytes([3; 16]),
            edit_rate: EditRate::FPS_24,
        }
    }

    fn test_emitter(show_length_frames: i32) -> (Emitter, dcsync_core::ring::AudioRingHandles) {
        let (worker, audio) = build_rings(8, 256);
        let config =
            EmitterConfig { sample_rate: 48_000, chunk_len: 256, queue_depth: 8, show_length_frames };
        let emitter = Emitter::new(config, Arc::new(|_frame| Some(frame_info())), worker);
        (emitter, audio)
    }

    #[test]
    fn play_waits_for_processor_ready() {
        let (emitter, _audio) = test_emitter(1000);
        emitter.initialize();
        emitter.play();
        assert_eq!(emitter.state(), EmitterState::WaitingToPlay);

        emitter.set_processor_ready(true);
        assert_eq!(emitter.state(), EmitterState::Playing);
    }

    #[test]
    fn play_goes_straight_to_playing_when_already_ready() {
        let (emitter, _audio) = test_emitter(1000);
        emitter.initialize();
        emitter.set_processor_ready(true);
        emitter.play();
        assert_eq!(emitter.state(), EmitterState::Playing);
    }

    #[test]
    fn tick_advances_frame_only_while_playing() {
        let (emitter, _audio) = test_emitter(1000);
        emitter.initialize();
        emitter.set_processor_ready(true);
        emitter.play();

        emitter.tick();
        assert_eq!(emitter.current_frame(), 1);

        emitter.pause();
        emitter.tick();
        assert_eq!(emitter.current_frame(), 1);
    }

    #[test]
    fn tick_pushes_a_chunk_onto_the_filled_ring() {
        let (emitter, mut audio) = test_emitter(1000);
        emitter.initialize();
        emitter.set_processor_ready(true);
        emitter.play();
        emitter.tick();

        assert!(audio.filled_consumer.pop().is_ok());
    }

    #[test]
    fn reaching_show_length_resets_to_no_data() {
        let (emitter, _audio) = test_emitter(2);
        emitter.initialize();
        emitter.set_processor_ready(true);
        emitter.play();
        emitter.set_frame(1);

        emitter.tick();
        assert_eq!(emitter.state(), EmitterState::NoData);
        assert_eq!(emitter.current_frame(), 0);
    }

    #[test]
    fn no_data_tick_is_a_noop() {
        let (emitter, mut audio) = test_emitter(1000);
        emitter.tick();
        assert_eq!(emitter.current_frame(), 0);
        assert!(audio.filled_consumer.pop().is_err());
    }
}
