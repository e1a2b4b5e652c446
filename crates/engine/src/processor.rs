//! Processor engine (§4.6): the capture-side worker thread, built on
//! [`dcsync_core::frame_recovery`]'s resynchronizing parser.
//!
//! Rings here are shared with [`crate::emitter`]'s [`build_rings`] but the
//! roles invert: the real-time audio *capture* callback (outside this
//! crate, in an app's I/O layer) pops a free buffer, fills it with
//! captured samples, and pushes it to the filled ring — exactly the
//! `WorkerRingHandles` role the emitter's own worker plays. This engine's
//! worker thread is instead the *consumer* side, pulling filled buffers
//! and returning them to free, i.e. the `AudioRingHandles` role.
//!
//! [`build_rings`]: dcsync_core::ring::build_rings

use crate::pcm::f32_to_int24;
use dcsync_core::frame_recovery::{FrameEvent, FrameRecoveryParser};
use dcsync_core::ring::AudioRingHandles;
use dcsync_core::state::{ObservableState, ProcessorState};
use dcsync_core::sync_packet::SyncPacket;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

pub type OnValidatedPacket = dyn Fn(&SyncPacket) + Send + Sync;

pub struct ProcessorConfig {
    pub sample_rate: u32,
    pub chunk_len: usize,
    pub queue_depth: usize,
}

fn idle_sleep(config: &ProcessorConfig) -> Duration {
    let buffer_duration = Duration::from_secs_f64(config.chunk_len as f64 / f64::from(config.sample_rate.max(1)));
    buffer_duration * u32::try_from(config.queue_depth / 2).unwrap_or(1).max(1)
}

/// Drains captured PCM from the ring, recovers frame sync from it, and
/// reports each validated sync packet to an injected callback.
pub struct Processor {
    state: ObservableState<ProcessorState>,
    current_frame: AtomicU32,
    parser: Mutex<FrameRecoveryParser>,
    ring: Mutex<AudioRingHandles>,
    on_validated_packet: Arc<OnValidatedPacket>,
    keep_running: AtomicBool,
    config: ProcessorConfig,
}

impl Processor {
    #[must_use]
    pub fn new(config: ProcessorConfig, ring: AudioRingHandles, on_validated_packet: Arc<OnValidatedPacket>) -> Self {
        Self {
            state: ObservableState::new(ProcessorState::NoData),
            current_frame: AtomicU32::new(0),
            parser: Mutex::new(FrameRecoveryParser::new(config.sample_rate)),
            ring: Mutex::new(ring),
            on_validated_packet,
            keep_running: AtomicBool::new(false),
            config,
        }
    }

    #[must_use]
    pub fn state(&self) -> ProcessorState {
        self.state.get()
    }

    pub fn observe_state(&self, f: impl Fn(ProcessorState) + Send + Sync + 'static) {
        self.state.observe(f);
    }

    #[must_use]
    pub fn current_frame(&self) -> u32 {
        self.current_frame.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.keep_running.store(false, Ordering::SeqCst);
    }

    /// Runs the worker loop until [`Processor::shutdown`] is called.
    /// Intended for its own `std::thread`, same as [`crate::emitter::Emitter::run`].
    pub fn run(&self) {
        self.keep_running.store(true, Ordering::SeqCst);
        let sleep_duration = idle_sleep(&self.config);
        while self.keep_running.load(Ordering::SeqCst) {
            self.tick();
            std::thread::sleep(sleep_duration);
        }
    }

    /// Pops at most one filled buffer; if the ring is empty, returns
    /// immediately and lets `run`'s sleep act as the retry backoff.
    fn tick(&self) {
        let Ok(mut ring) = self.ring.lock() else { return };
        let Ok(buffer) = ring.filled_consumer.pop() else { return };

        let samples: Vec<u32> = buffer.iter().map(|&s| f32_to_int24(s)).collect();
        let _ = ring.free_producer.push(buffer);
        drop(ring);

        let events = {
            let Ok(mut parser) = self.parser.lock() else { return };
            parser.append(&samples)
        };

        for event in events {
            self.handle_event(event);
        }
    }

    fn handle_event(&self, event: FrameEvent) {
        match event {
            FrameEvent::Packet(packet) => {
                self.current_frame.store(packet.timeline_edit_unit_index, Ordering::SeqCst);
                self.state.set(ProcessorState::from_flags(packet.flags));
                (self.on_validated_packet)(&packet);
            }
            FrameEvent::SilenceStarted => {
                debug!("silence detected on processor input");
            }
            FrameEvent::SilenceThresholdCrossed => {
                warn!("silence threshold crossed, processor losing sync");
                self.state.set(ProcessorState::NoData);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcsync_core::ids::Uuid;
    use dcsync_core::ring::build_rings;
    use std::sync::atomic::AtomicUsize;

    fn sample_packet() -> SyncPacket {
        SyncPacket {
            flags: 2,
            timeline_edit_unit_index: 7,
            playout_id: 42,
            edit_unit_duration: 300,
            sample_duration_num: 1,
            sample_duration_den: 48_000,
            primary_picture_output_offset: 0,
            primary_picture_screen_offset: 0,
            primary_picture_track_file_edit_unit_index: 7,
            primary_picture_track_file_uuid: Uuid::from_bytes([1; 16]),
            primary_sound_track_file_edit_unit_index: 7,
            primary_sound_track_file_uuid: Uuid::from_bytes([2; 16]),
            composition_playlist_uuid: Uuid::from_bytes([3; 16]),
            extension: vec![],
        }
    }

    fn test_processor() -> (Processor, dcsync_core::ring::WorkerRingHandles) {
        let (worker, audio) = build_rings(8, 256);
        let config = ProcessorConfig { sample_rate: 48_000, chunk_len: 256, queue_depth: 8 };
        let processor = Processor::new(config, audio, Arc::new(|_packet| {}));
        (processor, worker)
    }

    fn feed(worker: &mut dcsync_core::ring::WorkerRingHandles, samples: &[f32]) {
        let mut buffer = worker.free_consumer.pop().unwrap();
        let n = samples.len().min(buffer.len());
        buffer[..n].copy_from_slice(&samples[..n]);
        worker.filled_producer.push(buffer).unwrap();
    }

    #[test]
    fn idle_tick_with_empty_ring_is_a_noop() {
        let (processor, _worker) = test_processor();
        processor.tick();
        assert_eq!(processor.state(), ProcessorState::NoData);
    }

    /// Modulates `packet` and zero-pads it out to its own `edit_unit_duration`,
    /// matching the fill region the parser requires before it will emit.
    fn framed_pcm(packet: &SyncPacket) -> Vec<f32> {
        let mut raw = packet.modulate();
        raw.resize(packet.edit_unit_duration as usize, 0);
        raw.iter().map(|&s| crate::pcm::int24_to_f32(s)).collect()
    }

    #[test]
    fn validated_packet_advances_frame_and_state() {
        let (processor, mut worker) = test_processor();
        let packet = sample_packet();
        let pcm = framed_pcm(&packet);

        for chunk in pcm.chunks(256) {
            let mut padded = vec![0.0f32; 256];
            padded[..chunk.len()].copy_from_slice(chunk);
            feed(&mut worker, &padded);
            processor.tick();
        }

        assert_eq!(processor.current_frame(), 7);
        assert_eq!(processor.state(), ProcessorState::Playing);
    }

    #[test]
    fn validated_packet_invokes_callback() {
        let (worker_ring, audio_ring) = build_rings(8, 256);
        let config = ProcessorConfig { sample_rate: 48_000, chunk_len: 256, queue_depth: 8 };
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let processor = Processor::new(config, audio_ring, Arc::new(move |_packet| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        let mut worker = worker_ring;

        let packet = sample_packet();
        let pcm = framed_pcm(&packet);
        for chunk in pcm.chunks(256) {
            let mut padded = vec![0.0f32; 256];
            padded[..chunk.len()].copy_from_slice(chunk);
            feed(&mut worker, &padded);
            processor.tick();
        }

        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn returned_buffers_go_back_to_the_free_ring() {
        let (processor, mut worker) = test_processor();
        let before = worker.free_consumer.slots();
        feed(&mut worker, &[0.0; 256]);
        processor.tick();
        assert_eq!(worker.free_consumer.slots(), before);
    }
}
