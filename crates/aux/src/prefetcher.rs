//! Aux-data prefetcher, the client half of §4.8.
//!
//! Dormant until [`Prefetcher::set_resource_location`] hands it a base URL
//! (as DCS's `SetRPLLocationRequest` would), at which point it issues an
//! initial GET and then runs a deadline loop on a worker task: sleep until
//! the configured margin before the next window is due, fetch it, decode
//! the response into `AuxDataBlock`s, and push them onto the queue the
//! validator reads from.
//!
//! The original runs the GET on its own thread so the deadline loop can
//! keep ticking while a request is outstanding, logging "deadline missed"
//! if playback catches up first. This port instead awaits each GET inline
//! before computing the next deadline — the at-most-one-outstanding-request
//! invariant of §5 holds either way, and a sequential await is the simpler
//! thing to get right in async Rust. Recorded in `DESIGN.md`.

use crate::codec::{AuxDataBlock, AuxDataBlockTransferHeader};
use crate::error::PrefetchError;
use dcsync_core::ids::Ul;
use dcsync_core::state::{ObservableState, PrefetcherState};
use dcsync_core::wire::Reader;
use rtrb::Producer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptMode {
    Plaintext,
    Encrypted,
}

impl AcceptMode {
    const fn as_query_value(self) -> &'static str {
        match self {
            Self::Plaintext => "plaintext",
            Self::Encrypted => "encrypted",
        }
    }
}

/// All path-affecting request state, mutex-guarded since setters may run on
/// a foreign thread (the DCS socket thread handing over a new coding UL).
struct PathState {
    coding_ul: Ul,
    start_edit_unit: u32,
    accept: AcceptMode,
}

pub struct PrefetcherConfig {
    pub edit_units_per_request: u32,
    pub edit_units_ahead_of_current_edit_unit_to_request: u32,
    pub edit_units_ahead_of_current_edit_unit_to_initiate_request: u32,
}

pub struct Prefetcher {
    client: reqwest::Client,
    base_url: Mutex<Option<String>>,
    path: Mutex<PathState>,
    ms_per_frame: Mutex<f64>,
    config: PrefetcherConfig,
    state: ObservableState<PrefetcherState>,
    current_frame: Arc<dyn Fn() -> u32 + Send + Sync>,
    producer: Mutex<Producer<AuxDataBlock>>,
    running: Arc<AtomicBool>,
    wake: Notify,
}

impl Prefetcher {
    #[must_use]
    pub fn new(
        config: PrefetcherConfig,
        current_frame: Arc<dyn Fn() -> u32 + Send + Sync>,
        producer: Producer<AuxDataBlock>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Mutex::new(None),
            path: Mutex::new(PathState {
                coding_ul: Ul::default(),
                start_edit_unit: 0,
                accept: AcceptMode::Plaintext,
            }),
            ms_per_frame: Mutex::new(1000.0 / 24.0),
            config,
            state: ObservableState::new(PrefetcherState::Disconnected),
            current_frame,
            producer: Mutex::new(producer),
            running: Arc::new(AtomicBool::new(true)),
            wake: Notify::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> PrefetcherState {
        self.state.get()
    }

    pub fn observe_state(&self, f: impl Fn(PrefetcherState) + Send + Sync + 'static) {
        self.state.observe(f);
    }

    /// Sets the edit rate used to convert edit units to wall-clock
    /// milliseconds in the deadline loop. `1000 / (num/den)` per §4.8.
    pub fn set_edit_rate(&self, numerator: u32, denominator: u32) {
        let ms = 1000.0 * f64::from(denominator) / f64::from(numerator.max(1));
        *self.ms_per_frame.lock().expect("ms_per_frame poisoned") = ms;
    }

    /// Sets the source-data-essence-coding UL to request.
    pub fn set_coding_ul(&self, coding_ul: Ul) {
        self.path.lock().expect("path poisoned").coding_ul = coding_ul;
    }

    /// Sets whether to request plaintext or encrypted aux-data essence.
    pub fn set_accept_mode(&self, accept: AcceptMode) {
        self.path.lock().expect("path poisoned").accept = accept;
    }

    /// Hands the prefetcher a base URL (`http://host:port`), the moment
    /// DCS delivers a `SetRPLLocationRequest`. Resets `startEditUnit` to
    /// `start` and marks the prefetcher `Buffering`.
    pub fn set_resource_location(&self, base_url: impl Into<String>, start_edit_unit: u32) {
        *self.base_url.lock().expect("base_url poisoned") = Some(base_url.into());
        self.path.lock().expect("path poisoned").start_edit_unit = start_edit_unit;
        self.state.set(PrefetcherState::Buffering);
        self.wake.notify_one();
    }

    /// Signals the worker loop to stop and wakes it immediately.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn request_url(&self, base_url: &str, start: u32, count: u32) -> String {
        let path = self.path.lock().expect("path poisoned");
        format!(
            "{}/v1/auxdata/editunits?coding_UL={}&start={}&count={}&accept={}",
            base_url.trim_end_matches('/'),
            path.coding_ul.to_hex_upper(),
            start,
            count,
            path.accept.as_query_value()
        )
    }

    async fn fetch_window(&self, start: u32, count: u32) -> Result<(u32, u32), PrefetchError> {
        let base_url =
            self.base_url.lock().expect("base_url poisoned").clone().ok_or(PrefetchError::NoResourceUrl)?;
        let url = self.request_url(&base_url, start, count);

        let bytes = self.client.get(url).send().await?.error_for_status()?.bytes().await?;

        let mut r = Reader::new(&bytes);
        let header = AuxDataBlockTransferHeader::decode(&mut r)?;

        let mut producer = self.producer.lock().expect("producer poisoned");
        while r.remaining() > 0 {
            let block = AuxDataBlock::decode(&mut r)?;
            if producer.push(block).is_err() {
                tracing::warn!("aux-data validator queue full, dropping block");
            }
        }

        let next_start = if header.edit_unit_range_count > 0 {
            header.edit_unit_range_start_index + header.edit_unit_range_count
        } else {
            header.edit_unit_range_start_index
        };
        Ok((next_start, header.edit_unit_range_count))
    }

    /// Runs one deadline-loop iteration (§4.8 steps a-e). Returns `false`
    /// once `shutdown` has been signalled, so callers can loop this inside
    /// a worker task.
    pub async fn tick(&self) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        if self.base_url.lock().expect("base_url poisoned").is_none() {
            let timeout = tokio::time::sleep(Duration::from_millis(50));
            tokio::select! {
                () = timeout => {},
                () = self.wake.notified() => {},
            }
            return self.running.load(Ordering::SeqCst);
        }

        let current_frame = (self.current_frame)();
        let (start_edit_unit, ahead, margin, ms_per_frame) = {
            let path = self.path.lock().expect("path poisoned");
            let ms = *self.ms_per_frame.lock().expect("ms_per_frame poisoned");
            (
                path.start_edit_unit,
                self.config.edit_units_ahead_of_current_edit_unit_to_request,
                self.config.edit_units_ahead_of_current_edit_unit_to_initiate_request,
                ms,
            )
        };

        if current_frame > start_edit_unit {
            // Underflow: the processor has overtaken the prefetcher's window.
            let jumped = current_frame + ahead;
            self.path.lock().expect("path poisoned").start_edit_unit = jumped;
            return self.issue_request(jumped).await;
        }

        let frame_to_initiate_next_fetch_on = (start_edit_unit + ahead).saturating_sub(margin);
        if current_frame <= frame_to_initiate_next_fetch_on {
            let frames_to_wait = frame_to_initiate_next_fetch_on - current_frame;
            let sleep_ms = f64::from(frames_to_wait) * ms_per_frame;
            let timeout = tokio::time::sleep(Duration::from_millis(sleep_ms.round() as u64));
            tokio::select! {
                () = timeout => {},
                () = self.wake.notified() => {},
            }
            return self.running.load(Ordering::SeqCst);
        }

        self.issue_request(start_edit_unit).await
    }

    async fn issue_request(&self, start_edit_unit: u32) -> bool {
        let count = self.config.edit_units_per_request;
        match self.fetch_window(start_edit_unit, count).await {
            Ok((next_start, _count_read)) => {
                self.path.lock().expect("path poisoned").start_edit_unit = next_start;
                self.state.set(PrefetcherState::Connected);
                self.state.set(PrefetcherState::Buffered);
            },
            Err(err) => {
                tracing::warn!(%err, "aux-data fetch failed, rewinding window");
                let mut path = self.path.lock().expect("path poisoned");
                path.start_edit_unit = path.start_edit_unit.saturating_sub(count);
                self.state.set(PrefetcherState::Disconnected);
            },
        }
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_has_the_documented_shape() {
        let (producer, _consumer) = rtrb::RingBuffer::new(4);
        let prefetcher = Prefetcher::new(
            PrefetcherConfig {
                edit_units_per_request: 240,
                edit_units_ahead_of_current_edit_unit_to_request: 480,
                edit_units_ahead_of_current_edit_unit_to_initiate_request: 48,
            },
            Arc::new(|| 0),
            producer,
        );
        prefetcher.set_coding_ul(Ul::from_bytes([0xAB; 16]));
        let url = prefetcher.request_url("http://localhost:8080", 100, 240);
        assert_eq!(
            url,
            format!(
                "http://localhost:8080/v1/auxdata/editunits?coding_UL={}&start=100&count=240&accept=plaintext",
                "AB".repeat(16)
            )
        );
    }

    #[tokio::test]
    async fn tick_is_a_noop_before_a_resource_location_is_set() {
        let (producer, _consumer) = rtrb::RingBuffer::new(4);
        let prefetcher = Prefetcher::new(
            PrefetcherConfig {
                edit_units_per_request: 10,
                edit_units_ahead_of_current_edit_unit_to_request: 20,
                edit_units_ahead_of_current_edit_unit_to_initiate_request: 2,
            },
            Arc::new(|| 0),
            producer,
        );
        assert_eq!(prefetcher.state(), PrefetcherState::Disconnected);
        prefetcher.shutdown();
        assert!(!prefetcher.tick().await);
    }
}
