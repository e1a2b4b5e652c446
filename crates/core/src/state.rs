//! Per-engine state machines (§4.5, §4.6, §4.8, §4.10) and the observer
//! registry used to watch them.
//!
//! Each engine owns one small state enum plus an [`ObservableState`]
//! composed in beside it — no shared state supertype, no runtime
//! polymorphism. A state change is a single locked read-modify-write
//! followed by a best-effort broadcast to registered observers; nothing
//! here is called from the real-time audio callback itself, only from the
//! worker threads that drive each engine's tick.

use std::sync::{Mutex, RwLock};

/// Wraps a plain state enum with change notification. Setting a state
/// equal to the current one is a no-op and does not notify.
pub struct ObservableState<S> {
    current: RwLock<S>,
    observers: Mutex<Vec<Box<dyn Fn(S) + Send + Sync>>>,
}

impl<S: Copy + PartialEq> ObservableState<S> {
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self { current: RwLock::new(initial), observers: Mutex::new(Vec::new()) }
    }

    #[must_use]
    pub fn get(&self) -> S {
        let guard = match self.current.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard
    }

    /// Registers an observer invoked (synchronously, on the setter's
    /// thread) after every state change.
    pub fn observe(&self, f: impl Fn(S) + Send + Sync + 'static) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(Box::new(f));
        }
    }

    /// Transitions to `next`. Returns whether the state actually changed.
    pub fn set(&self, next: S) -> bool {
        let changed = {
            let mut guard = match self.current.write() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            if *guard == next {
                false
            } else {
                *guard = next;
                true
            }
        };
        if changed {
            if let Ok(observers) = self.observers.lock() {
                for observer in observers.iter() {
                    observer(next);
                }
            }
        }
        changed
    }
}

/// The emitter engine's play-state machine (§4.5): `SE_State::EState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    NoData,
    Stopped,
    Paused,
    WaitingToPlay,
    Playing,
}

impl EmitterState {
    /// The 2-bit `flags` tag a modulated sync packet carries for this
    /// state (§3, §4.5): 0 = stopped, 1 = paused (or waiting to play),
    /// 2 = playing.
    #[must_use]
    pub fn flags(self) -> u16 {
        match self {
            Self::NoData | Self::Stopped => 0,
            Self::Paused | Self::WaitingToPlay => 1,
            Self::Playing => 2,
        }
    }
}

/// The processor engine's play-state machine (§4.6): `SS_State::EState`,
/// derived by the processor from a validated packet's `flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    NoData,
    Stopped,
    Paused,
    Playing,
}

impl ProcessorState {
    #[must_use]
    pub fn from_flags(flags: u16) -> Self {
        match flags {
            0 => Self::Stopped,
            1 => Self::Paused,
            2 => Self::Playing,
            _ => Self::NoData,
        }
    }
}

/// The aux-data prefetcher's connection/buffering progress (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetcherState {
    Disconnected,
    Buffering,
    Connected,
    Buffered,
}

/// The DCS TCP session's connection state (§4.10): `DCS_State::EState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcsState {
    Disconnected,
    Connected,
}

/// The processor-side client's DCS session phase (§4.10): `Client_State::EState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Wait,
    Connect,
    Buffer,
    Play,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn set_is_noop_when_state_unchanged() {
        let state = ObservableState::new(EmitterState::Stopped);
        assert!(!state.set(EmitterState::Stopped));
        assert!(state.set(EmitterState::Playing));
        assert_eq!(state.get(), EmitterState::Playing);
    }

    #[test]
    fn observers_are_notified_only_on_change() {
        let state = ObservableState::new(DcsState::Disconnected);
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        state.observe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        state.set(DcsState::Disconnected);
        assert_eq!(notifications.load(Ordering::SeqCst), 0);

        state.set(DcsState::Connected);
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emitter_flags_map_matches_packet_encoding() {
        assert_eq!(EmitterState::Stopped.flags(), 0);
        assert_eq!(EmitterState::WaitingToPlay.flags(), 1);
        assert_eq!(EmitterState::Playing.flags(), 2);
    }

    #[test]
    fn processor_state_from_flags_round_trips_known_values() {
        assert_eq!(ProcessorState::from_flags(0), ProcessorState::Stopped);
        assert_eq!(ProcessorState::from_flags(1), ProcessorState::Paused);
        assert_eq!(ProcessorState::from_flags(2), ProcessorState::Playing);
        assert_eq!(ProcessorState::from_flags(7), ProcessorState::NoData);
    }
}
