//! Wire codec, sync-packet modulation, frame recovery, and real-time ring
//! buffers for the ST 430-10/430-14 sync stack.
//!
//! ## Modules
//!
//! - [`wire`]: big-endian cursor codec (fixed-width primitives, BER-4/BER-5 lengths)
//! - [`ids`]: `Uuid`/`Ul`/`PackKey` fixed 16-byte identifiers
//! - [`editrate`]: rational edit rate and sample-count conversions
//! - [`sync_packet`]: sync-packet modulation/demodulation
//! - [`frame_recovery`]: resynchronizing audio-stream parser
//! - [`ring`]: lock-free SPSC ring pair for the real-time audio boundary
//! - [`state`]: per-engine state machines and the observer registry
//! - [`error`]: crate-wide error types

pub mod editrate;
pub mod error;
pub mod frame_recovery;
pub mod ids;
pub mod ring;
pub mod state;
pub mod sync_packet;
pub mod wire;

pub use error::{Error, Result, SyncPacketError, WireError};
pub use ids::{PackKey, Ul, Uuid};
pub use sync_packet::SyncPacket;
