//! Emitter and processor worker engines (§4.5, §4.6): the two fixed
//! real-time pipelines this system runs, each a plain `std::thread` loop
//! driven off a [`dcsync_core::ring`] pair — not a general pipeline graph.

pub mod emitter;
pub mod pcm;
pub mod processor;

pub use emitter::{Emitter, EmitterConfig, GetFrameData};
pub use processor::{OnValidatedPacket, Processor, ProcessorConfig};
