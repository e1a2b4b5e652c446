//! Error types for the aux-data codec, prefetcher, responder, and validator.

use dcsync_core::ids::{PackKey, Ul};
use thiserror::Error;

/// Errors raised while encoding or decoding `AuxDataBlockTransferHeader` and
/// `AuxDataBlock` records (§4.7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("wire codec error: {0}")]
    Wire(#[from] dcsync_core::WireError),

    #[error("expected pack key {expected:?}, found {found:?}")]
    WrongPackKey { expected: PackKey, found: PackKey },

    #[error("record declared length {declared}, but body consumed {consumed} byte(s)")]
    LengthMismatch { declared: u32, consumed: u32 },
}

/// Errors raised by the prefetcher's HTTP round trip (§4.8).
#[derive(Debug, Error)]
pub enum PrefetchError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("prefetcher has no resource URL yet")]
    NoResourceUrl,
}

/// Errors raised by the responder while walking the show timeline to serve
/// a request (§4.9).
#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("no aux-data asset covers edit unit {start}")]
    NoCoveringAsset { start: u32 },

    #[error("essence coding UL {requested:?} does not match asset's {available:?}")]
    UlMismatch { requested: Ul, available: Ul },

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
