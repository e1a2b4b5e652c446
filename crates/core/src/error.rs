//! Structured error types shared by every crate in the sync stack.

use thiserror::Error;

/// Errors raised while reading or writing the big-endian wire codec (§4.1).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected end of buffer, needed {needed} more byte(s)")]
    UnexpectedEof { needed: usize },

    #[error("unrecognized BER lead byte 0x{byte:02x}")]
    BadBerLead { byte: u8 },

    #[error("BER value {value} exceeds the encoding's range")]
    BerOverflow { value: u64 },
}

/// Errors raised while demodulating a sync packet from a lead/tail sample
/// sequence (§4.2). Distinct from `WireError`, which operates on bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncPacketError {
    #[error("truncated sync packet, needed {needed} more sample(s)")]
    Truncated { needed: usize },

    #[error("expected sync marker 0xAAF0, found 0x{found:04x}")]
    MarkerMismatch { found: u16 },
}

/// Crate-wide error type for the sync stack.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration (unrecognized UUID text, zero
    /// `editUnitDuration`, missing CPL). Refuses a `NoData` exit per §7.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Wire-codec failure, always recoverable at the layer above.
    #[error("wire codec error: {0}")]
    Wire(#[from] WireError),

    /// Sync-packet demodulation failure.
    #[error("sync packet error: {0}")]
    SyncPacket(#[from] SyncPacketError),

    /// Malformed DCS or HTTP conversation.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Frame-recovery parser invalidated its current candidate frame. Not
    /// fatal: the parser resets and keeps hunting.
    #[error("frame sync error: {0}")]
    FrameSync(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock-free ring overflowed or underflowed past the point where
    /// silent recovery (drop input / emit silence) is appropriate.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_include_kind() {
        let err = Error::Configuration("missing CPL".to_string());
        assert_eq!(err.to_string(), "configuration error: missing CPL");

        let err: Error = WireError::BadBerLead { byte: 0x90 }.into();
        assert!(err.to_string().contains("0x90"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
