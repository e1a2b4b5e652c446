//! Error types for DCS message framing and session logic (§4.10).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("wire codec error: {0}")]
    Wire(#[from] dcsync_core::WireError),

    #[error("expected the DCS message-header pack key, found a different prefix")]
    WrongHeaderPrefix,

    #[error("unrecognized message kind (0x{kind1:02x}, 0x{kind2:02x})")]
    UnknownKind { kind1: u8, kind2: u8 },

    #[error("unrecognized status response key byte {byte}")]
    UnknownResponseKey { byte: i8 },

    #[error("payload text was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer closed the connection")]
    Closed,
}
