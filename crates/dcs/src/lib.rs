//! DCS (Digital Cinema Server) control-protocol messages, framing, and
//! session logic (§4.10).

pub mod error;
pub mod header;
pub mod klv;
pub mod message;
pub mod session;
pub mod status;

pub use error::{CodecError, SessionError};
pub use header::{MessageHeader, HEADER_SIZE};
pub use klv::TimelineExtension;
pub use message::DcsMessage;
pub use session::{
    run_client_session, run_server_session, ClientCallbacks, FrameReader, FrameWriter,
    ServerCallbacks, DEFAULT_LEASE_SECONDS,
};
pub use status::{ResponseKey, StatusResponse};
