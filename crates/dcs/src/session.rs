//! Framing and the two conversation state machines that drive a DCS TCP
//! session (§4.10): "Framing", "Conversation on the server side", and
//! "Conversation on the client side".
//!
//! Grounded on `original_source/src/commands/DCS_Message.cpp`'s read loop
//! (read the fixed header, then exactly `length` more bytes, then dispatch)
//! and on the server/client conversation description. The original drives
//! both sides from a class hierarchy of `DCS_Message` handlers; this splits
//! the same behavior into two plain async functions, one per side, since
//! nothing else needs to substitute a handler at runtime.

use crate::error::SessionError;
use crate::header::{MessageHeader, HEADER_SIZE};
use crate::message::DcsMessage;
use crate::status::{ResponseKey, StatusResponse};
use dcsync_core::state::{ClientState, DcsState, ObservableState};
use dcsync_core::wire::Reader;
use std::sync::Arc;
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::{debug, warn};

/// Default lease duration offered in `GetNewLeaseRequest`, in seconds.
pub const DEFAULT_LEASE_SECONDS: u32 = 60;

/// Reads one complete DCS frame at a time: the fixed 20-byte header, then
/// exactly `header.length` more bytes.
pub struct FrameReader<R> {
    inner: ReadHalf<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// # Errors
    /// Returns [`SessionError::Closed`] if the peer closes mid-frame, or a
    /// codec error on a malformed header or payload.
    pub async fn read_message(&mut self) -> Result<DcsMessage, SessionError> {
        let mut header_buf = [0u8; HEADER_SIZE];
        self.inner.read_exact(&mut header_buf).await.map_err(map_eof)?;
        let mut r = Reader::new(&header_buf);
        let header = MessageHeader::decode(&mut r)?;

        let mut payload = vec![0u8; header.length as usize];
        self.inner.read_exact(&mut payload).await.map_err(map_eof)?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&header_buf);
        frame.extend_from_slice(&payload);
        DcsMessage::decode(&frame).map_err(Into::into)
    }
}

/// Writes complete DCS frames. A `&mut FrameWriter` serializes writes by
/// construction, so two concurrent senders can never interleave a header
/// with someone else's payload.
pub struct FrameWriter<W> {
    inner: WriteHalf<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub async fn write_message(&mut self, msg: &DcsMessage) -> Result<(), SessionError> {
        let bytes = msg.encode();
        self.inner.write_all(&bytes).await?;
        Ok(())
    }
}

fn map_eof(err: std::io::Error) -> SessionError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        SessionError::Closed
    } else {
        SessionError::Io(err)
    }
}

fn split_frames<S: AsyncRead + AsyncWrite + Unpin>(stream: S) -> (FrameReader<S>, FrameWriter<S>) {
    let (r, w) = split(stream);
    (FrameReader { inner: r }, FrameWriter { inner: w })
}

/// Hands the server's emitter the 32-bit `playoutID` assigned to a newly
/// leased connection, and asks whether the processor has finished loading
/// enough to report ready.
pub struct ServerCallbacks {
    pub set_playout_id: Arc<dyn Fn(u32) + Send + Sync>,
    pub is_processor_ready: Arc<dyn Fn() -> bool + Send + Sync>,
}

/// Drives one accepted connection through the server-side conversation:
/// announce, lease, hand out the aux-data resource location, then answer
/// status polls until the peer disconnects or sends `TerminateLeaseRequest`.
///
/// # Errors
/// Returns [`SessionError`] on any read/write failure; the session's state
/// is always left `Disconnected` before returning.
pub async fn run_server_session<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    resource_url: String,
    callbacks: &ServerCallbacks,
    state: &ObservableState<DcsState>,
) -> Result<(), SessionError> {
    let (mut reader, mut writer) = split_frames(stream);
    state.set(DcsState::Connected);

    let mut next_request_id: u32 = 1;
    let mut alloc_id = move || {
        let id = next_request_id;
        next_request_id = next_request_id.wrapping_add(1);
        id
    };

    let outcome = run_server_loop(&mut reader, &mut writer, &resource_url, callbacks, &mut alloc_id).await;
    state.set(DcsState::Disconnected);
    outcome
}

async fn run_server_loop<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    resource_url: &str,
    callbacks: &ServerCallbacks,
    alloc_id: &mut impl FnMut() -> u32,
) -> Result<(), SessionError> {
    writer
        .write_message(&DcsMessage::AnnounceRequest {
            request_id: alloc_id(),
            server_time: 0,
            device_description: "dcsync-server".to_string(),
        })
        .await?;

    loop {
        let msg = reader.read_message().await?;
        debug!(kind = ?msg.kind(), "server session received message");
        match msg {
            DcsMessage::AnnounceResponse { .. } => {
                writer
                    .write_message(&DcsMessage::GetNewLeaseRequest {
                        request_id: alloc_id(),
                        lease_duration: DEFAULT_LEASE_SECONDS,
                    })
                    .await?;
            },
            DcsMessage::GetNewLeaseResponse { status, .. } => {
                if status.key == ResponseKey::Successful {
                    let playout_id: u32 = rand::random();
                    (callbacks.set_playout_id)(playout_id);
                    writer
                        .write_message(&DcsMessage::SetRplLocationRequest {
                            request_id: alloc_id(),
                            playout_id,
                            resource_url: resource_url.to_string(),
                        })
                        .await?;
                } else {
                    warn!(status = ?status.key, "lease request refused");
                }
            },
            DcsMessage::SetRplLocationResponse { status, .. } => {
                if status.key != ResponseKey::Successful {
                    warn!(status = ?status.key, "processor rejected aux-data resource location");
                }
            },
            DcsMessage::GetStatusResponse { status, .. } => {
                if status.key == ResponseKey::Successful {
                    let _ready = (callbacks.is_processor_ready)();
                }
            },
            DcsMessage::TerminateLeaseRequest { request_id } => {
                writer
                    .write_message(&DcsMessage::TerminateLeaseResponse {
                        request_id,
                        status: StatusResponse::ok(),
                    })
                    .await?;
                return Ok(());
            },
            _ => {},
        }
    }
}

/// Invoked with the `playoutID` and resource URL from a `SetRPLLocationRequest`.
pub struct ClientCallbacks {
    pub set_rpl_location: Arc<dyn Fn(u32, &str) + Send + Sync>,
}

/// Drives one client-side connection: answer every request immediately,
/// echoing its `requestID`, and invoke `callbacks.set_rpl_location` when
/// the server hands over the aux-data resource location.
///
/// # Errors
/// Returns [`SessionError`] on any read/write failure; the session's state
/// is always left `Wait` before returning.
pub async fn run_client_session<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    callbacks: &ClientCallbacks,
    state: &ObservableState<ClientState>,
) -> Result<(), SessionError> {
    let (mut reader, mut writer) = split_frames(stream);
    state.set(ClientState::Connect);

    let outcome = run_client_loop(&mut reader, &mut writer, callbacks, state).await;
    state.set(ClientState::Wait);
    outcome
}

async fn run_client_loop<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    callbacks: &ClientCallbacks,
    state: &ObservableState<ClientState>,
) -> Result<(), SessionError> {
    loop {
        let msg = reader.read_message().await?;
        debug!(kind = ?msg.kind(), "client session received message");
        match msg {
            DcsMessage::AnnounceRequest { request_id, .. } => {
                writer
                    .write_message(&DcsMessage::AnnounceResponse {
                        request_id,
                        client_time: 0,
                        description: "dcsync-client".to_string(),
                        status: StatusResponse::ok(),
                    })
                    .await?;
            },
            DcsMessage::GetNewLeaseRequest { request_id, .. } => {
                writer
                    .write_message(&DcsMessage::GetNewLeaseResponse {
                        request_id,
                        status: StatusResponse::ok(),
                    })
                    .await?;
            },
            DcsMessage::GetStatusRequest { request_id } => {
                writer
                    .write_message(&DcsMessage::GetStatusResponse {
                        request_id,
                        status: StatusResponse::ok(),
                    })
                    .await?;
            },
            DcsMessage::SetRplLocationRequest { request_id, playout_id, resource_url } => {
                (callbacks.set_rpl_location)(playout_id, &resource_url);
                writer
                    .write_message(&DcsMessage::SetRplLocationResponse {
                        request_id,
                        status: StatusResponse::ok(),
                    })
                    .await?;
                state.set(ClientState::Buffer);
            },
            DcsMessage::SetOutputModeRequest { request_id, .. } => {
                writer
                    .write_message(&DcsMessage::SetOutputModeResponse {
                        request_id,
                        status: StatusResponse::ok(),
                    })
                    .await?;
                state.set(ClientState::Play);
            },
            DcsMessage::UpdateTimelineRequest { request_id, .. } => {
                writer
                    .write_message(&DcsMessage::UpdateTimelineResponse {
                        request_id,
                        status: StatusResponse::ok(),
                    })
                    .await?;
            },
            DcsMessage::TerminateLeaseRequest { request_id } => {
                writer
                    .write_message(&DcsMessage::TerminateLeaseResponse {
                        request_id,
                        status: StatusResponse::ok(),
                    })
                    .await?;
                return Ok(());
            },
            other => {
                warn!(kind = ?other.kind(), "client session ignoring unexpected message");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Drives `run_server_session` from the test as a scripted peer,
    /// answering each request the way a real client would, then
    /// terminates the lease so the server task converges deterministically.
    #[tokio::test]
    async fn server_session_hands_out_a_playout_id_and_resource_location() {
        let (server_io, peer_io) = tokio::io::duplex(4096);

        let observed_playout_id = Arc::new(AtomicU32::new(0));
        let observed_playout_id_cb = observed_playout_id.clone();
        let server_callbacks = ServerCallbacks {
            set_playout_id: Arc::new(move |id| observed_playout_id_cb.store(id, Ordering::SeqCst)),
            is_processor_ready: Arc::new(|| true),
        };
        let server_state = ObservableState::new(DcsState::Disconnected);

        let server_task = tokio::spawn(async move {
            run_server_session(
                server_io,
                "http://127.0.0.1:9000/".to_string(),
                &server_callbacks,
                &server_state,
            )
            .await
        });

        let (mut peer_reader, mut peer_writer) = split_frames(peer_io);

        let announce = peer_reader.read_message().await.unwrap();
        let DcsMessage::AnnounceRequest { request_id, .. } = announce else {
            panic!("expected AnnounceRequest, got {announce:?}");
        };
        peer_writer
            .write_message(&DcsMessage::AnnounceResponse {
                request_id,
                client_time: 0,
                description: "test-peer".to_string(),
                status: StatusResponse::ok(),
            })
            .await
            .unwrap();

        let lease = peer_reader.read_message().await.unwrap();
        let DcsMessage::GetNewLeaseRequest { request_id, .. } = lease else {
            panic!("expected GetNewLeaseRequest, got {lease:?}");
        };
        peer_writer
            .write_message(&DcsMessage::GetNewLeaseResponse { request_id, status: StatusResponse::ok() })
            .await
            .unwrap();

        let rpl = peer_reader.read_message().await.unwrap();
        let DcsMessage::SetRplLocationRequest { request_id, playout_id, resource_url } = rpl else {
            panic!("expected SetRplLocationRequest, got {rpl:?}");
        };
        assert_eq!(resource_url, "http://127.0.0.1:9000/");
        assert_eq!(playout_id, observed_playout_id.load(Ordering::SeqCst));
        peer_writer
            .write_message(&DcsMessage::SetRplLocationResponse { request_id, status: StatusResponse::ok() })
            .await
            .unwrap();

        peer_writer
            .write_message(&DcsMessage::TerminateLeaseRequest { request_id: 999 })
            .await
            .unwrap();
        let term_response = peer_reader.read_message().await.unwrap();
        assert!(matches!(term_response, DcsMessage::TerminateLeaseResponse { request_id: 999, .. }));

        let server_result = tokio::time::timeout(std::time::Duration::from_secs(1), server_task)
            .await
            .expect("server session should converge after TerminateLeaseRequest")
            .unwrap();
        assert!(server_result.is_ok());
        assert_eq!(server_state.get(), DcsState::Disconnected);
    }

    #[tokio::test]
    async fn client_session_answers_set_rpl_location_and_terminates() {
        let (client_io, peer_io) = tokio::io::duplex(4096);

        let observed = Arc::new(std::sync::Mutex::new((0u32, String::new())));
        let observed_cb = observed.clone();
        let client_callbacks = ClientCallbacks {
            set_rpl_location: Arc::new(move |playout_id, url| {
                *observed_cb.lock().unwrap() = (playout_id, url.to_string());
            }),
        };
        let client_state = ObservableState::new(ClientState::Wait);

        let client_task =
            tokio::spawn(async move { run_client_session(client_io, &client_callbacks, &client_state).await });

        let (mut peer_reader, mut peer_writer) = split_frames(peer_io);

        peer_writer
            .write_message(&DcsMessage::SetRplLocationRequest {
                request_id: 1,
                playout_id: 0xABCD_EF01,
                resource_url: "http://127.0.0.1:9100/".to_string(),
            })
            .await
            .unwrap();
        let response = peer_reader.read_message().await.unwrap();
        assert!(matches!(response, DcsMessage::SetRplLocationResponse { request_id: 1, .. }));
        assert_eq!(*observed.lock().unwrap(), (0xABCD_EF01, "http://127.0.0.1:9100/".to_string()));

        peer_writer
            .write_message(&DcsMessage::TerminateLeaseRequest { request_id: 2 })
            .await
            .unwrap();
        let term_response = peer_reader.read_message().await.unwrap();
        assert!(matches!(term_response, DcsMessage::TerminateLeaseResponse { request_id: 2, .. }));

        let client_result = tokio::time::timeout(std::time::Duration::from_secs(1), client_task)
            .await
            .expect("client session should converge after TerminateLeaseRequest")
            .unwrap();
        assert!(client_result.is_ok());
    }

    #[tokio::test]
    async fn frame_reader_reports_closed_on_eof_mid_header() {
        let (a, b) = tokio::io::duplex(64);
        drop(b);
        let (mut reader, _writer) = split_frames(a);
        let err = reader.read_message().await.unwrap_err();
        assert!(matches!(err, SessionError::Closed));
    }
}
