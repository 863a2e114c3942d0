//! Blocking request/reply client for the control channel.

use thiserror::Error;
use tracing::{debug, info};

use gateway_config::SocketEndpoint;

use crate::frame::{ErrorCode, Frame, FrameError, FrameKind, read_frame, write_frame};
use crate::protocol::ProtocolConfig;
use crate::transport::{ConnectError, ConnectionStream, connect};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Synchronous control-channel client.
pub trait ControlClient {
    /// Establishes the transport connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] when the peer cannot be reached. Retry
    /// and abort policy belongs to the caller.
    fn start(&mut self) -> Result<(), ClientError>;

    /// Sends one message and blocks until its reply or an error arrives.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] describing the local, transport, or peer
    /// failure. None of them poison the client for later calls.
    fn send_wait_reply(&mut self, message: &[u8]) -> Result<Vec<u8>, ClientError>;
}

/// Creates clients for a protocol. Implementations are chosen once at startup.
pub trait ClientFactory {
    /// Client type produced by the factory.
    type Client: ControlClient;

    /// Creates an unstarted client for `protocol`.
    fn create(&self, protocol: &'static ProtocolConfig) -> Self::Client;
}

/// Factory for clients that reach the server over a socket endpoint.
#[derive(Debug, Clone)]
pub struct SocketClientFactory {
    endpoint: SocketEndpoint,
}

impl SocketClientFactory {
    /// Builds a factory connecting to `endpoint`.
    #[must_use]
    pub const fn new(endpoint: SocketEndpoint) -> Self {
        Self { endpoint }
    }
}

impl ClientFactory for SocketClientFactory {
    type Client = SocketClient;

    fn create(&self, protocol: &'static ProtocolConfig) -> Self::Client {
        SocketClient {
            endpoint: self.endpoint.clone(),
            protocol,
            started: false,
            stream: None,
        }
    }
}

/// Client speaking the framed control protocol over a socket.
///
/// After a transport failure the broken stream is dropped and the next call
/// reconnects once before sending, so a restarted server is picked up without
/// restarting the client.
#[derive(Debug)]
pub struct SocketClient {
    endpoint: SocketEndpoint,
    protocol: &'static ProtocolConfig,
    started: bool,
    stream: Option<ConnectionStream>,
}

impl SocketClient {
    /// Endpoint this client connects to.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    fn stream(&mut self) -> Result<&mut ConnectionStream, ClientError> {
        if !self.started {
            return Err(ClientError::NotStarted);
        }
        match &mut self.stream {
            Some(stream) => Ok(stream),
            slot @ None => {
                let stream = connect(&self.endpoint)?;
                debug!(
                    target: CLIENT_TARGET,
                    endpoint = %self.endpoint,
                    "reconnected to control channel"
                );
                Ok(slot.insert(stream))
            }
        }
    }
}

impl ControlClient for SocketClient {
    fn start(&mut self) -> Result<(), ClientError> {
        let stream = connect(&self.endpoint)?;
        self.stream = Some(stream);
        self.started = true;
        info!(
            target: CLIENT_TARGET,
            endpoint = %self.endpoint,
            identifier = self.protocol.identifier,
            "connected to control channel"
        );
        Ok(())
    }

    fn send_wait_reply(&mut self, message: &[u8]) -> Result<Vec<u8>, ClientError> {
        let max = self.protocol.max_send_size;
        if message.len() > max {
            return Err(ClientError::MessageTooLarge {
                size: message.len(),
                max,
            });
        }
        let stream = self.stream()?;
        let result = exchange(stream, message, max);
        if let Err(error) = &result
            && error.breaks_connection()
        {
            self.stream = None;
        }
        result
    }
}

fn exchange(
    stream: &mut ConnectionStream,
    message: &[u8],
    max: usize,
) -> Result<Vec<u8>, ClientError> {
    write_frame(stream, FrameKind::SendWithReply, message).map_err(ClientError::Send)?;
    match read_frame(stream, max).map_err(ClientError::Receive)? {
        None => Err(ClientError::Disconnected),
        Some(Frame {
            kind: FrameKind::Reply,
            payload,
        }) => Ok(payload),
        Some(Frame {
            kind: FrameKind::Error,
            payload,
        }) => match payload.as_slice() {
            [raw] => match ErrorCode::from_u8(*raw) {
                Some(code) => Err(ClientError::Rejected { code }),
                None => Err(ClientError::UnknownErrorCode { value: *raw }),
            },
            _ => Err(ClientError::InvalidErrorFrame {
                size: payload.len(),
            }),
        },
        Some(Frame { kind, .. }) => Err(ClientError::UnexpectedFrame { kind }),
    }
}

/// Errors surfaced by [`ControlClient`] operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport connection could not be established.
    #[error(transparent)]
    Connect(#[from] ConnectError),
    /// `send_wait_reply` was called before `start`.
    #[error("control client has not been started")]
    NotStarted,
    /// The message exceeds the protocol's maximum size; nothing was sent.
    #[error("message of {size} bytes exceeds the {max}-byte protocol limit")]
    MessageTooLarge {
        /// Message size.
        size: usize,
        /// Protocol limit.
        max: usize,
    },
    /// Writing the request failed.
    #[error("failed to send control message: {0}")]
    Send(#[source] FrameError),
    /// Reading the reply failed.
    #[error("failed to receive control reply: {0}")]
    Receive(#[source] FrameError),
    /// The server closed the connection before replying.
    #[error("control server closed the connection before replying")]
    Disconnected,
    /// The server rejected the request.
    #[error("control server rejected the request: {code}")]
    Rejected {
        /// Reason reported by the server.
        code: ErrorCode,
    },
    /// The server reported an error code this build does not know.
    #[error("control server reported unknown error code {value}")]
    UnknownErrorCode {
        /// Received code.
        value: u8,
    },
    /// The server sent an error frame of the wrong size.
    #[error("control server sent a {size}-byte error frame")]
    InvalidErrorFrame {
        /// Received payload size.
        size: usize,
    },
    /// The server answered with a frame kind that is not a reply.
    #[error("control server answered with an unexpected {kind} frame")]
    UnexpectedFrame {
        /// Received frame kind.
        kind: FrameKind,
    },
}

impl ClientError {
    /// Whether the stream can no longer be trusted to be aligned with the
    /// server and must be re-established.
    #[must_use]
    pub const fn breaks_connection(&self) -> bool {
        match self {
            Self::Send(_) | Self::Disconnected | Self::UnexpectedFrame { .. } => true,
            Self::Receive(error) => !error.is_recoverable(),
            Self::Connect(_)
            | Self::NotStarted
            | Self::MessageTooLarge { .. }
            | Self::Rejected { .. }
            | Self::UnknownErrorCode { .. }
            | Self::InvalidErrorFrame { .. } => false,
        }
    }

    /// Wire code when the server rejected the request.
    #[must_use]
    pub const fn rejection_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Rejected { code } => Some(*code),
            _ => None,
        }
    }
}
