//! Per-connection handler contract for control-channel servers.

use std::fmt;

use thiserror::Error;

use crate::frame::ErrorCode;
use crate::protocol::{CommandId, DecodeError};

/// Identity of an accepted connection, unique for the lifetime of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw connection number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw connection number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Server-side view of one client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConnection {
    id: ConnectionId,
    endpoint: String,
}

impl ServerConnection {
    /// Describes a connection accepted on `endpoint`.
    #[must_use]
    pub fn new(id: ConnectionId, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
        }
    }

    /// Identity of the connection.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Endpoint the connection was accepted on.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Reacts to the events of one connection.
///
/// A handler is created when its connection is accepted and is dropped after
/// [`ConnectionHandler::on_disconnect`]. Events arrive strictly in order; a
/// reply is written before the next message is read.
pub trait ConnectionHandler: Send {
    /// A fire-and-forget message arrived. The sender expects no reply; errors
    /// are logged by the server.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the message is rejected.
    fn on_message_sent(
        &mut self,
        connection: &ServerConnection,
        message: &[u8],
    ) -> Result<(), HandlerError>;

    /// A message that expects a reply arrived. The returned bytes are sent as
    /// the reply; an error is sent on the transport's error channel.
    ///
    /// # Errors
    ///
    /// Returns a [`HandlerError`] when the message is rejected or its handler
    /// fails.
    fn on_message_sent_with_reply(
        &mut self,
        connection: &ServerConnection,
        message: &[u8],
    ) -> Result<Vec<u8>, HandlerError>;

    /// The peer disconnected. The server never initiates this.
    fn on_disconnect(&mut self, connection: &ServerConnection);
}

/// Creates a [`ConnectionHandler`] for each accepted connection.
pub trait HandlerFactory: Send + Sync + 'static {
    /// Builds the handler owning the state of `connection`.
    fn create_handler(&self, connection: &ServerConnection) -> Box<dyn ConnectionHandler>;
}

/// Per-message failures reported to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The message could not be decoded.
    #[error("malformed message: {0}")]
    Malformed(#[from] DecodeError),
    /// The message kind is not permitted on this channel.
    #[error("fire-and-forget messages are not permitted on this channel")]
    NotPermitted,
    /// The command handler reported a failure.
    #[error("{command} handler failed: {reason}")]
    Failed {
        /// Command whose handler failed.
        command: CommandId,
        /// Failure description.
        reason: String,
    },
}

impl HandlerError {
    /// Wire code reported to the sender.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed(_) => ErrorCode::InvalidArgument,
            Self::NotPermitted => ErrorCode::NotPermitted,
            Self::Failed { .. } => ErrorCode::HandlerFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(HandlerError::Malformed(DecodeError::Size { expected: 1, actual: 2 }), ErrorCode::InvalidArgument)]
    #[case(HandlerError::Malformed(DecodeError::UnknownCommand { value: 0xFF }), ErrorCode::InvalidArgument)]
    #[case(HandlerError::NotPermitted, ErrorCode::NotPermitted)]
    #[case(HandlerError::Failed { command: CommandId::Bar, reason: "offline".to_owned() }, ErrorCode::HandlerFailed)]
    fn errors_map_to_wire_codes(#[case] error: HandlerError, #[case] expected: ErrorCode) {
        assert_eq!(error.code(), expected);
    }

    #[test]
    fn connection_ids_display_with_hash_prefix() {
        assert_eq!(ConnectionId::new(7).to_string(), "#7");
    }
}
