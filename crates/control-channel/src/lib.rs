//! Control channel between the SOME/IP gateway daemons.
//!
//! `gatewayd` drives `someipd` through a small request/reply protocol. Every
//! request is a fixed-size frame whose first byte selects a command; replies
//! travel back on the same connection, and failures are reported on a
//! separate error channel rather than mixed into reply payloads.
//!
//! The crate is split into the wire contract ([`protocol`]), the stream
//! framing that carries it ([`frame`]), the server-side handler contract
//! ([`handler`]), the socket transport ([`transport`]), and the blocking
//! client ([`client`]).

pub mod client;
pub mod frame;
pub mod handler;
pub mod protocol;
pub mod transport;

pub use client::{ClientError, ClientFactory, ControlClient, SocketClient, SocketClientFactory};
pub use frame::ErrorCode;
pub use handler::{
    ConnectionHandler, ConnectionId, HandlerError, HandlerFactory, ServerConnection,
};
pub use protocol::{
    BarCommand, Command, CommandId, DecodeError, FooCommand, MAX_SEND_SIZE, PROTOCOL_CONFIG,
    ProtocolConfig, REQUEST_SIZE, Request,
};
pub use transport::{ControlServer, ListenerError, ServerHandle};
