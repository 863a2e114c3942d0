//! Socket transport for the control channel.
//!
//! The server binds a configured endpoint and accepts connections on a
//! background thread, serving each connection on its own thread. The client
//! side connects to the same endpoint. Unix domain sockets and TCP are
//! interchangeable; the endpoint chosen at startup decides.

mod connect;
mod errors;
mod listener;
mod session;
mod stream;

pub use self::connect::{CONNECTION_TIMEOUT, connect};
pub use self::errors::{ConnectError, ListenerError};
pub use self::listener::{ControlServer, ServerHandle};
pub use self::stream::ConnectionStream;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
