//! Dispatcher answering control requests from `gatewayd`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info};

use control_channel::{
    BarCommand, Command, ConnectionHandler, FooCommand, HandlerError, HandlerFactory, Request,
    ServerConnection,
};

use super::DISPATCH_TARGET;

/// Failure reported by a command handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct CommandFailure {
    reason: String,
}

impl CommandFailure {
    /// Describes a failed command.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Executes decoded control commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandProcessor: Send + Sync {
    /// Handles [`Command::Foo`].
    ///
    /// # Errors
    ///
    /// Returns a [`CommandFailure`] when the command cannot be carried out.
    fn process_foo(&self, command: &FooCommand) -> Result<(), CommandFailure>;

    /// Handles [`Command::Bar`].
    ///
    /// # Errors
    ///
    /// Returns a [`CommandFailure`] when the command cannot be carried out.
    fn process_bar(&self, command: &BarCommand) -> Result<(), CommandFailure>;
}

/// Processor that logs each command and counts how often it ran.
#[derive(Debug, Default)]
pub struct LoggingProcessor {
    foo: AtomicU64,
    bar: AtomicU64,
}

impl LoggingProcessor {
    /// Number of processed `Foo` commands.
    #[must_use]
    pub fn foo_count(&self) -> u64 {
        self.foo.load(Ordering::SeqCst)
    }

    /// Number of processed `Bar` commands.
    #[must_use]
    pub fn bar_count(&self) -> u64 {
        self.bar.load(Ordering::SeqCst)
    }
}

impl CommandProcessor for LoggingProcessor {
    fn process_foo(&self, _command: &FooCommand) -> Result<(), CommandFailure> {
        self.foo.fetch_add(1, Ordering::SeqCst);
        info!(target: DISPATCH_TARGET, command = "foo", "processing command");
        Ok(())
    }

    fn process_bar(&self, _command: &BarCommand) -> Result<(), CommandFailure> {
        self.bar.fetch_add(1, Ordering::SeqCst);
        info!(target: DISPATCH_TARGET, command = "bar", "processing command");
        Ok(())
    }
}

/// Creates one [`NetworkServer`] per accepted connection.
pub struct NetworkServerFactory {
    processor: Arc<dyn CommandProcessor>,
}

impl NetworkServerFactory {
    /// Builds a factory whose servers share `processor`.
    #[must_use]
    pub fn new(processor: Arc<dyn CommandProcessor>) -> Self {
        Self { processor }
    }
}

impl HandlerFactory for NetworkServerFactory {
    fn create_handler(&self, connection: &ServerConnection) -> Box<dyn ConnectionHandler> {
        debug!(
            target: DISPATCH_TARGET,
            connection = %connection.id(),
            endpoint = connection.endpoint(),
            "control client connected"
        );
        Box::new(NetworkServer::new(Arc::clone(&self.processor)))
    }
}

/// Per-connection dispatcher state.
pub struct NetworkServer {
    processor: Arc<dyn CommandProcessor>,
    handled: u64,
    rejected: u64,
}

impl NetworkServer {
    /// Builds the dispatcher for one connection.
    #[must_use]
    pub fn new(processor: Arc<dyn CommandProcessor>) -> Self {
        Self {
            processor,
            handled: 0,
            rejected: 0,
        }
    }

    /// Requests dispatched successfully on this connection.
    #[must_use]
    pub const fn handled(&self) -> u64 {
        self.handled
    }

    /// Requests rejected on this connection.
    #[must_use]
    pub const fn rejected(&self) -> u64 {
        self.rejected
    }

    fn dispatch(&self, message: &[u8]) -> Result<(), HandlerError> {
        let request = Request::decode(message)?;
        let outcome = match request.command() {
            Command::Foo(command) => self.processor.process_foo(command),
            Command::Bar(command) => self.processor.process_bar(command),
        };
        outcome.map_err(|failure| HandlerError::Failed {
            command: request.command_id(),
            reason: failure.to_string(),
        })
    }
}

impl ConnectionHandler for NetworkServer {
    fn on_message_sent(
        &mut self,
        _connection: &ServerConnection,
        _message: &[u8],
    ) -> Result<(), HandlerError> {
        self.rejected += 1;
        Err(HandlerError::NotPermitted)
    }

    fn on_message_sent_with_reply(
        &mut self,
        _connection: &ServerConnection,
        message: &[u8],
    ) -> Result<Vec<u8>, HandlerError> {
        match self.dispatch(message) {
            Ok(()) => {
                self.handled += 1;
                Ok(Vec::new())
            }
            Err(error) => {
                self.rejected += 1;
                Err(error)
            }
        }
    }

    fn on_disconnect(&mut self, connection: &ServerConnection) {
        debug!(
            target: DISPATCH_TARGET,
            connection = %connection.id(),
            handled = self.handled,
            rejected = self.rejected,
            "control client disconnected"
        );
    }
}
