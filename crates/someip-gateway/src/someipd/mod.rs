//! The `someipd` daemon: control server for the gateway.

mod network_server;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use control_channel::{ControlServer, ListenerError, PROTOCOL_CONFIG};
use gateway_config::SocketPreparationError;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub use network_server::{
    CommandFailure, CommandProcessor, LoggingProcessor, NetworkServer, NetworkServerFactory,
};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Errors that end `someipd`.
#[derive(Debug, Error)]
pub enum SomeipdError {
    /// Configuration or telemetry failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The socket directory could not be prepared.
    #[error("failed to prepare control socket: {0}")]
    Socket(#[from] SocketPreparationError),
    /// The control server could not be bound or stopped cleanly.
    #[error("control server failed: {0}")]
    Listener(#[from] ListenerError),
    /// Waiting for the termination signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Runs `someipd` with the production collaborators.
///
/// # Errors
///
/// Returns a [`SomeipdError`] when startup fails or the server cannot be
/// stopped cleanly.
pub fn run_someipd() -> Result<(), SomeipdError> {
    run_someipd_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        Arc::new(LoggingProcessor::default()),
        &SystemShutdownSignal,
    )
}

/// Runs `someipd` with injected collaborators until `shutdown` fires.
///
/// # Errors
///
/// See [`run_someipd`].
pub fn run_someipd_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    processor: Arc<dyn CommandProcessor>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), SomeipdError> {
    let daemon = bootstrap_with(loader, reporter)?;
    let endpoint = daemon.config().control_endpoint(PROTOCOL_CONFIG.identifier);
    endpoint.prepare_filesystem()?;

    let server = ControlServer::bind(&endpoint, &PROTOCOL_CONFIG)?;
    let handle = server.start(Arc::new(NetworkServerFactory::new(processor)))?;
    daemon.reporter().listener_ready(&endpoint);

    let waited = shutdown.wait();
    handle.shutdown();
    handle.join()?;
    waited?;
    info!(target: DISPATCH_TARGET, "shutdown sequence completed");
    Ok(())
}
