//! The `gatewayd` daemon: service instances plus the control heartbeat.
//!
//! Startup reads the service-instance configuration, connects the control
//! client to `someipd`, offers the message-transfer skeleton and creates the
//! configured instances. The daemon then drives [`Heartbeat`] until a
//! termination signal cancels its [`ShutdownToken`].

mod heartbeat;
mod instances;
mod service_config;
mod skeleton;

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use control_channel::{
    ClientError, ClientFactory, ControlClient, PROTOCOL_CONFIG, SocketClientFactory,
};
use gateway_config::Config;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::shutdown::{ShutdownError, ShutdownToken};

pub use heartbeat::{Heartbeat, HeartbeatSummary};
pub use instances::{LocalServiceInstance, RemoteServiceInstance, ServiceInstances};
pub use service_config::{ServiceConfig, ServiceConfigError, ServiceInstanceDescriptor};
pub use skeleton::{
    InstanceSpecifier, LocalMessageTransferSkeleton, MessageTransferSkeleton, SkeletonError,
};

pub(crate) const GATEWAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::gatewayd");

/// Errors that end `gatewayd` during startup.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Signal handlers could not be installed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// Configuration or telemetry failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The service-instance configuration is unusable.
    #[error(transparent)]
    ServiceConfig(#[from] ServiceConfigError),
    /// The control connection to `someipd` could not be established.
    #[error("failed to start control client: {0}")]
    Control(#[from] ClientError),
    /// The message-transfer skeleton could not be created.
    #[error("failed to create message transfer skeleton: {0}")]
    Skeleton(#[from] SkeletonError),
}

/// A started gateway, ready to run its heartbeat.
#[derive(Debug)]
pub struct Gateway<C> {
    skeleton: LocalMessageTransferSkeleton,
    instances: ServiceInstances,
    heartbeat: Heartbeat<C>,
}

impl<C: ControlClient> Gateway<C> {
    /// Performs the startup sequence with the supplied collaborators.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the service configuration cannot be
    /// read, the control client cannot connect, or the skeleton's instance
    /// specifier is malformed. A failed offer is logged and startup continues.
    pub fn start<F>(
        config: &Config,
        clients: &F,
        reporter: &dyn HealthReporter,
    ) -> Result<Self, GatewayError>
    where
        F: ClientFactory<Client = C>,
    {
        let service_config = ServiceConfig::load(config.service_config_path())?;

        let mut client = clients.create(&PROTOCOL_CONFIG);
        client.start()?;
        reporter.control_connected(&config.control_endpoint(PROTOCOL_CONFIG.identifier));

        let instance = InstanceSpecifier::new(config.message_transfer_instance())?;
        let mut skeleton = LocalMessageTransferSkeleton::create(instance);
        if let Err(error) = skeleton.offer_service() {
            warn!(
                target: GATEWAY_TARGET,
                %error,
                "failed to offer message transfer service"
            );
        }

        let instances = ServiceInstances::create_all(&service_config, &skeleton);
        reporter.service_instances_created(instances.local().len(), instances.remote().len());

        Ok(Self {
            skeleton,
            instances,
            heartbeat: Heartbeat::new(client, config.heartbeat_interval()),
        })
    }

    /// Skeleton offered during startup.
    #[must_use]
    pub const fn skeleton(&self) -> &LocalMessageTransferSkeleton {
        &self.skeleton
    }

    /// Instances created during startup.
    #[must_use]
    pub const fn instances(&self) -> &ServiceInstances {
        &self.instances
    }

    /// Runs the heartbeat until `shutdown` is cancelled.
    pub fn run(mut self, shutdown: &ShutdownToken) -> HeartbeatSummary {
        info!(target: GATEWAY_TARGET, "gateway started, waiting for shutdown signal");
        let summary = self.heartbeat.run(shutdown);
        info!(
            target: GATEWAY_TARGET,
            ticks = summary.ticks,
            failures = summary.failures,
            "shutting down gateway"
        );
        summary
    }
}

/// Runs `gatewayd` with the production collaborators.
///
/// # Errors
///
/// Returns a [`GatewayError`] when startup fails.
pub fn run_gatewayd() -> Result<HeartbeatSummary, GatewayError> {
    let shutdown = ShutdownToken::new();
    shutdown.cancel_on_termination()?;
    run_gatewayd_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &shutdown,
    )
}

/// Runs `gatewayd` with injected configuration, reporter, and shutdown token.
///
/// # Errors
///
/// Returns a [`GatewayError`] when startup fails.
pub fn run_gatewayd_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &ShutdownToken,
) -> Result<HeartbeatSummary, GatewayError> {
    let daemon = bootstrap_with(loader, reporter)?;
    let config = daemon.config();
    let clients = SocketClientFactory::new(config.control_endpoint(PROTOCOL_CONFIG.identifier));
    let gateway = Gateway::start(config, &clients, daemon.reporter().as_ref())?;
    Ok(gateway.run(shutdown))
}
