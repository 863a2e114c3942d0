//! Daemons of the SOME/IP gateway.
//!
//! Two processes cooperate over the control channel defined in
//! [`control_channel`]:
//!
//! - [`gatewayd`] reads the service-instance configuration, offers the
//!   message-transfer skeleton, creates the configured service instances and
//!   drives `someipd` with a fixed-interval heartbeat.
//! - [`someipd`] serves the control channel and dispatches each request to a
//!   [`someipd::CommandProcessor`].
//!
//! Both daemons share the bootstrap sequence: layered configuration through
//! [`gateway_config`], structured telemetry, and health reporting hooks that
//! emit lifecycle events.

mod bootstrap;
pub mod gatewayd;
mod health;
mod shutdown;
pub mod someipd;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use shutdown::{ShutdownError, ShutdownSignal, ShutdownToken, SystemShutdownSignal};
pub use telemetry::TelemetryError;

#[cfg(test)]
mod tests;
