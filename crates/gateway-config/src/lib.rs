//! Shared configuration for the SOME/IP gateway daemons.
//!
//! `gatewayd` and `someipd` load the same [`Config`] through `ortho_config`,
//! layering built-in defaults, an optional TOML file, `SOMEIP_GATEWAY_*`
//! environment variables, and command-line flags (highest precedence). Both
//! daemons resolve the control-channel rendezvous the same way, so an unset
//! `control_socket` on each side still lands on a common endpoint derived from
//! the protocol identifier.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_LOG_FILTER, DEFAULT_MESSAGE_TRANSFER_INSTANCE,
    DEFAULT_SERVICE_CONFIG_PATH, DEFAULT_TCP_PORT, default_control_endpoint,
    default_heartbeat_interval_ms, default_log_filter_string,
    default_log_format, default_message_transfer_instance, default_service_config_path,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Runtime configuration shared by the gateway daemons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SOMEIP_GATEWAY")]
pub struct Config {
    /// Explicit control-channel endpoint. When unset, the endpoint is derived
    /// from the protocol identifier.
    #[serde(default)]
    pub control_socket: Option<SocketEndpoint>,
    /// `tracing` filter directive applied to both daemons.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format of the structured logs.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Period of the gateway heartbeat loop in milliseconds.
    #[serde(default = "defaults::default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Location of the service-instance configuration read by `gatewayd`.
    #[serde(default = "defaults::default_service_config_path")]
    pub service_config_path: Utf8PathBuf,
    /// Instance specifier of the message-transfer skeleton offered by `gatewayd`.
    #[serde(default = "defaults::default_message_transfer_instance")]
    pub message_transfer_instance: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_socket: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            service_config_path: default_service_config_path(),
            message_transfer_instance: default_message_transfer_instance(),
        }
    }
}

impl Config {
    /// Resolves the control-channel endpoint for the given protocol identifier.
    ///
    /// An explicitly configured socket wins; otherwise the identifier selects
    /// the platform default rendezvous.
    #[must_use]
    pub fn control_endpoint(&self, identifier: &str) -> SocketEndpoint {
        self.control_socket()
            .cloned()
            .unwrap_or_else(|| default_control_endpoint(identifier))
    }

    /// Explicitly configured control socket, if any.
    #[must_use]
    pub fn control_socket(&self) -> Option<&SocketEndpoint> {
        self.control_socket.as_ref()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Heartbeat period of the gateway control loop.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Path of the service-instance configuration document.
    #[must_use]
    pub fn service_config_path(&self) -> &camino::Utf8Path {
        &self.service_config_path
    }

    /// Instance specifier of the message-transfer skeleton.
    #[must_use]
    pub fn message_transfer_instance(&self) -> &str {
        &self.message_transfer_instance
    }
}
