use camino::Utf8PathBuf;

#[cfg(unix)]
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

use crate::socket::SocketEndpoint;

/// Default TCP port used when Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 30491;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default heartbeat period of the gateway control loop, in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 100;

/// Default location of the gateway service-instance configuration.
pub const DEFAULT_SERVICE_CONFIG_PATH: &str = "etc/gatewayd_config.json";

/// Default instance specifier of the gateway message-transfer skeleton.
pub const DEFAULT_MESSAGE_TRANSFER_INSTANCE: &str = "gatewayd/gatewayd_messages";

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default heartbeat period in milliseconds.
#[must_use]
pub const fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}

/// Default service-instance configuration path.
#[must_use]
pub fn default_service_config_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SERVICE_CONFIG_PATH)
}

/// Default message-transfer instance specifier.
#[must_use]
pub fn default_message_transfer_instance() -> String {
    DEFAULT_MESSAGE_TRANSFER_INSTANCE.to_owned()
}

/// Computes the rendezvous endpoint for a control channel identifier.
///
/// Both daemons call this with the same identifier, so they meet on the same
/// socket without any further coordination.
#[must_use]
pub fn default_control_endpoint(identifier: &str) -> SocketEndpoint {
    default_control_endpoint_inner(identifier)
}

#[cfg(unix)]
fn default_control_endpoint_inner(identifier: &str) -> SocketEndpoint {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("score");
    if apply_namespace {
        base.push(user_namespace());
    }

    let socket_path = base.join(format!("{identifier}.sock"));
    SocketEndpoint::unix(socket_path)
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_control_endpoint_inner(_identifier: &str) -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn control_endpoint_is_named_after_identifier() {
        let endpoint = default_control_endpoint("score_someipd_control_channel");
        let path = endpoint
            .unix_path()
            .expect("unix platforms rendezvous over domain sockets");
        assert_eq!(path.file_name(), Some("score_someipd_control_channel.sock"));
        assert!(
            path.components().any(|component| component.as_str() == "score"),
            "socket should live below a score directory: {path}"
        );
    }

    #[test]
    fn same_identifier_yields_same_endpoint() {
        assert_eq!(
            default_control_endpoint("channel"),
            default_control_endpoint("channel")
        );
    }
}
