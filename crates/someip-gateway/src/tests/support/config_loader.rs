//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use gateway_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Service configuration with one local and one remote instance.
const SERVICE_CONFIG: &str = r#"{
    "local_service_instances": [
        {"instance_specifier": "gatewayd/local_echo", "service_id": 4660, "instance_id": 1, "major_version": 1, "minor_version": 0}
    ],
    "remote_service_instances": [
        {"instance_specifier": "gatewayd/remote_echo", "service_id": 4661, "instance_id": 1, "major_version": 1, "minor_version": 0}
    ]
}"#;

/// Loader that places the control socket and service configuration under a
/// temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
    heartbeat_interval_ms: u64,
}

impl TestConfigLoader {
    /// Provisions a fresh directory holding [`SERVICE_CONFIG`].
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        fs::write(dir.path().join("gatewayd_config.json"), SERVICE_CONFIG)
            .expect("failed to write service config");
        Self {
            dir,
            heartbeat_interval_ms: 5,
        }
    }

    /// Path of a file inside the temporary directory.
    pub fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join(name))
            .expect("temporary path was not valid UTF-8")
    }

    /// Control endpoint both daemons resolve.
    pub fn endpoint(&self) -> SocketEndpoint {
        SocketEndpoint::unix(self.path("control.sock"))
    }

    /// The configuration this loader returns.
    pub fn config(&self) -> Config {
        Config {
            control_socket: Some(self.endpoint()),
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            service_config_path: self.path("gatewayd_config.json"),
            ..Config::default()
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config())
    }
}

/// Loader that intentionally fails by passing an invalid socket URL.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("someipd"),
            OsString::from("--control-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
