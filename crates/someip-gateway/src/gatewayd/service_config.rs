//! Service-instance configuration read by `gatewayd` at startup.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

/// One SOME/IP service instance bridged by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceInstanceDescriptor {
    /// Middleware instance specifier the instance binds to.
    pub instance_specifier: String,
    /// SOME/IP service identifier.
    pub service_id: u16,
    /// SOME/IP instance identifier.
    pub instance_id: u16,
    /// Major interface version.
    pub major_version: u8,
    /// Minor interface version.
    pub minor_version: u32,
}

#[derive(Debug, Deserialize)]
struct ServiceConfigDocument {
    #[serde(default)]
    local_service_instances: Option<Vec<ServiceInstanceDescriptor>>,
    #[serde(default)]
    remote_service_instances: Option<Vec<ServiceInstanceDescriptor>>,
}

/// Validated service-instance configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    local: Vec<ServiceInstanceDescriptor>,
    remote: Vec<ServiceInstanceDescriptor>,
}

impl ServiceConfig {
    /// Reads and validates the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceConfigError`] when the file cannot be read, is
    /// empty, does not parse, or lacks either instance list.
    pub fn load(path: &Utf8Path) -> Result<Self, ServiceConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ServiceConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    /// Parses a document already read from `path`.
    ///
    /// # Errors
    ///
    /// See [`ServiceConfig::load`].
    pub fn parse(path: &Utf8Path, contents: &str) -> Result<Self, ServiceConfigError> {
        if contents.trim().is_empty() {
            return Err(ServiceConfigError::Empty {
                path: path.to_path_buf(),
            });
        }
        let document: ServiceConfigDocument =
            serde_json::from_str(contents).map_err(|source| ServiceConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let Some(local) = document.local_service_instances else {
            return Err(ServiceConfigError::MissingLocalInstances);
        };
        let Some(remote) = document.remote_service_instances else {
            return Err(ServiceConfigError::MissingRemoteInstances);
        };
        Ok(Self { local, remote })
    }

    /// Instances offered locally, in configuration order.
    #[must_use]
    pub fn local_service_instances(&self) -> &[ServiceInstanceDescriptor] {
        &self.local
    }

    /// Instances consumed from the network, in configuration order.
    #[must_use]
    pub fn remote_service_instances(&self) -> &[ServiceInstanceDescriptor] {
        &self.remote
    }
}

/// Errors raised while reading the service-instance configuration.
#[derive(Debug, Error)]
pub enum ServiceConfigError {
    /// The file could not be opened or read.
    #[error("could not open service config {path}: {source}")]
    Open {
        /// Configured path.
        path: Utf8PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// The file has no content.
    #[error("service config {path} is empty")]
    Empty {
        /// Configured path.
        path: Utf8PathBuf,
    },
    /// The file is not a valid service-instance document.
    #[error("invalid service config {path}: {source}")]
    Parse {
        /// Configured path.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The document has no `local_service_instances` list.
    #[error("no local service instances configured")]
    MissingLocalInstances,
    /// The document has no `remote_service_instances` list.
    #[error("no remote service instances configured")]
    MissingRemoteInstances,
}
