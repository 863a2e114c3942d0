//! Service instances created from the gateway configuration.

use tracing::{info, warn};

use super::GATEWAY_TARGET;
use super::service_config::{ServiceConfig, ServiceInstanceDescriptor};
use super::skeleton::{InstanceSpecifier, MessageTransferSkeleton, SkeletonError};

/// Service offered by a local application and forwarded to the network
/// through the message-transfer skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalServiceInstance {
    descriptor: ServiceInstanceDescriptor,
    specifier: InstanceSpecifier,
    transfer: InstanceSpecifier,
}

impl LocalServiceInstance {
    /// Creates the instance described by `descriptor`, forwarding through
    /// `skeleton`.
    ///
    /// # Errors
    ///
    /// Returns [`SkeletonError::InvalidSpecifier`] when the descriptor names a
    /// malformed instance specifier.
    pub fn create<S>(
        descriptor: ServiceInstanceDescriptor,
        skeleton: &S,
    ) -> Result<Self, SkeletonError>
    where
        S: MessageTransferSkeleton + ?Sized,
    {
        let specifier = InstanceSpecifier::new(descriptor.instance_specifier.as_str())?;
        info!(
            target: GATEWAY_TARGET,
            instance = %specifier,
            service_id = descriptor.service_id,
            instance_id = descriptor.instance_id,
            transfer = %skeleton.instance(),
            "local service instance created"
        );
        Ok(Self {
            descriptor,
            specifier,
            transfer: skeleton.instance().clone(),
        })
    }

    /// Configuration the instance was created from.
    #[must_use]
    pub const fn descriptor(&self) -> &ServiceInstanceDescriptor {
        &self.descriptor
    }

    /// Instance specifier of the local service.
    #[must_use]
    pub const fn specifier(&self) -> &InstanceSpecifier {
        &self.specifier
    }

    /// Skeleton instance messages are forwarded through.
    #[must_use]
    pub const fn transfer(&self) -> &InstanceSpecifier {
        &self.transfer
    }
}

/// Service offered on the network and mirrored to local applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteServiceInstance {
    descriptor: ServiceInstanceDescriptor,
    specifier: InstanceSpecifier,
}

impl RemoteServiceInstance {
    /// Creates the instance described by `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns [`SkeletonError::InvalidSpecifier`] when the descriptor names a
    /// malformed instance specifier.
    pub fn create(descriptor: ServiceInstanceDescriptor) -> Result<Self, SkeletonError> {
        let specifier = InstanceSpecifier::new(descriptor.instance_specifier.as_str())?;
        info!(
            target: GATEWAY_TARGET,
            instance = %specifier,
            service_id = descriptor.service_id,
            instance_id = descriptor.instance_id,
            "remote service instance created"
        );
        Ok(Self {
            descriptor,
            specifier,
        })
    }

    /// Configuration the instance was created from.
    #[must_use]
    pub const fn descriptor(&self) -> &ServiceInstanceDescriptor {
        &self.descriptor
    }

    /// Instance specifier of the mirrored service.
    #[must_use]
    pub const fn specifier(&self) -> &InstanceSpecifier {
        &self.specifier
    }
}

/// All service instances of a running gateway.
#[derive(Debug, Default)]
pub struct ServiceInstances {
    local: Vec<LocalServiceInstance>,
    remote: Vec<RemoteServiceInstance>,
}

impl ServiceInstances {
    /// Creates local then remote instances in configuration order.
    ///
    /// A descriptor that cannot be turned into an instance is logged and
    /// skipped; the remaining instances are still created.
    pub fn create_all<S>(config: &ServiceConfig, skeleton: &S) -> Self
    where
        S: MessageTransferSkeleton + ?Sized,
    {
        let local = config
            .local_service_instances()
            .iter()
            .filter_map(|descriptor| {
                LocalServiceInstance::create(descriptor.clone(), skeleton)
                    .inspect_err(|error| skipped("local", descriptor, error))
                    .ok()
            })
            .collect();
        let remote = config
            .remote_service_instances()
            .iter()
            .filter_map(|descriptor| {
                RemoteServiceInstance::create(descriptor.clone())
                    .inspect_err(|error| skipped("remote", descriptor, error))
                    .ok()
            })
            .collect();
        Self { local, remote }
    }

    /// Local instances in creation order.
    #[must_use]
    pub fn local(&self) -> &[LocalServiceInstance] {
        &self.local
    }

    /// Remote instances in creation order.
    #[must_use]
    pub fn remote(&self) -> &[RemoteServiceInstance] {
        &self.remote
    }
}

fn skipped(kind: &str, descriptor: &ServiceInstanceDescriptor, error: &SkeletonError) {
    warn!(
        target: GATEWAY_TARGET,
        kind,
        service_id = descriptor.service_id,
        instance_id = descriptor.instance_id,
        %error,
        "skipping service instance"
    );
}
