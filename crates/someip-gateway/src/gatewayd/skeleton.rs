//! Message-transfer skeleton offered by the gateway.

use std::fmt;

use thiserror::Error;
use tracing::info;

use super::GATEWAY_TARGET;

/// Validated middleware instance specifier such as `gatewayd/gatewayd_messages`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceSpecifier(String);

impl InstanceSpecifier {
    /// Validates a specifier: non-empty ASCII alphanumerics, `_` and `/`, with
    /// no empty path segments.
    ///
    /// # Errors
    ///
    /// Returns [`SkeletonError::InvalidSpecifier`] naming the defect.
    pub fn new(specifier: impl Into<String>) -> Result<Self, SkeletonError> {
        let value = specifier.into();
        let invalid = |reason: &'static str| SkeletonError::InvalidSpecifier {
            value: value.clone(),
            reason,
        };
        if value.is_empty() {
            return Err(invalid("specifier is empty"));
        }
        if !value
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || matches!(character, '_' | '/'))
        {
            return Err(invalid("specifier contains characters outside [A-Za-z0-9_/]"));
        }
        if value.starts_with('/') || value.ends_with('/') || value.contains("//") {
            return Err(invalid("specifier has an empty path segment"));
        }
        Ok(Self(value))
    }

    /// The specifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceSpecifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Publisher through which local service instances forward SOME/IP messages.
pub trait MessageTransferSkeleton {
    /// Instance the skeleton is bound to.
    fn instance(&self) -> &InstanceSpecifier;

    /// Makes the service visible to consumers.
    ///
    /// # Errors
    ///
    /// Returns a [`SkeletonError`] when the service cannot be offered.
    fn offer_service(&mut self) -> Result<(), SkeletonError>;

    /// Whether [`MessageTransferSkeleton::offer_service`] succeeded.
    fn is_offered(&self) -> bool;
}

/// In-process skeleton that records its offer.
#[derive(Debug)]
pub struct LocalMessageTransferSkeleton {
    instance: InstanceSpecifier,
    offered: bool,
}

impl LocalMessageTransferSkeleton {
    /// Creates an unoffered skeleton for `instance`.
    #[must_use]
    pub const fn create(instance: InstanceSpecifier) -> Self {
        Self {
            instance,
            offered: false,
        }
    }
}

impl MessageTransferSkeleton for LocalMessageTransferSkeleton {
    fn instance(&self) -> &InstanceSpecifier {
        &self.instance
    }

    fn offer_service(&mut self) -> Result<(), SkeletonError> {
        if self.offered {
            return Err(SkeletonError::AlreadyOffered {
                instance: self.instance.to_string(),
            });
        }
        self.offered = true;
        info!(
            target: GATEWAY_TARGET,
            instance = %self.instance,
            "message transfer service offered"
        );
        Ok(())
    }

    fn is_offered(&self) -> bool {
        self.offered
    }
}

/// Errors raised by skeletons and instance specifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkeletonError {
    /// The instance specifier is malformed.
    #[error("invalid instance specifier '{value}': {reason}")]
    InvalidSpecifier {
        /// Rejected text.
        value: String,
        /// Defect found.
        reason: &'static str,
    },
    /// The service is already offered.
    #[error("service {instance} is already offered")]
    AlreadyOffered {
        /// Offered instance.
        instance: String,
    },
}
