//! # Errors
//!
//! Error taxonomy for the facade:
//!
//! - [`CloudProviderError`] - any vendor failure reached through a provider,
//!   tagged with the provider and the service that failed
//! - [`ConfigurationError`] - missing or invalid configuration, raised while
//!   loading config or constructing a provider
//! - [`ValidationError`] - malformed caller input
//!
//! Providers never let a raw vendor error escape; every vendor call runs
//! through [`with_cloud_error`].

use crate::types::{ProviderKind, ServiceKind};
use std::future::Future;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Vendor failure tagged with `(provider, service)`
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CloudProviderError {
    message: String,
    provider: ProviderKind,
    service: ServiceKind,
    #[source]
    original_error: Option<BoxError>,
}

impl CloudProviderError {
    /// Tag a lower-level failure
    ///
    /// The message becomes `"{PROVIDER} {service} error: {original message}"`.
    pub fn wrap(provider: ProviderKind, service: ServiceKind, error: impl Into<BoxError>) -> Self {
        let original: BoxError = error.into();
        Self {
            message: format!("{} {} error: {}", provider.label(), service, original),
            provider,
            service,
            original_error: Some(original),
        }
    }

    /// Normalize an arbitrary error
    ///
    /// Errors that already are a `CloudProviderError` come back unchanged, so
    /// nested wrappers never stack prefixes.
    #[must_use]
    pub fn normalize(provider: ProviderKind, service: ServiceKind, error: anyhow::Error) -> Self {
        match error.downcast::<CloudProviderError>() {
            Ok(tagged) => tagged,
            Err(other) => Self::wrap(provider, service, other),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    #[must_use]
    pub fn service(&self) -> ServiceKind {
        self.service
    }

    /// The failure this error wraps, if any
    #[must_use]
    pub fn original_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.original_error.as_deref()
    }
}

/// Configuration is missing or inconsistent
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Missing required environment variable: {name}")]
    MissingVariable { name: String },

    #[error("Unsupported cloud provider: {provider}")]
    UnsupportedProvider { provider: String },

    #[error("{provider} credentials are required for the {provider} provider")]
    MissingCredentials { provider: ProviderKind },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to initialize {provider} client: {reason}")]
    ClientInitialization {
        provider: ProviderKind,
        reason: String,
    },
}

/// Caller input is malformed
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("deploy_model requires at least one model file")]
    NoModelFiles,

    #[error("path '{path}' contains an empty segment")]
    EmptyPathSegment { path: String },
}

/// Any error surfaced by the facade
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    CloudProvider(#[from] CloudProviderError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Run a vendor operation and tag its failure with `(provider, service)`
///
/// Failures that are already a [`CloudProviderError`] pass through untouched.
///
/// # Errors
///
/// Returns the normalized error when `operation` fails.
pub async fn with_cloud_error<T, F>(
    provider: ProviderKind,
    service: ServiceKind,
    operation: F,
) -> Result<T, CloudProviderError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    operation
        .await
        .map_err(|e| CloudProviderError::normalize(provider, service, e))
}

/// Reject an empty identifier before it reaches a vendor
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] when `value` is blank.
pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_formats_message() {
        let err = CloudProviderError::wrap(
            ProviderKind::Aws,
            ServiceKind::Storage,
            anyhow::anyhow!("NoSuchKey"),
        );
        assert_eq!(err.message(), "AWS storage error: NoSuchKey");
        assert_eq!(err.provider(), ProviderKind::Aws);
        assert_eq!(err.service(), ServiceKind::Storage);
        assert!(err.original_error().is_some());
        assert_eq!(err.to_string(), err.message());
    }

    #[test]
    fn test_normalize_passes_tagged_error_through() {
        let tagged = CloudProviderError::wrap(
            ProviderKind::Azure,
            ServiceKind::Compute,
            anyhow::anyhow!("VM not found"),
        );
        let normalized = CloudProviderError::normalize(
            ProviderKind::Aws,
            ServiceKind::Ml,
            anyhow::Error::new(tagged),
        );

        assert_eq!(normalized.message(), "AZURE compute error: VM not found");
        assert_eq!(normalized.provider(), ProviderKind::Azure);
        assert_eq!(normalized.service(), ServiceKind::Compute);
    }

    #[tokio::test]
    async fn test_with_cloud_error_wraps_plain_failure() {
        let result: Result<(), CloudProviderError> =
            with_cloud_error(ProviderKind::Azure, ServiceKind::Ml, async {
                Err(anyhow::anyhow!("endpoint offline"))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.message(), "AZURE ml error: endpoint offline");
    }

    #[tokio::test]
    async fn test_with_cloud_error_does_not_double_wrap() {
        let inner = CloudProviderError::wrap(
            ProviderKind::Aws,
            ServiceKind::Compute,
            anyhow::anyhow!("no instance created"),
        );
        let result: Result<(), CloudProviderError> =
            with_cloud_error(ProviderKind::Aws, ServiceKind::Compute, async move {
                Err(inner.into())
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.message(), "AWS compute error: no instance created");
        assert_eq!(err.message().matches("error:").count(), 1);
    }

    #[tokio::test]
    async fn test_with_cloud_error_returns_value() {
        let value = with_cloud_error(ProviderKind::Aws, ServiceKind::Storage, async {
            Ok::<_, anyhow::Error>(42)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("instance id", "i-1").is_ok());
        assert!(matches!(
            require_non_empty("instance id", "  "),
            Err(ValidationError::Empty { field: "instance id" })
        ));
    }
}
