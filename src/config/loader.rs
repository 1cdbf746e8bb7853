//! # Config Loader
//!
//! Builds a validated [`CloudConfig`] from environment variables.
//!
//! The loader reads through a lookup function so callers (and tests) can
//! supply values from somewhere other than the process environment.

use super::cloud::{AwsCredentials, AzureCredentials, CloudConfig};
use crate::constants::*;
use crate::error::ConfigurationError;
use crate::types::ProviderKind;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads provider selection and credentials from key/value lookups
pub struct ConfigLoader {
    lookup: Lookup,
}

impl fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader").finish_non_exhaustive()
    }
}

impl ConfigLoader {
    /// Loader backed by the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loader backed by an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Loader backed by a fixed set of key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_lookup(move |key| values.get(key).cloned())
    }

    /// Load and validate the configuration
    ///
    /// `CLOUD_PROVIDER` defaults to `aws` and `CLOUD_REGION` to `us-east-1`.
    /// Every variable required by the selected provider must be present and
    /// non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnsupportedProvider`] for an unknown
    /// provider and [`ConfigurationError::MissingVariable`] for the first
    /// missing required variable.
    pub fn load(&self) -> Result<CloudConfig, ConfigurationError> {
        let provider: ProviderKind = self
            .optional(ENV_CLOUD_PROVIDER)
            .unwrap_or_else(|| DEFAULT_CLOUD_PROVIDER.to_string())
            .parse()?;
        let region = self
            .optional(ENV_CLOUD_REGION)
            .unwrap_or_else(|| DEFAULT_CLOUD_REGION.to_string());

        debug!(provider = %provider, region = %region, "Loading cloud configuration");

        let config = match provider {
            ProviderKind::Aws => CloudConfig::aws(region, self.aws_credentials()?),
            ProviderKind::Azure => CloudConfig::azure(region, self.azure_credentials()?),
        };
        config.validate()?;
        Ok(config)
    }

    fn aws_credentials(&self) -> Result<AwsCredentials, ConfigurationError> {
        Ok(AwsCredentials {
            access_key_id: self.required(ENV_AWS_ACCESS_KEY_ID)?,
            secret_access_key: self.required(ENV_AWS_SECRET_ACCESS_KEY)?,
            sagemaker_execution_role_arn: self.optional(ENV_AWS_SAGEMAKER_EXECUTION_ROLE_ARN),
        })
    }

    fn azure_credentials(&self) -> Result<AzureCredentials, ConfigurationError> {
        Ok(AzureCredentials {
            tenant_id: self.required(ENV_AZURE_TENANT_ID)?,
            client_id: self.required(ENV_AZURE_CLIENT_ID)?,
            client_secret: self.required(ENV_AZURE_CLIENT_SECRET)?,
            subscription_id: self.required(ENV_AZURE_SUBSCRIPTION_ID)?,
            storage_connection_string: self.required(ENV_AZURE_STORAGE_CONNECTION_STRING)?,
            resource_group: self
                .optional(ENV_AZURE_RESOURCE_GROUP)
                .unwrap_or_else(|| DEFAULT_AZURE_RESOURCE_GROUP.to_string()),
            ml_workspace: self
                .optional(ENV_AZURE_ML_WORKSPACE)
                .unwrap_or_else(|| DEFAULT_AZURE_ML_WORKSPACE.to_string()),
            network_interface_id: self.optional(ENV_AZURE_NETWORK_INTERFACE_ID),
            vm_admin_username: self
                .optional(ENV_AZURE_VM_ADMIN_USERNAME)
                .unwrap_or_else(|| DEFAULT_AZURE_VM_ADMIN_USERNAME.to_string()),
            vm_admin_password: self.optional(ENV_AZURE_VM_ADMIN_PASSWORD),
            vm_ssh_public_key: self.optional(ENV_AZURE_VM_SSH_PUBLIC_KEY),
        })
    }

    /// Non-empty value for `key`, if any
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigurationError> {
        self.optional(key)
            .ok_or_else(|| ConfigurationError::MissingVariable {
                name: key.to_string(),
            })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::from_env()
    }
}
