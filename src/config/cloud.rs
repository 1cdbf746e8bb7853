//! # Cloud Configuration
//!
//! Provider selection plus the credential block for each vendor.

use crate::error::ConfigurationError;
use crate::types::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration handed to the provider factory
///
/// Exactly one of `credentials.aws` / `credentials.azure` is expected to be
/// populated, matching `provider`. See [`CloudConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfig {
    pub provider: ProviderKind,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// AWS region or Azure location
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureCredentials>,
}

/// Static AWS access keys
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// IAM role SageMaker assumes when serving registered models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sagemaker_execution_role_arn: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "sagemaker_execution_role_arn",
                &self.sagemaker_execution_role_arn,
            )
            .finish()
    }
}

/// Azure service principal plus the resources the facade operates in
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
    pub storage_connection_string: String,
    #[serde(default = "default_resource_group")]
    pub resource_group: String,
    #[serde(default = "default_ml_workspace")]
    pub ml_workspace: String,
    /// Pre-provisioned NIC attached to new virtual machines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_interface_id: Option<String>,
    #[serde(default = "default_vm_admin_username")]
    pub vm_admin_username: String,
    /// At least one of the password and the SSH key is needed to create
    /// virtual machines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_admin_password: Option<String>,
    /// OpenSSH public key installed for the admin user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_ssh_public_key: Option<String>,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("storage_connection_string", &"<redacted>")
            .field("resource_group", &self.resource_group)
            .field("ml_workspace", &self.ml_workspace)
            .field("network_interface_id", &self.network_interface_id)
            .field("vm_admin_username", &self.vm_admin_username)
            .field(
                "vm_admin_password",
                &self.vm_admin_password.as_ref().map(|_| "<redacted>"),
            )
            .field("vm_ssh_public_key", &self.vm_ssh_public_key)
            .finish()
    }
}

fn default_resource_group() -> String {
    crate::constants::DEFAULT_AZURE_RESOURCE_GROUP.to_string()
}

fn default_ml_workspace() -> String {
    crate::constants::DEFAULT_AZURE_ML_WORKSPACE.to_string()
}

fn default_vm_admin_username() -> String {
    crate::constants::DEFAULT_AZURE_VM_ADMIN_USERNAME.to_string()
}

impl CloudConfig {
    /// AWS configuration
    pub fn aws(region: impl Into<String>, credentials: AwsCredentials) -> Self {
        Self {
            provider: ProviderKind::Aws,
            credentials: Credentials {
                region: region.into(),
                aws: Some(credentials),
                azure: None,
            },
        }
    }

    /// Azure configuration
    pub fn azure(region: impl Into<String>, credentials: AzureCredentials) -> Self {
        Self {
            provider: ProviderKind::Azure,
            credentials: Credentials {
                region: region.into(),
                aws: None,
                azure: Some(credentials),
            },
        }
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.credentials.region
    }

    /// Check that the credential block matches the selected provider
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingCredentials`] when the block for
    /// `provider` is absent and [`ConfigurationError::InvalidValue`] when the
    /// other vendor's block is also set or the region is empty.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.credentials.region.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "credentials.region".to_string(),
                reason: "region must not be empty".to_string(),
            });
        }

        let (matching, other, other_field) = match self.provider {
            ProviderKind::Aws => (
                self.credentials.aws.is_some(),
                self.credentials.azure.is_some(),
                "credentials.azure",
            ),
            ProviderKind::Azure => (
                self.credentials.azure.is_some(),
                self.credentials.aws.is_some(),
                "credentials.aws",
            ),
        };

        if !matching {
            return Err(ConfigurationError::MissingCredentials {
                provider: self.provider,
            });
        }
        if other {
            return Err(ConfigurationError::InvalidValue {
                field: other_field.to_string(),
                reason: format!("must not be set when provider is {}", self.provider),
            });
        }
        Ok(())
    }

    /// AWS credential block
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingCredentials`] when absent.
    pub fn aws_credentials(&self) -> Result<&AwsCredentials, ConfigurationError> {
        self.credentials
            .aws
            .as_ref()
            .ok_or(ConfigurationError::MissingCredentials {
                provider: ProviderKind::Aws,
            })
    }

    /// Azure credential block
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingCredentials`] when absent.
    pub fn azure_credentials(&self) -> Result<&AzureCredentials, ConfigurationError> {
        self.credentials
            .azure
            .as_ref()
            .ok_or(ConfigurationError::MissingCredentials {
                provider: ProviderKind::Azure,
            })
    }
}
