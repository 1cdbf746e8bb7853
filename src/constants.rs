//! # Constants
//!
//! Shared constants used throughout the facade.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Environment variable selecting the provider (`aws` or `azure`)
pub const ENV_CLOUD_PROVIDER: &str = "CLOUD_PROVIDER";

/// Environment variable holding the region / Azure location
pub const ENV_CLOUD_REGION: &str = "CLOUD_REGION";

pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_AWS_SAGEMAKER_EXECUTION_ROLE_ARN: &str = "AWS_SAGEMAKER_EXECUTION_ROLE_ARN";

pub const ENV_AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_AZURE_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const ENV_AZURE_STORAGE_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const ENV_AZURE_RESOURCE_GROUP: &str = "AZURE_RESOURCE_GROUP";
pub const ENV_AZURE_ML_WORKSPACE: &str = "AZURE_ML_WORKSPACE";
pub const ENV_AZURE_NETWORK_INTERFACE_ID: &str = "AZURE_NETWORK_INTERFACE_ID";
pub const ENV_AZURE_VM_ADMIN_USERNAME: &str = "AZURE_VM_ADMIN_USERNAME";
pub const ENV_AZURE_VM_ADMIN_PASSWORD: &str = "AZURE_VM_ADMIN_PASSWORD";
pub const ENV_AZURE_VM_SSH_PUBLIC_KEY: &str = "AZURE_VM_SSH_PUBLIC_KEY";

/// Provider used when `CLOUD_PROVIDER` is unset
pub const DEFAULT_CLOUD_PROVIDER: &str = "aws";

/// Region used when `CLOUD_REGION` is unset
pub const DEFAULT_CLOUD_REGION: &str = "us-east-1";

/// Resource group used for Azure compute and ML when none is configured
pub const DEFAULT_AZURE_RESOURCE_GROUP: &str = "cloud-facade";

/// Azure Machine Learning workspace used when none is configured
pub const DEFAULT_AZURE_ML_WORKSPACE: &str = "cloud-facade-ml";

/// Container (bucket) receiving model artifacts during `deploy_model`
pub const MODEL_ARTIFACT_CONTAINER: &str = "ml-models";

/// Model version reported when the caller did not request one
pub const DEFAULT_MODEL_VERSION: &str = "latest";

/// Runtime used when the requested one has no known deployment image
pub const DEFAULT_ML_RUNTIME: &str = "pytorch";

/// Azure Resource Manager endpoint
pub const AZURE_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// OAuth scopes for the Azure services the facade talks to
pub const AZURE_MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
pub const AZURE_STORAGE_SCOPE: &str = "https://storage.azure.com/.default";
pub const AZURE_ML_SCOPE: &str = "https://ml.azure.com/.default";

/// API versions pinned for the Azure REST surfaces
pub const AZURE_COMPUTE_API_VERSION: &str = "2024-07-01";
pub const AZURE_ML_API_VERSION: &str = "2024-04-01";
pub const AZURE_BLOB_API_VERSION: &str = "2023-11-03";

/// Default DNS suffix for storage accounts in the public cloud
pub const AZURE_DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Admin user provisioned on Azure virtual machines when none is configured
pub const DEFAULT_AZURE_VM_ADMIN_USERNAME: &str = "azureuser";

/// Source tag attached to AWS static credentials
pub const AWS_CREDENTIALS_PROVIDER_NAME: &str = "cloud-facade";
