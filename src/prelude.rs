//! Common imports for facade users

pub use crate::config::{AwsCredentials, AzureCredentials, CloudConfig, ConfigLoader};
pub use crate::error::{CloudProviderError, ConfigurationError, Error, ValidationError};
pub use crate::provider::{CloudProvider, ProviderFactory};
pub use crate::types::{
    ComputeInstance, HealthReport, HealthStatus, InstanceStatus, MlInferenceResult,
    MlModelOptions, ModelFile, ProviderKind, ServiceKind, StorageOptions,
};
