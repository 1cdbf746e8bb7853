//! # Domain Types
//!
//! Value shapes shared by every provider: instance descriptors, storage
//! addressing, ML options and results, and the health report.

use crate::constants::DEFAULT_MODEL_VERSION;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cloud vendor backing a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Amazon Web Services
    Aws,
    /// Microsoft Azure
    Azure,
}

impl ProviderKind {
    /// Every provider the facade can build
    pub const SUPPORTED: [ProviderKind; 2] = [ProviderKind::Aws, ProviderKind::Azure];

    /// Lower-case name, as used in configuration and metric labels
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Aws => "aws",
            ProviderKind::Azure => "azure",
        }
    }

    /// Upper-case name used as the prefix of wrapped error messages
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Aws => "AWS",
            ProviderKind::Azure => "AZURE",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(ProviderKind::Aws),
            "azure" => Ok(ProviderKind::Azure),
            _ => Err(ConfigurationError::UnsupportedProvider {
                provider: s.to_string(),
            }),
        }
    }
}

/// Subsystem an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Compute,
    Storage,
    Ml,
}

impl ServiceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Compute => "compute",
            ServiceKind::Storage => "storage",
            ServiceKind::Ml => "ml",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized lifecycle state of a compute instance
///
/// Vendors report many more states; anything that is not clearly running or
/// stopped is reported as `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Running,
    Stopped,
    Terminated,
}

impl InstanceStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Running => "running",
            InstanceStatus::Stopped => "stopped",
            InstanceStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a compute instance
///
/// Never updated in place; fetch again to observe a newer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInstance {
    pub id: String,
    pub status: InstanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
}

/// Address of one object in blob/object storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOptions {
    /// Bucket (AWS) or container (Azure)
    pub container: String,
    /// Object key / blob name inside the container
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl StorageOptions {
    pub fn new(container: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            path: path.into(),
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Identifies a model for deployment and inference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlModelOptions {
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Serving runtime (`pytorch`, `tensorflow`, `sklearn`, `xgboost`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

impl MlModelOptions {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            version: None,
            runtime: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    /// Requested version, or `latest`
    #[must_use]
    pub fn effective_version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_MODEL_VERSION)
    }
}

/// One model artifact handed to `deploy_model`
#[derive(Clone, PartialEq, Eq)]
pub struct ModelFile {
    /// Path relative to the model root; becomes `{model_id}/{relative_path}`
    pub relative_path: String,
    pub content: Vec<u8>,
}

impl ModelFile {
    pub fn new(relative_path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            content: content.into(),
        }
    }
}

impl fmt::Debug for ModelFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFile")
            .field("relative_path", &self.relative_path)
            .field("content_len", &self.content.len())
            .finish()
    }
}

/// Result of one online inference call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlInferenceResult {
    /// Raw vendor response, deserialized as JSON
    pub predictions: serde_json::Value,
    pub metadata: InferenceMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceMetadata {
    /// Wall-clock time of the vendor call in milliseconds
    pub latency: u64,
    pub model_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Per-subsystem probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub compute: bool,
    pub storage: bool,
    pub ml: bool,
}

impl ServiceHealth {
    #[must_use]
    pub fn all_healthy(&self) -> bool {
        self.compute && self.storage && self.ml
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub services: ServiceHealth,
}

impl From<ServiceHealth> for HealthReport {
    fn from(services: ServiceHealth) -> Self {
        let status = if services.all_healthy() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        Self { status, services }
    }
}
