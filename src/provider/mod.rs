//! # Provider Modules
//!
//! Provider modules for the supported cloud vendors.
//!
//! Each provider implements the [`CloudProvider`] trait: compute lifecycle,
//! object storage, ML deploy/inference and a health check. Vendor calls go
//! through a per-vendor seam (`AwsApi`, `AzureApi`) so the mapping logic can
//! be exercised without network access.

use crate::config::CloudConfig;
use crate::error::CloudProviderError;
use crate::types::{
    ComputeInstance, HealthReport, MlInferenceResult, MlModelOptions, ModelFile, ProviderKind,
    StorageOptions,
};
use async_trait::async_trait;

/// Operation set every cloud provider supports
///
/// Every fallible operation returns a [`CloudProviderError`] tagged with the
/// provider and the service that failed.
#[async_trait]
pub trait CloudProvider: Send + Sync + std::fmt::Debug {
    /// Provision exactly one compute instance
    async fn create_compute_instance(
        &self,
        name: &str,
        instance_type: &str,
        image_id: &str,
        user_data: Option<&str>,
    ) -> Result<ComputeInstance, CloudProviderError>;

    /// Fetch the current state of an instance
    async fn get_compute_instance(&self, id: &str) -> Result<ComputeInstance, CloudProviderError>;

    /// Request termination of an instance
    ///
    /// Returns once the vendor has accepted the request; it does not wait for
    /// the instance to be torn down. Poll [`CloudProvider::get_compute_instance`]
    /// to observe the final state.
    async fn terminate_instance(&self, id: &str) -> Result<(), CloudProviderError>;

    /// Write an object and return its vendor-specific locator
    ///
    /// AWS returns `s3://{container}/{path}`; Azure returns the blob URL.
    async fn upload_file(
        &self,
        options: &StorageOptions,
        data: Vec<u8>,
    ) -> Result<String, CloudProviderError>;

    /// Read an object fully into memory
    async fn download_file(&self, options: &StorageOptions) -> Result<Vec<u8>, CloudProviderError>;

    /// Delete an object; deleting a missing object succeeds
    async fn delete_file(&self, options: &StorageOptions) -> Result<(), CloudProviderError>;

    /// Upload model artifacts and register the first one as the primary artifact
    ///
    /// Every file lands in the model artifact container under
    /// `{model_id}/{relative_path}`. Uploads run concurrently and registration
    /// starts only once all of them have settled. Only the locator of the
    /// first file is passed to the vendor registration call.
    async fn deploy_model(
        &self,
        options: &MlModelOptions,
        model_files: &[ModelFile],
    ) -> Result<String, CloudProviderError>;

    /// Invoke a deployed model with a JSON payload
    async fn run_inference(
        &self,
        options: &MlModelOptions,
        input: &serde_json::Value,
    ) -> Result<MlInferenceResult, CloudProviderError>;

    /// Configuration this provider was built from
    fn get_config(&self) -> &CloudConfig;

    /// Probe compute, storage and ML independently
    ///
    /// Never fails: a failing probe only flips its own flag.
    async fn health_check(&self) -> HealthReport;

    fn provider_kind(&self) -> ProviderKind {
        self.get_config().provider
    }
}

// Common utilities shared across providers
pub mod common;

// Provider selection
pub mod factory;

// Provider implementations
pub mod aws;
pub mod azure;

pub use factory::{ProviderBuilder, ProviderFactory, SdkProviderBuilder};
