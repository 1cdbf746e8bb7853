//! # AWS Provider
//!
//! [`CloudProvider`] implementation for Amazon Web Services.
//!
//! - Compute maps to EC2 instances
//! - Storage maps to S3 objects (`container` is the bucket, `path` the key)
//! - ML deploys to SageMaker models and infers through SageMaker Runtime
//!   endpoints named after the model id

mod api;
mod sdk;

pub use api::{AwsApi, CreateModelRequest, RunInstanceRequest};
pub use sdk::SdkAwsApi;

use crate::config::CloudConfig;
use crate::error::{require_non_empty, CloudProviderError, ConfigurationError};
use crate::observability::metrics;
use crate::provider::common::{probe, run_operation, upload_model_artifacts, MlRuntime};
use crate::provider::CloudProvider;
use crate::types::{
    ComputeInstance, HealthReport, InferenceMetadata, InstanceStatus, MlInferenceResult,
    MlModelOptions, ModelFile, ProviderKind, ServiceHealth, ServiceKind, StorageOptions,
};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_ec2::types::Instance;
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const PROVIDER: ProviderKind = ProviderKind::Aws;

/// AWS provider
pub struct AwsProvider {
    config: CloudConfig,
    api: Arc<dyn AwsApi>,
}

impl std::fmt::Debug for AwsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsProvider")
            .field("region", &self.config.region())
            .finish_non_exhaustive()
    }
}

impl AwsProvider {
    /// Create the provider and its SDK clients
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::MissingCredentials`] when the
    /// configuration carries no AWS credentials block.
    pub async fn new(config: CloudConfig) -> Result<Self, ConfigurationError> {
        let credentials = config.aws_credentials()?;
        info!("Creating AWS provider for region {}", config.region());
        let api = SdkAwsApi::connect(config.region(), credentials).await;
        Self::with_api(config, Arc::new(api))
    }

    /// Create the provider over an existing API implementation
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or carries no AWS credentials.
    pub fn with_api(config: CloudConfig, api: Arc<dyn AwsApi>) -> Result<Self, ConfigurationError> {
        config.validate()?;
        config.aws_credentials()?;
        Ok(Self { config, api })
    }

    fn execution_role_arn(&self) -> Option<String> {
        self.config
            .credentials
            .aws
            .as_ref()
            .and_then(|c| c.sagemaker_execution_role_arn.clone())
    }
}

/// Map an EC2 instance state name onto the facade status
///
/// Only `running`, `stopped` and `terminated` map directly. Transitional
/// states (`pending`, `stopping`, `shutting-down`) and a missing state all
/// report as terminated.
#[must_use]
pub fn map_instance_state(state: Option<&str>) -> InstanceStatus {
    match state {
        Some("running") => InstanceStatus::Running,
        Some("stopped") => InstanceStatus::Stopped,
        _ => InstanceStatus::Terminated,
    }
}

/// Convert an EC2 instance description into a [`ComputeInstance`]
///
/// # Errors
///
/// Fails when EC2 returned an instance without an id.
pub fn to_compute_instance(instance: &Instance) -> anyhow::Result<ComputeInstance> {
    let id = instance
        .instance_id()
        .ok_or_else(|| anyhow!("EC2 returned an instance without an id"))?;
    let state = instance
        .state()
        .and_then(|s| s.name())
        .map(|name| name.as_str());

    Ok(ComputeInstance {
        id: id.to_string(),
        status: map_instance_state(state),
        public_ip: instance.public_ip_address().map(str::to_string),
        private_ip: instance.private_ip_address().map(str::to_string),
    })
}

/// `s3://{bucket}/{key}`
#[must_use]
pub fn s3_uri(options: &StorageOptions) -> String {
    format!("s3://{}/{}", options.container, options.path)
}

/// SageMaker inference container for a runtime in `region`
#[must_use]
pub fn inference_image(runtime: MlRuntime, region: &str) -> String {
    match runtime {
        MlRuntime::Pytorch => format!(
            "763104351884.dkr.ecr.{region}.amazonaws.com/pytorch-inference:2.1.0-cpu-py310"
        ),
        MlRuntime::Tensorflow => {
            format!("763104351884.dkr.ecr.{region}.amazonaws.com/tensorflow-inference:2.13.0-cpu")
        }
        MlRuntime::Sklearn => format!(
            "683313688378.dkr.ecr.{region}.amazonaws.com/sagemaker-scikit-learn:1.2-1-cpu-py3"
        ),
        MlRuntime::Xgboost => {
            format!("683313688378.dkr.ecr.{region}.amazonaws.com/sagemaker-xgboost:1.7-1")
        }
    }
}

/// SageMaker model name for a deployment
///
/// SageMaker names allow only alphanumerics and hyphens, so the version
/// suffix is sanitized.
#[must_use]
pub fn sagemaker_model_name(options: &MlModelOptions) -> String {
    let raw = match options.version.as_deref() {
        Some(version) => format!("{}-{}", options.model_id, version),
        None => options.model_id.clone(),
    };
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Parse a raw inference response body
///
/// Non-JSON bodies (CSV output from some containers) are returned as a string.
fn parse_predictions(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CloudProvider for AwsProvider {
    async fn create_compute_instance(
        &self,
        name: &str,
        instance_type: &str,
        image_id: &str,
        user_data: Option<&str>,
    ) -> Result<ComputeInstance, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Compute, "create_instance", async {
            require_non_empty("image id", image_id)?;
            require_non_empty("instance type", instance_type)?;

            let request = RunInstanceRequest {
                name: name.to_string(),
                instance_type: instance_type.to_string(),
                image_id: image_id.to_string(),
                user_data: user_data.map(|data| general_purpose::STANDARD.encode(data)),
            };

            let instances = self.api.run_instances(&request).await?;
            let instance = instances
                .first()
                .ok_or_else(|| anyhow!("RunInstances returned no instances"))?;
            let created = to_compute_instance(instance)?;

            info!("Created EC2 instance {} ({})", created.id, name);
            Ok(created)
        })
        .await
    }

    async fn get_compute_instance(&self, id: &str) -> Result<ComputeInstance, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Compute, "get_instance", async {
            require_non_empty("instance id", id)?;
            let instance = self
                .api
                .describe_instance(id)
                .await?
                .ok_or_else(|| anyhow!("Instance {id} not found"))?;
            to_compute_instance(&instance)
        })
        .await
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Compute, "terminate_instance", async {
            require_non_empty("instance id", id)?;
            self.api.terminate_instance(id).await?;
            info!("Requested termination of EC2 instance {}", id);
            Ok(())
        })
        .await
    }

    async fn upload_file(
        &self,
        options: &StorageOptions,
        data: Vec<u8>,
    ) -> Result<String, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Storage, "upload", async {
            require_non_empty("container", &options.container)?;
            require_non_empty("path", &options.path)?;

            debug!(
                "Uploading {} bytes to {}",
                data.len(),
                s3_uri(options)
            );
            self.api
                .put_object(
                    &options.container,
                    &options.path,
                    data,
                    options.content_type.as_deref(),
                )
                .await?;
            Ok(s3_uri(options))
        })
        .await
    }

    async fn download_file(&self, options: &StorageOptions) -> Result<Vec<u8>, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Storage, "download", async {
            require_non_empty("container", &options.container)?;
            require_non_empty("path", &options.path)?;
            self.api.get_object(&options.container, &options.path).await
        })
        .await
    }

    async fn delete_file(&self, options: &StorageOptions) -> Result<(), CloudProviderError> {
        // S3 DeleteObject already succeeds for missing keys
        run_operation(PROVIDER, ServiceKind::Storage, "delete", async {
            require_non_empty("container", &options.container)?;
            require_non_empty("path", &options.path)?;
            self.api
                .delete_object(&options.container, &options.path)
                .await
        })
        .await
    }

    async fn deploy_model(
        &self,
        options: &MlModelOptions,
        model_files: &[ModelFile],
    ) -> Result<String, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Ml, "deploy_model", async {
            require_non_empty("model id", &options.model_id)?;

            let locators = upload_model_artifacts(options, model_files, |location, data| async move {
                self.upload_file(&location, data)
                    .await
                    .map_err(anyhow::Error::from)
            })
            .await?;
            let primary = locators
                .first()
                .context("No model artifact was uploaded")?;

            let runtime = MlRuntime::resolve(options.runtime.as_deref());
            let request = CreateModelRequest {
                model_name: sagemaker_model_name(options),
                image: inference_image(runtime, self.config.region()),
                model_data_url: primary.clone(),
                execution_role_arn: self.execution_role_arn(),
            };

            self.api.create_model(&request).await?;
            info!(
                "Registered SageMaker model {} ({} runtime, {} artifacts)",
                request.model_name,
                runtime.as_str(),
                locators.len()
            );
            Ok(request.model_name)
        })
        .await
    }

    async fn run_inference(
        &self,
        options: &MlModelOptions,
        input: &serde_json::Value,
    ) -> Result<MlInferenceResult, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Ml, "inference", async {
            require_non_empty("model id", &options.model_id)?;
            let body = serde_json::to_vec(input).context("Failed to serialize inference input")?;

            let start = Instant::now();
            let response = self.api.invoke_endpoint(&options.model_id, body).await?;
            let latency = elapsed_ms(start);

            Ok(MlInferenceResult {
                predictions: parse_predictions(&response),
                metadata: InferenceMetadata {
                    latency,
                    model_version: options.effective_version().to_string(),
                },
            })
        })
        .await
    }

    fn get_config(&self) -> &CloudConfig {
        &self.config
    }

    async fn health_check(&self) -> HealthReport {
        let (compute, storage, ml) = futures::join!(
            probe(PROVIDER, ServiceKind::Compute, self.api.probe_compute()),
            probe(PROVIDER, ServiceKind::Storage, self.api.probe_storage()),
            probe(PROVIDER, ServiceKind::Ml, self.api.probe_ml()),
        );

        let report = HealthReport::from(ServiceHealth {
            compute,
            storage,
            ml,
        });
        metrics::record_health_check(PROVIDER.as_str(), report.status.as_str());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{InstanceState, InstanceStateName};

    #[test]
    fn test_map_instance_state() {
        assert_eq!(map_instance_state(Some("running")), InstanceStatus::Running);
        assert_eq!(map_instance_state(Some("stopped")), InstanceStatus::Stopped);
        assert_eq!(
            map_instance_state(Some("terminated")),
            InstanceStatus::Terminated
        );
        assert_eq!(
            map_instance_state(Some("pending")),
            InstanceStatus::Terminated
        );
        assert_eq!(
            map_instance_state(Some("shutting-down")),
            InstanceStatus::Terminated
        );
        assert_eq!(map_instance_state(None), InstanceStatus::Terminated);
    }

    #[test]
    fn test_to_compute_instance() {
        let instance = Instance::builder()
            .instance_id("i-0abc")
            .state(
                InstanceState::builder()
                    .name(InstanceStateName::Running)
                    .build(),
            )
            .public_ip_address("54.1.2.3")
            .private_ip_address("10.0.0.5")
            .build();

        let converted = to_compute_instance(&instance).unwrap();
        assert_eq!(converted.id, "i-0abc");
        assert_eq!(converted.status, InstanceStatus::Running);
        assert_eq!(converted.public_ip.as_deref(), Some("54.1.2.3"));
        assert_eq!(converted.private_ip.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_to_compute_instance_requires_id() {
        let instance = Instance::builder().build();
        assert!(to_compute_instance(&instance).is_err());
    }

    #[test]
    fn test_s3_uri() {
        let options = StorageOptions::new("reports", "2024/q1.csv");
        assert_eq!(s3_uri(&options), "s3://reports/2024/q1.csv");
    }

    #[test]
    fn test_inference_image_is_regional() {
        let image = inference_image(MlRuntime::Pytorch, "eu-west-1");
        assert!(image.contains(".ecr.eu-west-1.amazonaws.com/pytorch-inference"));
        assert!(inference_image(MlRuntime::Xgboost, "us-east-1").contains("sagemaker-xgboost"));
    }

    #[test]
    fn test_sagemaker_model_name() {
        assert_eq!(
            sagemaker_model_name(&MlModelOptions::new("churn")),
            "churn"
        );
        assert_eq!(
            sagemaker_model_name(&MlModelOptions::new("churn").with_version("1.2")),
            "churn-1-2"
        );
    }

    #[test]
    fn test_parse_predictions_falls_back_to_text() {
        assert_eq!(
            parse_predictions(br#"{"scores":[0.9]}"#),
            serde_json::json!({"scores": [0.9]})
        );
        assert_eq!(
            parse_predictions(b"0.9,0.1"),
            serde_json::Value::String("0.9,0.1".to_string())
        );
    }
}
