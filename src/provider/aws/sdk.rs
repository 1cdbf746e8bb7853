//! # AWS SDK Client
//!
//! [`AwsApi`] implementation backed by the official AWS Rust SDK.
//!
//! All four service clients share one `SdkConfig` built from the static
//! access keys in the facade configuration.

use super::api::{AwsApi, CreateModelRequest, RunInstanceRequest};
use crate::config::AwsCredentials;
use crate::constants::AWS_CREDENTIALS_PROVIDER_NAME;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{Instance, InstanceType, ResourceType, Tag, TagSpecification};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_sagemaker::types::ContainerDefinition;
use aws_sdk_sagemakerruntime::primitives::Blob;
use tracing::debug;

/// AWS SDK clients owned by one provider
pub struct SdkAwsApi {
    ec2: aws_sdk_ec2::Client,
    s3: aws_sdk_s3::Client,
    sagemaker: aws_sdk_sagemaker::Client,
    sagemaker_runtime: aws_sdk_sagemakerruntime::Client,
    region: String,
}

impl std::fmt::Debug for SdkAwsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkAwsApi")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl SdkAwsApi {
    /// Build the SDK clients for `region` using static access keys
    pub async fn connect(region: &str, credentials: &AwsCredentials) -> Self {
        debug!("Creating AWS SDK clients for region {}", region);
        let sdk_config = Self::create_static_config(region, credentials).await;
        Self::from_sdk_config(&sdk_config)
    }

    /// Build the SDK clients from an existing `SdkConfig`
    #[must_use]
    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        Self {
            ec2: aws_sdk_ec2::Client::new(sdk_config),
            s3: aws_sdk_s3::Client::new(sdk_config),
            sagemaker: aws_sdk_sagemaker::Client::new(sdk_config),
            sagemaker_runtime: aws_sdk_sagemakerruntime::Client::new(sdk_config),
            region: sdk_config
                .region()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }

    /// Create AWS SDK config from access keys
    async fn create_static_config(region: &str, credentials: &AwsCredentials) -> SdkConfig {
        let static_credentials = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None,
            None,
            AWS_CREDENTIALS_PROVIDER_NAME,
        );

        aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(static_credentials)
            .load()
            .await
    }
}

/// Flatten an SDK error, including its source chain, into an `anyhow::Error`
fn sdk_error<E>(action: &str, error: E) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    anyhow!("{action} failed: {}", DisplayErrorContext(error))
}

#[async_trait]
impl AwsApi for SdkAwsApi {
    async fn run_instances(&self, request: &RunInstanceRequest) -> Result<Vec<Instance>> {
        let name_tag = TagSpecification::builder()
            .resource_type(ResourceType::Instance)
            .tags(Tag::builder().key("Name").value(request.name.clone()).build())
            .build();

        let output = self
            .ec2
            .run_instances()
            .image_id(request.image_id.clone())
            .instance_type(InstanceType::from(request.instance_type.as_str()))
            .min_count(1)
            .max_count(1)
            .set_user_data(request.user_data.clone())
            .tag_specifications(name_tag)
            .send()
            .await
            .map_err(|e| sdk_error("RunInstances", e))?;

        Ok(output.instances().to_vec())
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<Instance>> {
        let output = self
            .ec2
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeInstances", e))?;

        Ok(output
            .reservations()
            .iter()
            .flat_map(|reservation| reservation.instances())
            .next()
            .cloned())
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        self.ec2
            .terminate_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| sdk_error("TerminateInstances", e))?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        self.s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| sdk_error("PutObject", e))?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let output = self
            .s3
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("GetObject", e))?;

        let data = output
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read s3://{bucket}/{key}"))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.s3
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteObject", e))?;
        Ok(())
    }

    async fn create_model(&self, request: &CreateModelRequest) -> Result<()> {
        let container = ContainerDefinition::builder()
            .image(request.image.clone())
            .model_data_url(request.model_data_url.clone())
            .build();

        self.sagemaker
            .create_model()
            .model_name(request.model_name.clone())
            .primary_container(container)
            .set_execution_role_arn(request.execution_role_arn.clone())
            .send()
            .await
            .map_err(|e| sdk_error("CreateModel", e))?;
        Ok(())
    }

    async fn invoke_endpoint(&self, endpoint_name: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let output = self
            .sagemaker_runtime
            .invoke_endpoint()
            .endpoint_name(endpoint_name)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| sdk_error("InvokeEndpoint", e))?;

        Ok(output
            .body()
            .map(|blob| blob.as_ref().to_vec())
            .unwrap_or_default())
    }

    async fn probe_compute(&self) -> Result<()> {
        self.ec2
            .describe_instances()
            .max_results(5)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeInstances", e))?;
        Ok(())
    }

    async fn probe_storage(&self) -> Result<()> {
        self.s3
            .list_buckets()
            .send()
            .await
            .map_err(|e| sdk_error("ListBuckets", e))?;
        Ok(())
    }

    async fn probe_ml(&self) -> Result<()> {
        self.sagemaker
            .list_models()
            .max_results(1)
            .send()
            .await
            .map_err(|e| sdk_error("ListModels", e))?;
        Ok(())
    }
}
