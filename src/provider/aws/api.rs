//! # AWS API Seam
//!
//! The subset of EC2, S3, SageMaker and SageMaker Runtime calls used by
//! [`super::AwsProvider`]. [`super::sdk::SdkAwsApi`] implements it on top of
//! the AWS Rust SDK; tests substitute an in-memory implementation.

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_ec2::types::Instance;

/// Parameters for launching a single EC2 instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInstanceRequest {
    /// Value of the `Name` tag
    pub name: String,
    pub instance_type: String,
    pub image_id: String,
    /// Base64-encoded user data, as EC2 expects it
    pub user_data: Option<String>,
}

/// Parameters for registering a SageMaker model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateModelRequest {
    pub model_name: String,
    /// Inference container image URI
    pub image: String,
    /// `s3://` URL of the primary model artifact
    pub model_data_url: String,
    pub execution_role_arn: Option<String>,
}

#[async_trait]
pub trait AwsApi: Send + Sync {
    /// `RunInstances`; returns the instances EC2 reports as created
    async fn run_instances(&self, request: &RunInstanceRequest) -> Result<Vec<Instance>>;

    /// `DescribeInstances` for one id; `None` when EC2 returns no match
    async fn describe_instance(&self, instance_id: &str) -> Result<Option<Instance>>;

    /// `TerminateInstances` for one id
    async fn terminate_instance(&self, instance_id: &str) -> Result<()>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()>;

    /// `GetObject`, draining the body stream completely
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// `CreateModel`
    async fn create_model(&self, request: &CreateModelRequest) -> Result<()>;

    /// `InvokeEndpoint` with a JSON body; returns the raw response body
    async fn invoke_endpoint(&self, endpoint_name: &str, body: Vec<u8>) -> Result<Vec<u8>>;

    async fn probe_compute(&self) -> Result<()>;

    async fn probe_storage(&self) -> Result<()>;

    async fn probe_ml(&self) -> Result<()>;
}
