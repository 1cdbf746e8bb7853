//! Shared test fixtures: configurations and in-memory vendor APIs
//!
//! The fakes record every call so tests can assert on what reached the
//! vendor, and can be told to fail individual operations.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use aws_sdk_ec2::types::{Instance, InstanceState, InstanceStateName};
use cloud_facade::config::{AwsCredentials, AzureCredentials, CloudConfig};
use cloud_facade::provider::aws::{AwsApi, CreateModelRequest, RunInstanceRequest};
use cloud_facade::provider::azure::{
    AzureApi, InstanceView, InstanceViewStatus, ModelVersion, VirtualMachine,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn aws_credentials() -> AwsCredentials {
    AwsCredentials {
        access_key_id: "AKIAEXAMPLE".to_string(),
        secret_access_key: "aws-secret".to_string(),
        sagemaker_execution_role_arn: Some(
            "arn:aws:iam::123456789012:role/sagemaker".to_string(),
        ),
    }
}

pub fn azure_credentials() -> AzureCredentials {
    AzureCredentials {
        tenant_id: "tenant".to_string(),
        client_id: "client".to_string(),
        client_secret: "azure-secret".to_string(),
        subscription_id: "subscription".to_string(),
        storage_connection_string: "AccountName=facadestore;SharedAccessSignature=sv=1&sig=x"
            .to_string(),
        resource_group: "facade-rg".to_string(),
        ml_workspace: "facade-ws".to_string(),
        network_interface_id: Some("/subscriptions/subscription/nic/web".to_string()),
        vm_admin_username: "azureuser".to_string(),
        vm_admin_password: Some("Fac4de-Passw0rd!".to_string()),
        vm_ssh_public_key: None,
    }
}

/// Select ring for rustls before real clients are built
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

pub fn aws_config() -> CloudConfig {
    CloudConfig::aws("us-east-1", aws_credentials())
}

pub fn azure_config() -> CloudConfig {
    CloudConfig::azure("eastus", azure_credentials())
}

/// Operations a fake can be told to fail
#[derive(Debug, Default)]
struct Failures(Mutex<HashSet<&'static str>>);

impl Failures {
    fn set(&self, operation: &'static str) {
        self.0.lock().unwrap().insert(operation);
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.0.lock().unwrap().contains(operation) {
            bail!("{operation} rejected by fake");
        }
        Ok(())
    }
}

// ============================================================================
// AWS
// ============================================================================

pub fn ec2_instance(id: &str, state: InstanceStateName) -> Instance {
    Instance::builder()
        .instance_id(id)
        .state(InstanceState::builder().name(state).build())
        .private_ip_address("10.0.0.12")
        .build()
}

#[derive(Debug, Default)]
pub struct FakeAwsApi {
    failures: Failures,
    pub instances: Mutex<HashMap<String, Instance>>,
    pub run_requests: Mutex<Vec<RunInstanceRequest>>,
    pub terminated: Mutex<Vec<String>>,
    pub objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub put_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub model_requests: Mutex<Vec<CreateModelRequest>>,
    pub invoked_endpoints: Mutex<Vec<String>>,
    pub inference_response: Mutex<Vec<u8>>,
    /// When set, `RunInstances` reports no created instances
    pub launch_nothing: Mutex<bool>,
}

impl FakeAwsApi {
    pub fn fail(&self, operation: &'static str) {
        self.failures.set(operation);
    }

    pub fn with_instance(self, instance: Instance) -> Self {
        let id = instance.instance_id().unwrap_or_default().to_string();
        self.instances.lock().unwrap().insert(id, instance);
        self
    }

    pub fn with_inference_response(self, body: &[u8]) -> Self {
        *self.inference_response.lock().unwrap() = body.to_vec();
        self
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl AwsApi for FakeAwsApi {
    async fn run_instances(&self, request: &RunInstanceRequest) -> Result<Vec<Instance>> {
        self.failures.check("run_instances")?;
        self.run_requests.lock().unwrap().push(request.clone());
        if *self.launch_nothing.lock().unwrap() {
            return Ok(Vec::new());
        }
        let instance = ec2_instance("i-0fake", InstanceStateName::Pending);
        self.instances
            .lock()
            .unwrap()
            .insert("i-0fake".to_string(), instance.clone());
        Ok(vec![instance])
    }

    async fn describe_instance(&self, instance_id: &str) -> Result<Option<Instance>> {
        self.failures.check("describe_instance")?;
        Ok(self.instances.lock().unwrap().get(instance_id).cloned())
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        self.failures.check("terminate_instance")?;
        self.terminated
            .lock()
            .unwrap()
            .push(instance_id.to_string());
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.failures.check("put_object")?;
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.failures.check("get_object")?;
        self.object(bucket, key)
            .ok_or_else(|| anyhow!("NoSuchKey: The specified key does not exist."))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.failures.check("delete_object")?;
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn create_model(&self, request: &CreateModelRequest) -> Result<()> {
        self.failures.check("create_model")?;
        self.model_requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn invoke_endpoint(&self, endpoint_name: &str, _body: Vec<u8>) -> Result<Vec<u8>> {
        self.failures.check("invoke_endpoint")?;
        self.invoked_endpoints
            .lock()
            .unwrap()
            .push(endpoint_name.to_string());
        Ok(self.inference_response.lock().unwrap().clone())
    }

    async fn probe_compute(&self) -> Result<()> {
        self.failures.check("probe_compute")
    }

    async fn probe_storage(&self) -> Result<()> {
        self.failures.check("probe_storage")
    }

    async fn probe_ml(&self) -> Result<()> {
        self.failures.check("probe_ml")
    }
}

// ============================================================================
// Azure
// ============================================================================

pub fn azure_vm(name: &str, power_state: Option<&str>) -> VirtualMachine {
    let mut vm = VirtualMachine {
        name: Some(name.to_string()),
        location: "eastus".to_string(),
        ..Default::default()
    };
    if let Some(state) = power_state {
        vm.properties.instance_view = Some(InstanceView {
            statuses: vec![
                InstanceViewStatus {
                    code: Some("ProvisioningState/succeeded".to_string()),
                    display_status: None,
                },
                InstanceViewStatus {
                    code: Some(format!("PowerState/{state}")),
                    display_status: None,
                },
            ],
        });
    }
    vm
}

#[derive(Debug, Default)]
pub struct FakeAzureApi {
    failures: Failures,
    pub vms: Mutex<HashMap<String, VirtualMachine>>,
    pub created_vms: Mutex<Vec<VirtualMachine>>,
    pub deleted_vms: Mutex<Vec<String>>,
    pub blobs: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub put_calls: AtomicUsize,
    pub model_versions: Mutex<Vec<(String, String, ModelVersion)>>,
    pub scored_uris: Mutex<Vec<String>>,
    pub score_response: Mutex<Vec<u8>>,
    /// When set, the VM PUT response carries no name
    pub create_returns_unnamed: Mutex<bool>,
}

impl FakeAzureApi {
    pub fn fail(&self, operation: &'static str) {
        self.failures.set(operation);
    }

    pub fn with_vm(self, vm: VirtualMachine) -> Self {
        let name = vm.name.clone().unwrap_or_default();
        self.vms.lock().unwrap().insert(name, vm);
        self
    }

    pub fn with_score_response(self, body: &[u8]) -> Self {
        *self.score_response.lock().unwrap() = body.to_vec();
        self
    }

    pub fn blob(&self, container: &str, path: &str) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(&(container.to_string(), path.to_string()))
            .cloned()
    }
}

#[async_trait]
impl AzureApi for FakeAzureApi {
    async fn create_virtual_machine(
        &self,
        name: &str,
        definition: &VirtualMachine,
    ) -> Result<VirtualMachine> {
        self.failures.check("create_virtual_machine")?;
        self.created_vms.lock().unwrap().push(definition.clone());
        if *self.create_returns_unnamed.lock().unwrap() {
            return Ok(VirtualMachine::default());
        }
        let mut created = definition.clone();
        created.name = Some(name.to_string());
        created.properties.provisioning_state = Some("Creating".to_string());
        self.vms
            .lock()
            .unwrap()
            .insert(name.to_string(), created.clone());
        Ok(created)
    }

    async fn get_virtual_machine(&self, name: &str) -> Result<Option<VirtualMachine>> {
        self.failures.check("get_virtual_machine")?;
        Ok(self.vms.lock().unwrap().get(name).cloned())
    }

    async fn delete_virtual_machine(&self, name: &str) -> Result<()> {
        self.failures.check("delete_virtual_machine")?;
        self.deleted_vms.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn put_blob(
        &self,
        container: &str,
        path: &str,
        data: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<String> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.failures.check("put_blob")?;
        self.blobs
            .lock()
            .unwrap()
            .insert((container.to_string(), path.to_string()), data);
        Ok(format!(
            "https://facadestore.blob.core.windows.net/{container}/{path}"
        ))
    }

    async fn get_blob(&self, container: &str, path: &str) -> Result<Vec<u8>> {
        self.failures.check("get_blob")?;
        self.blob(container, path)
            .ok_or_else(|| anyhow!("BlobNotFound: The specified blob does not exist."))
    }

    async fn delete_blob(&self, container: &str, path: &str) -> Result<()> {
        self.failures.check("delete_blob")?;
        self.blobs
            .lock()
            .unwrap()
            .remove(&(container.to_string(), path.to_string()));
        Ok(())
    }

    async fn create_model_version(
        &self,
        model_name: &str,
        version: &str,
        model: &ModelVersion,
    ) -> Result<String> {
        self.failures.check("create_model_version")?;
        self.model_versions.lock().unwrap().push((
            model_name.to_string(),
            version.to_string(),
            model.clone(),
        ));
        Ok(format!(
            "/subscriptions/subscription/resourceGroups/facade-rg/providers/Microsoft.MachineLearningServices/workspaces/facade-ws/models/{model_name}/versions/{version}"
        ))
    }

    async fn score(&self, scoring_uri: &str, _body: Vec<u8>) -> Result<Vec<u8>> {
        self.failures.check("score")?;
        self.scored_uris
            .lock()
            .unwrap()
            .push(scoring_uri.to_string());
        Ok(self.score_response.lock().unwrap().clone())
    }

    async fn probe_compute(&self) -> Result<()> {
        self.failures.check("probe_compute")
    }

    async fn probe_storage(&self) -> Result<()> {
        self.failures.check("probe_storage")
    }

    async fn probe_ml(&self) -> Result<()> {
        self.failures.check("probe_ml")
    }
}
