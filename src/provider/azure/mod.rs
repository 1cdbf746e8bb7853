//! # Azure Provider
//!
//! [`CloudProvider`] implementation for Microsoft Azure.
//!
//! - Compute maps to virtual machines in the configured resource group,
//!   addressed by VM name
//! - Storage maps to block blobs (`container` is the blob container)
//! - ML registers model versions in the configured workspace and scores
//!   against the managed online endpoint named after the model id

mod api;
mod connection_string;
mod rest;
mod shared_key;

pub use api::{
    AzureApi, HardwareProfile, ImageReference, InstanceView, InstanceViewStatus,
    LinuxConfiguration, ModelVersion, ModelVersionProperties, NetworkInterfaceReference,
    NetworkProfile, OsProfile, SshConfiguration, SshPublicKey, StorageProfile, VirtualMachine,
    VirtualMachineProperties,
};
pub use connection_string::StorageConnectionString;
pub use rest::ArmRestApi;
pub use shared_key::SharedKeyCredential;

use crate::config::{AzureCredentials, CloudConfig};
use crate::error::{require_non_empty, CloudProviderError, ConfigurationError, ValidationError};
use crate::observability::metrics;
use crate::provider::common::{probe, run_operation, upload_model_artifacts, MlRuntime};
use crate::provider::CloudProvider;
use crate::types::{
    ComputeInstance, HealthReport, InferenceMetadata, InstanceStatus, MlInferenceResult,
    MlModelOptions, ModelFile, ProviderKind, ServiceHealth, ServiceKind, StorageOptions,
};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const PROVIDER: ProviderKind = ProviderKind::Azure;

/// Model version registered when the caller does not pin one
const DEFAULT_AZURE_MODEL_VERSION: &str = "1";

/// Azure provider
pub struct AzureProvider {
    config: CloudConfig,
    api: Arc<dyn AzureApi>,
}

impl std::fmt::Debug for AzureProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureProvider")
            .field("region", &self.config.region())
            .finish_non_exhaustive()
    }
}

impl AzureProvider {
    /// Create the provider and its REST client
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::MissingCredentials`] when the
    /// configuration carries no Azure credentials block, or when the storage
    /// connection string or service principal credential is unusable.
    pub fn new(config: CloudConfig) -> Result<Self, ConfigurationError> {
        let credentials = config.azure_credentials()?;
        info!(
            "Creating Azure provider for region {} (resource group {})",
            config.region(),
            credentials.resource_group
        );
        let api = ArmRestApi::new(credentials)?;
        Self::with_api(config, Arc::new(api))
    }

    /// Create the provider over an existing API implementation
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or carries no Azure credentials.
    pub fn with_api(
        config: CloudConfig,
        api: Arc<dyn AzureApi>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        config.azure_credentials()?;
        Ok(Self { config, api })
    }

    fn credentials(&self) -> anyhow::Result<&AzureCredentials> {
        Ok(self.config.azure_credentials()?)
    }
}

/// Map an instance view power state onto the facade status
///
/// `running` maps to running; `stopped` and `deallocated` map to stopped.
/// Transitional states (`starting`, `stopping`, `deallocating`) and a
/// missing instance view report as terminated.
#[must_use]
pub fn map_power_state(power_state: Option<&str>) -> InstanceStatus {
    match power_state {
        Some("running") => InstanceStatus::Running,
        Some("stopped" | "deallocated") => InstanceStatus::Stopped,
        _ => InstanceStatus::Terminated,
    }
}

/// Convert a virtual machine resource into a [`ComputeInstance`]
///
/// The VM name is the instance id. IP addresses live on separate network
/// resources and are not resolved.
///
/// # Errors
///
/// Fails when the resource carries no name.
pub fn to_compute_instance(vm: &VirtualMachine) -> anyhow::Result<ComputeInstance> {
    let name = vm
        .name
        .as_deref()
        .ok_or_else(|| anyhow!("Azure returned a virtual machine without a name"))?;

    Ok(ComputeInstance {
        id: name.to_string(),
        status: map_power_state(vm.power_state()),
        public_ip: None,
        private_ip: None,
    })
}

/// Parse an image id into an image reference
///
/// Accepts a custom image resource id (`/subscriptions/...`) or a
/// marketplace URN `publisher:offer:sku:version`.
///
/// # Errors
///
/// Fails for anything else.
pub fn parse_image_reference(image_id: &str) -> anyhow::Result<ImageReference> {
    if image_id.starts_with("/subscriptions/") {
        return Ok(ImageReference {
            id: Some(image_id.to_string()),
            ..Default::default()
        });
    }

    match image_id.split(':').collect::<Vec<_>>().as_slice() {
        [publisher, offer, sku, version] => Ok(ImageReference {
            id: None,
            publisher: Some((*publisher).to_string()),
            offer: Some((*offer).to_string()),
            sku: Some((*sku).to_string()),
            version: Some((*version).to_string()),
        }),
        _ => bail!(
            "Image '{image_id}' is neither an image resource id nor a publisher:offer:sku:version URN"
        ),
    }
}

/// Blob path check run before any vendor call
///
/// Empty segments (`a//b`, a leading or trailing `/`) are rejected rather
/// than collapsed, so every accepted path names exactly one blob.
///
/// # Errors
///
/// Fails when the path is blank or has an empty segment.
pub fn require_blob_path(path: &str) -> Result<(), ValidationError> {
    require_non_empty("path", path)?;
    if path.split('/').any(str::is_empty) {
        return Err(ValidationError::EmptyPathSegment {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Admin account for a new virtual machine
///
/// A configured SSH key is installed through `linuxConfiguration`, and
/// password login is disabled unless a password is configured as well.
///
/// # Errors
///
/// Fails when neither an admin password nor an SSH key is configured.
pub fn build_os_profile(
    credentials: &AzureCredentials,
    computer_name: &str,
    user_data: Option<&str>,
) -> anyhow::Result<OsProfile> {
    if credentials.vm_admin_password.is_none() && credentials.vm_ssh_public_key.is_none() {
        bail!(
            "AZURE_VM_ADMIN_PASSWORD or AZURE_VM_SSH_PUBLIC_KEY must be set to create virtual machines"
        );
    }

    let linux_configuration = credentials
        .vm_ssh_public_key
        .as_ref()
        .map(|key| LinuxConfiguration {
            disable_password_authentication: credentials.vm_admin_password.is_none(),
            ssh: Some(SshConfiguration {
                public_keys: vec![SshPublicKey {
                    path: format!(
                        "/home/{}/.ssh/authorized_keys",
                        credentials.vm_admin_username
                    ),
                    key_data: key.clone(),
                }],
            }),
        });

    Ok(OsProfile {
        computer_name: computer_name.to_string(),
        admin_username: credentials.vm_admin_username.clone(),
        admin_password: credentials.vm_admin_password.clone(),
        custom_data: user_data.map(|data| general_purpose::STANDARD.encode(data)),
        linux_configuration,
    })
}

/// Build the PUT body for a single virtual machine
///
/// # Errors
///
/// Fails when the image id is malformed, or when no network interface or
/// admin credential is configured.
pub fn build_virtual_machine(
    credentials: &AzureCredentials,
    location: &str,
    name: &str,
    instance_type: &str,
    image_id: &str,
    user_data: Option<&str>,
) -> anyhow::Result<VirtualMachine> {
    let network_interface_id = credentials
        .network_interface_id
        .clone()
        .context("AZURE_NETWORK_INTERFACE_ID must be set to create virtual machines")?;

    Ok(VirtualMachine {
        id: None,
        name: None,
        location: location.to_string(),
        tags: HashMap::from([("Name".to_string(), name.to_string())]),
        properties: VirtualMachineProperties {
            hardware_profile: Some(HardwareProfile {
                vm_size: instance_type.to_string(),
            }),
            storage_profile: Some(StorageProfile {
                image_reference: parse_image_reference(image_id)?,
            }),
            os_profile: Some(build_os_profile(credentials, name, user_data)?),
            network_profile: Some(NetworkProfile {
                network_interfaces: vec![NetworkInterfaceReference {
                    id: network_interface_id,
                }],
            }),
            instance_view: None,
            provisioning_state: None,
        },
    })
}

/// Curated Azure ML environment for a runtime
#[must_use]
pub fn inference_environment(runtime: MlRuntime) -> &'static str {
    match runtime {
        MlRuntime::Pytorch => "azureml:AzureML-acpt-pytorch-2.2-cuda12.1@latest",
        MlRuntime::Tensorflow => "azureml:AzureML-tensorflow-2.12-cuda11@latest",
        MlRuntime::Sklearn => "azureml:AzureML-sklearn-1.5@latest",
        MlRuntime::Xgboost => "azureml:AzureML-ai-ml-automl@latest",
    }
}

/// Scoring URI of the managed online endpoint serving `model_id`
#[must_use]
pub fn scoring_uri(model_id: &str, region: &str) -> String {
    format!("https://{model_id}.{region}.inference.ml.azure.com/score")
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CloudProvider for AzureProvider {
    async fn create_compute_instance(
        &self,
        name: &str,
        instance_type: &str,
        image_id: &str,
        user_data: Option<&str>,
    ) -> Result<ComputeInstance, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Compute, "create_instance", async {
            require_non_empty("instance name", name)?;
            require_non_empty("instance type", instance_type)?;

            let definition = build_virtual_machine(
                self.credentials()?,
                self.config.region(),
                name,
                instance_type,
                image_id,
                user_data,
            )?;

            let vm = self.api.create_virtual_machine(name, &definition).await?;
            let created = to_compute_instance(&vm)
                .context("Azure reported no virtual machine as created")?;

            info!("Created Azure virtual machine {}", created.id);
            Ok(created)
        })
        .await
    }

    async fn get_compute_instance(&self, id: &str) -> Result<ComputeInstance, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Compute, "get_instance", async {
            require_non_empty("instance id", id)?;
            let vm = self
                .api
                .get_virtual_machine(id)
                .await?
                .ok_or_else(|| anyhow!("Virtual machine {id} not found"))?;
            to_compute_instance(&vm)
        })
        .await
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Compute, "terminate_instance", async {
            require_non_empty("instance id", id)?;
            self.api.delete_virtual_machine(id).await?;
            info!("Requested deletion of Azure virtual machine {}", id);
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
            require_blob_path(&options.path)?;

            debug!(
                "Uploading {} bytes to {}/{}",
                data.len(),
                options.container,
                options.path
            );
            self.api
                .put_blob(
                    &options.container,
                    &options.path,
                    data,
                    options.content_type.as_deref(),
                )
                .await
        })
        .await
    }

    async fn download_file(&self, options: &StorageOptions) -> Result<Vec<u8>, CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Storage, "download", async {
            require_non_empty("container", &options.container)?;
            require_blob_path(&options.path)?;
            self.api.get_blob(&options.container, &options.path).await
        })
        .await
    }

    async fn delete_file(&self, options: &StorageOptions) -> Result<(), CloudProviderError> {
        run_operation(PROVIDER, ServiceKind::Storage, "delete", async {
            require_non_empty("container", &options.container)?;
            require_blob_path(&options.path)?;
            self.api.delete_blob(&options.container, &options.path).await
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
            let version = options
                .version
                .as_deref()
                .unwrap_or(DEFAULT_AZURE_MODEL_VERSION);
            let model = ModelVersion {
                properties: ModelVersionProperties {
                    model_uri: primary.clone(),
                    model_type: "custom_model".to_string(),
                    description: None,
                    tags: HashMap::from([
                        ("runtime".to_string(), runtime.as_str().to_string()),
                        (
                            "environment".to_string(),
                            inference_environment(runtime).to_string(),
                        ),
                    ]),
                },
            };

            let model_version_id = self
                .api
                .create_model_version(&options.model_id, version, &model)
                .await?;
            info!(
                "Registered Azure ML model {} version {} ({} artifacts)",
                options.model_id,
                version,
                locators.len()
            );
            Ok(model_version_id)
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
            let uri = scoring_uri(&options.model_id, self.config.region());

            let start = Instant::now();
            let response = self.api.score(&uri, body).await?;
            let latency = elapsed_ms(start);

            let predictions = serde_json::from_slice(&response)
                .context("Scoring endpoint returned a non-JSON body")?;

            Ok(MlInferenceResult {
                predictions,
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
