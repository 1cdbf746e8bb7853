//! # Azure API Seam
//!
//! The Azure Resource Manager, Blob and Machine Learning calls used by
//! [`super::AzureProvider`], plus the JSON shapes they exchange.
//! [`super::rest::ArmRestApi`] implements the trait over REST.
//!
//! API references:
//! - [Virtual Machines](https://learn.microsoft.com/rest/api/compute/virtual-machines)
//! - [Blob service](https://learn.microsoft.com/rest/api/storageservices/blob-service-rest-api)
//! - [Model Versions](https://learn.microsoft.com/rest/api/azureml/model-versions)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Virtual Machine resource
// ============================================================================

/// `Microsoft.Compute/virtualMachines` resource, used for both the PUT body
/// and GET responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: VirtualMachineProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_profile: Option<HardwareProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<OsProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<NetworkProfile>,
    /// Only present on GET with `$expand=instanceView`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_view: Option<InstanceView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    pub vm_size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    pub image_reference: ImageReference,
}

/// Either a marketplace image (`publisher`/`offer`/`sku`/`version`) or a
/// custom image resource `id`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Admin account and bootstrap data; ARM never returns `adminPassword`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    pub computer_name: String,
    pub admin_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    /// Base64-encoded cloud-init payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_configuration: Option<LinuxConfiguration>,
}

impl std::fmt::Debug for OsProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsProfile")
            .field("computer_name", &self.computer_name)
            .field("admin_username", &self.admin_username)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "<redacted>"),
            )
            .field("custom_data", &self.custom_data)
            .field("linux_configuration", &self.linux_configuration)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxConfiguration {
    pub disable_password_authentication: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<SshConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfiguration {
    pub public_keys: Vec<SshPublicKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    /// Absolute path of `authorized_keys` on the VM
    pub path: String,
    pub key_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub network_interfaces: Vec<NetworkInterfaceReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfaceReference {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceView {
    #[serde(default)]
    pub statuses: Vec<InstanceViewStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceViewStatus {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_status: Option<String>,
}

impl VirtualMachine {
    /// The `PowerState/*` code of the instance view, without its prefix
    #[must_use]
    pub fn power_state(&self) -> Option<&str> {
        self.properties
            .instance_view
            .as_ref()?
            .statuses
            .iter()
            .filter_map(|status| status.code.as_deref())
            .find_map(|code| code.strip_prefix("PowerState/"))
    }
}

// ============================================================================
// Machine Learning model version
// ============================================================================

/// Body of a model version PUT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub properties: ModelVersionProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersionProperties {
    /// Blob URL of the primary artifact
    pub model_uri: String,
    pub model_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

#[async_trait]
pub trait AzureApi: Send + Sync {
    /// PUT a virtual machine in the configured resource group
    async fn create_virtual_machine(
        &self,
        name: &str,
        definition: &VirtualMachine,
    ) -> Result<VirtualMachine>;

    /// GET a virtual machine with its instance view; `None` on 404
    async fn get_virtual_machine(&self, name: &str) -> Result<Option<VirtualMachine>>;

    /// DELETE a virtual machine; returns once ARM accepts the request
    async fn delete_virtual_machine(&self, name: &str) -> Result<()>;

    /// Put a block blob and return its URL (without any SAS token)
    async fn put_blob(
        &self,
        container: &str,
        path: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String>;

    async fn get_blob(&self, container: &str, path: &str) -> Result<Vec<u8>>;

    /// Delete a blob; a missing blob is not an error
    async fn delete_blob(&self, container: &str, path: &str) -> Result<()>;

    /// PUT a model version and return its resource id
    async fn create_model_version(
        &self,
        model_name: &str,
        version: &str,
        model: &ModelVersion,
    ) -> Result<String>;

    /// POST a JSON body to an online endpoint scoring URI
    async fn score(&self, scoring_uri: &str, body: Vec<u8>) -> Result<Vec<u8>>;

    async fn probe_compute(&self) -> Result<()>;

    async fn probe_storage(&self) -> Result<()>;

    async fn probe_ml(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_state_from_instance_view() {
        let vm: VirtualMachine = serde_json::from_value(serde_json::json!({
            "name": "web-1",
            "location": "westeurope",
            "properties": {
                "provisioningState": "Succeeded",
                "instanceView": {
                    "statuses": [
                        {"code": "ProvisioningState/succeeded"},
                        {"code": "PowerState/deallocated", "displayStatus": "VM deallocated"}
                    ]
                }
            }
        }))
        .unwrap();

        assert_eq!(vm.power_state(), Some("deallocated"));
    }

    #[test]
    fn test_power_state_absent_without_instance_view() {
        let vm: VirtualMachine =
            serde_json::from_value(serde_json::json!({"name": "web-1"})).unwrap();
        assert_eq!(vm.power_state(), None);
    }

    #[test]
    fn test_vm_body_omits_empty_fields() {
        let vm = VirtualMachine {
            location: "eastus".to_string(),
            properties: VirtualMachineProperties {
                hardware_profile: Some(HardwareProfile {
                    vm_size: "Standard_B1s".to_string(),
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let body = serde_json::to_value(&vm).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "location": "eastus",
                "properties": {"hardwareProfile": {"vmSize": "Standard_B1s"}}
            })
        );
    }
}
