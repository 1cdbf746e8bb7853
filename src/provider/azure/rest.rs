//! Azure REST Client
//!
//! [`AzureApi`] implementation over the Azure REST APIs using reqwest.
//!
//! - Virtual machines and ML model versions go through Azure Resource
//!   Manager with a management-scope bearer token
//! - Blobs go to the endpoint from the storage connection string, signed
//!   with SharedKey when it carries an `AccountKey`, else with its SAS
//!   token, else with a storage-scope bearer token
//! - Scoring goes to the online endpoint with an ML-scope bearer token
//!
//! Tokens come from a service principal (`ClientSecretCredential`).

use super::api::{AzureApi, ModelVersion, VirtualMachine};
use super::connection_string::StorageConnectionString;
use super::shared_key::SharedKeyCredential;
use crate::config::AzureCredentials;
use crate::constants::{
    AZURE_BLOB_API_VERSION, AZURE_COMPUTE_API_VERSION, AZURE_MANAGEMENT_ENDPOINT,
    AZURE_MANAGEMENT_SCOPE, AZURE_ML_API_VERSION, AZURE_ML_SCOPE, AZURE_STORAGE_SCOPE,
};
use crate::error::ConfigurationError;
use crate::types::ProviderKind;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use azure_core::credentials::{Secret, TokenCredential, TokenRequestOptions};
use azure_identity::ClientSecretCredential;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use std::sync::Arc;
use tracing::debug;

/// Azure REST client
pub struct ArmRestApi {
    http_client: Client,
    credential: Arc<dyn TokenCredential>,
    management_endpoint: String,
    subscription_id: String,
    resource_group: String,
    ml_workspace: String,
    storage: StorageConnectionString,
    blob_auth: BlobAuth,
}

/// How Blob requests are authorized
enum BlobAuth {
    SharedKey(SharedKeyCredential),
    Sas(String),
    Token,
}

impl BlobAuth {
    fn from_connection_string(storage: &StorageConnectionString) -> Self {
        match (
            &storage.account_name,
            &storage.account_key,
            &storage.shared_access_signature,
        ) {
            (Some(account), Some(key), _) => {
                Self::SharedKey(SharedKeyCredential::new(account.clone(), key.clone()))
            }
            (_, _, Some(sas)) => Self::Sas(sas.clone()),
            _ => Self::Token,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::SharedKey(_) => "shared-key",
            Self::Sas(_) => "sas",
            Self::Token => "token",
        }
    }
}

impl std::fmt::Debug for ArmRestApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmRestApi")
            .field("subscription_id", &self.subscription_id)
            .field("resource_group", &self.resource_group)
            .field("ml_workspace", &self.ml_workspace)
            .field("storage", &self.storage)
            .field("blob_auth", &self.blob_auth.kind())
            .finish_non_exhaustive()
    }
}

impl ArmRestApi {
    /// Create the REST client from service principal credentials
    ///
    /// # Errors
    ///
    /// Fails when the storage connection string cannot be parsed or the
    /// credential or HTTP client cannot be built.
    pub fn new(credentials: &AzureCredentials) -> Result<Self, ConfigurationError> {
        let storage = StorageConnectionString::parse(&credentials.storage_connection_string)?;

        let credential: Arc<dyn TokenCredential> = ClientSecretCredential::new(
            &credentials.tenant_id,
            credentials.client_id.clone(),
            Secret::new(credentials.client_secret.clone()),
            None,
        )
        .map_err(|e| ConfigurationError::ClientInitialization {
            provider: ProviderKind::Azure,
            reason: format!("failed to create ClientSecretCredential: {e}"),
        })?;

        // Create HTTP client with rustls
        let http_client =
            Client::builder()
                .build()
                .map_err(|e| ConfigurationError::ClientInitialization {
                    provider: ProviderKind::Azure,
                    reason: format!("failed to create HTTP client: {e}"),
                })?;

        let blob_auth = BlobAuth::from_connection_string(&storage);
        debug!(
            "Azure blob endpoint: {} ({} auth)",
            storage.blob_endpoint,
            blob_auth.kind()
        );

        Ok(Self {
            http_client,
            credential,
            management_endpoint: AZURE_MANAGEMENT_ENDPOINT.to_string(),
            subscription_id: credentials.subscription_id.clone(),
            resource_group: credentials.resource_group.clone(),
            ml_workspace: credentials.ml_workspace.clone(),
            storage,
            blob_auth,
        })
    }

    /// Get an access token for one resource scope
    async fn get_token(&self, scope: &str) -> Result<String> {
        let token_response = self
            .credential
            .get_token(&[scope], Some(TokenRequestOptions::default()))
            .await
            .with_context(|| format!("Failed to get Azure access token for {scope}"))?;
        Ok(token_response.token.secret().to_string())
    }

    fn resource_group_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}",
            self.management_endpoint, self.subscription_id, self.resource_group
        )
    }

    fn virtual_machine_url(&self, name: &str) -> String {
        format!(
            "{}/providers/Microsoft.Compute/virtualMachines/{}",
            self.resource_group_url(),
            name
        )
    }

    fn workspace_url(&self) -> String {
        format!(
            "{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.resource_group_url(),
            self.ml_workspace
        )
    }

    /// Blob URL without SAS, with each path segment percent-encoded
    ///
    /// Segments are kept as given, so `a//b` stays distinct from `a/b`.
    fn blob_url(&self, container: &str, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.storage.blob_endpoint)
            .with_context(|| format!("Invalid blob endpoint {}", self.storage.blob_endpoint))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Blob endpoint cannot carry a path"))?
            .pop_if_empty()
            .push(container)
            .extend(path.split('/'));
        Ok(url)
    }

    /// Stamp the Blob service headers, authorize and send
    async fn send_blob(&self, request: RequestBuilder) -> Result<Response> {
        let mut request = request
            .header("x-ms-version", AZURE_BLOB_API_VERSION)
            .header(
                "x-ms-date",
                Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            );
        if matches!(self.blob_auth, BlobAuth::Token) {
            request = request.bearer_auth(self.get_token(AZURE_STORAGE_SCOPE).await?);
        }

        let mut request = request.build().context("Failed to build blob request")?;
        match &self.blob_auth {
            BlobAuth::SharedKey(credential) => credential.sign(&mut request)?,
            BlobAuth::Sas(sas) => {
                let query = match request.url().query() {
                    Some(existing) => format!("{existing}&{sas}"),
                    None => sas.clone(),
                };
                request.url_mut().set_query(Some(&query));
            }
            BlobAuth::Token => {}
        }

        self.http_client
            .execute(request)
            .await
            .context("Failed to reach Azure Blob service")
    }

    async fn send_management(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.get_token(AZURE_MANAGEMENT_SCOPE).await?;
        request
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to reach Azure Resource Manager")
    }
}

/// Turn a non-success response into an error carrying the Azure error body
async fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("{action} failed with status {status}: {body}")
}

#[async_trait]
impl AzureApi for ArmRestApi {
    async fn create_virtual_machine(
        &self,
        name: &str,
        definition: &VirtualMachine,
    ) -> Result<VirtualMachine> {
        let url = self.virtual_machine_url(name);
        let request = self
            .http_client
            .put(&url)
            .query(&[("api-version", AZURE_COMPUTE_API_VERSION)])
            .json(definition);

        let response = ensure_success(
            self.send_management(request).await?,
            "Create virtual machine",
        )
        .await?;
        response
            .json::<VirtualMachine>()
            .await
            .context("Failed to parse virtual machine response")
    }

    async fn get_virtual_machine(&self, name: &str) -> Result<Option<VirtualMachine>> {
        let url = self.virtual_machine_url(name);
        let request = self.http_client.get(&url).query(&[
            ("api-version", AZURE_COMPUTE_API_VERSION),
            ("$expand", "instanceView"),
        ]);

        let response = self.send_management(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response, "Get virtual machine").await?;
        let vm = response
            .json::<VirtualMachine>()
            .await
            .context("Failed to parse virtual machine response")?;
        Ok(Some(vm))
    }

    async fn delete_virtual_machine(&self, name: &str) -> Result<()> {
        let url = self.virtual_machine_url(name);
        let request = self
            .http_client
            .delete(&url)
            .query(&[("api-version", AZURE_COMPUTE_API_VERSION)]);

        // 202 Accepted: deletion continues asynchronously in ARM
        ensure_success(
            self.send_management(request).await?,
            "Delete virtual machine",
        )
        .await?;
        Ok(())
    }

    async fn put_blob(
        &self,
        container: &str,
        path: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let url = self.blob_url(container, path)?;
        let request = self
            .http_client
            .put(url.clone())
            .header("x-ms-blob-type", "BlockBlob")
            .header(
                "Content-Type",
                content_type.unwrap_or("application/octet-stream"),
            )
            .body(data);

        ensure_success(self.send_blob(request).await?, "Put blob").await?;
        Ok(url.to_string())
    }

    async fn get_blob(&self, container: &str, path: &str) -> Result<Vec<u8>> {
        let url = self.blob_url(container, path)?;
        let response = self.send_blob(self.http_client.get(url)).await?;
        let response = ensure_success(response, "Get blob").await?;
        let bytes = response
            .bytes()
            .await
            .context("Failed to read blob body")?;
        Ok(bytes.to_vec())
    }

    async fn delete_blob(&self, container: &str, path: &str) -> Result<()> {
        let url = self.blob_url(container, path)?;
        let response = self.send_blob(self.http_client.delete(url.clone())).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Blob {} already absent", url);
            return Ok(());
        }
        ensure_success(response, "Delete blob").await?;
        Ok(())
    }

    async fn create_model_version(
        &self,
        model_name: &str,
        version: &str,
        model: &ModelVersion,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}/versions/{}",
            self.workspace_url(),
            model_name,
            version
        );
        let request = self
            .http_client
            .put(&url)
            .query(&[("api-version", AZURE_ML_API_VERSION)])
            .json(model);

        let response = ensure_success(
            self.send_management(request).await?,
            "Create model version",
        )
        .await?;
        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse model version response")?;

        Ok(body
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map_or_else(
                || url.trim_start_matches(&self.management_endpoint).to_string(),
                str::to_string,
            ))
    }

    async fn score(&self, scoring_uri: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let token = self.get_token(AZURE_ML_SCOPE).await?;
        let response = self
            .http_client
            .post(scoring_uri)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach scoring endpoint {scoring_uri}"))?;

        let response = ensure_success(response, "Score").await?;
        let bytes = response
            .bytes()
            .await
            .context("Failed to read scoring response")?;
        Ok(bytes.to_vec())
    }

    async fn probe_compute(&self) -> Result<()> {
        let url = format!(
            "{}/providers/Microsoft.Compute/virtualMachines",
            self.resource_group_url()
        );
        let request = self
            .http_client
            .get(&url)
            .query(&[("api-version", AZURE_COMPUTE_API_VERSION)]);
        ensure_success(self.send_management(request).await?, "List virtual machines").await?;
        Ok(())
    }

    async fn probe_storage(&self) -> Result<()> {
        let mut url = Url::parse(&self.storage.blob_endpoint)
            .with_context(|| format!("Invalid blob endpoint {}", self.storage.blob_endpoint))?;
        url.query_pairs_mut()
            .append_pair("comp", "list")
            .append_pair("maxresults", "1");

        let response = self.send_blob(self.http_client.get(url)).await?;
        ensure_success(response, "List containers").await?;
        Ok(())
    }

    async fn probe_ml(&self) -> Result<()> {
        let request = self
            .http_client
            .get(self.workspace_url())
            .query(&[("api-version", AZURE_ML_API_VERSION)]);
        ensure_success(self.send_management(request).await?, "Get workspace").await?;
        Ok(())
    }
}
