//! Azure Storage connection string parsing
//!
//! Connection strings are `Key=Value` pairs separated by `;`. Only the keys
//! needed to address and authorize the Blob service are read.

use crate::constants::AZURE_DEFAULT_ENDPOINT_SUFFIX;
use crate::error::ConfigurationError;
use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;

const FIELD: &str = "AZURE_STORAGE_CONNECTION_STRING";

/// Blob service address extracted from a storage connection string
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConnectionString {
    /// Blob service endpoint without a trailing slash
    pub blob_endpoint: String,
    pub account_name: Option<String>,
    /// Decoded `AccountKey`, used for SharedKey signing
    pub account_key: Option<Vec<u8>>,
    /// SAS token without the leading `?`
    pub shared_access_signature: Option<String>,
}

impl std::fmt::Debug for StorageConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConnectionString")
            .field("blob_endpoint", &self.blob_endpoint)
            .field("account_name", &self.account_name)
            .field("account_key", &self.account_key.as_ref().map(|_| "<redacted>"))
            .field(
                "shared_access_signature",
                &self.shared_access_signature.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl StorageConnectionString {
    /// Parse a connection string
    ///
    /// `BlobEndpoint` wins; otherwise the endpoint is derived from
    /// `AccountName` and `EndpointSuffix`.
    ///
    /// # Errors
    ///
    /// Fails when a segment is not `Key=Value`, when neither `BlobEndpoint`
    /// nor `AccountName` is present, or when `AccountKey` is not base64.
    pub fn parse(connection_string: &str) -> Result<Self, ConfigurationError> {
        let mut pairs = HashMap::new();
        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            // Values (keys, SAS tokens) may themselves contain '='
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| invalid(format!("segment '{segment}' is not a Key=Value pair")))?;
            pairs.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let account_name = pairs.get("accountname").cloned();
        let blob_endpoint = match (pairs.get("blobendpoint"), &account_name) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, Some(account)) => {
                let suffix = pairs
                    .get("endpointsuffix")
                    .map_or(AZURE_DEFAULT_ENDPOINT_SUFFIX, String::as_str);
                format!("https://{account}.blob.{suffix}")
            }
            (None, None) => {
                return Err(invalid(
                    "neither BlobEndpoint nor AccountName is set".to_string(),
                ))
            }
        };

        let account_key = pairs
            .get("accountkey")
            .filter(|key| !key.is_empty())
            .map(|key| {
                general_purpose::STANDARD
                    .decode(key)
                    .map_err(|e| invalid(format!("AccountKey is not valid base64: {e}")))
            })
            .transpose()?;

        let shared_access_signature = pairs
            .get("sharedaccesssignature")
            .map(|sas| sas.trim_start_matches('?').to_string())
            .filter(|sas| !sas.is_empty());

        Ok(Self {
            blob_endpoint,
            account_name,
            account_key,
            shared_access_signature,
        })
    }
}

fn invalid(reason: String) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: FIELD.to_string(),
        reason,
    }
}
