//! Azure Storage SharedKey authorization
//!
//! Signs a finished [`Request`] with the storage account key: HMAC-SHA256
//! over the canonical string described in
//! <https://learn.microsoft.com/rest/api/storageservices/authorize-with-shared-key>.
//! The request must already carry every `x-ms-*` header it will be sent
//! with, including `x-ms-date`.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use sha2::Sha256;
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Storage account name and decoded account key
#[derive(Clone)]
pub struct SharedKeyCredential {
    account_name: String,
    account_key: Vec<u8>,
}

impl std::fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}

impl SharedKeyCredential {
    #[must_use]
    pub fn new(account_name: impl Into<String>, account_key: Vec<u8>) -> Self {
        Self {
            account_name: account_name.into(),
            account_key,
        }
    }

    /// Canonical string the signature is computed over
    #[must_use]
    pub fn string_to_sign(&self, request: &Request) -> String {
        let headers = request.headers();
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        // Zero-length bodies sign as an empty Content-Length
        let content_length = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .map(<[u8]>::len)
            .filter(|len| *len > 0)
            .map(|len| len.to_string())
            .unwrap_or_default();

        let lines = [
            request.method().as_str().to_string(),
            header("content-encoding"),
            header("content-language"),
            content_length,
            header("content-md5"),
            header("content-type"),
            header("date"),
            header("if-modified-since"),
            header("if-match"),
            header("if-none-match"),
            header("if-unmodified-since"),
            header("range"),
        ];

        let mut signed = lines.join("\n");
        signed.push('\n');
        signed.push_str(&canonicalized_headers(request));
        signed.push_str(&self.canonicalized_resource(request));
        signed
    }

    /// Add the `Authorization: SharedKey account:signature` header
    ///
    /// # Errors
    ///
    /// Fails when the account key cannot key the HMAC or the header value is
    /// not valid.
    pub fn sign(&self, request: &mut Request) -> Result<()> {
        let mut mac = HmacSha256::new_from_slice(&self.account_key)
            .map_err(|e| anyhow!("Storage account key cannot be used as an HMAC key: {e}"))?;
        mac.update(self.string_to_sign(request).as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let value = HeaderValue::from_str(&format!(
            "SharedKey {}:{}",
            self.account_name, signature
        ))
        .context("Invalid SharedKey authorization header")?;
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }

    /// `/account/path` followed by one `\nname:value` line per query parameter
    fn canonicalized_resource(&self, request: &Request) -> String {
        let url = request.url();
        let mut resource = format!("/{}{}", self.account_name, url.path());

        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in url.query_pairs() {
            params
                .entry(name.to_ascii_lowercase())
                .or_default()
                .push(value.into_owned());
        }
        for (name, mut values) in params {
            values.sort();
            resource.push_str(&format!("\n{name}:{}", values.join(",")));
        }
        resource
    }
}

/// Every `x-ms-*` header as `name:value\n`, sorted by name
fn canonicalized_headers(request: &Request) -> String {
    let mut ms_headers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in request.headers() {
        if name.as_str().starts_with("x-ms-") {
            ms_headers
                .entry(name.as_str())
                .or_default()
                .push(value.to_str().unwrap_or_default().trim());
        }
    }

    ms_headers
        .into_iter()
        .map(|(name, values)| format!("{name}:{}\n", values.join(",")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, Url};

    fn credential() -> SharedKeyCredential {
        SharedKeyCredential::new("facadestore", b"key-bytes".to_vec())
    }

    fn put_request() -> Request {
        let url = Url::parse("https://facadestore.blob.core.windows.net/reports/2024/q1.csv")
            .unwrap();
        let mut request = Request::new(Method::PUT, url);
        let headers = request.headers_mut();
        headers.insert("x-ms-version", HeaderValue::from_static("2023-11-03"));
        headers.insert(
            "x-ms-date",
            HeaderValue::from_static("Fri, 18 Oct 2024 09:30:00 GMT"),
        );
        headers.insert("x-ms-blob-type", HeaderValue::from_static("BlockBlob"));
        headers.insert("content-type", HeaderValue::from_static("text/csv"));
        *request.body_mut() = Some(reqwest::Body::from(b"a,b\n".to_vec()));
        request
    }

    #[test]
    fn test_string_to_sign_for_put_blob() {
        let expected = "PUT\n\n\n4\n\ntext/csv\n\n\n\n\n\n\n\
            x-ms-blob-type:BlockBlob\n\
            x-ms-date:Fri, 18 Oct 2024 09:30:00 GMT\n\
            x-ms-version:2023-11-03\n\
            /facadestore/reports/2024/q1.csv";

        assert_eq!(credential().string_to_sign(&put_request()), expected);
    }

    #[test]
    fn test_query_parameters_are_sorted_and_lowercased() {
        let url =
            Url::parse("https://facadestore.blob.core.windows.net/?maxresults=1&Comp=list")
                .unwrap();
        let request = Request::new(Method::GET, url);

        let signed = credential().string_to_sign(&request);

        assert!(signed.starts_with("GET\n\n\n\n"));
        assert!(signed.ends_with("/facadestore/\ncomp:list\nmaxresults:1"));
    }

    #[test]
    fn test_sign_sets_shared_key_header() {
        let mut request = put_request();

        credential().sign(&mut request).unwrap();

        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "SharedKey facadestore:OXITKaDt0yix8Du5SCxRlDP5Ztld2Je68J0ADfv1Plw="
        );
    }

    #[test]
    fn test_debug_hides_account_key() {
        assert!(!format!("{:?}", credential()).contains("key-bytes"));
    }
}
