//! # Common Provider Utilities
//!
//! Shared utilities and patterns used across all provider implementations.
//!
//! - [`run_operation`] wraps one vendor operation with a tracing span,
//!   metrics and error tagging
//! - [`probe`] collapses a health probe into a boolean
//! - [`upload_model_artifacts`] fans model uploads out and waits for all of them

use crate::constants::MODEL_ARTIFACT_CONTAINER;
use crate::error::{with_cloud_error, CloudProviderError, ValidationError};
use crate::observability::metrics;
use crate::types::{MlModelOptions, ModelFile, ProviderKind, ServiceKind, StorageOptions};
use futures::future::join_all;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, field, info_span, warn, Instrument, Span};

/// Serving runtimes with a known deployment image
///
/// Unknown or missing runtime names resolve to [`MlRuntime::Pytorch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlRuntime {
    Pytorch,
    Tensorflow,
    Sklearn,
    Xgboost,
}

impl MlRuntime {
    #[must_use]
    pub fn resolve(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("tensorflow") => MlRuntime::Tensorflow,
            Some("sklearn" | "scikit-learn") => MlRuntime::Sklearn,
            Some("xgboost") => MlRuntime::Xgboost,
            _ => MlRuntime::Pytorch,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MlRuntime::Pytorch => "pytorch",
            MlRuntime::Tensorflow => "tensorflow",
            MlRuntime::Sklearn => "sklearn",
            MlRuntime::Xgboost => "xgboost",
        }
    }
}

/// Records operation metrics and span attributes for a successful operation
pub fn record_success_metrics(
    span: &Span,
    provider: ProviderKind,
    service: ServiceKind,
    operation: &str,
    duration: Duration,
) {
    span.record("operation.duration_ms", duration_ms(duration));
    span.record("operation.success", true);
    metrics::record_provider_operation(
        provider.as_str(),
        service.as_str(),
        operation,
        duration.as_secs_f64(),
    );
}

/// Records operation metrics and span attributes for a failed operation
pub fn record_error_metrics(
    span: &Span,
    provider: ProviderKind,
    service: ServiceKind,
    error_message: &str,
    duration: Duration,
) {
    span.record("operation.success", false);
    span.record("error.message", error_message);
    span.record("operation.duration_ms", duration_ms(duration));
    metrics::increment_provider_operation_errors(provider.as_str(), service.as_str());
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Helper struct for tracking operation state
#[derive(Debug)]
pub struct OperationTracker {
    start: Instant,
    span: Span,
    provider: ProviderKind,
    service: ServiceKind,
    operation: &'static str,
}

impl OperationTracker {
    /// Create a new operation tracker
    pub fn new(
        provider: ProviderKind,
        service: ServiceKind,
        operation: &'static str,
        span: Span,
    ) -> Self {
        Self {
            start: Instant::now(),
            span,
            provider,
            service,
            operation,
        }
    }

    pub fn record_success(&self) {
        record_success_metrics(
            &self.span,
            self.provider,
            self.service,
            self.operation,
            self.start.elapsed(),
        );
    }

    pub fn record_error(&self, error_message: &str) {
        record_error_metrics(
            &self.span,
            self.provider,
            self.service,
            error_message,
            self.start.elapsed(),
        );
    }
}

/// Run one provider operation
///
/// The future runs inside a `cloud.operation` span; the outcome is recorded
/// on the span and in metrics, and a failure is tagged with
/// `(provider, service)`.
///
/// # Errors
///
/// Returns the tagged failure of `operation_future`.
pub async fn run_operation<T, F>(
    provider: ProviderKind,
    service: ServiceKind,
    operation: &'static str,
    operation_future: F,
) -> Result<T, CloudProviderError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    let span = info_span!(
        "cloud.operation",
        cloud.provider = provider.as_str(),
        cloud.service = service.as_str(),
        operation.name = operation,
        operation.success = field::Empty,
        operation.duration_ms = field::Empty,
        error.message = field::Empty,
    );
    let tracker = OperationTracker::new(provider, service, operation, span.clone());

    let result = with_cloud_error(provider, service, operation_future)
        .instrument(span)
        .await;

    match &result {
        Ok(_) => tracker.record_success(),
        Err(e) => {
            debug!("{} {} {} failed: {}", provider, service, operation, e);
            tracker.record_error(e.message());
        }
    }
    result
}

/// Run a health probe and collapse its outcome to a boolean
///
/// The probe's error is logged and dropped; it never reaches the caller.
pub async fn probe<F>(provider: ProviderKind, service: ServiceKind, probe_future: F) -> bool
where
    F: Future<Output = anyhow::Result<()>>,
{
    match with_cloud_error(provider, service, probe_future).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                provider = provider.as_str(),
                service = service.as_str(),
                "Health probe failed: {}",
                e
            );
            false
        }
    }
}

/// Object key for one model artifact: `{model_id}/{relative_path}`
#[must_use]
pub fn model_artifact_key(model_id: &str, relative_path: &str) -> String {
    format!("{}/{}", model_id, relative_path.trim_start_matches('/'))
}

/// Storage address for one model artifact
#[must_use]
pub fn model_artifact_location(options: &MlModelOptions, file: &ModelFile) -> StorageOptions {
    StorageOptions::new(
        MODEL_ARTIFACT_CONTAINER,
        model_artifact_key(&options.model_id, &file.relative_path),
    )
}

/// Upload every model file concurrently and wait for all of them to settle
///
/// Locators come back in input order. When several uploads fail, the
/// failure of the earliest file in the input is returned.
///
/// # Errors
///
/// Returns [`ValidationError::NoModelFiles`] for an empty file list, or the
/// first upload failure.
pub async fn upload_model_artifacts<U, Fut>(
    options: &MlModelOptions,
    model_files: &[ModelFile],
    upload: U,
) -> anyhow::Result<Vec<String>>
where
    U: Fn(StorageOptions, Vec<u8>) -> Fut,
    Fut: Future<Output = anyhow::Result<String>>,
{
    if model_files.is_empty() {
        return Err(ValidationError::NoModelFiles.into());
    }

    let uploads = model_files
        .iter()
        .map(|file| upload(model_artifact_location(options, file), file.content.clone()));

    join_all(uploads).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_runtime_resolution_defaults_to_pytorch() {
        assert_eq!(MlRuntime::resolve(Some("TensorFlow")), MlRuntime::Tensorflow);
        assert_eq!(MlRuntime::resolve(Some("scikit-learn")), MlRuntime::Sklearn);
        assert_eq!(MlRuntime::resolve(Some("xgboost")), MlRuntime::Xgboost);
        assert_eq!(MlRuntime::resolve(Some("onnx")), MlRuntime::Pytorch);
        assert_eq!(MlRuntime::resolve(None), MlRuntime::Pytorch);
    }

    #[test]
    fn test_model_artifact_key() {
        assert_eq!(model_artifact_key("churn", "model.pt"), "churn/model.pt");
        assert_eq!(
            model_artifact_key("churn", "/weights/layer.bin"),
            "churn/weights/layer.bin"
        );
    }

    #[tokio::test]
    async fn test_upload_model_artifacts_preserves_input_order() {
        let options = MlModelOptions::new("churn");
        let files = vec![
            ModelFile::new("model.pt", b"weights".to_vec()),
            ModelFile::new("config.json", b"{}".to_vec()),
        ];

        let locators = upload_model_artifacts(&options, &files, |location, _data| async move {
            Ok(format!("mem://{}/{}", location.container, location.path))
        })
        .await
        .unwrap();

        assert_eq!(
            locators,
            vec![
                "mem://ml-models/churn/model.pt".to_string(),
                "mem://ml-models/churn/config.json".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_model_artifacts_waits_for_every_upload() {
        let options = MlModelOptions::new("churn");
        let files = vec![
            ModelFile::new("a.bin", b"a".to_vec()),
            ModelFile::new("b.bin", b"b".to_vec()),
            ModelFile::new("c.bin", b"c".to_vec()),
        ];
        let settled = Arc::new(AtomicUsize::new(0));

        let result = upload_model_artifacts(&options, &files, |location, _data| {
            let settled = Arc::clone(&settled);
            async move {
                settled.fetch_add(1, Ordering::SeqCst);
                if location.path.ends_with("a.bin") {
                    anyhow::bail!("upload rejected");
                }
                Ok(location.path)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(settled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_upload_model_artifacts_rejects_empty_list() {
        let options = MlModelOptions::new("churn");
        let err = upload_model_artifacts(&options, &[], |_location, _data| async move {
            Ok(String::new())
        })
        .await
        .unwrap_err();

        assert!(err.downcast_ref::<ValidationError>().is_some());
    }

    #[tokio::test]
    async fn test_probe_swallows_failure() {
        let healthy = probe(ProviderKind::Aws, ServiceKind::Storage, async { Ok(()) }).await;
        let unhealthy = probe(ProviderKind::Aws, ServiceKind::Ml, async {
            Err(anyhow::anyhow!("access denied"))
        })
        .await;

        assert!(healthy);
        assert!(!unhealthy);
    }

    #[tokio::test]
    async fn test_run_operation_tags_failure() {
        let err = run_operation(ProviderKind::Azure, ServiceKind::Storage, "download", async {
            Err::<(), _>(anyhow::anyhow!("BlobNotFound"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.message(), "AZURE storage error: BlobNotFound");
    }
}
