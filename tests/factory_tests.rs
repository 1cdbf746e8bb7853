//! # Provider Factory Tests
//!
//! Caching, eviction and validation behaviour of [`ProviderFactory`], using a
//! builder that wires providers to in-memory vendor APIs.

mod common;

use async_trait::async_trait;
use cloud_facade::config::CloudConfig;
use cloud_facade::error::{ConfigurationError, Error, Result};
use cloud_facade::provider::aws::AwsProvider;
use cloud_facade::provider::azure::AzureProvider;
use cloud_facade::provider::{CloudProvider, ProviderBuilder, ProviderFactory};
use cloud_facade::types::ProviderKind;
use common::{aws_config, azure_config, install_crypto_provider, FakeAwsApi, FakeAzureApi};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Builds fake-backed providers and counts how often it is asked to
#[derive(Debug, Default)]
struct CountingBuilder {
    builds: AtomicUsize,
}

impl CountingBuilder {
    fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderBuilder for CountingBuilder {
    async fn build(&self, config: &CloudConfig) -> Result<Arc<dyn CloudProvider>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which concurrent callers could race
        tokio::time::sleep(Duration::from_millis(20)).await;
        let provider: Arc<dyn CloudProvider> = match config.provider {
            ProviderKind::Aws => Arc::new(AwsProvider::with_api(
                config.clone(),
                Arc::new(FakeAwsApi::default()),
            )?),
            ProviderKind::Azure => Arc::new(AzureProvider::with_api(
                config.clone(),
                Arc::new(FakeAzureApi::default()),
            )?),
        };
        Ok(provider)
    }
}

fn factory() -> (ProviderFactory, Arc<CountingBuilder>) {
    let builder = Arc::new(CountingBuilder::default());
    (ProviderFactory::with_builder(builder.clone()), builder)
}

#[tokio::test]
async fn test_repeated_calls_return_same_instance() {
    let (factory, builder) = factory();

    let first = factory.get_provider(&aws_config()).await.unwrap();
    let second = factory.get_provider(&aws_config()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builder.builds(), 1);
}

#[tokio::test]
async fn test_cached_provider_ignores_different_config() {
    let (factory, builder) = factory();

    let first = factory.get_provider(&aws_config()).await.unwrap();
    let second = factory.get_provider(&azure_config()).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.provider_kind(), ProviderKind::Aws);
    assert_eq!(builder.builds(), 1);
}

#[tokio::test]
async fn test_clear_then_rebuild_with_new_config() {
    let (factory, builder) = factory();

    let first = factory.get_provider(&aws_config()).await.unwrap();
    factory.clear_provider().await;
    assert!(factory.current().await.is_none());

    let second = factory.get_provider(&azure_config()).await.unwrap();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.provider_kind(), ProviderKind::Azure);
    assert_eq!(second.get_config().region(), "eastus");
    assert_eq!(builder.builds(), 2);
}

#[tokio::test]
async fn test_clear_on_empty_factory_is_noop() {
    let (factory, builder) = factory();

    factory.clear_provider().await;
    factory.clear_provider().await;

    assert!(factory.current().await.is_none());
    assert_eq!(builder.builds(), 0);
}

#[tokio::test]
async fn test_concurrent_first_calls_build_once() {
    let (factory, builder) = factory();
    let factory = Arc::new(factory);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let factory = Arc::clone(&factory);
            tokio::spawn(async move { factory.get_provider(&aws_config()).await })
        })
        .collect();

    let mut providers = Vec::new();
    for handle in handles {
        providers.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(builder.builds(), 1);
    assert!(providers.iter().all(|p| Arc::ptr_eq(p, &providers[0])));
}

#[tokio::test]
async fn test_missing_credentials_fail_without_building() {
    let (factory, builder) = factory();
    let mut config = azure_config();
    config.credentials.azure = None;

    let err = factory.get_provider(&config).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::MissingCredentials {
            provider: ProviderKind::Azure
        })
    ));
    assert_eq!(builder.builds(), 0);
    assert!(factory.current().await.is_none());
}

#[tokio::test]
async fn test_get_provider_by_name() {
    let (factory, builder) = factory();

    let provider = factory
        .get_provider_by_name("AWS", &aws_config())
        .await
        .unwrap();
    assert_eq!(provider.provider_kind(), ProviderKind::Aws);

    factory.clear_provider().await;
    let err = factory
        .get_provider_by_name("oracle", &aws_config())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::UnsupportedProvider { .. })
    ));
    assert_eq!(builder.builds(), 1);
    assert!(factory.current().await.is_none());
}

#[tokio::test]
async fn test_sdk_factory_builds_aws_provider() {
    install_crypto_provider();
    let factory = ProviderFactory::new();

    let provider = factory.get_provider(&aws_config()).await.unwrap();

    assert_eq!(provider.provider_kind(), ProviderKind::Aws);
    assert_eq!(provider.get_config().provider, ProviderKind::Aws);
    assert_eq!(provider.get_config(), &aws_config());
}

#[tokio::test]
async fn test_sdk_factory_builds_azure_provider() {
    install_crypto_provider();
    let factory = ProviderFactory::default();

    let provider = factory.get_provider(&azure_config()).await.unwrap();

    assert_eq!(provider.provider_kind(), ProviderKind::Azure);
    assert_eq!(provider.get_config().provider, ProviderKind::Azure);
    assert_eq!(provider.get_config().region(), "eastus");
}

#[tokio::test]
async fn test_sdk_factory_rejects_bad_connection_string() {
    install_crypto_provider();
    let factory = ProviderFactory::new();
    let mut config = azure_config();
    if let Some(azure) = config.credentials.azure.as_mut() {
        azure.storage_connection_string = "AccountName=facadestore;AccountKey=%%%".to_string();
    }

    let err = factory.get_provider(&config).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::InvalidValue { .. })
    ));
    assert!(factory.current().await.is_none());
}

#[tokio::test]
async fn test_current_peeks_without_building() {
    let (factory, builder) = factory();

    assert!(factory.current().await.is_none());
    let provider = factory.get_provider(&aws_config()).await.unwrap();
    let current = factory.current().await.unwrap();

    assert!(Arc::ptr_eq(&provider, &current));
    assert_eq!(builder.builds(), 1);
}
