//! # Provider Factory
//!
//! Builds the [`CloudProvider`] for a configuration and caches it.
//!
//! The factory holds at most one provider. The first successful
//! [`ProviderFactory::get_provider`] call builds it; later calls return the
//! cached instance even when passed a different configuration, until
//! [`ProviderFactory::clear_provider`] evicts it.

use crate::config::CloudConfig;
use crate::error::{Error, Result};
use crate::provider::aws::AwsProvider;
use crate::provider::azure::AzureProvider;
use crate::provider::CloudProvider;
use crate::types::ProviderKind;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Constructs a provider from a validated configuration
#[async_trait]
pub trait ProviderBuilder: Send + Sync + std::fmt::Debug {
    async fn build(&self, config: &CloudConfig) -> Result<Arc<dyn CloudProvider>>;
}

/// Builds providers backed by the real vendor clients
#[derive(Debug, Default, Clone, Copy)]
pub struct SdkProviderBuilder;

#[async_trait]
impl ProviderBuilder for SdkProviderBuilder {
    async fn build(&self, config: &CloudConfig) -> Result<Arc<dyn CloudProvider>> {
        let provider: Arc<dyn CloudProvider> = match config.provider {
            ProviderKind::Aws => Arc::new(AwsProvider::new(config.clone()).await?),
            ProviderKind::Azure => Arc::new(AzureProvider::new(config.clone())?),
        };
        Ok(provider)
    }
}

/// Caller-owned provider cache
#[derive(Debug)]
pub struct ProviderFactory {
    builder: Arc<dyn ProviderBuilder>,
    cached: Mutex<Option<Arc<dyn CloudProvider>>>,
}

impl Default for ProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderFactory {
    /// Factory that builds SDK-backed providers
    #[must_use]
    pub fn new() -> Self {
        Self::with_builder(Arc::new(SdkProviderBuilder))
    }

    #[must_use]
    pub fn with_builder(builder: Arc<dyn ProviderBuilder>) -> Self {
        Self {
            builder,
            cached: Mutex::new(None),
        }
    }

    /// Return the cached provider, building it from `config` on first use
    ///
    /// The lock is held while building, so concurrent first calls build once.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::ConfigurationError`] when nothing is cached
    /// and `config` is invalid, or the builder's error when construction fails.
    /// A failed build leaves the cache empty.
    pub async fn get_provider(&self, config: &CloudConfig) -> Result<Arc<dyn CloudProvider>> {
        let mut cached = self.cached.lock().await;
        if let Some(provider) = cached.as_ref() {
            if provider.provider_kind() != config.provider {
                debug!(
                    "Returning cached {} provider; requested {} is ignored until cleared",
                    provider.provider_kind(),
                    config.provider
                );
            }
            return Ok(Arc::clone(provider));
        }

        config.validate()?;
        info!(
            "Building {} provider for region {}",
            config.provider,
            config.region()
        );
        let provider = self.builder.build(config).await?;
        *cached = Some(Arc::clone(&provider));
        Ok(provider)
    }

    /// Build from a provider name, as read from configuration
    ///
    /// `config.provider` is replaced by the parsed name before building.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ConfigurationError::UnsupportedProvider`] for
    /// an unknown name, before anything is constructed.
    pub async fn get_provider_by_name(
        &self,
        name: &str,
        config: &CloudConfig,
    ) -> Result<Arc<dyn CloudProvider>> {
        let provider: ProviderKind = name.parse().map_err(Error::from)?;
        let mut config = config.clone();
        config.provider = provider;
        self.get_provider(&config).await
    }

    /// Evict the cached provider unconditionally
    pub async fn clear_provider(&self) {
        if self.cached.lock().await.take().is_some() {
            debug!("Cleared cached provider");
        }
    }

    /// The cached provider, without building one
    pub async fn current(&self) -> Option<Arc<dyn CloudProvider>> {
        self.cached.lock().await.clone()
    }
}
