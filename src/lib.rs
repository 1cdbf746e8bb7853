//! Cloud Facade Library
//!
//! A single asynchronous interface over AWS and Azure for compute instance
//! lifecycle, object storage and ML model deploy/inference.
//!
//! ```no_run
//! use cloud_facade::prelude::*;
//!
//! # async fn run() -> cloud_facade::error::Result<()> {
//! let config = ConfigLoader::from_env().load()?;
//! let factory = ProviderFactory::new();
//! let provider = factory.get_provider(&config).await?;
//! let report = provider.health_check().await;
//! println!("{}", report.status.as_str());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod types;
