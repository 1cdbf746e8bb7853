//! # Configuration
//!
//! - `cloud`: provider selection and credentials ([`CloudConfig`])
//! - `loader`: environment-backed [`ConfigLoader`]
//! - `logging`: tracing subscriber settings

pub mod cloud;
pub mod loader;
pub mod logging;

pub use cloud::{AwsCredentials, AzureCredentials, CloudConfig, Credentials};
pub use loader::ConfigLoader;
pub use logging::{LogFormat, LoggingConfig};
