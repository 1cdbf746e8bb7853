//! # Metrics
//!
//! Prometheus metrics for provider operations.
//!
//! ## Metrics Exposed
//!
//! - `cloud_facade_provider_operations_total` - Provider operations by provider, service and operation
//! - `cloud_facade_provider_operation_duration_seconds` - Duration of provider operations
//! - `cloud_facade_provider_operation_errors_total` - Failed provider operations
//! - `cloud_facade_health_checks_total` - Health checks by provider and outcome

use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static PROVIDER_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloud_facade_provider_operations_total",
            "Total number of provider operations by provider, service and operation",
        ),
        &["provider", "service", "operation"],
    )
    .expect("Failed to create PROVIDER_OPERATIONS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "cloud_facade_provider_operation_duration_seconds",
            "Duration of provider operations in seconds by provider and service",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["provider", "service"],
    )
    .expect("Failed to create PROVIDER_OPERATION_DURATION metric - this should never happen")
});

static PROVIDER_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloud_facade_provider_operation_errors_total",
            "Total number of provider operation errors by provider and service",
        ),
        &["provider", "service"],
    )
    .expect("Failed to create PROVIDER_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static HEALTH_CHECKS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cloud_facade_health_checks_total",
            "Total number of health checks by provider and resulting status",
        ),
        &["provider", "status"],
    )
    .expect("Failed to create HEALTH_CHECKS_TOTAL metric - this should never happen")
});

/// Register all metrics with the crate registry
///
/// # Errors
///
/// Returns an error if a metric is registered twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(PROVIDER_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(HEALTH_CHECKS_TOTAL.clone()))?;
    Ok(())
}

/// Render the registry in the Prometheus text exposition format
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_text() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a completed provider operation
pub fn record_provider_operation(provider: &str, service: &str, operation: &str, duration: f64) {
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[provider, service, operation])
        .inc();
    PROVIDER_OPERATION_DURATION
        .with_label_values(&[provider, service])
        .observe(duration);
}

pub fn increment_provider_operation_errors(provider: &str, service: &str) {
    PROVIDER_OPERATION_ERRORS_TOTAL
        .with_label_values(&[provider, service])
        .inc();
}

pub fn record_health_check(provider: &str, status: &str) {
    HEALTH_CHECKS_TOTAL
        .with_label_values(&[provider, status])
        .inc();
}
