//! Prometheus exporter setup.
//!
//! The recorder is process-global. Metric descriptions are registered by the
//! caller after installation so that `# HELP` lines show up in the scrape.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Latency buckets (seconds) applied to every `*_duration_seconds` histogram.
const DURATION_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to configure metrics exporter: {0}")]
    Build(String),

    #[error("failed to install metrics recorder: {0}")]
    Install(String),
}

/// Install the Prometheus recorder and return a handle that renders the
/// text exposition format.
///
/// Repeated calls return the handle from the first installation.
pub fn install() -> Result<PrometheusHandle, MetricsError> {
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    match builder.install_recorder() {
        Ok(handle) => Ok(HANDLE.get_or_init(|| handle).clone()),
        Err(e) => {
            let msg = e.to_string();
            // Another thread won the race; its handle is the one wired to the recorder.
            if let Some(handle) = HANDLE.get() {
                ::tracing::warn!("metrics recorder already initialized, reusing handle");
                return Ok(handle.clone());
            }
            Err(MetricsError::Install(msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent() {
        let first = install().unwrap();
        let second = install().unwrap();
        // Both handles render from the same recorder.
        assert_eq!(first.render(), second.render());
    }
}
