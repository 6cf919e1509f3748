//! Metrics module for the health checker.
//!
//! Owns an explicit Prometheus registry and the labeled gauge series that the
//! prober writes into. Every series carries a single `url` label.

mod health;

pub use health::*;

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// The only label dimension on every series.
pub const URL_LABEL: &str = "url";

/// Metrics error types.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("exposition is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Fully qualified name of a gauge series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesName {
    pub namespace: &'static str,
    pub subsystem: &'static str,
    pub name: &'static str,
}

impl SeriesName {
    pub const fn new(namespace: &'static str, subsystem: &'static str, name: &'static str) -> Self {
        Self {
            namespace,
            subsystem,
            name,
        }
    }

    /// The exposed name, e.g. `sample_external_url_up`.
    pub fn full_name(&self) -> String {
        format!("{}_{}_{}", self.namespace, self.subsystem, self.name)
    }
}

/// A registered gauge series keyed by URL.
#[derive(Clone)]
pub struct GaugeHandle {
    gauge: GaugeVec,
}

impl GaugeHandle {
    /// Overwrite the current value for `url`.
    pub fn set(&self, url: &str, value: f64) {
        self.gauge.with_label_values(&[url]).set(value);
    }

    #[cfg(test)]
    pub fn name(&self) -> String {
        use prometheus::core::Collector;
        self.gauge.desc()[0].fq_name.clone()
    }
}

/// Registry holding every gauge series exposed by the process.
#[derive(Clone, Default)]
pub struct MetricRegistry {
    registry: Registry,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a gauge series.
    ///
    /// Fails if a series with the same name is already registered.
    pub fn register(&self, series: SeriesName, help: &str) -> Result<GaugeHandle, MetricsError> {
        let opts = Opts::new(series.name, help)
            .namespace(series.namespace)
            .subsystem(series.subsystem);
        let gauge = GaugeVec::new(opts, &[URL_LABEL])?;
        self.registry.register(Box::new(gauge.clone()))?;
        tracing::debug!("Registered gauge {}", series.full_name());

        Ok(GaugeHandle { gauge })
    }

    /// Render all series in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Read the current value of `name` for `url` without creating the series.
    #[cfg(test)]
    pub fn sample(&self, name: &str, url: &str) -> Option<f64> {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric().iter())
            .find(|metric| {
                metric
                    .get_label()
                    .iter()
                    .any(|label| label.get_name() == URL_LABEL && label.get_value() == url)
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Count the series that currently hold a value for `url`.
    #[cfg(test)]
    pub fn series_for(&self, url: &str) -> Vec<String> {
        self.registry
            .gather()
            .iter()
            .filter(|family| {
                family.get_metric().iter().any(|metric| {
                    metric
                        .get_label()
                        .iter()
                        .any(|label| label.get_value() == url)
                })
            })
            .map(|family| family.get_name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SERIES: SeriesName = SeriesName::new("sample", "external", "url_up");

    #[test]
    fn test_full_name() {
        assert_eq!(TEST_SERIES.full_name(), "sample_external_url_up");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = MetricRegistry::new();
        assert!(registry.register(TEST_SERIES, "first").is_ok());
        assert!(registry.register(TEST_SERIES, "second").is_err());
    }

    #[test]
    fn test_set_overwrites() {
        let registry = MetricRegistry::new();
        let handle = registry.register(TEST_SERIES, "status").unwrap();

        handle.set("http://a", 1.0);
        handle.set("http://a", 0.0);
        handle.set("http://b", 1.0);

        assert_eq!(registry.sample("sample_external_url_up", "http://a"), Some(0.0));
        assert_eq!(registry.sample("sample_external_url_up", "http://b"), Some(1.0));
        assert_eq!(registry.sample("sample_external_url_up", "http://c"), None);
    }

    #[test]
    fn test_encode_text_format() {
        let registry = MetricRegistry::new();
        let handle = registry
            .register(TEST_SERIES, "Status of the URL as a integer value")
            .unwrap();
        handle.set("http://example.com", 1.0);

        let text = registry.encode().unwrap();
        assert!(text.contains("# HELP sample_external_url_up Status of the URL as a integer value"));
        assert!(text.contains("# TYPE sample_external_url_up gauge"));
        assert!(text.contains("sample_external_url_up{url=\"http://example.com\"} 1"));
    }
}
