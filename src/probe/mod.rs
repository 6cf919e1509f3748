//! Probe module for endpoint health checks.
//!
//! A probe is one timed GET. Its outcome always lands in the generic gauge
//! series; recognised device pages additionally feed the device series.

mod auth;
mod http;

pub use auth::*;
pub use http::*;

use std::time::Duration;
use thiserror::Error;

use crate::extract::{extract_counters, extract_status};
use crate::metrics::HealthMetrics;

/// Probe error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Measurement for one probe of one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    /// 1 for a 2xx response, 0 otherwise.
    pub status: u8,
    pub dns_ms: u64,
    pub connect_ms: u64,
    pub first_byte_ms: u64,
    pub total_ms: u64,
}

impl ProbeResult {
    pub fn new(url: &str, status: u8, timings: PhaseTimings) -> Self {
        Self {
            url: url.to_string(),
            status,
            dns_ms: timings.dns_ms,
            connect_ms: timings.connect_ms,
            first_byte_ms: timings.first_byte_ms,
            total_ms: timings.total_ms,
        }
    }
}

/// Which device page a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePage {
    Status,
    Counters,
}

/// The two device page URLs that trigger extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePages {
    pub status_url: String,
    pub counters_url: String,
}

impl DevicePages {
    /// Exact string match, the URL is also the metric label.
    pub fn classify(&self, url: &str) -> Option<DevicePage> {
        if url == self.status_url {
            Some(DevicePage::Status)
        } else if url == self.counters_url {
            Some(DevicePage::Counters)
        } else {
            None
        }
    }
}

/// Issues probes and writes their results into the gauge set.
pub struct Prober {
    metrics: HealthMetrics,
    pages: DevicePages,
    timeout: Option<Duration>,
}

impl Prober {
    pub fn new(metrics: HealthMetrics, pages: DevicePages, timeout: Option<Duration>) -> Self {
        Self {
            metrics,
            pages,
            timeout,
        }
    }

    pub fn device_page(&self, url: &str) -> Option<DevicePage> {
        self.pages.classify(url)
    }

    /// Probe `url` once and publish the result.
    ///
    /// Never fails: transport errors and non-2xx answers are recorded as
    /// status 0. A body or extraction problem only skips the device series
    /// for this round.
    pub async fn probe(&self, url: &str) -> ProbeResult {
        let HttpProbe { timings, outcome } = run_http_probe(url, self.timeout).await;

        let status = match outcome {
            HttpOutcome::Success { body } => {
                match body {
                    Ok(html) => self.extract(url, &html),
                    Err(e) => tracing::warn!("Skipping extraction for {}: {}", url, e),
                }
                1
            }
            HttpOutcome::Unhealthy { status } => {
                tracing::debug!("{} answered with status {}", url, status);
                0
            }
            HttpOutcome::Failed(e) => {
                tracing::warn!("error/timeout getting http request {}: {}", url, e);
                0
            }
        };

        let result = ProbeResult::new(url, status, timings);
        self.metrics.record_probe(&result);
        result
    }

    fn extract(&self, url: &str, html: &str) {
        match self.pages.classify(url) {
            Some(DevicePage::Status) => match extract_status(html) {
                Ok(sample) => self.metrics.record_status(url, &sample),
                Err(e) => tracing::warn!("Failed to extract device status from {}: {}", url, e),
            },
            Some(DevicePage::Counters) => match extract_counters(html) {
                Ok(sample) => self.metrics.record_counters(url, &sample),
                Err(e) => tracing::warn!("Failed to extract device counters from {}: {}", url, e),
            },
            None => {}
        }
    }
}
