//! Gauge set written by the prober.

use super::{GaugeHandle, MetricRegistry, MetricsError, SeriesName};
use crate::extract::{DeviceCounterSample, DeviceStatusSample, FieldTable, COUNTERS_TABLE, STATUS_TABLE};
use crate::probe::ProbeResult;

const GENERIC_NAMESPACE: &str = "sample";
const DEVICE_NAMESPACE: &str = "pon";
const SUBSYSTEM: &str = "external";

pub const URL_UP: SeriesName = SeriesName::new(GENERIC_NAMESPACE, SUBSYSTEM, "url_up");
pub const URL_RESPONSE_MS: SeriesName = SeriesName::new(GENERIC_NAMESPACE, SUBSYSTEM, "url_response_ms");
pub const URL_DNS_MS: SeriesName = SeriesName::new(GENERIC_NAMESPACE, SUBSYSTEM, "url_dns_ms");
pub const URL_FIRST_BYTE_MS: SeriesName =
    SeriesName::new(GENERIC_NAMESPACE, SUBSYSTEM, "url_first_byte_ms");
pub const URL_CONNECT_TIME_MS: SeriesName =
    SeriesName::new(GENERIC_NAMESPACE, SUBSYSTEM, "url_connect_time_ms");

/// All gauge series, registered once at startup.
///
/// The device series exist even when no configured target is a device page,
/// so a scrape never races the first write.
#[derive(Clone)]
pub struct HealthMetrics {
    up: GaugeHandle,
    response_ms: GaugeHandle,
    dns_ms: GaugeHandle,
    first_byte_ms: GaugeHandle,
    connect_ms: GaugeHandle,
    device_status: Vec<GaugeHandle>,
    device_counters: Vec<GaugeHandle>,
}

impl HealthMetrics {
    /// Register every series with `registry`.
    ///
    /// A duplicate name is a configuration bug; callers treat the error as fatal.
    pub fn register(registry: &MetricRegistry) -> Result<Self, MetricsError> {
        Ok(Self {
            up: registry.register(URL_UP, "Status of the URL as a integer value")?,
            response_ms: registry.register(
                URL_RESPONSE_MS,
                "Response time in milliseconds it took for the URL to respond.",
            )?,
            dns_ms: registry.register(
                URL_DNS_MS,
                "Response time in milliseconds it took for the DNS request to take place.",
            )?,
            first_byte_ms: registry.register(
                URL_FIRST_BYTE_MS,
                "Response time in milliseconds it took to retrive the first byte.",
            )?,
            connect_ms: registry.register(
                URL_CONNECT_TIME_MS,
                "Response time in milliseconds it took to establish the inital connection.",
            )?,
            device_status: register_table(registry, &STATUS_TABLE)?,
            device_counters: register_table(registry, &COUNTERS_TABLE)?,
        })
    }

    /// Write the five generic series for one probe.
    pub fn record_probe(&self, result: &ProbeResult) {
        tracing::debug!(
            "Updating metrics: url: {}, connect_ms: {}, dns_ms: {}, first_byte_ms: {}, total_ms: {}, status: {}",
            result.url,
            result.connect_ms,
            result.dns_ms,
            result.first_byte_ms,
            result.total_ms,
            result.status
        );

        self.dns_ms.set(&result.url, result.dns_ms as f64);
        self.connect_ms.set(&result.url, result.connect_ms as f64);
        self.response_ms.set(&result.url, result.total_ms as f64);
        self.first_byte_ms.set(&result.url, result.first_byte_ms as f64);
        self.up.set(&result.url, f64::from(result.status));
    }

    pub fn record_status(&self, url: &str, sample: &DeviceStatusSample) {
        tracing::debug!("Updating device status: url: {}, {:?}", url, sample);
        write_all(&self.device_status, url, &sample.values());
    }

    pub fn record_counters(&self, url: &str, sample: &DeviceCounterSample) {
        tracing::debug!("Updating device counters: url: {}, {:?}", url, sample);
        write_all(&self.device_counters, url, &sample.values());
    }
}

fn register_table<const N: usize>(
    registry: &MetricRegistry,
    table: &FieldTable<N>,
) -> Result<Vec<GaugeHandle>, MetricsError> {
    table
        .fields
        .iter()
        .map(|field| {
            registry.register(
                SeriesName::new(DEVICE_NAMESPACE, SUBSYSTEM, field.name),
                field.help,
            )
        })
        .collect()
}

fn write_all(handles: &[GaugeHandle], url: &str, values: &[f64]) {
    for (handle, value) in handles.iter().zip(values) {
        handle.set(url, *value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::PhaseTimings;

    fn metrics() -> (HealthMetrics, MetricRegistry) {
        let registry = MetricRegistry::new();
        (HealthMetrics::register(&registry).unwrap(), registry)
    }

    fn down(url: &str) -> ProbeResult {
        ProbeResult::new(url, 0, PhaseTimings::default())
    }

    #[test]
    fn test_register_twice_fails() {
        let registry = MetricRegistry::new();
        assert!(HealthMetrics::register(&registry).is_ok());
        assert!(HealthMetrics::register(&registry).is_err());
    }

    #[test]
    fn test_device_series_names() {
        let (metrics, _registry) = metrics();
        let status: Vec<String> = metrics.device_status.iter().map(|h| h.name()).collect();
        assert_eq!(
            status,
            [
                "pon_external_pon_temperature",
                "pon_external_pon_voltage",
                "pon_external_pon_tx_power",
                "pon_external_pon_rx_power",
                "pon_external_pon_bias_current",
            ]
        );
        assert_eq!(metrics.device_counters.len(), 15);
        assert_eq!(metrics.device_counters[1].name(), "pon_external_pon_receieved_bytes");
        assert_eq!(metrics.device_counters[14].name(), "pon_external_pon_pause_packets_received");
    }

    #[test]
    fn test_update_custom_metrics() {
        let (metrics, registry) = metrics();
        let result = ProbeResult {
            url: "testurl.com".to_string(),
            status: 1,
            total_ms: 9,
            dns_ms: 2,
            first_byte_ms: 3,
            connect_ms: 4,
        };
        metrics.record_probe(&result);

        assert_eq!(registry.sample("sample_external_url_up", "testurl.com"), Some(1.0));
        assert_eq!(registry.sample("sample_external_url_response_ms", "testurl.com"), Some(9.0));
        assert_eq!(registry.sample("sample_external_url_dns_ms", "testurl.com"), Some(2.0));
        assert_eq!(registry.sample("sample_external_url_first_byte_ms", "testurl.com"), Some(3.0));
        assert_eq!(registry.sample("sample_external_url_connect_time_ms", "testurl.com"), Some(4.0));
        assert_eq!(registry.series_for("testurl.com").len(), 5);
    }

    #[test]
    fn test_status_overwrites() {
        let (metrics, registry) = metrics();
        let mut result = down("testurl.com");
        result.status = 1;
        metrics.record_probe(&result);
        metrics.record_probe(&down("testurl.com"));

        assert_eq!(registry.sample("sample_external_url_up", "testurl.com"), Some(0.0));
    }

    #[test]
    fn test_record_status_writes_five() {
        let (metrics, registry) = metrics();
        let sample = DeviceStatusSample {
            temperature: 41.5,
            voltage: 3.3,
            tx_power: 2.1,
            rx_power: -18.4,
            bias_current: 12.0,
        };
        metrics.record_status("http://device/status", &sample);

        assert_eq!(registry.series_for("http://device/status").len(), 5);
        assert_eq!(
            registry.sample("pon_external_pon_voltage", "http://device/status"),
            Some(3.3)
        );
        assert_eq!(
            registry.sample("pon_external_pon_rx_power", "http://device/status"),
            Some(-18.4)
        );
    }

    #[test]
    fn test_record_counters_writes_fifteen() {
        let (metrics, registry) = metrics();
        let mut values = [0.0; 15];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i + 1) as f64;
        }
        let sample = DeviceCounterSample::from_values(values);
        metrics.record_counters("http://device/stats", &sample);

        assert_eq!(registry.series_for("http://device/stats").len(), 15);
        assert_eq!(
            registry.sample("pon_external_pon_received_multicast_packets", "http://device/stats"),
            Some(8.0)
        );
        assert_eq!(
            registry.sample("pon_external_pon_pause_packets_received", "http://device/stats"),
            Some(15.0)
        );
    }
}
