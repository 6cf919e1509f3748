//! Configuration module for the health checker.
//!
//! Loads configuration from environment variables with sensible defaults.

use regex::Regex;
use std::env;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Device page locations and login credentials.
#[derive(Clone)]
pub struct DeviceConfig {
    pub status_url: String,
    pub counters_url: String,
    pub login_url: String,
    pub username: String,
    pub password: String,
    /// Log in before each probe of a device page (default: true)
    pub login_enabled: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            status_url: "http://192.168.1.1/status_pon.asp".to_string(),
            counters_url: "http://192.168.1.1/admin/pon-stats.asp".to_string(),
            login_url: "http://192.168.1.1/boaform/admin/formLogin".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            login_enabled: true,
        }
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("status_url", &self.status_url)
            .field("counters_url", &self.counters_url)
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("login_enabled", &self.login_enabled)
            .finish()
    }
}

/// Checker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Interval between probe rounds (default: 10s)
    pub interval: Duration,
    /// Target URLs, probed in this order
    pub urls: Vec<String>,
    /// HTTP port for the metrics endpoint (default: 2112)
    pub http_port: u16,
    /// Targets probed at once within a round (default: 1, sequential)
    pub concurrency: usize,
    /// Request timeout; `None` leaves the transport default in place
    pub timeout: Option<Duration>,
    pub device: DeviceConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            urls: Vec::new(),
            http_port: 2112,
            concurrency: 1,
            timeout: None,
            device: DeviceConfig::default(),
        }
    }
}

impl CheckerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `HEALTHCHECKER_INTERVAL`: probe interval, e.g. `10s`, `500ms` (default: 10s)
    /// - `HEALTHCHECKER_URLS`: comma-separated target URLs
    /// - `HEALTHCHECKER_HTTP_PORT`: metrics port (default: 2112)
    /// - `HEALTHCHECKER_CONCURRENCY`: parallel probes per round (default: 1)
    /// - `HEALTHCHECKER_TIMEOUT`: request timeout (default: none)
    /// - `HEALTHCHECKER_DEVICE_STATUS_URL`, `HEALTHCHECKER_DEVICE_COUNTERS_URL`,
    ///   `HEALTHCHECKER_DEVICE_LOGIN_URL`, `HEALTHCHECKER_DEVICE_USERNAME`,
    ///   `HEALTHCHECKER_DEVICE_PASSWORD`, `HEALTHCHECKER_DEVICE_LOGIN`
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(value) = lookup("HEALTHCHECKER_INTERVAL") {
            match parse_duration(&value) {
                Some(interval) if !interval.is_zero() => cfg.interval = interval,
                _ => tracing::warn!("Ignoring invalid HEALTHCHECKER_INTERVAL {:?}", value),
            }
        }

        if let Some(value) = lookup("HEALTHCHECKER_URLS") {
            cfg.urls = parse_urls(&value);
        }

        if let Some(value) = lookup("HEALTHCHECKER_HTTP_PORT") {
            match value.parse() {
                Ok(port) => cfg.http_port = port,
                Err(_) => tracing::warn!("Ignoring invalid HEALTHCHECKER_HTTP_PORT {:?}", value),
            }
        }

        if let Some(value) = lookup("HEALTHCHECKER_CONCURRENCY") {
            match value.parse::<usize>() {
                Ok(n) if n > 0 => cfg.concurrency = n,
                _ => tracing::warn!("Ignoring invalid HEALTHCHECKER_CONCURRENCY {:?}", value),
            }
        }

        if let Some(value) = lookup("HEALTHCHECKER_TIMEOUT") {
            match parse_duration(&value) {
                Some(timeout) if !timeout.is_zero() => cfg.timeout = Some(timeout),
                _ => tracing::warn!("Ignoring invalid HEALTHCHECKER_TIMEOUT {:?}", value),
            }
        }

        let device = &mut cfg.device;
        if let Some(url) = lookup("HEALTHCHECKER_DEVICE_STATUS_URL") {
            device.status_url = url;
        }
        if let Some(url) = lookup("HEALTHCHECKER_DEVICE_COUNTERS_URL") {
            device.counters_url = url;
        }
        if let Some(url) = lookup("HEALTHCHECKER_DEVICE_LOGIN_URL") {
            device.login_url = url;
        }
        if let Some(username) = lookup("HEALTHCHECKER_DEVICE_USERNAME") {
            device.username = username;
        }
        if let Some(password) = lookup("HEALTHCHECKER_DEVICE_PASSWORD") {
            device.password = password;
        }
        if let Some(value) = lookup("HEALTHCHECKER_DEVICE_LOGIN") {
            device.login_enabled = !matches!(value.trim(), "0" | "false" | "no" | "off");
        }

        cfg
    }
}

/// Split a comma-separated URL list, keeping order and dropping blanks.
pub fn parse_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect()
}

/// Parse `500ms`, `10s`, `2m`, `1h` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    static DURATION_RE: OnceLock<Regex> = OnceLock::new();
    let re = DURATION_RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(ms|s|m|h)?\s*$").unwrap()
    });

    let caps = re.captures(value)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let seconds = match caps.get(2).map(|m| m.as_str()) {
        Some("ms") => amount / 1000.0,
        Some("m") => amount * 60.0,
        Some("h") => amount * 3600.0,
        _ => amount,
    };

    Duration::try_from_secs_f64(seconds).ok()
}
