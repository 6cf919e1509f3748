//! healthchecker - HTTP endpoint health exporter
//!
//! Probes a list of URLs on a fixed interval and publishes status and phase
//! timings, plus PON terminal health read from its status pages, as
//! Prometheus gauges.

mod config;
mod extract;
mod metrics;
mod probe;
mod scheduler;
mod web;

#[cfg(test)]
mod testing;

use config::CheckerConfig;
use metrics::{HealthMetrics, MetricRegistry};
use probe::{DeviceLogin, DevicePages, Prober};
use scheduler::Scheduler;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("healthchecker=info".parse()?))
        .init();

    // Load configuration
    let cfg = CheckerConfig::load();
    tracing::info!("app.config {:?}", cfg);
    if cfg.urls.is_empty() {
        tracing::warn!("No URLs configured, set HEALTHCHECKER_URLS to probe something");
    }

    // Every series is registered up front; a duplicate is fatal
    let registry = MetricRegistry::new();
    let metrics = HealthMetrics::register(&registry)?;

    let pages = DevicePages {
        status_url: cfg.device.status_url.clone(),
        counters_url: cfg.device.counters_url.clone(),
    };
    let prober = Arc::new(Prober::new(metrics, pages, cfg.timeout));

    let mut scheduler = Scheduler::new(prober, cfg.urls.clone(), cfg.interval)
        .with_concurrency(cfg.concurrency);
    if cfg.device.login_enabled {
        let login = DeviceLogin::new(
            &cfg.device.login_url,
            &cfg.device.username,
            &cfg.device.password,
        )?;
        scheduler = scheduler.with_login(login);
    }

    scheduler.start().await;

    let server = Server::new(cfg.http_port, registry);
    let served = server.start(shutdown_signal()).await;

    scheduler.stop().await;
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received interrupt, shutting down."),
        Err(e) => {
            tracing::error!("Failed to listen for interrupt: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
