//! HTTP probe implementation with per-phase timing.
//!
//! Each probe builds its own client so no pooled connection or cached lookup
//! hides a phase. DNS resolution is timed by wrapping the resolver, connection
//! establishment by a layer around the connector, and first byte by the
//! arrival of the response head.
//!
//! The connector layer sits outside reqwest's TLS handshake, so for `https`
//! targets `connect_ms` covers the TCP dial plus the handshake.

use super::ProbeError;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Phase durations in whole milliseconds.
///
/// A phase whose hook never fired stays at zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    pub dns_ms: u64,
    pub connect_ms: u64,
    pub first_byte_ms: u64,
    pub total_ms: u64,
}

/// What came back from a single GET.
#[derive(Debug)]
pub enum HttpOutcome {
    /// 2xx response; the body read may still have failed.
    Success { body: Result<String, ProbeError> },
    /// Any other status code.
    Unhealthy { status: u16 },
    /// No response at all.
    Failed(ProbeError),
}

#[derive(Debug)]
pub struct HttpProbe {
    pub timings: PhaseTimings,
    pub outcome: HttpOutcome,
}

#[derive(Debug, Default, Clone, Copy)]
struct PhaseMarks {
    dns_start: Option<Instant>,
    dns_done: Option<Instant>,
    connect_start: Option<Instant>,
    connect_done: Option<Instant>,
}

/// Shared between the resolver, the connector layer and the probe.
#[derive(Debug, Default, Clone)]
struct PhaseRecorder(Arc<Mutex<PhaseMarks>>);

impl PhaseRecorder {
    fn mark(&self, f: impl FnOnce(&mut PhaseMarks)) {
        if let Ok(mut marks) = self.0.lock() {
            f(&mut marks);
        }
    }

    fn timings(&self) -> PhaseTimings {
        let marks = self.0.lock().map(|m| *m).unwrap_or_default();
        let mut timings = PhaseTimings::default();

        if let (Some(start), Some(done)) = (marks.dns_start, marks.dns_done) {
            timings.dns_ms = whole_ms(done.saturating_duration_since(start));
        }

        // The connector resolves before it dials, so the connect phase
        // begins where DNS ended.
        if let (Some(start), Some(done)) = (marks.connect_start, marks.connect_done) {
            let start = marks.dns_done.map_or(start, |dns| dns.max(start));
            timings.connect_ms = whole_ms(done.saturating_duration_since(start));
        }

        timings
    }
}

fn whole_ms(d: Duration) -> u64 {
    d.as_millis().try_into().unwrap_or(u64::MAX)
}

/// Resolver that records when the lookup starts and ends.
struct TimedResolver {
    recorder: PhaseRecorder,
}

impl Resolve for TimedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let recorder = self.recorder.clone();
        Box::pin(async move {
            recorder.mark(|m| m.dns_start = Some(Instant::now()));
            let lookup = tokio::net::lookup_host((name.as_str(), 0)).await;
            recorder.mark(|m| m.dns_done = Some(Instant::now()));

            let found = lookup.map_err(|e| -> BoxError { Box::new(e) })?;
            let addrs: Addrs = Box::new(found.collect::<Vec<SocketAddr>>().into_iter());
            Ok::<Addrs, BoxError>(addrs)
        })
    }
}

/// Connector layer that records when a connection attempt starts and when
/// it succeeds.
#[derive(Clone)]
struct ConnectTimingLayer {
    recorder: PhaseRecorder,
}

impl<S> Layer<S> for ConnectTimingLayer {
    type Service = ConnectTiming<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ConnectTiming {
            inner,
            recorder: self.recorder.clone(),
        }
    }
}

#[derive(Clone)]
struct ConnectTiming<S> {
    inner: S,
    recorder: PhaseRecorder,
}

impl<S, R> Service<R> for ConnectTiming<S>
where
    S: Service<R>,
    S::Future: Send + 'static,
    S::Response: 'static,
    S::Error: 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: R) -> Self::Future {
        self.recorder.mark(|m| m.connect_start = Some(Instant::now()));
        let recorder = self.recorder.clone();
        let connecting = self.inner.call(req);

        Box::pin(async move {
            let result = connecting.await;
            if result.is_ok() {
                recorder.mark(|m| m.connect_done = Some(Instant::now()));
            }
            result
        })
    }
}

fn build_client(
    recorder: &PhaseRecorder,
    timeout: Option<Duration>,
) -> Result<reqwest::Client, ProbeError> {
    let mut builder = reqwest::Client::builder()
        .no_proxy()
        .dns_resolver(Arc::new(TimedResolver {
            recorder: recorder.clone(),
        }))
        .connector_layer(ConnectTimingLayer {
            recorder: recorder.clone(),
        });

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| ProbeError::Client(e.to_string()))
}

/// Issue a single GET against `address` and time each phase.
///
/// There is no retry. Without `timeout` the transport defaults apply, so a
/// target that never answers holds the caller until the OS gives up.
pub async fn run_http_probe(address: &str, timeout: Option<Duration>) -> HttpProbe {
    let url = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let recorder = PhaseRecorder::default();
    let client = match build_client(&recorder, timeout) {
        Ok(client) => client,
        Err(e) => {
            return HttpProbe {
                timings: PhaseTimings::default(),
                outcome: HttpOutcome::Failed(e),
            }
        }
    };

    let start = Instant::now();
    let sent = client.get(&url).send().await;
    let mut timings = recorder.timings();

    let response = match sent {
        Ok(response) => response,
        Err(e) => {
            let error = match timeout {
                Some(timeout) if e.is_timeout() => ProbeError::Timeout(timeout),
                _ => ProbeError::Network(e.to_string()),
            };
            return HttpProbe {
                timings,
                outcome: HttpOutcome::Failed(error),
            };
        }
    };
    timings.first_byte_ms = whole_ms(start.elapsed());

    let status = response.status();
    let outcome = if status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| ProbeError::Body(e.to_string()));
        HttpOutcome::Success { body }
    } else {
        HttpOutcome::Unhealthy {
            status: status.as_u16(),
        }
    };
    timings.total_ms = whole_ms(start.elapsed());

    HttpProbe { timings, outcome }
}
