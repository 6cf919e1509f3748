//! Scheduler module for running probes on a fixed interval.

use crate::probe::{DeviceLogin, Prober};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

/// Lifecycle of the probe loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

struct RunState {
    state: SchedulerState,
    stop_tx: Option<broadcast::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

/// Everything a tick needs, cheap to clone into tasks.
#[derive(Clone)]
struct TickContext {
    prober: Arc<Prober>,
    login: Option<Arc<DeviceLogin>>,
    targets: Arc<Vec<String>>,
    concurrency: usize,
    ticks: Arc<AtomicU64>,
}

/// Probes every configured target once per interval.
pub struct Scheduler {
    ctx: TickContext,
    interval: Duration,
    run: Mutex<RunState>,
}

impl Scheduler {
    /// Create a scheduler over `targets`, probed in the given order.
    pub fn new(prober: Arc<Prober>, targets: Vec<String>, interval: Duration) -> Self {
        Self {
            ctx: TickContext {
                prober,
                login: None,
                targets: Arc::new(targets),
                concurrency: 1,
                ticks: Arc::new(AtomicU64::new(0)),
            },
            interval,
            run: Mutex::new(RunState {
                state: SchedulerState::Idle,
                stop_tx: None,
                handle: None,
            }),
        }
    }

    /// Log in to the device before each probe of one of its pages.
    pub fn with_login(mut self, login: DeviceLogin) -> Self {
        self.ctx.login = Some(Arc::new(login));
        self
    }

    /// Probe up to `limit` targets at once within a tick. `1` keeps the
    /// strictly sequential order.
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.ctx.concurrency = limit.max(1);
        self
    }

    pub async fn state(&self) -> SchedulerState {
        self.run.lock().await.state
    }

    /// Ticks that finished probing every target.
    pub fn completed_ticks(&self) -> u64 {
        self.ctx.ticks.load(Ordering::SeqCst)
    }

    /// Start the background probe loop. Does nothing if already running.
    pub async fn start(&self) {
        let mut run = self.run.lock().await;
        if run.state == SchedulerState::Running {
            return;
        }

        tracing::info!(
            "Starting collector with {} targets every {:?}",
            self.ctx.targets.len(),
            self.interval
        );

        let (stop_tx, stop_rx) = broadcast::channel(1);
        let ctx = self.ctx.clone();
        let interval = self.interval;

        run.handle = Some(tokio::spawn(run_probe_loop(ctx, interval, stop_rx)));
        run.stop_tx = Some(stop_tx);
        run.state = SchedulerState::Running;
    }

    /// Stop the loop and wait for the in-flight tick to finish.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        if run.state != SchedulerState::Running {
            return;
        }

        if let Some(stop_tx) = run.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = run.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Collector task ended abnormally: {}", e);
            }
        }

        run.state = SchedulerState::Stopped;
        tracing::info!(
            "Gracefully stopped metrics collector after {} rounds",
            self.completed_ticks()
        );
    }
}

/// Tick until told to stop. Stop is only observed between ticks.
async fn run_probe_loop(
    ctx: TickContext,
    period: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.recv() => {
                break;
            }
            _ = interval.tick() => {
                ctx.run_tick().await;
                ctx.ticks.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

impl TickContext {
    async fn run_tick(&self) {
        if self.concurrency <= 1 {
            for url in self.targets.iter() {
                self.check(url).await;
            }
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for url in self.targets.iter().cloned() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let ctx = self.clone();

            tasks.spawn(async move {
                let _permit = permit;
                ctx.check(&url).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Probe task failed: {}", e);
            }
        }
    }

    async fn check(&self, url: &str) {
        if self.prober.device_page(url).is_some() {
            if let Some(login) = &self.login {
                login.attempt().await;
            }
        }
        self.prober.probe(url).await;
    }
}
