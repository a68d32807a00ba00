//! Nginx connection and request figures

use lempman_core::ServiceState;
use lempman_exec::{CommandRunner, CommandSpec};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::parse;
use crate::report::{NginxRequests, NginxStatus, NginxWorkers};

/// Turns a monotonically increasing counter into a per-second rate
#[derive(Debug, Default)]
pub struct RateSampler {
    last: Mutex<Option<(Instant, u64)>>,
}

impl RateSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `total` at `now` and return the rate since the previous sample.
    /// The first sample, and any sample after a counter reset, yields 0.
    pub fn sample(&self, total: u64, now: Instant) -> f64 {
        let mut last = self.last.lock();
        let rate = match *last {
            Some((at, prev)) if total >= prev => {
                let elapsed = now.saturating_duration_since(at).as_secs_f64();
                if elapsed > 0.0 {
                    (total - prev) as f64 / elapsed
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
        *last = Some((now, total));
        rate
    }
}

/// Probe combining `systemctl`, `stub_status` and `pgrep`
pub struct NginxProbe {
    runner: Arc<dyn CommandRunner>,
    client: reqwest::Client,
    status_url: String,
    timeout: Duration,
    sampler: RateSampler,
}

impl NginxProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, status_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            runner,
            client,
            status_url: status_url.into(),
            timeout,
            sampler: RateSampler::new(),
        }
    }

    /// Current unit state and, when running, the traffic figures
    pub async fn status(&self) -> (ServiceState, NginxStatus) {
        let state = match self
            .runner
            .run(&CommandSpec::new("systemctl").args(["is-active", "nginx"]).timeout(self.timeout))
            .await
        {
            Ok(output) => parse::service_state(&output.stdout),
            Err(e) => {
                warn!("Failed to check nginx: {}", e);
                ServiceState::Error
            }
        };

        if !state.is_up() {
            return (state, NginxStatus::default());
        }

        let stub = match self.fetch_stub().await {
            Some(body) => parse::stub_status(&body),
            None => parse::StubStatus::default(),
        };
        let per_second = self.sampler.sample(stub.requests, Instant::now());
        let workers = self.worker_count().await;

        let status = NginxStatus {
            is_running: true,
            connections: stub.connections,
            requests: NginxRequests {
                total: stub.requests,
                per_second,
            },
            workers: NginxWorkers::from_counts(workers, stub.connections.active),
        };
        (state, status)
    }

    async fn fetch_stub(&self) -> Option<String> {
        let response = match self.client.get(&self.status_url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("{} returned {}", self.status_url, r.status());
                return None;
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", self.status_url, e);
                return None;
            }
        };
        response.text().await.ok()
    }

    async fn worker_count(&self) -> u64 {
        // pgrep exits 1 when nothing matches but still prints the count
        let spec = CommandSpec::new("pgrep")
            .args(["-c", "-f", "nginx: worker process"])
            .timeout(self.timeout);
        match self.runner.run(&spec).await {
            Ok(output) => parse::count(&output.stdout),
            Err(e) => {
                debug!("Failed to count nginx workers: {}", e);
                0
            }
        }
    }
}
