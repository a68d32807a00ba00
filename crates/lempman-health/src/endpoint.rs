//! Reachability checks for the monitoring stack

use lempman_core::settings::MonitoringEndpoints;
use lempman_core::{Error, Result};
use std::time::Duration;
use tracing::{debug, warn};

use crate::report::{EndpointStatus, MonitoringStackStatus};

/// HTTP checker for Prometheus, Alertmanager and Grafana
#[derive(Clone)]
pub struct EndpointChecker {
    client: reqwest::Client,
}

impl EndpointChecker {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Up when the endpoint answers with a 2xx status
    pub async fn check(&self, url: &str) -> EndpointStatus {
        match self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!("{} is healthy", url);
                EndpointStatus::up()
            }
            Ok(response) => {
                warn!("{} returned {}", url, response.status());
                EndpointStatus::down()
            }
            Err(e) => {
                warn!("{} unreachable: {}", url, e);
                EndpointStatus::down()
            }
        }
    }

    pub async fn alertmanager(&self, base: &str) -> EndpointStatus {
        self.check(&join(base, "/-/healthy")).await
    }

    pub async fn stack(&self, endpoints: &MonitoringEndpoints) -> MonitoringStackStatus {
        let prometheus = join(&endpoints.prometheus_url, "/-/healthy");
        let grafana = join(&endpoints.grafana_url, "/api/health");

        let (prometheus, alertmanager, grafana) = tokio::join!(
            self.check(&prometheus),
            self.alertmanager(&endpoints.alertmanager_url),
            self.check(&grafana),
        );

        MonitoringStackStatus {
            prometheus,
            alertmanager,
            grafana,
        }
    }

    /// Active alerts as returned by Alertmanager's v2 API
    pub async fn alerts(&self, base: &str) -> Result<serde_json::Value> {
        let url = join(base, "/api/v2/alerts");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Alertmanager request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "Alertmanager returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("Invalid Alertmanager response: {}", e)))
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
