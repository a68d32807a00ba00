//! Service transition tracking and the background status watcher

use chrono::Utc;
use futures::future::join_all;
use lempman_core::{MonitoringConfig, Result, ServiceState, Transition, MIN_WATCH_INTERVAL_SECS};
use lempman_db::Database;
use lempman_health::ServiceStatus;
use lempman_notify::{NotificationManager, ServiceEvent};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::AppState;

/// Persists service observations and notifies on up/down flips.
///
/// Notifications are sent from a detached task. Reading the previous state and recording the new one happen under one
/// lock, so each transition is seen by exactly one observer no matter how
/// many pollers race.
pub struct StatusTracker {
    db: Database,
    notifications: Arc<NotificationManager>,
    monitoring_path: PathBuf,
    lock: Mutex<()>,
}

impl StatusTracker {
    pub fn new(db: Database, notifications: Arc<NotificationManager>, monitoring_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            notifications,
            monitoring_path: monitoring_path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Record one observation, returning the transition it caused
    pub async fn observe(&self, service: &str, state: ServiceState) -> Result<Option<Transition>> {
        let transition = {
            let _guard = self.lock.lock().await;
            let repo = self.db.service_status();
            let previous = repo.get(service).await?.map(|s| s.state);
            repo.record(service, state, Utc::now()).await?;
            ServiceState::transition(previous, state)
        };

        if let Some(transition) = transition {
            info!("Service {} is now {}", service, state);
            self.dispatch(service, state, transition);
        }
        Ok(transition)
    }

    /// Record a batch of probe results; storage failures are logged
    pub async fn observe_all(&self, statuses: &BTreeMap<String, ServiceStatus>) {
        let results = join_all(
            statuses
                .iter()
                .map(|(name, status)| async move { (name, self.observe(name, status.status).await) }),
        )
        .await;

        for (name, result) in results {
            if let Err(e) = result {
                warn!("Failed to record status of {}: {}", name, e);
            }
        }
    }

    fn dispatch(&self, service: &str, state: ServiceState, transition: Transition) {
        let config = match MonitoringConfig::load_or_init(&self.monitoring_path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to load monitoring config: {}", e);
                return;
            }
        };
        if !config.notifications.status {
            debug!("Status notifications disabled, not reporting {}", service);
            return;
        }

        let event = match transition {
            Transition::Down => ServiceEvent::Down {
                service: service.to_string(),
                state: state.to_string(),
            },
            Transition::Recovered => ServiceEvent::Recovered {
                service: service.to_string(),
            },
        };

        // Delivery never holds up the caller
        let notifications = self.notifications.clone();
        let service = service.to_string();
        tokio::spawn(async move {
            if let Err(e) = notifications.notify(&event).await {
                warn!("Failed to send {} notification for {}: {}", event.event_type(), service, e);
            }
        });
    }
}

/// Poll the configured services in the background.
///
/// The monitoring config is re-read every round, so interval changes and
/// disabling monitoring take effect without a restart.
pub fn spawn_watcher(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Status watcher started for {} services", state.settings.services.len());

        loop {
            let config = state.monitoring_config().unwrap_or_else(|e| {
                warn!("Failed to load monitoring config, using defaults: {}", e);
                MonitoringConfig::default()
            });

            if config.watch_enabled() {
                let statuses = state.probe.services(&state.settings.services).await;
                state.tracker.observe_all(&statuses).await;
            } else {
                debug!("Basic monitoring disabled, skipping status round");
            }

            let secs = config.intervals.basic.max(MIN_WATCH_INTERVAL_SECS);
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
    })
}
