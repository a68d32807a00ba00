//! Shared application state

use lempman_core::{MonitoringConfig, Result, Settings, DEFAULT_ADMIN_USERNAME};
use lempman_db::Database;
use lempman_deploy::Deployer;
use lempman_exec::{CommandRunner, SystemRunner};
use lempman_health::{EndpointChecker, NginxProbe, SystemProbe};
use lempman_logs::LogClient;
use lempman_notify::NotificationManager;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{self, JwtKeys};
use crate::tracker::StatusTracker;

/// Everything a handler may need, cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: Database,
    pub keys: Arc<JwtKeys>,
    pub probe: Arc<SystemProbe>,
    pub nginx: Arc<NginxProbe>,
    pub endpoints: EndpointChecker,
    pub logs: LogClient,
    pub notifications: Arc<NotificationManager>,
    pub deployer: Deployer,
    pub tracker: Arc<StatusTracker>,
}

impl AppState {
    /// Wire the state from already-opened parts
    pub fn new(
        settings: Settings,
        db: Database,
        jwt_secret: &str,
        runner: Arc<dyn CommandRunner>,
        notifications: Arc<NotificationManager>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(settings.command_timeout_secs);

        let probe = SystemProbe::new(runner.clone(), timeout, settings.magento.clone());
        let nginx = NginxProbe::new(runner.clone(), settings.nginx.status_url.clone(), timeout);
        let logs = LogClient::new(&settings.opensearch, timeout)?;
        let deployer = Deployer::new(runner, settings.deploy.clone(), settings.deploy_dir());
        let tracker = StatusTracker::new(db.clone(), notifications.clone(), settings.monitoring_path());

        Ok(Self {
            keys: Arc::new(JwtKeys::new(jwt_secret)),
            probe: Arc::new(probe),
            nginx: Arc::new(nginx),
            endpoints: EndpointChecker::new(timeout),
            logs,
            notifications,
            deployer,
            tracker: Arc::new(tracker),
            db,
            settings: Arc::new(settings),
        })
    }

    /// Open the database, seed the default admin and the signing secret,
    /// and run commands on this host
    pub async fn open(mut settings: Settings) -> Result<Self> {
        std::fs::create_dir_all(&settings.config_dir)?;
        let secret = settings.ensure_jwt_secret()?;

        let db = Database::new(&settings.db_path()).await?;
        let users = db.users();
        if users.count().await? == 0 {
            let hash = auth::hash_password(&settings.default_admin_password, settings.bcrypt_cost).await?;
            users.ensure_default_admin(DEFAULT_ADMIN_USERNAME, || Ok(hash)).await?;
        }

        let runner: Arc<dyn CommandRunner> =
            Arc::new(SystemRunner::new(Duration::from_secs(settings.command_timeout_secs)));
        let notifications = Arc::new(NotificationManager::new(settings.telegram_path()));

        Self::new(settings, db, &secret, runner, notifications)
    }

    /// Stored monitoring config merged over defaults
    pub fn monitoring_config(&self) -> Result<MonitoringConfig> {
        MonitoringConfig::load_or_init(&self.settings.monitoring_path())
    }
}
