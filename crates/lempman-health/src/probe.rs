//! Host probes built on external commands

use futures::future::join_all;
use lempman_core::settings::MagentoSettings;
use lempman_core::{validate_service_name, validate_site_path, Site};
use lempman_exec::{CommandOutput, CommandRunner, CommandSpec};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::parse;
use crate::report::{
    CacheStatus, Cpu, MagentoStatus, Orders, ServiceStatus, SiteStatus, SystemStatus, Usage,
};

/// Collects host, service and storefront figures
#[derive(Clone)]
pub struct SystemProbe {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    magento: MagentoSettings,
}

impl SystemProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration, magento: MagentoSettings) -> Self {
        Self {
            runner,
            timeout,
            magento,
        }
    }

    /// Run a command; failures are logged and come back as `None`
    async fn run(&self, spec: CommandSpec) -> Option<CommandOutput> {
        let spec = spec.timeout(self.timeout);
        match self.runner.run(&spec).await {
            Ok(output) => Some(output),
            Err(e) => {
                warn!("Probe '{}' failed: {}", spec.program, e);
                None
            }
        }
    }

    /// Successful stdout only
    async fn stdout(&self, spec: CommandSpec) -> Option<String> {
        self.run(spec)
            .await
            .filter(CommandOutput::success)
            .map(|o| o.stdout)
    }

    pub async fn uptime(&self) -> String {
        self.stdout(CommandSpec::new("uptime").arg("-p"))
            .await
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub async fn cpu(&self) -> Cpu {
        let usage = self
            .stdout(CommandSpec::new("top").arg("-bn1"))
            .await
            .map(|s| parse::cpu_usage(&s))
            .unwrap_or(0.0);
        Cpu { usage }
    }

    pub async fn memory(&self) -> Usage {
        self.stdout(CommandSpec::new("free").arg("-b"))
            .await
            .map(|s| parse::memory(&s))
            .unwrap_or_default()
    }

    pub async fn disk(&self) -> Usage {
        self.stdout(CommandSpec::new("df").args(["-B1", "/"]))
            .await
            .map(|s| parse::disk(&s))
            .unwrap_or_default()
    }

    /// State of one systemd unit
    pub async fn service(&self, name: &str) -> ServiceStatus {
        if !validate_service_name(name) {
            return ServiceStatus::failed("Invalid service name");
        }

        // is-active exits non-zero for inactive units; stdout still tells the state
        match self
            .run(CommandSpec::new("systemctl").args(["is-active", name]))
            .await
        {
            Some(output) => ServiceStatus::of(parse::service_state(&output.stdout)),
            None => ServiceStatus::failed("Service check failed"),
        }
    }

    pub async fn services(&self, names: &[String]) -> BTreeMap<String, ServiceStatus> {
        let states = join_all(names.iter().map(|n| self.service(n))).await;
        names.iter().cloned().zip(states).collect()
    }

    /// Storefront figures for a site; anything unreadable degrades to defaults
    pub async fn magento(&self, site: &Site) -> MagentoStatus {
        if !validate_site_path(&site.path) {
            return MagentoStatus::default();
        }

        let root = Path::new(&site.path);
        let bin = root.join("bin").join("magento").to_string_lossy().to_string();
        let magento = |cmd: &str| CommandSpec::new(bin.clone()).arg(cmd).cwd(root);

        let Some(mode) = self.stdout(magento("deploy:mode:show")).await else {
            debug!("No Magento install answered at {}", site.path);
            return MagentoStatus::default();
        };

        let orders_sql = format!(
            "SELECT COUNT(*) FROM sales_order WHERE created_at >= CURDATE() AND store_id = {}",
            self.magento.store_id
        );
        let visitors_sql = "SELECT COUNT(DISTINCT customer_id) FROM customer_visitor \
                            WHERE last_visit_at >= DATE_SUB(NOW(), INTERVAL 15 MINUTE)";

        let (cache, orders, users) = tokio::join!(
            self.stdout(magento("cache:status")),
            self.mysql_count(&orders_sql),
            self.mysql_count(visitors_sql),
        );

        let (enabled, total) = cache.map(|c| parse::magento_cache(&c)).unwrap_or((0, 0));

        MagentoStatus {
            mode: parse::magento_mode(&mode),
            cache_status: CacheStatus { enabled, total },
            orders: Orders { today: orders },
            active_users: users,
        }
    }

    async fn mysql_count(&self, sql: &str) -> u64 {
        let db = &self.magento.database;
        if db.is_empty() || !db.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            warn!("Refusing to query invalid database name '{}'", db);
            return 0;
        }

        self.stdout(CommandSpec::new("mysql").args(["-N", "-e", sql, db.as_str()]))
            .await
            .map(|s| parse::count(&s))
            .unwrap_or(0)
    }

    /// Full dashboard report. Storefront figures are gathered for enabled sites only.
    pub async fn system_status(&self, sites: &[Site], services: &[String]) -> SystemStatus {
        let enabled: Vec<&Site> = sites.iter().filter(|s| s.enabled).collect();

        let ((uptime, cpu, memory, disk, services), magento) = tokio::join!(
            async {
                tokio::join!(
                    self.uptime(),
                    self.cpu(),
                    self.memory(),
                    self.disk(),
                    self.services(services)
                )
            },
            join_all(enabled.iter().map(|s| self.magento(s))),
        );

        let sites = enabled
            .into_iter()
            .zip(magento)
            .map(|(site, status)| {
                (
                    site.id.clone(),
                    SiteStatus {
                        name: site.name.clone(),
                        path: site.path.clone(),
                        status,
                    },
                )
            })
            .collect();

        SystemStatus {
            uptime,
            cpu,
            memory,
            disk,
            sites,
            services,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lempman_core::ServiceState;
    use lempman_exec::ScriptedRunner;

    fn probe(runner: ScriptedRunner) -> SystemProbe {
        SystemProbe::new(
            Arc::new(runner),
            Duration::from_secs(5),
            MagentoSettings::default(),
        )
    }

    fn site(id: &str, enabled: bool) -> Site {
        Site {
            id: id.to_string(),
            name: format!("shop-{}", id),
            path: "/var/www/shop".to_string(),
            enabled,
            frontend_url: String::new(),
            admin_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_services() {
        let p = probe(
            ScriptedRunner::new()
                .on("systemctl", CommandOutput {
                    code: Some(3),
                    stdout: "inactive\n".to_string(),
                    stderr: String::new(),
                })
                .on_args("systemctl", &["is-active", "nginx"], CommandOutput::ok("active\n")),
        );

        let services = p
            .services(&["nginx".to_string(), "mysql".to_string()])
            .await;
        assert_eq!(services["nginx"].status, ServiceState::Running);
        assert_eq!(services["mysql"].status, ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_service_spawn_failure_is_error() {
        let p = probe(ScriptedRunner::new().missing("systemctl"));
        let status = p.service("nginx").await;
        assert_eq!(status.status, ServiceState::Error);
        assert_eq!(status.error.as_deref(), Some("Service check failed"));
    }

    #[tokio::test]
    async fn test_invalid_service_not_run() {
        let runner = Arc::new(ScriptedRunner::new().on("systemctl", CommandOutput::ok("active")));
        let p = SystemProbe::new(runner.clone(), Duration::from_secs(5), MagentoSettings::default());

        let status = p.service("nginx; reboot").await;
        assert_eq!(status.status, ServiceState::Error);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_magento_figures() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .on_args(
                    "/var/www/shop/bin/magento",
                    &["deploy:mode:show"],
                    CommandOutput::ok("Current application mode: developer.\n"),
                )
                .on_args(
                    "/var/www/shop/bin/magento",
                    &["cache:status"],
                    CommandOutput::ok("Current status:\n config: 1\n layout: 0\n"),
                )
                .on("mysql", CommandOutput::ok("12\n")),
        );
        let p = SystemProbe::new(runner.clone(), Duration::from_secs(5), MagentoSettings::default());

        let status = p.magento(&site("1", true)).await;
        assert_eq!(status.mode, "developer");
        assert_eq!(status.cache_status, CacheStatus { enabled: 1, total: 2 });
        assert_eq!(status.orders.today, 12);
        assert_eq!(status.active_users, 12);

        let magento_calls = runner.calls_to("/var/www/shop/bin/magento");
        assert!(magento_calls
            .iter()
            .all(|c| c.cwd.as_deref() == Some(Path::new("/var/www/shop"))));
        let mysql = &runner.calls_to("mysql")[0];
        assert_eq!(mysql.args.last().map(String::as_str), Some("magento"));
    }

    #[tokio::test]
    async fn test_magento_missing_degrades() {
        let p = probe(ScriptedRunner::new());
        assert_eq!(p.magento(&site("1", true)).await, MagentoStatus::default());
    }

    #[tokio::test]
    async fn test_system_status_defaults_and_enabled_sites() {
        let p = probe(
            ScriptedRunner::new()
                .on("uptime", CommandOutput::ok("up 3 days, 2 hours\n"))
                .on("systemctl", CommandOutput::ok("active\n")),
        );

        let sites = vec![site("1", true), site("2", false)];
        let status = p.system_status(&sites, &["nginx".to_string()]).await;

        assert_eq!(status.uptime, "up 3 days, 2 hours");
        assert_eq!(status.memory, Usage::default());
        assert_eq!(status.cpu.usage, 0.0);
        assert_eq!(status.sites.len(), 1);
        assert_eq!(status.sites["1"].status.mode, "unknown");
        assert_eq!(status.services["nginx"].status, ServiceState::Running);
    }

    #[tokio::test]
    async fn test_uptime_unknown() {
        let p = probe(ScriptedRunner::new());
        assert_eq!(p.uptime().await, "Unknown");
    }
}
