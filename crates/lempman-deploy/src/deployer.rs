//! Runs the pre-check and install scripts

use lempman_core::settings::DeploySettings;
use lempman_core::{Result, DEPLOY_WORKSPACE_TTL_SECS};
use lempman_exec::{CommandOutput, CommandRunner, CommandSpec};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::render;
use crate::request::{AuthType, CheckRequest, CheckResult, Checks, InstallRequest, InstallResult};
use crate::workspace::Workspace;

/// Drives the deployment wizard's server-side steps
#[derive(Clone)]
pub struct Deployer {
    runner: Arc<dyn CommandRunner>,
    settings: DeploySettings,
    root: PathBuf,
}

impl Deployer {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: DeploySettings, root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            settings,
            root: root.into(),
        }
    }

    fn script(path: &std::path::Path) -> String {
        path.to_string_lossy().into_owned()
    }

    /// Build the pre-check invocation for a request and its workspace
    pub fn check_command(&self, req: &CheckRequest, ws: &Workspace) -> Result<CommandSpec> {
        let precheck = Self::script(&self.settings.precheck_script);
        let timeout = Duration::from_secs(self.settings.check_timeout_secs);

        let spec = match req.auth_type {
            AuthType::Key => {
                let key = ws.write_key(req.ssh_key.as_deref().unwrap_or_default())?;
                CommandSpec::new(precheck)
                    .args(["-h", req.host.as_str(), "-k"])
                    .arg(key.to_string_lossy())
            }
            AuthType::Password => CommandSpec::new("sshpass")
                .arg("-e")
                .arg(precheck)
                .args(["-h", req.host.as_str(), "-p"])
                .env("SSHPASS", req.password.clone().unwrap_or_default()),
        };

        Ok(spec.cwd(ws.dir()).timeout(timeout))
    }

    /// Programs the pre-check needs on this machine
    fn check_prerequisites(&self, req: &CheckRequest) -> Vec<String> {
        let mut programs = vec![Self::script(&self.settings.precheck_script)];
        if req.auth_type == AuthType::Password {
            programs.push("sshpass".to_string());
        }
        programs
    }

    /// Step one: verify the target host
    pub async fn check(&self, req: &CheckRequest) -> Result<CheckResult> {
        req.validate()?;

        if let Some(missing) = self
            .check_prerequisites(req)
            .into_iter()
            .find(|program| !self.runner.available(program))
        {
            warn!("Environment check for {} skipped: {} not found", req.host, missing);
            return Ok(CheckResult {
                deployment_id: String::new(),
                success: false,
                output: String::new(),
                error: format!("Required program not found: {}", missing),
                checks: Checks::all(false),
            });
        }

        if let Err(e) = Workspace::prune(&self.root, Duration::from_secs(DEPLOY_WORKSPACE_TTL_SECS)) {
            warn!("Failed to prune deployment workspaces: {}", e);
        }
        let ws = Workspace::create(&self.root)?;
        let spec = self.check_command(req, &ws)?;

        info!("Running environment check for {} ({})", req.host, ws.id());
        let output = self.runner.run(&spec).await?;
        log_outcome("Environment check", &req.host, &output);

        let success = output.success();
        Ok(CheckResult {
            deployment_id: ws.id().to_string(),
            success,
            output: output.stdout,
            error: output.stderr,
            checks: Checks::all(success),
        })
    }

    /// Step two: render inventory and variables, then run the installer
    pub async fn install(&self, req: &InstallRequest) -> Result<InstallResult> {
        req.validate()?;
        let ws = Workspace::open_or_create(&self.root, req.deployment_id.as_deref())?;

        let outcome = self.run_install(req, &ws).await;
        // The key never outlives an install run
        if let Err(e) = ws.remove_key() {
            warn!("Failed to remove deployment key for {}: {}", ws.id(), e);
        }
        let output = outcome?;

        Ok(InstallResult {
            deployment_id: ws.id().to_string(),
            success: output.success(),
            output: output.stdout,
            error: output.stderr,
        })
    }

    async fn run_install(&self, req: &InstallRequest, ws: &Workspace) -> Result<CommandOutput> {
        let key = ws.has_key().then(|| ws.key_path());
        let inventory = render::inventory(&req.host, req.user.as_deref(), key.as_deref());
        let vars = render::vars(&req.components, &req.versions)?;
        ws.write_file(&ws.inventory_path(), &inventory)?;
        ws.write_file(&ws.vars_path(), &vars)?;

        let spec = CommandSpec::new(Self::script(&self.settings.install_script))
            .arg("-i")
            .arg(ws.inventory_path().to_string_lossy())
            .arg("-v")
            .arg(ws.vars_path().to_string_lossy())
            .cwd(ws.dir())
            .timeout(Duration::from_secs(self.settings.install_timeout_secs));

        info!("Installing on {} ({})", req.host, ws.id());
        let output = self.runner.run(&spec).await?;
        log_outcome("Install", &req.host, &output);
        Ok(output)
    }
}

fn log_outcome(step: &str, host: &str, output: &CommandOutput) {
    if output.success() {
        info!("{} for {} succeeded", step, host);
    } else {
        warn!("{} for {} exited with {:?}", step, host, output.code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lempman_exec::ScriptedRunner;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn settings() -> DeploySettings {
        DeploySettings {
            precheck_script: PathBuf::from("/opt/installer/pre-check.sh"),
            install_script: PathBuf::from("/opt/installer/install.sh"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_check_with_password_uses_env() {
        let root = tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .on("/opt/installer/pre-check.sh", CommandOutput::ok(""))
                .on("sshpass", CommandOutput::ok("all good\n")),
        );
        let deployer = Deployer::new(runner.clone(), settings(), root.path());

        let result = deployer
            .check(&CheckRequest {
                host: "10.0.0.5".to_string(),
                auth_type: AuthType::Password,
                user: None,
                password: Some("p@ss' word".to_string()),
                ssh_key: None,
            })
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.checks.network);
        assert_eq!(result.output, "all good\n");

        let call = &runner.calls_to("sshpass")[0];
        assert_eq!(
            call.args,
            vec!["-e", "/opt/installer/pre-check.sh", "-h", "10.0.0.5", "-p"]
        );
        assert_eq!(call.env.get("SSHPASS").map(String::as_str), Some("p@ss' word"));
        assert!(!call.args.iter().any(|a| a.contains("p@ss")));
    }

    #[tokio::test]
    async fn test_check_failure_mirrors_exit() {
        let root = tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new().on("/opt/installer/pre-check.sh", CommandOutput::exit(2, "disk too small")),
        );
        let deployer = Deployer::new(runner.clone(), settings(), root.path());

        let result = deployer
            .check(&CheckRequest {
                host: "10.0.0.5".to_string(),
                auth_type: AuthType::Key,
                user: None,
                password: None,
                ssh_key: Some("KEY".to_string()),
            })
            .await
            .unwrap();

        assert!(!result.success);
        assert!(!result.checks.disk);
        assert_eq!(result.error, "disk too small");

        let ws = Workspace::open(root.path(), &result.deployment_id).unwrap();
        assert!(ws.has_key());
        let call = &runner.calls()[0];
        assert_eq!(call.args.last().map(PathBuf::from), Some(ws.key_path()));
    }

    #[tokio::test]
    async fn test_install_renders_into_check_workspace() {
        let root = tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .on("/opt/installer/pre-check.sh", CommandOutput::ok(""))
                .on("/opt/installer/install.sh", CommandOutput::ok("PLAY RECAP ok=42\n")),
        );
        let deployer = Deployer::new(runner.clone(), settings(), root.path());

        let check = deployer
            .check(&CheckRequest {
                host: "10.0.0.5".to_string(),
                auth_type: AuthType::Key,
                user: None,
                password: None,
                ssh_key: Some("KEY".to_string()),
            })
            .await
            .unwrap();

        let mut components = BTreeMap::new();
        components.insert("nginx".to_string(), true);
        let result = deployer
            .install(&InstallRequest {
                deployment_id: Some(check.deployment_id.clone()),
                host: "10.0.0.5".to_string(),
                user: Some("deploy".to_string()),
                components,
                versions: BTreeMap::new(),
            })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.deployment_id, check.deployment_id);

        let ws = Workspace::open(root.path(), &result.deployment_id).unwrap();
        let inventory = std::fs::read_to_string(ws.inventory_path()).unwrap();
        assert!(inventory.contains("ansible_ssh_private_key_file="));
        assert!(!ws.key_path().exists());
        assert!(std::fs::read_to_string(ws.vars_path())
            .unwrap()
            .contains("nginx_enabled: true"));

        let call = &runner.calls_to("/opt/installer/install.sh")[0];
        assert_eq!(call.args[0], "-i");
        assert_eq!(call.timeout, Some(Duration::from_secs(3600)));
    }

    #[tokio::test]
    async fn test_failed_install_still_removes_key() {
        let root = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().on("/opt/installer/pre-check.sh", CommandOutput::ok("")));
        let deployer = Deployer::new(runner.clone(), settings(), root.path());

        let check = deployer
            .check(&CheckRequest {
                host: "10.0.0.5".to_string(),
                auth_type: AuthType::Key,
                user: None,
                password: None,
                ssh_key: Some("KEY".to_string()),
            })
            .await
            .unwrap();
        let ws = Workspace::open(root.path(), &check.deployment_id).unwrap();
        assert!(ws.has_key());

        // install.sh is not scripted, so the run itself errors
        let result = deployer
            .install(&InstallRequest {
                deployment_id: Some(check.deployment_id.clone()),
                host: "10.0.0.5".to_string(),
                user: None,
                components: BTreeMap::new(),
                versions: BTreeMap::new(),
            })
            .await;

        assert!(result.is_err());
        assert!(!ws.key_path().exists());
    }

    #[tokio::test]
    async fn test_check_reports_missing_sshpass() {
        let root = tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .on("/opt/installer/pre-check.sh", CommandOutput::ok(""))
                .missing("sshpass"),
        );
        let deployer = Deployer::new(runner.clone(), settings(), root.path());

        let result = deployer
            .check(&CheckRequest {
                host: "10.0.0.5".to_string(),
                auth_type: AuthType::Password,
                user: None,
                password: Some("pw".to_string()),
                ssh_key: None,
            })
            .await
            .unwrap();

        assert!(!result.success);
        assert!(!result.checks.os);
        assert_eq!(result.error, "Required program not found: sshpass");
        assert!(runner.calls().is_empty());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_install_rejects_invalid_before_running() {
        let root = tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let deployer = Deployer::new(runner.clone(), settings(), root.path());

        let result = deployer
            .install(&InstallRequest {
                deployment_id: None,
                host: "$(reboot)".to_string(),
                user: None,
                components: BTreeMap::new(),
                versions: BTreeMap::new(),
            })
            .await;

        assert!(result.is_err());
        assert!(runner.calls().is_empty());
    }
}
