//! One-shot host status

use anyhow::Result;
use lempman_core::Settings;
use lempman_exec::{CommandRunner, SystemRunner};
use lempman_health::SystemProbe;
use std::sync::Arc;
use std::time::Duration;

use crate::output::print_system_status;

pub async fn execute(settings: Settings) -> Result<()> {
    let db = super::open_db(&settings).await?;
    let sites = db.sites().list().await?;

    let timeout = Duration::from_secs(settings.command_timeout_secs);
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(timeout));
    let probe = SystemProbe::new(runner, timeout, settings.magento.clone());

    let status = probe.system_status(&sites, &settings.services).await;
    print_system_status(&status);
    Ok(())
}
