//! Run the web console

use anyhow::{Context, Result};
use lempman_core::Settings;
use lempman_web::{spawn_watcher, start_server, AppState};
use tracing::info;

use crate::cli::ServeArgs;

pub async fn execute(mut settings: Settings, args: ServeArgs) -> Result<()> {
    if let Some(bind) = args.bind {
        settings.bind = bind;
    }
    let bind = settings.bind.clone();
    let watch = settings.watch && !args.no_watch;

    let state = AppState::open(settings)
        .await
        .context("Failed to initialise console state")?;

    let watcher = if watch {
        Some(spawn_watcher(state.clone()))
    } else {
        info!("Background status watcher disabled");
        None
    };

    let result = start_server(state, &bind)
        .await
        .with_context(|| format!("Failed to serve on {}", bind));

    if let Some(handle) = watcher {
        handle.abort();
    }
    result
}
