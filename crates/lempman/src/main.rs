//! LEMP Manager - admin console for LEMP/Magento hosts

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

const LOG_FILE_PREFIX: &str = "lempman.log";

fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!("lempman={level},lempman_web={level},tower_http={level}")
}

/// Console logging, plus a daily rolled file when serving with `--log-dir`
fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(cli.verbose)));

    let (file_layer, guard) = match &cli.command {
        Commands::Serve(args) => match &args.log_dir {
            Some(dir) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        },
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    output::set_json_mode(cli.json);
    let guard = init_logging(&cli);

    let result = match load_settings(cli.config.as_deref()) {
        Ok(settings) => match cli.command {
            Commands::Serve(args) => serve::execute(settings, args).await,
            Commands::User(args) => user::execute(settings, args).await,
            Commands::Notify(args) => notify::execute(settings, args).await,
            Commands::Status => status::execute(settings).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        drop(guard);
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
