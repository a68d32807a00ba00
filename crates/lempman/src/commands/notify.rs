//! Notification configuration command

use anyhow::{bail, Context, Result};
use lempman_core::Settings;
use lempman_exec::{CommandRunner, SystemRunner};
use lempman_health::SystemProbe;
use lempman_notify::{NotificationManager, ServiceEvent, TelegramConfig};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{NotifyArgs, NotifyCommand};
use crate::output::{is_json_mode, mask_secret, print_info, print_json, print_success};

pub async fn execute(settings: Settings, args: NotifyArgs) -> Result<()> {
    match args.command {
        NotifyCommand::Telegram {
            token,
            chat,
            disable,
        } => configure_telegram(&settings, token, chat, !disable),
        NotifyCommand::Status => show_status(&settings),
        NotifyCommand::Test => test_notification(&settings).await,
    }
}

fn configure_telegram(settings: &Settings, token: String, chat: String, enabled: bool) -> Result<()> {
    std::fs::create_dir_all(&settings.config_dir)?;

    let config = TelegramConfig::new(enabled, token.trim(), chat.trim());
    config.save(&settings.telegram_path())?;

    if enabled {
        print_success("Telegram notifications configured");
    } else {
        print_success("Telegram credentials saved, notifications disabled");
    }
    print_info(&format!("Config saved to: {}", settings.telegram_path().display()));
    Ok(())
}

fn show_status(settings: &Settings) -> Result<()> {
    let config = TelegramConfig::load(&settings.telegram_path())?;

    if is_json_mode() {
        print_json(&serde_json::json!({
            "enabled": config.enabled,
            "active": config.is_active(),
            "chatId": config.chat_id,
            "botToken": mask_secret(&config.bot_token),
        }));
        return Ok(());
    }

    println!();
    println!("Notification Configuration");
    println!("{}", "=".repeat(40));
    if config.is_complete() {
        println!(
            "Telegram: {}",
            if config.enabled { "enabled" } else { "disabled" }
        );
        println!("  Chat ID: {}", config.chat_id);
        println!("  Bot Token: {}", mask_secret(&config.bot_token));
    } else {
        println!("Telegram: not configured");
    }
    println!();
    println!("Config file: {}", settings.telegram_path().display());

    Ok(())
}

async fn test_notification(settings: &Settings) -> Result<()> {
    let manager = NotificationManager::new(settings.telegram_path());
    if !manager.config()?.is_active() {
        print_info("Run 'lempman notify telegram --token <TOKEN> --chat <CHAT_ID>' to configure");
        bail!("Telegram notifications are not enabled");
    }

    let timeout = Duration::from_secs(settings.command_timeout_secs);
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(timeout));
    let probe = SystemProbe::new(runner, timeout, settings.magento.clone());
    let nginx = probe.service("nginx").await;

    print_info("Sending test notification...");
    let event = ServiceEvent::Test {
        nginx_state: nginx.status.to_string(),
    };
    manager
        .send_test(&event)
        .await
        .context("Failed to send test notification")?;
    print_success("Test notification sent");
    Ok(())
}
