//! One-shot subcommands

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::api::ChatClient;
use crate::config::Config;
use crate::controller::ConversationController;

/// Send a single message and print the assistant's answer.
///
/// The transcript starts from the configured greeting, so the backend sees the
/// same history it would on the first turn of an interactive session.
pub async fn send_once(config: &Config, text: &str) -> Result<ExitCode> {
    let client = ChatClient::new(config)?;
    let mut controller = ConversationController::new(client, config.greeting.clone());

    match controller.send(text).await {
        None => {
            eprintln!("Nothing to send: the message is empty.");
            Ok(ExitCode::from(2))
        }
        Some(settlement) => {
            let ok = settlement.is_reply();
            println!("{}", settlement.into_content());
            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// Probe the backend and report its status
pub async fn health(config: &Config) -> Result<ExitCode> {
    let client = ChatClient::new(config)?;
    match client.health().await {
        Ok(status) => {
            println!("✅ {} is {}", config.api_url, status.status);
            if let Some(service) = status.service {
                println!("   Service: {service}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            tracing::debug!(?error, "health probe failed");
            println!("❌ {} is unreachable: {error}", config.api_url);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print the effective configuration, optionally writing defaults first
pub fn show_config(config: &Config, init: bool) -> Result<ExitCode> {
    let path = Config::default_path()?;
    if init {
        if path.exists() {
            println!("📄 Config already exists at {}", path.display());
        } else {
            Config::default().save_to(&path)?;
            println!("✨ Wrote default config to {}", path.display());
        }
    }

    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("# {}", path.display());
    print!("{rendered}");
    Ok(ExitCode::SUCCESS)
}
