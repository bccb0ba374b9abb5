pub mod admin;
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod forms;
mod logging;
pub mod models;
pub mod pages;
pub mod schedule;
pub mod search;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use cli::{Cli, Command, ConfigAction};
use config::ConfigStore;
use db::Store;
use pages::RenderContext;
use schedule::SystemClock;

pub use error::{BookingError, Result};

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_config(config_store: &ConfigStore, action: ConfigAction) -> anyhow::Result<ExitCode> {
    let config = match action {
        ConfigAction::Show => config_store.read(),
        ConfigAction::Set { key, value } => {
            let updated = config_store.update(|config| config.set(&key, &value))?;
            info!(%key, %value, "config updated");
            updated
        }
    };
    print_json(&serde_json::to_value(&config)?)?;
    Ok(ExitCode::SUCCESS)
}

pub fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config_store = ConfigStore::load()?;
    let config = config_store.read();
    let _log_guard = logging::init(&config)?;

    if let Command::Config { action } = cli.command {
        return run_config(&config_store, action);
    }

    let tz = config.timezone()?;
    let path = cli.database.unwrap_or_else(|| config.database_path());
    let store = Store::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?;

    let ctx = RenderContext::capture(&SystemClock, tz);
    let rendered = cli::execute(&store, cli.command, ctx, config.recent_limit);
    print_json(&rendered.body)?;

    Ok(if rendered.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
