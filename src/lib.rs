pub mod capture;
pub mod chat;
pub mod cli;
pub mod db;
pub mod mood;
pub mod response;
pub mod session;
pub mod settings;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, LevelFilter};

use cli::{AppContext, Cli};
use db::Database;
use settings::SettingsStore;

const DATA_DIR_ENV: &str = "MOODWATCH_DATA_DIR";
const DEBUG_ENV: &str = "MOODWATCH_DEBUG";

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".moodwatch"),
        None => PathBuf::from(".moodwatch"),
    }
}

fn to_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000)
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let debug = env_flag(DEBUG_ENV);

    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    info!("moodwatch starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let app_data_dir = data_dir();
        std::fs::create_dir_all(&app_data_dir).with_context(|| {
            format!("failed to create data directory {}", app_data_dir.display())
        })?;

        let database = Database::new(app_data_dir.join("moodwatch.sqlite3"))?;

        let settings_path = app_data_dir.join("settings.json");
        let first_run = !settings_path.exists();
        let settings = SettingsStore::new(settings_path)?;
        if first_run {
            // Write the defaults out so there is a file to edit.
            settings.update(settings.get())?;
        }
        let settings = settings.get();

        // Close sessions that were still running when the app last exited uncleanly.
        let stale_after = chrono::Duration::seconds(to_secs(settings.stale_session_secs));
        let recovered = cli::recover_open_sessions(&database, Utc::now(), stale_after).await?;
        if recovered > 0 {
            info!("Recovered {recovered} interrupted session(s)");
        }

        cli::dispatch(
            cli,
            AppContext {
                db: database,
                settings,
                debug,
            },
        )
        .await
    })
}
