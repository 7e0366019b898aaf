pub mod alerts;
pub mod audio;
pub mod db;
pub mod history;
pub mod models;
pub mod monitor;
pub mod parser;
pub mod presence;
pub mod settings;
pub mod transport;

pub use models::{AlertKind, AlertRecord, DeliveryStatus, Item, Snapshot};
pub use settings::{Settings, SettingsStore};

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};

use alerts::{AlertDispatcher, AlertEngine, EmailConfig, Mailer};
use audio::BuzzerHandle;
use db::Database;
use monitor::MonitorController;
use transport::LineTransport;

pub async fn run(data_dir: Option<PathBuf>) -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("ppewatch starting up...");

    let data_dir = match data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings_store = SettingsStore::new(&data_dir.join("settings.json"))?;
    let settings = settings_store.current();

    let database = Database::new(data_dir.join("alerts.sqlite3"))?;

    let mailer = if settings.enable_email_alerts {
        match EmailConfig::from_env() {
            Some(config) => Some(Mailer::new(config)),
            None => {
                warn!("email alerts enabled but SMTP_HOST is not set; delivery will be recorded as failed");
                None
            }
        }
    } else {
        None
    };

    // Startup connect failure is fatal; everything after this point
    // degrades instead of dying.
    let transport = LineTransport::connect(&settings.serial_port)?;

    let engine = AlertEngine::new(
        settings.alert_threshold(),
        settings.cooldown(),
        settings.cooldown_policy,
    );

    let mut controller = MonitorController::new();
    let dispatcher = AlertDispatcher::new(
        &settings,
        mailer,
        database.clone(),
        BuzzerHandle::new(),
        controller.ui_sender(),
    );
    controller.start(transport.into_receiver(), engine, dispatcher)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    controller.stop().await?;

    Ok(())
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("ppewatch"))
        .context("could not determine a data directory")
}
