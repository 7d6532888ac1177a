use color_eyre::eyre::{Result, WrapErr};
use crossterm::event::EventStream;
use std::sync::Arc;
use tracing::{error, info};

use diary_autosave::config::DiaryConfig;
use diary_autosave::ui::UI;
use diary_autosave::{app, telemetry, AutoSaveController, ControllerSettings, HttpEntryStore};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = DiaryConfig::load()?;
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)
        .wrap_err_with(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let _guard = telemetry::init_subscriber(&log_dir, std::env::var_os("DIARY_DEBUG").is_some())?;

    let store = HttpEntryStore::new(&config.api_url, config.request_timeout())?;
    info!(url = %store.base_url(), "starting diary");

    let mut controller =
        AutoSaveController::new(Arc::new(store), ControllerSettings::from(&config));
    let mut ui = UI::new()?;

    let result = app::run(&mut controller, &mut ui, EventStream::new()).await;
    if let Err(e) = &result {
        error!(error = %e, "diary exited with an error");
    }
    result
}
