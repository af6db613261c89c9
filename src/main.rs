//! Binary entry point: load settings, open the database, and drive the TUI
//! until the user exits. The gateway is owned here so it is closed exactly
//! once, after the interface has gone away.
use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use student_records::{ensure_schema, run_app, App, AppPaths, Gateway, Settings, StudentStore};

fn main() -> Result<()> {
    let paths = AppPaths::discover()?;
    paths.ensure_root()?;

    let config_path = paths.config_file();
    let (settings, created) = Settings::load_or_create(&config_path)?;
    init_tracing(&paths, &settings)?;
    if created {
        info!(path = %config_path.display(), "wrote default settings");
    }

    let mut gateway = Gateway::connect(&settings.database.location(&paths));
    if gateway.is_connected() {
        if let Err(err) = ensure_schema(&gateway) {
            warn!(error = ?err, "failed to prepare the students table");
        }
    }

    let stored = Settings::load_stored(&config_path)?;
    let result = {
        let store = StudentStore::new(&gateway);
        let mut app = App::new(store, stored, config_path.clone());
        if created {
            app.notify(format!(
                "Default settings written to {}",
                config_path.display()
            ));
        }
        run_app(&mut app)
    };

    gateway.close();
    result
}

/// Log to a file under the data directory; the terminal belongs to the TUI.
/// `RUST_LOG` wins over the `loglevel` setting.
fn init_tracing(paths: &AppPaths, settings: &Settings) -> Result<()> {
    let log_path = paths.log_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.loglevel))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
