mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, EngineSection, NotificationsConfig, PositionSection, RemindersConfig};
pub use database::ReminderDb;

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `REMINDME_HOME` wins when set. Otherwise `~/.config/remindme`, or
/// `~/.config/remindme-dev` with `REMINDME_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = match std::env::var_os("REMINDME_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("REMINDME_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("remindme-dev")
            } else {
                base_dir.join("remindme")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
