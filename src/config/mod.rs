//! Configuration module for CompanyLens
//!
//! Handles loading settings from YAML files and environment variables.
//! Settings are loaded once at startup and handed to the components that
//! need them; nothing here is global.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Load settings from the first settings file found, or use defaults.
///
/// `COMPANYLENS_SETTINGS_PATH` takes precedence over the default locations.
/// Environment overrides are applied in every case.
pub fn load_settings() -> Result<Settings> {
    let paths = [
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
        PathBuf::from("/etc/companylens/settings.yml"),
        dirs::config_dir()
            .map(|p| p.join("companylens/settings.yml"))
            .unwrap_or_default(),
    ];

    let explicit = std::env::var("COMPANYLENS_SETTINGS_PATH")
        .ok()
        .map(PathBuf::from)
        .filter(|p| p.exists());

    let found = explicit.or_else(|| paths.into_iter().find(|p| p.exists()));

    let mut settings = match found {
        Some(path) => {
            info!("Loading settings from: {}", path.display());
            Settings::from_file(&path)?
        }
        None => {
            info!("No settings file found, using defaults");
            Settings::default()
        }
    };

    settings.merge_env();
    Ok(settings)
}
