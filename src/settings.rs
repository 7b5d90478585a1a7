use dirs_next as dirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::entry_log::NumberPolicy;

fn default_true() -> bool {
    true
}

fn default_plot_height() -> f32 {
    240.0
}

fn default_thumbnail_size() -> f32 {
    48.0
}

/// Persistent user preferences.
///
/// Stored as JSON next to other per-user configuration. Every field carries a
/// serde default so that files written by older versions still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Overrides the database location when set.
    #[serde(default)]
    pub database_path: Option<String>,
    /// Reject non-numeric measurements instead of storing them as NaN.
    #[serde(default = "default_true")]
    pub strict_numbers: bool,
    #[serde(default = "default_plot_height")]
    pub plot_height: f32,
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: f32,
    #[serde(default = "default_true")]
    pub show_entry_table: bool,
    #[serde(default)]
    pub last_export_dir: Option<String>,
}

impl Settings {
    const FILE: &'static str = "gym_machine_tracker_settings.json";
    const APP_DIR: &'static str = "gym_machine_tracker";
    const DB_FILE: &'static str = "gym_tracker.db";

    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(Self::FILE))
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable.
    pub fn load() -> Self {
        if let Some(path) = Self::path() {
            if let Ok(data) = std::fs::read_to_string(&path) {
                match serde_json::from_str(&data) {
                    Ok(cfg) => return cfg,
                    Err(err) => log::warn!("Ignoring malformed settings file: {err}"),
                }
            }
        }
        Self::default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            if let Some(parent) = path.parent() {
                if let Err(err) = std::fs::create_dir_all(parent) {
                    log::error!("Failed to create {}: {err}", parent.display());
                    return;
                }
            }
            match serde_json::to_string_pretty(self) {
                Ok(data) => {
                    if let Err(err) = std::fs::write(&path, data) {
                        log::error!("Failed to save settings to {}: {err}", path.display());
                    }
                }
                Err(err) => log::error!("Failed to serialize settings: {err}"),
            }
        }
    }

    /// Where the database lives: the configured override, else the per-user
    /// data directory.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        match self.database_path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => Some(PathBuf::from(p)),
            _ => dirs::data_dir().map(|d| d.join(Self::APP_DIR).join(Self::DB_FILE)),
        }
    }

    pub fn number_policy(&self) -> NumberPolicy {
        if self.strict_numbers {
            NumberPolicy::Strict
        } else {
            NumberPolicy::Lenient
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            strict_numbers: true,
            plot_height: default_plot_height(),
            thumbnail_size: default_thumbnail_size(),
            show_entry_table: true,
            last_export_dir: None,
        }
    }
}
