mod config;
pub mod history;
pub mod state_store;

pub use config::{
    AnalyticsConfig, FloorEngineConfig, PlannerConfig, TrainingStrategy, WaveConfig,
    WaveVisibility,
};
pub use history::HistoryFile;
pub use state_store::{FileStateStore, MemoryStateStore, StateStore};

use std::path::PathBuf;

/// Returns `~/.config/focusplan[-dev]/` based on FOCUSPLAN_ENV.
///
/// Set FOCUSPLAN_ENV=dev to use development data directory.
/// Set FOCUSPLAN_HOME to replace the base directory entirely.
///
/// # Errors
/// Returns an error if creating the data directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("FOCUSPLAN_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FOCUSPLAN_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("focusplan-dev")
            } else {
                base_dir.join("focusplan")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
