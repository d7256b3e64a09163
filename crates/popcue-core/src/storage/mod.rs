mod config;
pub mod database;
pub mod session;

pub use config::{Config, ExitConfig, StorageConfig, UrgencyConfig, WelcomeConfig};
pub use database::SqliteStore;
pub use session::{
    clear_session, load_snapshot, save_countdown, save_snapshot, MemoryStore, SessionKeys,
    SessionSnapshot, SessionStore,
};

use std::path::PathBuf;

/// Returns `~/.config/popcue[-dev]/` based on POPCUE_ENV.
///
/// Set POPCUE_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("POPCUE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("popcue-dev")
    } else {
        base_dir.join("popcue")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
