use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Preceptor";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Temporary-dismiss suppression window, in hours.
pub const DISMISS_SUPPRESS_HOURS: i64 = 24;

/// Snooze length when the caller does not pick one, in days.
pub const DEFAULT_SNOOZE_DAYS: u32 = 7;

/// Get the application data directory
/// ~/Preceptor/ on all platforms (user-visible)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Preceptor")
}

/// Default on-disk location for the guidance state database
pub fn default_state_db() -> PathBuf {
    app_data_dir().join("guidance.db")
}
