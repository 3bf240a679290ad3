//! Standard file locations

use std::path::PathBuf;

const APP_DIR: &str = "woodshed";

/// Config directory: `$XDG_CONFIG_HOME/woodshed` (or the platform equivalent)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Data directory: `$XDG_DATA_HOME/woodshed` (or the platform equivalent)
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default settings file
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// Default saved-sessions file
pub fn default_sessions_path() -> PathBuf {
    data_dir().join("sessions.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_under_app_dir() {
        assert!(default_config_path().ends_with("woodshed/config.yaml"));
        assert!(default_sessions_path().ends_with("woodshed/sessions.yaml"));
    }
}
