//! Default paths for termtally components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/termtally/config.toml` or `~/.config/termtally/config.toml`
//! - Data: `$XDG_DATA_HOME/termtally` or `~/.local/share/termtally`
//! - Logs: `$XDG_STATE_HOME/termtally` or `~/.local/state/termtally`

use std::path::PathBuf;

/// Environment variable for overriding the config file
pub const TERMTALLY_CONFIG_ENV: &str = "TERMTALLY_CONFIG";

/// Environment variable for overriding the data directory
pub const TERMTALLY_DATA_DIR_ENV: &str = "TERMTALLY_DATA_DIR";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "sessions.db";

/// Application subdirectory name
const APP_DIR: &str = "termtally";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$TERMTALLY_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/termtally/config.toml`
/// 3. `~/.config/termtally/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(TERMTALLY_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    xdg_dir("XDG_CONFIG_HOME", &[".config"], "config").join("config.toml")
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$TERMTALLY_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/termtally`
/// 3. `~/.local/share/termtally`
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(TERMTALLY_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking `TERMTALLY_DATA_DIR`.
/// Used for config defaults where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", &[".local", "share"], "data")
}

/// Get the default log directory.
pub fn default_log_dir() -> PathBuf {
    xdg_dir("XDG_STATE_HOME", &[".local", "state"], "logs")
}

fn xdg_dir(xdg_var: &str, home_fallback: &[&str], last_resort: &str) -> PathBuf {
    if let Ok(base) = std::env::var(xdg_var) {
        return PathBuf::from(base).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        let mut path = PathBuf::from(home);
        path.extend(home_fallback);
        return path.join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join(last_resort)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_contains_termtally() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("termtally"));
    }

    #[test]
    fn log_dir_contains_termtally() {
        let path = default_log_dir();
        assert!(path.to_string_lossy().contains("termtally"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = xdg_dir("XDG_CONFIG_HOME", &[".config"], "config").join("config.toml");
        assert_eq!(path.extension().unwrap(), "toml");
    }
}
