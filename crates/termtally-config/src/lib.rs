//! Configuration parsing and validation for termtally
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Host list, reader command and poll interval
//! - Validation with clear error messages
//!
//! The configuration is read once at startup and never reloaded during a run.

mod monitor;
mod schema;
mod validation;

pub use monitor::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<MonitorConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<MonitorConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        tracing::debug!(error_count = errors.len(), "Config validation failed");
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(MonitorConfig::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [[hosts]]
            id = "server1"
        "#;

        let monitor = parse_config(config).unwrap();
        assert_eq!(monitor.hosts.len(), 1);
        assert_eq!(monitor.hosts[0].id.as_str(), "server1");
        assert_eq!(monitor.service.poll_interval, Duration::from_secs(60));
    }

    #[test]
    fn parse_full_config() {
        let config = r#"
            config_version = 1

            [service]
            data_dir = "/tmp/termtally-test"
            poll_interval_seconds = 30
            flush_on_shutdown = false
            report_path = "/tmp/termtally-test/report.csv"

            [reader]
            format = "quser"
            timeout_seconds = 5
            ignored_users = ["admin", "svc_backup"]

            [[hosts]]
            id = "server1"
            address = "server1.corp.example"

            [[hosts]]
            id = "server2"
        "#;

        let monitor = parse_config(config).unwrap();
        assert_eq!(monitor.service.poll_interval, Duration::from_secs(30));
        assert!(!monitor.service.flush_on_shutdown);
        assert_eq!(monitor.reader.timeout, Duration::from_secs(5));
        assert_eq!(monitor.reader.ignored_users.len(), 2);
        assert_eq!(monitor.hosts[0].address, "server1.corp.example");
        assert_eq!(monitor.hosts[1].address, "server2");
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99

            [[hosts]]
            id = "server1"
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_config() {
        let config = r#"
            config_version = 1
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "config_version = 1\n[[hosts]]\nid = \"h1\"").unwrap();

        let monitor = load_config(file.path()).unwrap();
        assert_eq!(monitor.hosts.len(), 1);
    }

    #[test]
    fn load_missing_file() {
        let result = load_config("/nonexistent/termtally.toml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
