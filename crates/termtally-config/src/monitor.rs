//! Validated configuration structures

use crate::schema::{RawConfig, RawHost, RawReaderConfig, RawReaderFormat, RawServiceConfig};
use crate::validation::HOST_PLACEHOLDER;
use encoding_rs::Encoding;
use termtally_util::{HostId, Username, data_dir_without_env, default_log_dir};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default seconds between poll cycles
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default per-host read timeout
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Default wait on a locked database before a write fails
pub const DEFAULT_STORE_BUSY_TIMEOUT_SECS: u64 = 5;

/// Validated configuration, built once at startup and passed into the scheduler
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub service: ServiceConfig,
    pub reader: ReaderConfig,
    pub hosts: Vec<HostConfig>,
}

impl MonitorConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            reader: ReaderConfig::from_raw(raw.reader),
            hosts: raw.hosts.into_iter().map(HostConfig::from_raw).collect(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub poll_interval: Duration,
    pub store_busy_timeout: Duration,
    pub flush_on_shutdown: bool,
    pub report_path: Option<PathBuf>,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw.data_dir.unwrap_or_else(data_dir_without_env),
            log_dir: raw.log_dir.unwrap_or_else(default_log_dir),
            poll_interval: Duration::from_secs(
                raw.poll_interval_seconds
                    .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            store_busy_timeout: Duration::from_secs(
                raw.store_busy_timeout_seconds
                    .unwrap_or(DEFAULT_STORE_BUSY_TIMEOUT_SECS),
            ),
            flush_on_shutdown: raw.flush_on_shutdown.unwrap_or(true),
            report_path: raw.report_path,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Format of the session listing produced by the reader command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderFormat {
    /// Windows `quser` / `query user` table
    #[default]
    Quser,
    /// POSIX `who` listing
    Who,
}

impl ReaderFormat {
    /// Command used when the config does not set one
    pub fn default_command(self) -> Vec<String> {
        match self {
            ReaderFormat::Quser => {
                vec!["quser".into(), format!("/server:{}", HOST_PLACEHOLDER)]
            }
            ReaderFormat::Who => vec!["ssh".into(), HOST_PLACEHOLDER.into(), "who".into()],
        }
    }

    /// Output encoding used when the config does not set one.
    ///
    /// `quser` writes in the console OEM code page.
    pub fn default_encoding(self) -> &'static Encoding {
        match self {
            ReaderFormat::Quser => encoding_rs::IBM866,
            ReaderFormat::Who => encoding_rs::UTF_8,
        }
    }
}

/// How sessions are read from hosts
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub format: ReaderFormat,
    pub command: Vec<String>,
    pub timeout: Duration,
    pub encoding: &'static Encoding,
    pub count_disconnected: bool,
    pub ignored_users: HashSet<Username>,
}

impl ReaderConfig {
    fn from_raw(raw: RawReaderConfig) -> Self {
        let format = match raw.format {
            Some(RawReaderFormat::Who) => ReaderFormat::Who,
            Some(RawReaderFormat::Quser) | None => ReaderFormat::Quser,
        };
        let ignored_users = raw
            .ignored_users
            .unwrap_or_else(|| vec!["admin".into()])
            .into_iter()
            .map(Username::new)
            .collect();
        let encoding = raw
            .encoding
            .as_deref()
            .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
            .unwrap_or_else(|| format.default_encoding());

        Self {
            format,
            command: raw.command.unwrap_or_else(|| format.default_command()),
            timeout: Duration::from_secs(raw.timeout_seconds.unwrap_or(DEFAULT_READ_TIMEOUT_SECS)),
            encoding,
            count_disconnected: raw.count_disconnected,
            ignored_users,
        }
    }

    /// Build the argv for one host by substituting its address
    pub fn command_for(&self, address: &str) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| arg.replace(HOST_PLACEHOLDER, address))
            .collect()
    }

    pub fn is_ignored(&self, user: &Username) -> bool {
        self.ignored_users.contains(user)
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::from_raw(RawReaderConfig::default())
    }
}

/// Validated host definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub id: HostId,
    pub address: String,
}

impl HostConfig {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            address: id.clone(),
            id: HostId::new(id),
        }
    }

    fn from_raw(raw: RawHost) -> Self {
        Self {
            address: raw.address.unwrap_or_else(|| raw.id.clone()),
            id: HostId::new(raw.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_defaults() {
        let reader = ReaderConfig::default();
        assert_eq!(reader.format, ReaderFormat::Quser);
        assert_eq!(reader.timeout, Duration::from_secs(30));
        assert_eq!(reader.encoding, encoding_rs::IBM866);
        assert!(!reader.count_disconnected);
        assert!(reader.is_ignored(&Username::new("admin")));
    }

    #[test]
    fn test_command_substitution() {
        let reader = ReaderConfig::default();
        assert_eq!(
            reader.command_for("server1"),
            vec!["quser".to_string(), "/server:server1".to_string()]
        );
    }

    #[test]
    fn test_who_default_command() {
        let reader = ReaderConfig::from_raw(RawReaderConfig {
            format: Some(RawReaderFormat::Who),
            ..Default::default()
        });
        assert_eq!(reader.command_for("box"), vec!["ssh", "box", "who"]);
        assert_eq!(reader.encoding, encoding_rs::UTF_8);
    }

    #[test]
    fn test_encoding_override() {
        let reader = ReaderConfig::from_raw(RawReaderConfig {
            encoding: Some("windows-1251".into()),
            ..Default::default()
        });
        assert_eq!(reader.format, ReaderFormat::Quser);
        assert_eq!(reader.encoding, encoding_rs::WINDOWS_1251);
    }

    #[test]
    fn test_host_address_defaults_to_id() {
        let host = HostConfig::from_raw(RawHost {
            id: "server1".into(),
            address: None,
        });
        assert_eq!(host.address, "server1");
        assert_eq!(host.id.as_str(), "server1");
    }

    #[test]
    fn test_service_defaults() {
        let service = ServiceConfig::default();
        assert_eq!(service.poll_interval, Duration::from_secs(60));
        assert!(service.flush_on_shutdown);
        assert!(service.report_path.is_none());
    }
}
