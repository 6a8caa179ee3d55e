//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// How sessions are read from each host
    #[serde(default)]
    pub reader: RawReaderConfig,

    /// Hosts to poll, in polling order
    #[serde(default)]
    pub hosts: Vec<RawHost>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the sessions database
    pub data_dir: Option<PathBuf>,

    /// Log directory
    pub log_dir: Option<PathBuf>,

    /// Seconds between the start of two poll cycles
    pub poll_interval_seconds: Option<u64>,

    /// How long a store write may wait on a locked database
    pub store_busy_timeout_seconds: Option<u64>,

    /// Commit open sessions' confirmed time on graceful shutdown
    pub flush_on_shutdown: Option<bool>,

    /// CSV report rewritten after every cycle
    pub report_path: Option<PathBuf>,
}

/// Reader settings shared by all hosts
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReaderConfig {
    /// Output format of the session command: "quser" or "who"
    pub format: Option<RawReaderFormat>,

    /// Command argv; `{host}` is replaced by the host address
    pub command: Option<Vec<String>>,

    /// Per-host read timeout in seconds
    pub timeout_seconds: Option<u64>,

    /// Encoding label of the command output, e.g. "ibm866" or "utf-8"
    pub encoding: Option<String>,

    /// Count disconnected sessions as connected time
    #[serde(default)]
    pub count_disconnected: bool,

    /// Users whose sessions are never tracked
    pub ignored_users: Option<Vec<String>>,
}

/// Session listing format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawReaderFormat {
    Quser,
    Who,
}

/// Raw host definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawHost {
    /// Unique stable ID, used as the ledger key
    pub id: String,

    /// Address substituted into the command (defaults to `id`)
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hosts() {
        let toml_str = r#"
            config_version = 1

            [[hosts]]
            id = "server1"

            [[hosts]]
            id = "server2"
            address = "10.0.0.2"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.hosts[0].id, "server1");
        assert!(config.hosts[0].address.is_none());
        assert_eq!(config.hosts[1].address.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn parse_reader_section() {
        let toml_str = r#"
            config_version = 1

            [reader]
            format = "who"
            command = ["ssh", "{host}", "who"]
            timeout_seconds = 10
            encoding = "utf-8"
            count_disconnected = true
            ignored_users = ["root"]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.reader.format, Some(RawReaderFormat::Who));
        assert_eq!(config.reader.command.as_ref().unwrap().len(), 3);
        assert_eq!(config.reader.encoding.as_deref(), Some("utf-8"));
        assert!(config.reader.count_disconnected);
        assert!(config.hosts.is_empty());
    }
}
