//! Session reader that shells out once per host

use async_trait::async_trait;
use std::process::Stdio;
use termtally_config::{HostConfig, ReaderConfig};
use termtally_host_api::{ReaderError, ReaderResult, SessionListing, SessionReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{decode_output, parse_output, reports_no_users};

/// Reads sessions by running the configured command for each host
pub struct CommandReader {
    config: ReaderConfig,
}

impl CommandReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }
}

#[async_trait]
impl SessionReader for CommandReader {
    async fn list_sessions(&self, host: &HostConfig) -> ReaderResult<SessionListing> {
        let argv = self.config.command_for(&host.address);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ReaderError::HostUnreachable("empty reader command".into()))?;

        debug!(host = %host.id, command = ?argv, "Running session reader");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReaderError::HostUnreachable(format!("failed to run {}: {}", program, e)))?;

        // Dropping the future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(result) => result
                .map_err(|e| ReaderError::HostUnreachable(format!("{} did not finish: {}", program, e)))?,
            Err(_) => {
                warn!(host = %host.id, timeout = ?self.config.timeout, "Session reader timed out");
                return Err(ReaderError::Timeout(self.config.timeout));
            }
        };

        let stdout = decode_output(self.config.encoding, &output.stdout);
        let stderr = decode_output(self.config.encoding, &output.stderr);

        if reports_no_users(&stdout, &stderr) {
            debug!(host = %host.id, "Host reports no users");
            return Ok(SessionListing::default());
        }

        if !output.status.success() {
            return Err(ReaderError::CommandFailed {
                status: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(parse_output(self.config.format, &stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use termtally_config::ReaderFormat;

    fn reader(format: ReaderFormat, script: &str) -> CommandReader {
        CommandReader::new(ReaderConfig {
            format,
            command: vec![
                "sh".into(),
                "-c".into(),
                script.into(),
                "sh".into(),
                "{host}".into(),
            ],
            timeout: Duration::from_secs(5),
            encoding: format.default_encoding(),
            ..ReaderConfig::default()
        })
    }

    #[tokio::test]
    async fn reads_who_output_with_host_substituted() {
        let reader = reader(ReaderFormat::Who, r#"echo "$1 pts/0 2026-10-19 09:00""#);
        let listing = reader
            .list_sessions(&HostConfig::new("alice"))
            .await
            .unwrap();

        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].username.as_str(), "alice");
    }

    #[tokio::test]
    async fn no_users_marker_on_failure_is_empty() {
        let reader = reader(
            ReaderFormat::Quser,
            "echo 'No users exist for *' >&2; exit 1",
        );
        let listing = reader
            .list_sessions(&HostConfig::new("server1"))
            .await
            .unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_is_command_failed() {
        let reader = reader(ReaderFormat::Quser, "echo 'Error 5 getting session names' >&2; exit 1");
        let err = reader
            .list_sessions(&HostConfig::new("server1"))
            .await
            .unwrap_err();

        match err {
            ReaderError::CommandFailed { status, stderr } => {
                assert_eq!(status, Some(1));
                assert!(stderr.contains("Error 5"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_unreachable() {
        let reader = CommandReader::new(ReaderConfig {
            command: vec!["/nonexistent/termtally-reader".into(), "{host}".into()],
            ..ReaderConfig::default()
        });
        let err = reader
            .list_sessions(&HostConfig::new("server1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::HostUnreachable(_)));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let mut reader = reader(ReaderFormat::Who, "sleep 5");
        reader.config.timeout = Duration::from_millis(100);

        let err = reader
            .list_sessions(&HostConfig::new("server1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::Timeout(_)));
    }

    #[tokio::test]
    async fn quser_output_decoded_from_oem_code_page() {
        // "иван" and "петр" in IBM866
        let reader = reader(
            ReaderFormat::Quser,
            r"printf ' USERNAME SESSIONNAME ID STATE\n \250\242\240\255 rdp-tcp#1 2 Active\n \257\245\342\340 rdp-tcp#2 3 Active\n'",
        );
        let listing = reader
            .list_sessions(&HostConfig::new("server1"))
            .await
            .unwrap();

        let names: Vec<&str> = listing.records.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, ["иван", "петр"]);
    }
}
