//! Configuration validation

use crate::schema::{RawConfig, RawHost, RawReaderConfig, RawServiceConfig};
use encoding_rs::Encoding;
use std::collections::HashSet;
use thiserror::Error;

/// Placeholder replaced by the host address in the reader command
pub const HOST_PLACEHOLDER: &str = "{host}";

/// Largest accepted duration setting, in seconds.
///
/// Timers and the SQLite busy handler take milliseconds as an `i32`.
pub const MAX_DURATION_SECS: u64 = i32::MAX as u64 / 1000;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Host '{host_id}': {message}")]
    HostError { host_id: String, message: String },

    #[error("Duplicate host ID: {0}")]
    DuplicateHostId(String),

    #[error("No hosts configured")]
    NoHosts,

    #[error("Reader config error: {0}")]
    ReaderError(String),

    #[error("Service config error: {0}")]
    ServiceError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.hosts.is_empty() {
        errors.push(ValidationError::NoHosts);
    }

    let mut seen_ids = HashSet::new();
    for host in &config.hosts {
        if !seen_ids.insert(host.id.as_str()) {
            errors.push(ValidationError::DuplicateHostId(host.id.clone()));
        }
        errors.extend(validate_host(host));
    }

    errors.extend(validate_service(&config.service));
    errors.extend(validate_reader(&config.reader));

    errors
}

fn validate_host(host: &RawHost) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if host.id.trim().is_empty() {
        errors.push(ValidationError::HostError {
            host_id: host.id.clone(),
            message: "id cannot be empty".into(),
        });
    }

    if let Some(address) = &host.address
        && address.trim().is_empty()
    {
        errors.push(ValidationError::HostError {
            host_id: host.id.clone(),
            message: "address cannot be empty when set".into(),
        });
    }

    errors
}

fn validate_service(service: &RawServiceConfig) -> Vec<ValidationError> {
    [
        ("poll_interval_seconds", service.poll_interval_seconds),
        ("store_busy_timeout_seconds", service.store_busy_timeout_seconds),
    ]
    .into_iter()
    .filter_map(|(field, value)| check_seconds(field, value?))
    .map(ValidationError::ServiceError)
    .collect()
}

fn check_seconds(field: &str, value: u64) -> Option<String> {
    if value == 0 {
        Some(format!("{} must be greater than 0", field))
    } else if value > MAX_DURATION_SECS {
        Some(format!(
            "{} must be at most {} (got {})",
            field, MAX_DURATION_SECS, value
        ))
    } else {
        None
    }
}

fn validate_reader(reader: &RawReaderConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(message) = reader
        .timeout_seconds
        .and_then(|value| check_seconds("timeout_seconds", value))
    {
        errors.push(ValidationError::ReaderError(message));
    }

    if let Some(label) = &reader.encoding
        && Encoding::for_label(label.trim().as_bytes()).is_none()
    {
        errors.push(ValidationError::ReaderError(format!(
            "unknown encoding '{}'",
            label
        )));
    }

    if let Some(command) = &reader.command {
        match command.first() {
            None => errors.push(ValidationError::ReaderError("command cannot be empty".into())),
            Some(program) if program.trim().is_empty() => errors.push(
                ValidationError::ReaderError("command program cannot be empty".into()),
            ),
            Some(_) => {}
        }

        if !command.is_empty() && !command.iter().any(|arg| arg.contains(HOST_PLACEHOLDER)) {
            errors.push(ValidationError::ReaderError(format!(
                "command must reference the host with '{}'",
                HOST_PLACEHOLDER
            )));
        }
    }

    if let Some(users) = &reader.ignored_users
        && users.iter().any(|u| u.trim().is_empty())
    {
        errors.push(ValidationError::ReaderError(
            "ignored_users cannot contain empty names".into(),
        ));
    }

    errors
}
