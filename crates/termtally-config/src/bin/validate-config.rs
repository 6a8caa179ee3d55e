//! Config validation CLI tool
//!
//! Validates a termtally configuration file and reports any errors.

use termtally_config::ReaderFormat;
use termtally_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a termtally configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match termtally_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", termtally_config::CURRENT_CONFIG_VERSION);
            println!("  Poll interval: {}", format_duration(config.service.poll_interval));
            println!("  Read timeout: {}", format_duration(config.reader.timeout));
            let format = match config.reader.format {
                ReaderFormat::Quser => "quser",
                ReaderFormat::Who => "who",
            };
            println!("  Reader: {} ({})", format, config.reader.command.join(" "));
            println!("  Output encoding: {}", config.reader.encoding.name());
            println!("  Data dir: {}", config.service.data_dir.display());
            println!("  Hosts: {}", config.hosts.len());

            for host in &config.hosts {
                println!("  - {} -> {}", host.id, config.reader.command_for(&host.address).join(" "));
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                termtally_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                termtally_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                termtally_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                termtally_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        termtally_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
