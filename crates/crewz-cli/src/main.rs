//! crewz - command-line client for the CrewzNation API.
//!
//! Logs in, keeps the session on this device and issues authenticated
//! requests, the same way the mobile app's screens do.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crewz_core::Config;

/// Log file prefix inside `<cache_dir>/logs`
const LOG_FILE_PREFIX: &str = "crewz.log";

#[derive(Parser)]
#[command(name = "crewz", version, about = "CrewzNation from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
    },
    /// Forget the session stored on this device
    Logout,
    /// Show the logged in member
    Whoami,
    /// Update profile fields
    Profile {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// Authenticated GET against any API path, e.g. /api/posts/feed
    Get { path: String },
}

/// Initialize tracing: stderr plus a daily log file when a cache dir exists
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config_result = Config::load();
    let mut config = config_result.as_ref().cloned().unwrap_or_default();
    let _log_guard = init_tracing(config.cache_dir().ok().map(|dir| dir.join("logs")));
    if let Err(ref e) = config_result {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    info!("crewz starting");
    let result = commands::run(cli.command, &mut config).await;
    info!("crewz done");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_profile_flags() {
        let cli = Cli::try_parse_from(["crewz", "profile", "--bio", "Stanced and proud"]).unwrap();
        match cli.command {
            Command::Profile { full_name, bio } => {
                assert_eq!(full_name, None);
                assert_eq!(bio.as_deref(), Some("Stanced and proud"));
            }
            _ => panic!("expected profile command"),
        }
    }

    #[test]
    fn test_get_requires_path() {
        assert!(Cli::try_parse_from(["crewz", "get"]).is_err());
    }
}
