//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations, plus the
//! wiring that turns the config file into a transfer session.

use clap::{Parser, Subcommand};
use ut_core::{
    CachedCredential, Config, ConfigCredentialProvider, ConfigManager, Endpoints, Error, Session,
};
use ut_http::HttpTransport;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod config;
mod fetch;
mod list;
mod push;

/// ut - UploadThing command-line client
///
/// Upload, download and manage files on UploadThing from your terminal.
/// Get an API key at https://uploadthing.com and store it with
/// `ut config set-secret`.
#[derive(Parser, Debug)]
#[command(name = "ut")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress display
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload one or more files
    Push(push::PushArgs),

    /// Download a file by its key
    Fetch(fetch::FetchArgs),

    /// List uploaded files
    List(list::ListArgs),

    /// Manage credentials and settings
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    // `defaults.output = "json"` in the config file acts like --json
    let json_default = ConfigManager::new()
        .and_then(|m| m.load())
        .map(|c| c.defaults.output == "json")
        .unwrap_or(false);

    let output_config = OutputConfig {
        json: cli.json || json_default,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Push(args) => push::execute(args, output_config).await,
        Commands::Fetch(args) => fetch::execute(args, output_config).await,
        Commands::List(args) => list::execute(args, output_config).await,
        Commands::Config(cmd) => config::execute(cmd, output_config),
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Build a session from the config file and the environment
///
/// The credential is not read here; it is loaded on the first call that
/// needs it, so public downloads work without one.
pub(crate) fn open_session() -> ut_core::Result<(Session, Config)> {
    let manager = ConfigManager::new()?;
    let config = manager.load()?;
    let endpoints = Endpoints::resolve(&config.endpoints);
    tracing::debug!(api = %endpoints.api_url, files = %endpoints.file_url, "endpoints resolved");

    let credential = CachedCredential::new(ConfigCredentialProvider::new(manager));
    let session = Session::new(HttpTransport::new()?, endpoints, credential);
    Ok((session, config))
}

/// Human-readable message for a failed operation
pub(crate) fn describe_error(error: &Error) -> String {
    match error {
        Error::ConfigurationMissing(_) => {
            "API key is not configured.\nRun 'ut config set-secret' to set it.".to_string()
        }
        Error::CredentialInvalid => {
            "Invalid API key. Run 'ut config set-secret' to update it.".to_string()
        }
        Error::RemoteApi { status, body } if body.is_empty() => {
            format!("API request failed: status {status}")
        }
        other => other.to_string(),
    }
}

/// Print an error and map it to an exit code
pub(crate) fn fail(formatter: &Formatter, error: &Error) -> ExitCode {
    formatter.error(&describe_error(error));
    ExitCode::from(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_missing_credential() {
        let msg = describe_error(&Error::ConfigurationMissing("api key not set".into()));
        assert!(msg.contains("not configured"));
        assert!(msg.contains("ut config set-secret"));
    }

    #[test]
    fn test_describe_invalid_credential() {
        let msg = describe_error(&Error::CredentialInvalid);
        assert_eq!(msg, "Invalid API key. Run 'ut config set-secret' to update it.");
    }

    #[test]
    fn test_describe_remote_error_keeps_body() {
        let msg = describe_error(&Error::RemoteApi {
            status: 500,
            body: "boom".into(),
        });
        assert!(msg.contains("500"));
        assert!(msg.contains("boom"));

        let msg = describe_error(&Error::RemoteApi {
            status: 502,
            body: String::new(),
        });
        assert_eq!(msg, "API request failed: status 502");
    }

    #[test]
    fn test_cli_parses_fetch_flags() {
        let cli = Cli::parse_from(["ut", "fetch", "abc-file.txt", "-o", "out/", "-f", "--private"]);
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.file_key, "abc-file.txt");
                assert_eq!(args.output, "out/");
                assert!(args.force);
                assert!(args.private);
                assert!(!args.progress);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_push_requires_files() {
        assert!(Cli::try_parse_from(["ut", "push"]).is_err());

        let cli = Cli::parse_from(["ut", "--quiet", "push", "a.txt", "b.txt"]);
        assert!(cli.quiet);
        match cli.command {
            Commands::Push(args) => assert_eq!(args.files.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ut", "list", "-v", "--json", "--debug"]);
        assert!(cli.json);
        assert!(cli.debug);
    }
}
