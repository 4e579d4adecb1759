//! Configuration commands
//!
//! Store the API key and app name, and show what is configured.

use anyhow::{bail, Context};
use clap::Subcommand;
use console::Term;
use serde::Serialize;
use ut_core::{mask_secret, ConfigManager};

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set the secret API key (prompted for when omitted)
    SetSecret(SetSecretArgs),

    /// Set the application name shown by `config show`
    SetAppName(SetAppNameArgs),

    /// Show the current configuration
    Show,

    /// Print the configuration file path
    Path,
}

/// Arguments for the `config set-secret` command
#[derive(clap::Args, Debug)]
pub struct SetSecretArgs {
    /// Secret key, e.g. sk_live_...; read from the terminal when omitted
    pub secret_key: Option<String>,
}

/// Arguments for the `config set-app-name` command
#[derive(clap::Args, Debug)]
pub struct SetAppNameArgs {
    pub name: String,
}

/// JSON output for `config show`
#[derive(Debug, Serialize)]
struct ConfigShowOutput {
    config_file: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
    api_url: String,
    file_url: String,
}

/// Execute a config subcommand
pub fn execute(cmd: ConfigCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let manager = match ConfigManager::new() {
        Ok(m) => m,
        Err(e) => return fail(&formatter, &e),
    };

    match cmd {
        ConfigCommands::SetSecret(args) => execute_set_secret(args, &manager, &formatter),
        ConfigCommands::SetAppName(args) => execute_set_app_name(args, &manager, &formatter),
        ConfigCommands::Show => execute_show(&manager, &formatter),
        ConfigCommands::Path => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({
                    "config_file": manager.config_path().display().to_string()
                }));
            } else {
                println!("{}", manager.config_path().display());
            }
            ExitCode::Success
        }
    }
}

fn execute_set_secret(args: SetSecretArgs, manager: &ConfigManager, formatter: &Formatter) -> ExitCode {
    let secret = match args.secret_key {
        Some(key) => key,
        None => match prompt_secret() {
            Ok(key) => key,
            Err(e) => {
                formatter.error(&format!("{e:#}"));
                return ExitCode::UsageError;
            }
        },
    };

    match manager.set_secret_key(&secret) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({
                    "success": true,
                    "secret_key": mask_secret(secret.trim()),
                }));
            } else {
                formatter.success("Secret key updated successfully!");
            }
            ExitCode::Success
        }
        Err(e) => fail(formatter, &e),
    }
}

fn execute_set_app_name(args: SetAppNameArgs, manager: &ConfigManager, formatter: &Formatter) -> ExitCode {
    match manager.set_app_name(&args.name) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&serde_json::json!({"success": true, "app_name": args.name.trim()}));
            } else {
                formatter.success(&format!("App name set to '{}'.", args.name.trim()));
            }
            ExitCode::Success
        }
        Err(e) => fail(formatter, &e),
    }
}

fn execute_show(manager: &ConfigManager, formatter: &Formatter) -> ExitCode {
    let config = match manager.load() {
        Ok(c) => c,
        Err(e) => return fail(formatter, &e),
    };
    let endpoints = ut_core::Endpoints::resolve(&config.endpoints);
    let secret = config
        .credentials
        .secret_key
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(mask_secret);

    if formatter.is_json() {
        formatter.json(&ConfigShowOutput {
            config_file: manager.config_path().display().to_string(),
            exists: manager.exists(),
            app_name: config.credentials.app_name.clone(),
            secret_key: secret,
            api_url: endpoints.api_url,
            file_url: endpoints.file_url,
        });
        return ExitCode::Success;
    }

    if !manager.exists() {
        formatter.println("No configuration file found.");
        formatter.println("Use 'ut config set-secret <key>' to set up your UploadThing secret key.");
        return ExitCode::Success;
    }

    formatter.println("Current Configuration:");
    formatter.println(&format!("  Config file: {}", manager.config_path().display()));
    if let Some(app_name) = &config.credentials.app_name {
        formatter.println(&format!("  App Name: {app_name}"));
    }
    match secret {
        Some(masked) => formatter.println(&format!("  Secret Key: {masked}")),
        None => formatter.println("  Secret Key: (not set)"),
    }
    formatter.println(&format!("  API URL: {}", endpoints.api_url));
    formatter.println(&format!("  File URL: {}", endpoints.file_url));

    ExitCode::Success
}

fn prompt_secret() -> anyhow::Result<String> {
    let term = Term::stderr();
    if !term.is_term() {
        bail!("no secret key given and no terminal to prompt on");
    }

    term.write_str("Enter your UploadThing secret key: ")
        .context("failed to write prompt")?;
    let secret = term
        .read_secure_line()
        .context("failed to read secret key")?;

    if secret.trim().is_empty() {
        bail!("secret key cannot be empty");
    }
    Ok(secret)
}
