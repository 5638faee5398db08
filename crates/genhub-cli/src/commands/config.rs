//! Configuration inspection commands.

use clap::{Args, Subcommand};

use crate::output;
use genhub_core::config::AppConfig;
use genhub_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Environment overlay to merge over `config/default.toml`
    #[arg(short, long, env = "GENHUB_ENV", default_value = "development")]
    pub env: String,

    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration as JSON
    Show,
    /// Validate configuration and print the effective settings
    Validate,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = AppConfig::load(&args.env)?;
            config.upstream.api_key = mask_secret(&config.upstream.api_key);
            output::print_json(&config);
        }
        ConfigCommand::Validate => {
            let config = AppConfig::load(&args.env).map_err(|e| {
                AppError::configuration(format!("Configuration invalid: {}", e.message))
            })?;

            output::print_success(&format!("Configuration '{}' is valid", args.env));
            output::print_kv(
                "Server",
                &format!("{}:{}", config.server.host, config.server.port),
            );
            output::print_kv("Execution mode", &format!("{:?}", config.execution.mode));
            output::print_kv("Resolved mode", config.execution.resolve().as_str());
            output::print_kv(
                "Per-owner limit",
                &config.jobs.max_concurrent_per_owner.to_string(),
            );
            output::print_kv("Retention", &format!("{}s", config.jobs.retention_seconds));
            output::print_kv("Upstream", &config.upstream.base_url);
            output::print_kv("API key", &mask_secret(&config.upstream.api_key));
        }
    }

    Ok(())
}

/// Mask all but the last four characters of a secret
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(none)".to_string();
    }
    let visible: String = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{visible}")
}
