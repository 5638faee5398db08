//! CLI command definitions and dispatch.

pub mod config;
pub mod health;
pub mod jobs;

use clap::{Parser, Subcommand};

use crate::client::ApiClient;
use crate::output::OutputFormat;
use genhub_core::error::AppError;

/// GenHub: image job orchestration admin tool
#[derive(Debug, Parser)]
#[command(name = "genhub", version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the GenHub server
    #[arg(
        short,
        long,
        env = "GENHUB_SERVER",
        default_value = "http://localhost:8080"
    )]
    pub server: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect and manage jobs
    Jobs(jobs::JobsArgs),
    /// Check server health
    Health,
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Jobs(args) => jobs::execute(args, &self.client()?, self.format).await,
            Commands::Health => health::execute(&self.client()?, self.format).await,
            Commands::Config(args) => config::execute(args),
        }
    }

    fn client(&self) -> Result<ApiClient, AppError> {
        ApiClient::new(&self.server)
    }
}
