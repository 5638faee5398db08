//! Server health command.

use serde::{Deserialize, Serialize};

use genhub_core::error::AppError;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Debug, Serialize, Deserialize)]
struct Health {
    status: String,
    version: String,
    mode: String,
    job_types: Vec<String>,
    uptime_seconds: i64,
}

/// Execute the health command
pub async fn execute(client: &ApiClient, format: OutputFormat) -> Result<(), AppError> {
    let health: Health = client.get("/health").await?;

    match format {
        OutputFormat::Json => output::print_json(&health),
        OutputFormat::Table => {
            output::print_success(&format!("Server is {}", health.status));
            output::print_kv("Version", &health.version);
            output::print_kv("Mode", &health.mode);
            output::print_kv("Job types", &health.job_types.join(", "));
            output::print_kv("Uptime", &format!("{}s", health.uptime_seconds));
        }
    }
    Ok(())
}
