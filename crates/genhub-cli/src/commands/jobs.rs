//! Job inspection and management commands.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tabled::Tabled;

use genhub_core::error::AppError;
use genhub_core::types::{JobId, OwnerId};
use genhub_entity::job::{IMAGE_FUSION, IMAGE_GENERATION, Job, JobPayload, JobStatus};

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

/// Arguments for job commands
#[derive(Debug, Args)]
pub struct JobsArgs {
    /// Jobs subcommand
    #[command(subcommand)]
    pub command: JobsCommand,
}

/// Job subcommands
#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// Show counts by status
    Stats,
    /// List live jobs
    List {
        /// Only show jobs in this status
        #[arg(long)]
        status: Option<JobStatus>,
        /// Only show jobs created by this owner
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one job in full
    Get {
        /// Job ID
        id: JobId,
    },
    /// Remove a job from the store
    Remove {
        /// Job ID
        id: JobId,
    },
    /// Submit a job
    Submit {
        /// Job type, e.g. image_generation
        job_type: String,
        /// JSON payload
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },
}

/// The part of the admin listing the CLI shows.
#[derive(Debug, Clone, Deserialize)]
struct Listing {
    jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stats {
    queued: usize,
    running: usize,
    succeeded: usize,
    failed: usize,
    total: usize,
    owners: usize,
}

/// Table row for a job
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    job_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.to_string(),
            job_type: job.job_type.clone(),
            status: job.status.to_string(),
            progress: format!("{}%", job.progress),
            owner: job
                .owner
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            updated_at: format_time(job.updated_at),
        }
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Execute job commands
pub async fn execute(
    args: &JobsArgs,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        JobsCommand::Stats => {
            let stats: Stats = client.get("/admin/jobs/stats").await?;
            match format {
                OutputFormat::Json => output::print_json(&stats),
                OutputFormat::Table => {
                    println!("Job Store:");
                    output::print_kv("Queued", &stats.queued.to_string());
                    output::print_kv("Running", &stats.running.to_string());
                    output::print_kv("Succeeded", &stats.succeeded.to_string());
                    output::print_kv("Failed", &stats.failed.to_string());
                    output::print_kv("Total", &stats.total.to_string());
                    output::print_kv("Owners", &stats.owners.to_string());
                }
            }
        }
        JobsCommand::List { status, owner } => {
            let listing: Listing = client.get("/admin/jobs").await?;
            let owner = owner.as_deref().map(OwnerId::new);
            let rows: Vec<JobRow> = listing
                .jobs
                .iter()
                .filter(|job| status.is_none_or(|s| job.status == s))
                .filter(|job| owner.is_none() || job.owner == owner)
                .map(JobRow::from)
                .collect();
            output::print_list(&rows, format);
        }
        JobsCommand::Get { id } => {
            let listing: Listing = client.get("/admin/jobs").await?;
            let job = listing
                .jobs
                .into_iter()
                .find(|job| job.id == *id)
                .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;

            match format {
                OutputFormat::Json => output::print_json(&job),
                OutputFormat::Table => print_job(&job),
            }
        }
        JobsCommand::Remove { id } => {
            let _: Value = client.delete(&format!("/admin/jobs/{id}")).await?;
            output::print_success(&format!("Job {id} removed"));
        }
        JobsCommand::Submit { job_type, payload } => {
            let payload: Value = serde_json::from_str(payload)
                .map_err(|e| AppError::validation(format!("Invalid JSON payload: {e}")))?;
            let body = build_submission(job_type, payload)?;

            let data: Value = client.post("/jobs", &body).await?;
            match (format, data.get("job_id").and_then(Value::as_str)) {
                (OutputFormat::Table, Some(job_id)) => {
                    output::print_success(&format!("Job {job_id} queued"));
                }
                _ => output::print_json(&data),
            }
        }
    }

    Ok(())
}

/// Validate built-in job types locally before sending; pass others through.
fn build_submission(job_type: &str, payload: Value) -> Result<Value, AppError> {
    let body = json!({ "type": job_type, "payload": payload });
    match serde_json::from_value::<JobPayload>(body.clone()) {
        Ok(typed) => {
            typed
                .validate()
                .map_err(|e| AppError::validation(e.to_string()))?;
            Ok(serde_json::to_value(typed)?)
        }
        Err(e) if matches!(job_type, IMAGE_GENERATION | IMAGE_FUSION) => Err(AppError::validation(
            format!("Invalid {job_type} payload: {e}"),
        )),
        Err(_) => Ok(body),
    }
}

fn print_job(job: &Job) {
    println!("Job {}:", job.id);
    output::print_kv("Type", &job.job_type);
    output::print_kv("Status", job.status.as_str());
    output::print_kv("Progress", &format!("{}%", job.progress));
    output::print_kv(
        "Owner",
        job.owner.as_ref().map_or("-", |owner| owner.as_str()),
    );
    output::print_kv("Created", &format_time(job.created_at));
    output::print_kv("Updated", &format_time(job.updated_at));
    if let Some(error) = &job.error {
        output::print_kv("Error", error);
    }
    if let Some(result) = &job.result {
        println!("  Result:");
        output::print_json(result);
    }
}
