//! Recompute job records
//!
//! Every recompute run gets a row with a terminal status and the count of
//! rounds whose stored score actually changed.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use super::bouts::{parse_timestamp, parse_uuid};

/// Terminal status of a recompute job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

/// Stored recompute job record
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub scope: String,
    pub status: String,
    pub rows_updated: u64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Record a job start
pub async fn start_job(db: &Pool<Sqlite>, job_id: Uuid, scope: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO recompute_jobs (job_id, scope, status, started_at) VALUES (?, ?, ?, ?)",
    )
    .bind(job_id.to_string())
    .bind(scope)
    .bind(JobStatus::Running.as_str())
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await?;
    Ok(())
}

/// Record a job's terminal status
pub async fn finish_job(
    db: &Pool<Sqlite>,
    job_id: Uuid,
    status: JobStatus,
    rows_updated: u64,
    error: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE recompute_jobs
        SET status = ?, rows_updated = ?, error = ?, finished_at = ?
        WHERE job_id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(rows_updated as i64)
    .bind(error)
    .bind(Utc::now().to_rfc3339())
    .bind(job_id.to_string())
    .execute(db)
    .await?;
    Ok(())
}

/// Load a job record by id
pub async fn get_job(db: &Pool<Sqlite>, job_id: Uuid) -> Result<JobRecord> {
    let row = sqlx::query(
        r#"
        SELECT job_id, scope, status, rows_updated, error, started_at, finished_at
        FROM recompute_jobs
        WHERE job_id = ?
        "#,
    )
    .bind(job_id.to_string())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Recompute job {}", job_id)))?;

    let finished_at = match row.get::<Option<String>, _>("finished_at") {
        Some(s) => Some(parse_timestamp(s)?),
        None => None,
    };

    Ok(JobRecord {
        job_id: parse_uuid(row.get::<String, _>("job_id"))?,
        scope: row.get("scope"),
        status: row.get("status"),
        rows_updated: row.get::<i64, _>("rows_updated") as u64,
        error: row.get("error"),
        started_at: parse_timestamp(row.get::<String, _>("started_at"))?,
        finished_at,
    })
}
