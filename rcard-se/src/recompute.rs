//! Recompute job runner
//!
//! Supervisor-triggered, idempotent re-aggregation over a round, fight, or
//! career scope. Each run gets a job id and records only actually-changed
//! rows; a failure in one round never disturbs another round's committed
//! score, because a fresh score is stored only after its own pipeline pass
//! completed.

use chrono::Utc;
use rcard_common::events::EngineEvent;
use sqlx::{Pool, Sqlite};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::db;
use crate::db::jobs::JobStatus;
use crate::error::Result;
use crate::scoring;
use crate::state::SharedState;

/// Target of a recompute run
#[derive(Debug, Clone)]
pub enum RecomputeScope {
    Round { bout_id: Uuid, round_number: u32 },
    Fight { bout_id: Uuid },
    /// All rounds of all bouts a fighter appears in; `None` recomputes
    /// every stored round
    Career { fighter: Option<String> },
}

impl fmt::Display for RecomputeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecomputeScope::Round {
                bout_id,
                round_number,
            } => write!(f, "round:{}:{}", bout_id, round_number),
            RecomputeScope::Fight { bout_id } => write!(f, "fight:{}", bout_id),
            RecomputeScope::Career { fighter: Some(name) } => write!(f, "career:{}", name),
            RecomputeScope::Career { fighter: None } => write!(f, "career:all"),
        }
    }
}

/// Outcome of a recompute run
#[derive(Debug, Clone)]
pub struct RecomputeReport {
    pub job_id: Uuid,
    pub succeeded: bool,
    pub rows_updated: u64,
    pub error: Option<String>,
}

/// Run a recompute over the given scope
///
/// Idempotent: with an unchanged event log a second run reports
/// `rows_updated = 0`. Per-round failures are collected, not propagated
/// mid-run, so already-committed scores elsewhere stay intact.
pub async fn run(
    db: &Pool<Sqlite>,
    shared: &Arc<SharedState>,
    scope: RecomputeScope,
) -> Result<RecomputeReport> {
    let job_id = Uuid::new_v4();
    let scope_str = scope.to_string();
    db::jobs::start_job(db, job_id, &scope_str).await?;

    let mut rows_updated = 0u64;
    let mut first_error: Option<String> = None;

    match collect_targets(db, &scope).await {
        Ok(targets) => {
            for (bout_id, round_number) in targets {
                match recompute_one(db, bout_id, round_number).await {
                    Ok(changed) => {
                        if changed {
                            rows_updated += 1;
                        }
                    }
                    Err(e) => {
                        error!(
                            "Recompute of bout {} round {} failed: {}",
                            bout_id, round_number, e
                        );
                        first_error.get_or_insert(e.to_string());
                    }
                }
            }
        }
        Err(e) => {
            first_error = Some(e.to_string());
        }
    }

    let succeeded = first_error.is_none();
    let status = if succeeded {
        JobStatus::Succeeded
    } else {
        JobStatus::Failed
    };
    db::jobs::finish_job(db, job_id, status, rows_updated, first_error.as_deref()).await?;

    info!(
        "Recompute job {} over {} finished: {} ({} rows updated)",
        job_id,
        scope_str,
        status.as_str(),
        rows_updated
    );
    shared.broadcast_event(EngineEvent::RecomputeFinished {
        job_id,
        scope: scope_str,
        succeeded,
        rows_updated,
        timestamp: Utc::now(),
    });

    Ok(RecomputeReport {
        job_id,
        succeeded,
        rows_updated,
        error: first_error,
    })
}

/// Expand a scope into its (bout, round) targets
async fn collect_targets(
    db: &Pool<Sqlite>,
    scope: &RecomputeScope,
) -> Result<Vec<(Uuid, u32)>> {
    match scope {
        RecomputeScope::Round {
            bout_id,
            round_number,
        } => {
            db::bouts::get_bout(db, *bout_id).await?;
            Ok(vec![(*bout_id, *round_number)])
        }
        RecomputeScope::Fight { bout_id } => {
            db::bouts::get_bout(db, *bout_id).await?;
            let rows = db::rounds::rounds_for_bout(db, *bout_id).await?;
            Ok(rows.iter().map(|r| (*bout_id, r.round_number)).collect())
        }
        RecomputeScope::Career { fighter } => {
            let bout_ids = db::bouts::bouts_for_fighter(db, fighter.as_deref()).await?;
            let mut targets = Vec::new();
            for bout_id in bout_ids {
                let rows = db::rounds::rounds_for_bout(db, bout_id).await?;
                targets.extend(rows.iter().map(|r| (bout_id, r.round_number)));
            }
            Ok(targets)
        }
    }
}

/// Recompute one round; returns whether the stored score changed
async fn recompute_one(db: &Pool<Sqlite>, bout_id: Uuid, round_number: u32) -> Result<bool> {
    db::rounds::ensure_round(db, bout_id, round_number).await?;
    let prior = db::rounds::get_round(db, bout_id, round_number)
        .await?
        .and_then(|row| row.score);

    let profile = db::profiles::active_profile(db).await?;
    let events = db::events::list_events(db, bout_id, round_number).await?;
    let fresh = scoring::score_events(bout_id, round_number, &events, &profile);

    let changed = match prior {
        Some(prior) => !prior.same_result(&fresh),
        None => true,
    };

    if changed {
        db::rounds::store_score(db, bout_id, round_number, &fresh).await?;
    }
    Ok(changed)
}
