//! HTTP request handlers
//!
//! Request/response types and the handlers for bout setup, event ingestion,
//! round scoring/lifecycle, recompute, and tuning profile access.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use rcard_common::model::{
    Bout, Corner, EventSource, FightResult, RawEvent, RoundScore, RoundState,
};
use rcard_common::profile::{ProfileView, TuningProfile};

use crate::api::AppContext;
use crate::db;
use crate::error::{Error, Result};
use crate::lifecycle;
use crate::recompute::{self, RecomputeScope};
use crate::scoring::normalize;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoutRequest {
    pub red_fighter: String,
    pub blue_fighter: String,
    /// Defaults to the `default_scheduled_rounds` setting when omitted
    pub scheduled_rounds: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct IngestEventRequest {
    pub corner: Corner,
    pub event_type: String,
    pub tier: Option<String>,
    pub position: Option<String>,
    pub seconds: Option<f64>,
    pub confidence: Option<f64>,
    pub source: EventSource,
    /// Defaults to receipt time when omitted
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestEventResponse {
    pub status: String,
    pub seq: i64,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Serialize)]
pub struct RoundScoreResponse {
    pub state: RoundState,
    /// True only when the round is LOCKED or CONFIRMED
    pub authoritative: bool,
    pub score: Option<RoundScore>,
}

#[derive(Debug, Deserialize)]
pub struct ForceCloseRequest {
    pub actor: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub actor: String,
}

#[derive(Debug, Deserialize)]
pub struct RecomputeRequest {
    /// One of "round", "fight", "career"
    pub scope: String,
    pub bout_id: Option<Uuid>,
    pub round_number: Option<u32>,
    pub fighter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecomputeResponse {
    pub job_id: Uuid,
    pub status: String,
    pub rows_updated: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub profile: TuningProfile,
}

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    /// Requesting identity; raw coefficients are owner-gated
    pub requester: Option<String>,
}

// ============================================================================
// Health
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "scoring_engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Bouts
// ============================================================================

/// POST /bouts - Register bout metadata
pub async fn create_bout(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateBoutRequest>,
) -> Result<Json<Bout>> {
    let scheduled_rounds = match req.scheduled_rounds {
        Some(n) if n >= 1 => n,
        Some(n) => {
            return Err(Error::BadRequest(format!(
                "scheduled_rounds must be at least 1, got {}",
                n
            )))
        }
        None => db::settings::get_setting::<u32>(&ctx.db_pool, "default_scheduled_rounds")
            .await?
            .unwrap_or(3),
    };

    let bout = Bout {
        bout_id: Uuid::new_v4(),
        red_fighter: req.red_fighter,
        blue_fighter: req.blue_fighter,
        scheduled_rounds,
        created_at: Utc::now(),
    };
    db::bouts::insert_bout(&ctx.db_pool, &bout).await?;
    info!(
        "Registered bout {}: {} vs {} ({} rounds)",
        bout.bout_id, bout.red_fighter, bout.blue_fighter, bout.scheduled_rounds
    );
    Ok(Json(bout))
}

/// GET /bouts/:bout_id - Bout metadata
pub async fn get_bout(
    State(ctx): State<AppContext>,
    Path(bout_id): Path<Uuid>,
) -> Result<Json<Bout>> {
    Ok(Json(db::bouts::get_bout(&ctx.db_pool, bout_id).await?))
}

/// GET /bouts/:bout_id/result - Aggregated fight result
pub async fn get_fight_result(
    State(ctx): State<AppContext>,
    Path(bout_id): Path<Uuid>,
) -> Result<Json<FightResult>> {
    Ok(Json(lifecycle::fight_result(&ctx.db_pool, bout_id).await?))
}

// ============================================================================
// Event ingestion
// ============================================================================

/// POST /bouts/:bout_id/rounds/:round_number/events - Ingest one raw event
///
/// Unknown event types and malformed payloads are rejected here, at the
/// normalizer boundary; nothing reaches the log half-parsed.
pub async fn ingest_event(
    State(ctx): State<AppContext>,
    Path((bout_id, round_number)): Path<(Uuid, u32)>,
    Json(req): Json<IngestEventRequest>,
) -> Result<Json<IngestEventResponse>> {
    db::bouts::get_bout(&ctx.db_pool, bout_id).await?;

    let parsed = normalize::parse_kind(
        &req.event_type,
        req.tier.as_deref(),
        req.position.as_deref(),
        req.seconds,
    )?;
    normalize::validate_confidence(req.source, req.confidence)?;

    let mut metadata = json!({});
    if parsed.tier_defaulted {
        metadata["tier_defaulted"] = json!(true);
    }
    if let Some(note) = req.note {
        metadata["note"] = json!(note);
    }

    let appended = db::events::append(
        &ctx.db_pool,
        db::events::NewEvent {
            bout_id,
            round_number,
            corner: req.corner,
            kind: parsed.kind,
            confidence: req.confidence,
            source: req.source,
            occurred_at: req.occurred_at.unwrap_or_else(Utc::now),
            metadata,
        },
    )
    .await?;

    ctx.state
        .broadcast_event(rcard_common::events::EngineEvent::EventAppended {
            bout_id,
            round_number,
            seq: appended.seq,
            event_type: appended.kind.type_name().to_string(),
            timestamp: Utc::now(),
        });

    Ok(Json(IngestEventResponse {
        status: "appended".to_string(),
        seq: appended.seq,
    }))
}

/// GET /bouts/:bout_id/rounds/:round_number/events - Ordered timeline
pub async fn get_events(
    State(ctx): State<AppContext>,
    Path((bout_id, round_number)): Path<(Uuid, u32)>,
) -> Result<Json<EventsResponse>> {
    db::bouts::get_bout(&ctx.db_pool, bout_id).await?;
    let events = db::events::list_events(&ctx.db_pool, bout_id, round_number).await?;
    Ok(Json(EventsResponse { events }))
}

// ============================================================================
// Round scoring and lifecycle
// ============================================================================

/// POST /bouts/:bout_id/rounds/:round_number/compute - Run the pipeline
pub async fn compute_round(
    State(ctx): State<AppContext>,
    Path((bout_id, round_number)): Path<(Uuid, u32)>,
) -> Result<Json<RoundScore>> {
    let score =
        lifecycle::compute_and_store(&ctx.db_pool, &ctx.state, bout_id, round_number).await?;
    Ok(Json(score))
}

/// GET /bouts/:bout_id/rounds/:round_number/score - Stored score
pub async fn get_round_score(
    State(ctx): State<AppContext>,
    Path((bout_id, round_number)): Path<(Uuid, u32)>,
) -> Result<Json<RoundScoreResponse>> {
    db::bouts::get_bout(&ctx.db_pool, bout_id).await?;
    let row = db::rounds::get_round(&ctx.db_pool, bout_id, round_number)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("Round {} of bout {}", round_number, bout_id))
        })?;

    let authoritative = matches!(row.state, RoundState::Locked | RoundState::Confirmed);
    Ok(Json(RoundScoreResponse {
        state: row.state,
        authoritative,
        score: row.score,
    }))
}

/// POST /bouts/:bout_id/rounds/:round_number/lock - End the round
pub async fn lock_round(
    State(ctx): State<AppContext>,
    Path((bout_id, round_number)): Path<(Uuid, u32)>,
) -> Result<Json<RoundScore>> {
    let score = lifecycle::lock_round(&ctx.db_pool, &ctx.state, bout_id, round_number).await?;
    Ok(Json(score))
}

/// POST /bouts/:bout_id/rounds/:round_number/force-close - Supervisor close
pub async fn force_close_round(
    State(ctx): State<AppContext>,
    Path((bout_id, round_number)): Path<(Uuid, u32)>,
    Json(req): Json<ForceCloseRequest>,
) -> Result<Json<StatusResponse>> {
    lifecycle::force_close_round(
        &ctx.db_pool,
        &ctx.state,
        bout_id,
        round_number,
        &req.actor,
        &req.reason,
    )
    .await?;
    Ok(Json(StatusResponse {
        status: "force_closed".to_string(),
    }))
}

/// POST /bouts/:bout_id/rounds/:round_number/unlock - Supervisor unlock
pub async fn unlock_round(
    State(ctx): State<AppContext>,
    Path((bout_id, round_number)): Path<(Uuid, u32)>,
    Json(req): Json<UnlockRequest>,
) -> Result<Json<StatusResponse>> {
    lifecycle::unlock_round(&ctx.db_pool, &ctx.state, bout_id, round_number, &req.actor).await?;
    Ok(Json(StatusResponse {
        status: "unlocked".to_string(),
    }))
}

/// POST /bouts/:bout_id/rounds/:round_number/confirm - Confirm the result
pub async fn confirm_round(
    State(ctx): State<AppContext>,
    Path((bout_id, round_number)): Path<(Uuid, u32)>,
) -> Result<Json<StatusResponse>> {
    lifecycle::confirm_round(&ctx.db_pool, &ctx.state, bout_id, round_number).await?;
    Ok(Json(StatusResponse {
        status: "confirmed".to_string(),
    }))
}

// ============================================================================
// Recompute
// ============================================================================

/// POST /recompute - Run an idempotent recompute over a scope
pub async fn recompute(
    State(ctx): State<AppContext>,
    Json(req): Json<RecomputeRequest>,
) -> Result<Json<RecomputeResponse>> {
    let scope = match req.scope.as_str() {
        "round" => RecomputeScope::Round {
            bout_id: req
                .bout_id
                .ok_or_else(|| Error::BadRequest("round scope requires bout_id".to_string()))?,
            round_number: req.round_number.ok_or_else(|| {
                Error::BadRequest("round scope requires round_number".to_string())
            })?,
        },
        "fight" => RecomputeScope::Fight {
            bout_id: req
                .bout_id
                .ok_or_else(|| Error::BadRequest("fight scope requires bout_id".to_string()))?,
        },
        "career" => RecomputeScope::Career {
            fighter: req.fighter,
        },
        other => {
            return Err(Error::BadRequest(format!(
                "Unknown recompute scope: {}",
                other
            )))
        }
    };

    let report = recompute::run(&ctx.db_pool, &ctx.state, scope).await?;
    Ok(Json(RecomputeResponse {
        job_id: report.job_id,
        status: if report.succeeded {
            "succeeded".to_string()
        } else {
            "failed".to_string()
        },
        rows_updated: report.rows_updated,
        error: report.error,
    }))
}

/// GET /recompute/:job_id - Job record lookup
pub async fn get_recompute_job(
    State(ctx): State<AppContext>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<RecomputeResponse>> {
    let record = db::jobs::get_job(&ctx.db_pool, job_id).await?;
    Ok(Json(RecomputeResponse {
        job_id: record.job_id,
        status: record.status,
        rows_updated: record.rows_updated,
        error: record.error,
    }))
}

// ============================================================================
// Tuning profiles
// ============================================================================

/// POST /profiles - Create a tuning profile
pub async fn create_profile(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<Json<ProfileView>> {
    let profile = req.profile;
    if profile.name.is_empty() || profile.owner.is_empty() {
        return Err(Error::BadRequest(
            "Profile name and owner are required".to_string(),
        ));
    }
    db::profiles::insert_profile(&ctx.db_pool, &profile).await?;
    info!("Created tuning profile '{}' owned by {}", profile.name, profile.owner);
    let owner = profile.owner.clone();
    Ok(Json(profile.view(&owner)))
}

/// GET /profiles/:name - Ownership-gated profile read
///
/// Non-owners get the redacted view (name + owner, no coefficients); this
/// is an authorization outcome, not a scoring failure.
pub async fn get_profile(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ProfileView>> {
    let profile = db::profiles::get_profile(&ctx.db_pool, &name).await?;
    let requester = query.requester.unwrap_or_default();
    Ok(Json(profile.view(&requester)))
}
