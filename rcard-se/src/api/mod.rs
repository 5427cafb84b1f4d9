//! REST API for the scoring engine
//!
//! Exposes event ingestion, round computation/lifecycle, recompute jobs,
//! tuning profile access, and the SSE engine event stream. All identity and
//! context (bout, round, actor, requester) arrives as explicit request
//! parameters.

pub mod handlers;
pub mod sse;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use crate::error::Error;
use crate::state::SharedState;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub db_pool: Pool<Sqlite>,
    pub state: Arc<SharedState>,
}

/// Create the API router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))

        // Bout metadata
        .route("/bouts", post(handlers::create_bout))
        .route("/bouts/:bout_id", get(handlers::get_bout))
        .route("/bouts/:bout_id/result", get(handlers::get_fight_result))

        // Event ingestion and timeline
        .route(
            "/bouts/:bout_id/rounds/:round_number/events",
            post(handlers::ingest_event).get(handlers::get_events),
        )

        // Round scoring and lifecycle
        .route(
            "/bouts/:bout_id/rounds/:round_number/compute",
            post(handlers::compute_round),
        )
        .route(
            "/bouts/:bout_id/rounds/:round_number/score",
            get(handlers::get_round_score),
        )
        .route(
            "/bouts/:bout_id/rounds/:round_number/lock",
            post(handlers::lock_round),
        )
        .route(
            "/bouts/:bout_id/rounds/:round_number/force-close",
            post(handlers::force_close_round),
        )
        .route(
            "/bouts/:bout_id/rounds/:round_number/unlock",
            post(handlers::unlock_round),
        )
        .route(
            "/bouts/:bout_id/rounds/:round_number/confirm",
            post(handlers::confirm_round),
        )

        // Recompute jobs
        .route("/recompute", post(handlers::recompute))
        .route("/recompute/:job_id", get(handlers::get_recompute_job))

        // Tuning profiles
        .route("/profiles", post(handlers::create_profile))
        .route("/profiles/:name", get(handlers::get_profile))

        // SSE event stream
        .route("/events", get(sse::event_stream))

        .with_state(ctx)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::UnknownEventType(_) | Error::MalformedEvent(_) | Error::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::LockConflict(_) | Error::InvalidState(_) => StatusCode::CONFLICT,
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
