//! Round lifecycle and recompute integration tests
//!
//! Exercises the full append -> compute -> lock -> confirm flow against an
//! in-memory database, including the stale-snapshot recovery path, the
//! concurrent-lock race, and recompute idempotency.

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use uuid::Uuid;

use rcard_common::model::{
    Bout, Card, Corner, EventKind, EventSource, RoundState, SeverityTier, Winner,
};
use rcard_se::db;
use rcard_se::error::Error;
use rcard_se::lifecycle;
use rcard_se::recompute::{self, RecomputeScope};
use rcard_se::state::SharedState;

async fn test_pool() -> Pool<Sqlite> {
    // Single connection so every handle sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init::init_database(&pool).await.unwrap();
    pool
}

async fn test_bout(pool: &Pool<Sqlite>, scheduled_rounds: u32) -> Uuid {
    let bout = Bout {
        bout_id: Uuid::new_v4(),
        red_fighter: "Amanda Reyes".to_string(),
        blue_fighter: "Keiko Tanaka".to_string(),
        scheduled_rounds,
        created_at: Utc::now(),
    };
    db::bouts::insert_bout(pool, &bout).await.unwrap();
    bout.bout_id
}

async fn append(
    pool: &Pool<Sqlite>,
    bout_id: Uuid,
    round_number: u32,
    corner: Corner,
    kind: EventKind,
) {
    db::events::append(
        pool,
        db::events::NewEvent {
            bout_id,
            round_number,
            corner,
            kind,
            confidence: None,
            source: EventSource::Manual,
            occurred_at: Utc::now(),
            metadata: serde_json::Value::Null,
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn append_compute_lock_confirm_flow() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(
        &pool,
        bout_id,
        1,
        Corner::Red,
        EventKind::Knockdown {
            tier: Some(SeverityTier::Hard),
        },
    )
    .await;
    append(&pool, bout_id, 1, Corner::Blue, EventKind::SignificantStrike).await;

    let score = lifecycle::compute_and_store(&pool, &shared, bout_id, 1)
        .await
        .unwrap();
    assert_eq!(score.winner, Winner::Red);
    assert_eq!(score.event_seq, 2);

    let locked = lifecycle::lock_round(&pool, &shared, bout_id, 1).await.unwrap();
    assert_eq!(locked.event_seq, 2);

    let row = db::rounds::get_round(&pool, bout_id, 1).await.unwrap().unwrap();
    assert_eq!(row.state, RoundState::Locked);
    assert_eq!(row.lock_seq, Some(2));

    lifecycle::confirm_round(&pool, &shared, bout_id, 1).await.unwrap();
    let row = db::rounds::get_round(&pool, bout_id, 1).await.unwrap().unwrap();
    assert_eq!(row.state, RoundState::Confirmed);
}

#[tokio::test]
async fn confirm_releases_the_round_lock_entry() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 1).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::SignificantStrike).await;
    let before = shared.round_lock(bout_id, 1).await;
    lifecycle::lock_round(&pool, &shared, bout_id, 1).await.unwrap();
    lifecycle::confirm_round(&pool, &shared, bout_id, 1).await.unwrap();

    // The registry entry is dropped with the confirmed round, so asking
    // again hands out a fresh mutex rather than the retained one
    let after = shared.round_lock(bout_id, 1).await;
    assert!(!Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn lock_recomputes_a_stale_snapshot_transparently() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::SignificantStrike).await;
    lifecycle::compute_and_store(&pool, &shared, bout_id, 1)
        .await
        .unwrap();

    // Event lands after the compute; the stored score is now stale
    append(&pool, bout_id, 1, Corner::Blue, EventKind::Takedown).await;

    let locked = lifecycle::lock_round(&pool, &shared, bout_id, 1).await.unwrap();
    assert_eq!(locked.event_seq, 2);
    assert_eq!(locked.blue_totals.control, 4.0);
}

#[tokio::test]
async fn lock_without_a_prior_compute_scores_the_round() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::Takedown).await;

    let locked = lifecycle::lock_round(&pool, &shared, bout_id, 1).await.unwrap();
    assert_eq!(locked.event_seq, 1);
    assert_eq!(locked.red_totals.control, 4.0);
}

#[tokio::test]
async fn concurrent_lock_yields_one_winner_and_one_conflict() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::SignificantStrike).await;

    let (a, b) = tokio::join!(
        lifecycle::lock_round(&pool, &shared, bout_id, 1),
        lifecycle::lock_round(&pool, &shared, bout_id, 1),
    );

    let outcomes = [a, b];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(Error::LockConflict(_))))
        .count();
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);

    let row = db::rounds::get_round(&pool, bout_id, 1).await.unwrap().unwrap();
    assert_eq!(row.state, RoundState::Locked);
}

#[tokio::test]
async fn appends_are_rejected_once_locked() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::SignificantStrike).await;
    lifecycle::lock_round(&pool, &shared, bout_id, 1).await.unwrap();

    let result = db::events::append(
        &pool,
        db::events::NewEvent {
            bout_id,
            round_number: 1,
            corner: Corner::Blue,
            kind: EventKind::SignificantStrike,
            confidence: None,
            source: EventSource::Manual,
            occurred_at: Utc::now(),
            metadata: serde_json::Value::Null,
        },
    )
    .await;
    assert!(matches!(result, Err(Error::InvalidState(_))));

    // The locked score is untouched
    let row = db::rounds::get_round(&pool, bout_id, 1).await.unwrap().unwrap();
    assert_eq!(row.score.unwrap().event_seq, 1);
}

#[tokio::test]
async fn force_close_stops_appends_then_locks_normally() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::Takedown).await;
    lifecycle::force_close_round(&pool, &shared, bout_id, 1, "supervisor-1", "ringside stoppage")
        .await
        .unwrap();

    let row = db::rounds::get_round(&pool, bout_id, 1).await.unwrap().unwrap();
    assert_eq!(row.state, RoundState::ForceClosed);
    assert_eq!(row.closed_by.as_deref(), Some("supervisor-1"));

    let result = db::events::append(
        &pool,
        db::events::NewEvent {
            bout_id,
            round_number: 1,
            corner: Corner::Red,
            kind: EventKind::Strike,
            confidence: None,
            source: EventSource::Manual,
            occurred_at: Utc::now(),
            metadata: serde_json::Value::Null,
        },
    )
    .await;
    assert!(matches!(result, Err(Error::InvalidState(_))));

    // Force-closed rounds proceed through the normal lock transition
    let locked = lifecycle::lock_round(&pool, &shared, bout_id, 1).await.unwrap();
    assert_eq!(locked.event_seq, 1);

    // Force-close only applies to OPEN rounds
    let err = lifecycle::force_close_round(&pool, &shared, bout_id, 1, "supervisor-1", "again")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn unlock_invalidates_the_score_and_reopens_appends() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::SignificantStrike).await;
    lifecycle::lock_round(&pool, &shared, bout_id, 1).await.unwrap();

    lifecycle::unlock_round(&pool, &shared, bout_id, 1, "supervisor-1")
        .await
        .unwrap();

    let row = db::rounds::get_round(&pool, bout_id, 1).await.unwrap().unwrap();
    assert_eq!(row.state, RoundState::Open);
    assert!(row.score.is_none());
    assert!(row.lock_seq.is_none());

    // A corrected event log re-locks at the new sequence
    append(&pool, bout_id, 1, Corner::Blue, EventKind::Takedown).await;
    let relocked = lifecycle::lock_round(&pool, &shared, bout_id, 1).await.unwrap();
    assert_eq!(relocked.event_seq, 2);

    // Unlock requires LOCKED
    lifecycle::confirm_round(&pool, &shared, bout_id, 1).await.unwrap();
    let err = lifecycle::unlock_round(&pool, &shared, bout_id, 1, "supervisor-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn fight_result_requires_every_round_confirmed() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 2).await;

    for round in 1..=2 {
        append(&pool, bout_id, round, Corner::Red, EventKind::SignificantStrike).await;
        lifecycle::lock_round(&pool, &shared, bout_id, round).await.unwrap();
    }
    lifecycle::confirm_round(&pool, &shared, bout_id, 1).await.unwrap();

    // Round 2 still LOCKED
    let err = lifecycle::fight_result(&pool, bout_id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    lifecycle::confirm_round(&pool, &shared, bout_id, 2).await.unwrap();
    let result = lifecycle::fight_result(&pool, bout_id).await.unwrap();
    assert_eq!(result.winner, Winner::Red);
    assert_eq!(result.rounds.len(), 2);
}

#[tokio::test]
async fn fight_result_majority_and_card_totals() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    // Round 1: red shutout KD round (primacy -> 10-8)
    append(
        &pool,
        bout_id,
        1,
        Corner::Red,
        EventKind::Knockdown {
            tier: Some(SeverityTier::NearFinish),
        },
    )
    .await;
    // Rounds 2 and 3: blue edges them on strikes, no primacy
    for round in 2..=3 {
        for _ in 0..10 {
            append(&pool, bout_id, round, Corner::Blue, EventKind::SignificantStrike).await;
        }
        for _ in 0..3 {
            append(&pool, bout_id, round, Corner::Red, EventKind::SignificantStrike).await;
        }
    }

    for round in 1..=3 {
        lifecycle::lock_round(&pool, &shared, bout_id, round).await.unwrap();
        lifecycle::confirm_round(&pool, &shared, bout_id, round).await.unwrap();
    }

    let result = lifecycle::fight_result(&pool, bout_id).await.unwrap();
    assert_eq!(result.winner, Winner::Blue);
    assert_eq!(result.rounds[0].card, Card::TenEight);
    assert_eq!(result.rounds[1].card, Card::TenNine);
    assert_eq!(result.rounds[1].winner, Winner::Blue);
    // 8 + 10 + 10 vs 10 + 9 + 9
    assert_eq!(result.final_blue, 28);
    assert_eq!(result.final_red, 28);
}

#[tokio::test]
async fn recompute_round_is_idempotent() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::SignificantStrike).await;

    let first = recompute::run(
        &pool,
        &shared,
        RecomputeScope::Round {
            bout_id,
            round_number: 1,
        },
    )
    .await
    .unwrap();
    assert!(first.succeeded);
    assert_eq!(first.rows_updated, 1);

    // Unchanged event log: nothing to update
    let second = recompute::run(
        &pool,
        &shared,
        RecomputeScope::Round {
            bout_id,
            round_number: 1,
        },
    )
    .await
    .unwrap();
    assert!(second.succeeded);
    assert_eq!(second.rows_updated, 0);

    let job = db::jobs::get_job(&pool, second.job_id).await.unwrap();
    assert_eq!(job.status, "succeeded");
    assert_eq!(job.rows_updated, 0);
}

#[tokio::test]
async fn recompute_fight_counts_only_changed_rounds() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());
    let bout_id = test_bout(&pool, 3).await;

    append(&pool, bout_id, 1, Corner::Red, EventKind::SignificantStrike).await;
    append(&pool, bout_id, 2, Corner::Blue, EventKind::Takedown).await;
    // Round 1 already has a current score; round 2 does not
    lifecycle::compute_and_store(&pool, &shared, bout_id, 1)
        .await
        .unwrap();

    let report = recompute::run(&pool, &shared, RecomputeScope::Fight { bout_id })
        .await
        .unwrap();
    assert!(report.succeeded);
    assert_eq!(report.rows_updated, 1);
}

#[tokio::test]
async fn recompute_career_covers_all_bouts_for_a_fighter() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());

    let bout_a = test_bout(&pool, 3).await;
    let bout_b = test_bout(&pool, 3).await;
    append(&pool, bout_a, 1, Corner::Red, EventKind::SignificantStrike).await;
    append(&pool, bout_b, 2, Corner::Blue, EventKind::Takedown).await;

    let report = recompute::run(
        &pool,
        &shared,
        RecomputeScope::Career {
            fighter: Some("Amanda Reyes".to_string()),
        },
    )
    .await
    .unwrap();
    assert!(report.succeeded);
    assert_eq!(report.rows_updated, 2);
}

#[tokio::test]
async fn recompute_of_an_unknown_bout_fails_with_a_recorded_job() {
    let pool = test_pool().await;
    let shared = Arc::new(SharedState::new());

    let report = recompute::run(
        &pool,
        &shared,
        RecomputeScope::Fight {
            bout_id: Uuid::new_v4(),
        },
    )
    .await
    .unwrap();
    assert!(!report.succeeded);
    assert_eq!(report.rows_updated, 0);
    assert!(report.error.is_some());

    let job = db::jobs::get_job(&pool, report.job_id).await.unwrap();
    assert_eq!(job.status, "failed");
}
