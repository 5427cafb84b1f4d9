//! Round lifecycle: OPEN -> LOCKED -> CONFIRMED with supervisor side edges
//!
//! The only contended resource in the engine is the lock transition.
//! Scoring itself is pure and may run anywhere; this module wraps it with
//! the per-round mutex + compare-and-swap sequence that guarantees a single
//! authoritative score per round, even with concurrent "end round" actions
//! and operator appends racing the close.

use chrono::Utc;
use rcard_common::events::EngineEvent;
use rcard_common::model::{FightResult, RoundCardSummary, RoundScore, RoundState, Winner};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::error::{Error, Result};
use crate::scoring;
use crate::state::SharedState;

/// Compute the round's score from the current event log and store it
///
/// Safe to call redundantly (polling, supervisor refresh); the stored
/// score is replaced wholesale each time.
pub async fn compute_and_store(
    db: &Pool<Sqlite>,
    shared: &Arc<SharedState>,
    bout_id: Uuid,
    round_number: u32,
) -> Result<RoundScore> {
    // Bout must exist; identity is always an explicit parameter
    db::bouts::get_bout(db, bout_id).await?;
    db::rounds::ensure_round(db, bout_id, round_number).await?;

    let profile = db::profiles::active_profile(db).await?;
    let events = db::events::list_events(db, bout_id, round_number).await?;
    let score = scoring::score_events(bout_id, round_number, &events, &profile);

    db::rounds::store_score(db, bout_id, round_number, &score).await?;

    shared.broadcast_event(EngineEvent::ScoreComputed {
        bout_id,
        round_number,
        card: score.card,
        winner: score.winner,
        delta: score.delta,
        timestamp: Utc::now(),
    });

    Ok(score)
}

/// Lock a round, making its score authoritative
///
/// Requires a score computed in the current open window. A stale snapshot
/// (events appended after the last compute) triggers one transparent
/// recompute and exactly one lock retry before failing with LockConflict.
/// Appends are rejected the moment the CAS lands; a straggler that slipped
/// in just before is folded in by a final recompute under the lock.
pub async fn lock_round(
    db: &Pool<Sqlite>,
    shared: &Arc<SharedState>,
    bout_id: Uuid,
    round_number: u32,
) -> Result<RoundScore> {
    db::bouts::get_bout(db, bout_id).await?;
    db::rounds::ensure_round(db, bout_id, round_number).await?;

    let round_mutex = shared.round_lock(bout_id, round_number).await;
    let _guard = round_mutex.lock().await;

    let mut attempts = 0;
    let score = loop {
        let row = db::rounds::get_round(db, bout_id, round_number)
            .await?
            .ok_or_else(|| Error::Internal("Round row vanished".to_string()))?;
        if !matches!(row.state, RoundState::Open | RoundState::ForceClosed) {
            return Err(Error::LockConflict(format!(
                "Round {} of bout {} is already {}",
                round_number, bout_id, row.state
            )));
        }

        let last = db::events::last_seq(db, bout_id, round_number).await?;
        let score = match row.score.filter(|s| s.event_seq == last) {
            Some(score) => score,
            None => compute_and_store(db, shared, bout_id, round_number).await?,
        };

        if db::rounds::try_lock(db, bout_id, round_number, score.event_seq).await? {
            break score;
        }

        attempts += 1;
        if attempts >= 2 {
            return Err(Error::LockConflict(format!(
                "Round {} of bout {} lost the lock to a concurrent writer",
                round_number, bout_id
            )));
        }
    };

    // A straggler append between snapshot and CAS is still pre-lock; fold
    // it in now that LOCKED blocks any further appends
    let final_seq = db::events::last_seq(db, bout_id, round_number).await?;
    let score = if final_seq != score.event_seq {
        info!(
            "Straggler events on bout {} round {} at lock time; recomputing {} -> {}",
            bout_id, round_number, score.event_seq, final_seq
        );
        let score = compute_and_store(db, shared, bout_id, round_number).await?;
        db::rounds::update_lock_seq(db, bout_id, round_number, score.event_seq).await?;
        score
    } else {
        score
    };

    info!(
        "Locked bout {} round {} at seq {} ({} to {:?})",
        bout_id, round_number, score.event_seq, score.card, score.winner
    );
    shared.broadcast_event(EngineEvent::RoundLocked {
        bout_id,
        round_number,
        lock_seq: score.event_seq,
        timestamp: Utc::now(),
    });

    Ok(score)
}

/// Supervisor force-close: OPEN -> FORCE_CLOSED, logged with actor and reason
///
/// Functionally identical to a normal close once locked; the round stops
/// accepting judge input and proceeds through the normal lock transition.
pub async fn force_close_round(
    db: &Pool<Sqlite>,
    shared: &Arc<SharedState>,
    bout_id: Uuid,
    round_number: u32,
    actor: &str,
    reason: &str,
) -> Result<()> {
    db::bouts::get_bout(db, bout_id).await?;
    db::rounds::ensure_round(db, bout_id, round_number).await?;

    if !db::rounds::try_force_close(db, bout_id, round_number, actor, reason).await? {
        let row = db::rounds::get_round(db, bout_id, round_number).await?;
        return Err(Error::InvalidState(format!(
            "Round {} of bout {} cannot be force-closed from {}",
            round_number,
            bout_id,
            row.map(|r| r.state.to_string())
                .unwrap_or_else(|| "missing".to_string())
        )));
    }

    warn!(
        "Round {} of bout {} force-closed by {}: {}",
        round_number, bout_id, actor, reason
    );
    shared.broadcast_event(EngineEvent::RoundForceClosed {
        bout_id,
        round_number,
        actor: actor.to_string(),
        reason: reason.to_string(),
        timestamp: Utc::now(),
    });

    Ok(())
}

/// Supervisor unlock: LOCKED -> OPEN, invalidating the stored score
pub async fn unlock_round(
    db: &Pool<Sqlite>,
    shared: &Arc<SharedState>,
    bout_id: Uuid,
    round_number: u32,
    actor: &str,
) -> Result<()> {
    if !db::rounds::try_unlock(db, bout_id, round_number).await? {
        return Err(Error::InvalidState(format!(
            "Round {} of bout {} is not locked",
            round_number, bout_id
        )));
    }

    info!(
        "Round {} of bout {} unlocked by {}; score invalidated",
        round_number, bout_id, actor
    );
    shared.broadcast_event(EngineEvent::RoundUnlocked {
        bout_id,
        round_number,
        actor: actor.to_string(),
        timestamp: Utc::now(),
    });

    Ok(())
}

/// Confirm a locked round's result: LOCKED -> CONFIRMED
pub async fn confirm_round(
    db: &Pool<Sqlite>,
    shared: &Arc<SharedState>,
    bout_id: Uuid,
    round_number: u32,
) -> Result<()> {
    if !db::rounds::try_confirm(db, bout_id, round_number).await? {
        return Err(Error::InvalidState(format!(
            "Round {} of bout {} is not locked",
            round_number, bout_id
        )));
    }

    // Confirmed rounds never transition again; drop their lock entry
    shared.release_round_lock(bout_id, round_number).await;

    info!("Round {} of bout {} confirmed", round_number, bout_id);
    shared.broadcast_event(EngineEvent::RoundConfirmed {
        bout_id,
        round_number,
        timestamp: Utc::now(),
    });

    Ok(())
}

/// Aggregate round winners into the fight result
///
/// Available only once every scheduled round is confirmed. Majority of
/// round cards decides; ties break on total weighted score, then an
/// explicit draw.
pub async fn fight_result(db: &Pool<Sqlite>, bout_id: Uuid) -> Result<FightResult> {
    let bout = db::bouts::get_bout(db, bout_id).await?;

    let mut rounds = Vec::with_capacity(bout.scheduled_rounds as usize);
    for round_number in 1..=bout.scheduled_rounds {
        let row = db::rounds::get_round(db, bout_id, round_number).await?;
        let row = row.filter(|r| r.state == RoundState::Confirmed).ok_or_else(|| {
            Error::InvalidState(format!(
                "Round {} of bout {} is not confirmed",
                round_number, bout_id
            ))
        })?;
        let score = row.score.ok_or_else(|| {
            Error::Internal(format!(
                "Confirmed round {} of bout {} has no stored score",
                round_number, bout_id
            ))
        })?;
        rounds.push(score);
    }

    let mut red_rounds = 0u32;
    let mut blue_rounds = 0u32;
    let mut final_red = 0u32;
    let mut final_blue = 0u32;
    let mut red_weighted_sum = 0.0;
    let mut blue_weighted_sum = 0.0;
    let mut summaries = Vec::with_capacity(rounds.len());

    for score in &rounds {
        let loser_points = score.card.loser_points();
        match score.winner {
            Winner::Red => {
                red_rounds += 1;
                final_red += 10;
                final_blue += loser_points;
            }
            Winner::Blue => {
                blue_rounds += 1;
                final_blue += 10;
                final_red += loser_points;
            }
            Winner::Draw => {
                final_red += 10;
                final_blue += 10;
            }
        }
        red_weighted_sum += score.red_weighted;
        blue_weighted_sum += score.blue_weighted;
        summaries.push(RoundCardSummary {
            round_number: score.round_number,
            card: score.card,
            winner: score.winner,
        });
    }

    let winner = if red_rounds > blue_rounds {
        Winner::Red
    } else if blue_rounds > red_rounds {
        Winner::Blue
    } else if red_weighted_sum > blue_weighted_sum {
        Winner::Red
    } else if blue_weighted_sum > red_weighted_sum {
        Winner::Blue
    } else {
        Winner::Draw
    };

    Ok(FightResult {
        bout_id,
        winner,
        final_red,
        final_blue,
        rounds: summaries,
    })
}
