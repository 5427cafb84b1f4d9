//! Round state and score storage
//!
//! One row per (bout, round) holding the lifecycle state, the lock
//! sequence snapshot, and the serialized RoundScore. State transitions are
//! compare-and-swap UPDATEs guarded on the current state so exactly one of
//! two concurrent writers can win a transition.

use crate::error::{Error, Result};
use chrono::Utc;
use rcard_common::model::{RoundScore, RoundState};
use sqlx::{Pool, Row, Sqlite, Transaction};
use uuid::Uuid;

/// Stored lifecycle row for one round
#[derive(Debug, Clone)]
pub struct RoundRow {
    pub bout_id: Uuid,
    pub round_number: u32,
    pub state: RoundState,
    /// Event sequence snapshot recorded at lock time
    pub lock_seq: Option<i64>,
    pub score: Option<RoundScore>,
    pub closed_by: Option<String>,
    pub close_reason: Option<String>,
}

/// Create the round row in OPEN state if it does not exist
pub async fn ensure_round(db: &Pool<Sqlite>, bout_id: Uuid, round_number: u32) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO rounds (bout_id, round_number, state, updated_at)
        VALUES (?, ?, 'OPEN', ?)
        "#,
    )
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(db)
    .await?;
    Ok(())
}

/// Transaction-scoped variant of [`ensure_round`], used by the event store
pub(crate) async fn ensure_round_tx(
    tx: &mut Transaction<'_, Sqlite>,
    bout_id: Uuid,
    round_number: u32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO rounds (bout_id, round_number, state, updated_at)
        VALUES (?, ?, 'OPEN', ?)
        "#,
    )
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Load a round row, if present
pub async fn get_round(
    db: &Pool<Sqlite>,
    bout_id: Uuid,
    round_number: u32,
) -> Result<Option<RoundRow>> {
    let row = sqlx::query(
        r#"
        SELECT state, lock_seq, score, closed_by, close_reason
        FROM rounds
        WHERE bout_id = ? AND round_number = ?
        "#,
    )
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .fetch_optional(db)
    .await?;

    match row {
        Some(row) => {
            let score = match row.get::<Option<String>, _>("score") {
                Some(json) => Some(
                    serde_json::from_str(&json)
                        .map_err(|e| Error::Internal(format!("Corrupt stored score: {}", e)))?,
                ),
                None => None,
            };
            Ok(Some(RoundRow {
                bout_id,
                round_number,
                state: row.get::<String, _>("state").parse()?,
                lock_seq: row.get("lock_seq"),
                score,
                closed_by: row.get("closed_by"),
                close_reason: row.get("close_reason"),
            }))
        }
        None => Ok(None),
    }
}

/// Replace the stored score for a round
///
/// The score is written wholesale; individual fields are never edited.
pub async fn store_score(
    db: &Pool<Sqlite>,
    bout_id: Uuid,
    round_number: u32,
    score: &RoundScore,
) -> Result<()> {
    let json = serde_json::to_string(score)
        .map_err(|e| Error::Internal(format!("Failed to serialize score: {}", e)))?;

    sqlx::query(
        "UPDATE rounds SET score = ?, updated_at = ? WHERE bout_id = ? AND round_number = ?",
    )
    .bind(json)
    .bind(Utc::now().to_rfc3339())
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .execute(db)
    .await?;

    Ok(())
}

/// Compare-and-swap lock transition: OPEN or FORCE_CLOSED -> LOCKED
///
/// Records the event sequence snapshot the locked score was computed from.
/// Returns false when a concurrent writer already moved the state.
pub async fn try_lock(
    db: &Pool<Sqlite>,
    bout_id: Uuid,
    round_number: u32,
    lock_seq: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE rounds
        SET state = 'LOCKED', lock_seq = ?, updated_at = ?
        WHERE bout_id = ? AND round_number = ? AND state IN ('OPEN', 'FORCE_CLOSED')
        "#,
    )
    .bind(lock_seq)
    .bind(Utc::now().to_rfc3339())
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Refresh the lock sequence of an already-locked round
///
/// Used when a straggler append landed between the snapshot and the lock
/// CAS; the round is re-scored against the final log while LOCKED blocks
/// any further appends.
pub async fn update_lock_seq(
    db: &Pool<Sqlite>,
    bout_id: Uuid,
    round_number: u32,
    lock_seq: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE rounds
        SET lock_seq = ?, updated_at = ?
        WHERE bout_id = ? AND round_number = ? AND state = 'LOCKED'
        "#,
    )
    .bind(lock_seq)
    .bind(Utc::now().to_rfc3339())
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Compare-and-swap force-close: OPEN -> FORCE_CLOSED, recording actor and reason
pub async fn try_force_close(
    db: &Pool<Sqlite>,
    bout_id: Uuid,
    round_number: u32,
    actor: &str,
    reason: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE rounds
        SET state = 'FORCE_CLOSED', closed_by = ?, close_reason = ?, updated_at = ?
        WHERE bout_id = ? AND round_number = ? AND state = 'OPEN'
        "#,
    )
    .bind(actor)
    .bind(reason)
    .bind(Utc::now().to_rfc3339())
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Compare-and-swap unlock: LOCKED -> OPEN
///
/// Invalidates the stored score; a fresh compute is required before the
/// round can be locked again.
pub async fn try_unlock(db: &Pool<Sqlite>, bout_id: Uuid, round_number: u32) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE rounds
        SET state = 'OPEN', lock_seq = NULL, score = NULL, updated_at = ?
        WHERE bout_id = ? AND round_number = ? AND state = 'LOCKED'
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Compare-and-swap confirm: LOCKED -> CONFIRMED
pub async fn try_confirm(db: &Pool<Sqlite>, bout_id: Uuid, round_number: u32) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE rounds
        SET state = 'CONFIRMED', updated_at = ?
        WHERE bout_id = ? AND round_number = ? AND state = 'LOCKED'
        "#,
    )
    .bind(Utc::now().to_rfc3339())
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All round rows for a bout, ordered by round number
pub async fn rounds_for_bout(db: &Pool<Sqlite>, bout_id: Uuid) -> Result<Vec<RoundRow>> {
    let numbers: Vec<i64> = sqlx::query_scalar(
        "SELECT round_number FROM rounds WHERE bout_id = ? ORDER BY round_number",
    )
    .bind(bout_id.to_string())
    .fetch_all(db)
    .await?;

    let mut rows = Vec::with_capacity(numbers.len());
    for number in numbers {
        if let Some(row) = get_round(db, bout_id, number as u32).await? {
            rows.push(row);
        }
    }
    Ok(rows)
}
