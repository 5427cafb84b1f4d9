//! Event store: append-only ordered log of scoring events per (bout, round)
//!
//! Appends run in a single transaction that checks the round is still
//! accepting events and assigns the next monotonic sequence number, so
//! concurrent operator submissions serialize per round. Stored events are
//! never mutated.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rcard_common::model::{Corner, EventKind, EventSource, RawEvent, RoundState};
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use super::bouts::parse_timestamp;

/// Fields of an event prior to sequence assignment
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub bout_id: Uuid,
    pub round_number: u32,
    pub corner: Corner,
    pub kind: EventKind,
    pub confidence: Option<f64>,
    pub source: EventSource,
    pub occurred_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// Append an event, assigning its sequence number
///
/// Fails with `InvalidState` once the round has left OPEN; the lock
/// timestamp is a hard cutoff for a locked score.
pub async fn append(db: &Pool<Sqlite>, event: NewEvent) -> Result<RawEvent> {
    let mut tx = db.begin().await?;

    super::rounds::ensure_round_tx(&mut tx, event.bout_id, event.round_number).await?;

    let state: String = sqlx::query_scalar(
        "SELECT state FROM rounds WHERE bout_id = ? AND round_number = ?",
    )
    .bind(event.bout_id.to_string())
    .bind(event.round_number as i64)
    .fetch_one(&mut *tx)
    .await?;

    let state: RoundState = state.parse()?;
    if !state.accepts_events() {
        return Err(Error::InvalidState(format!(
            "Round {} of bout {} is {} and no longer accepts events",
            event.round_number, event.bout_id, state
        )));
    }

    let next_seq: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(seq), 0) + 1 FROM round_events WHERE bout_id = ? AND round_number = ?",
    )
    .bind(event.bout_id.to_string())
    .bind(event.round_number as i64)
    .fetch_one(&mut *tx)
    .await?;

    let kind_json = serde_json::to_string(&event.kind)
        .map_err(|e| Error::Internal(format!("Failed to serialize event kind: {}", e)))?;
    let metadata_json = event.metadata.to_string();

    sqlx::query(
        r#"
        INSERT INTO round_events
            (bout_id, round_number, seq, corner, kind, confidence, source, occurred_at, metadata)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.bout_id.to_string())
    .bind(event.round_number as i64)
    .bind(next_seq)
    .bind(event.corner.to_string())
    .bind(kind_json)
    .bind(event.confidence)
    .bind(event.source.to_string())
    .bind(event.occurred_at.to_rfc3339())
    .bind(metadata_json)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    debug!(
        "Appended {} event seq {} to bout {} round {}",
        event.kind.type_name(),
        next_seq,
        event.bout_id,
        event.round_number
    );

    Ok(RawEvent {
        bout_id: event.bout_id,
        round_number: event.round_number,
        seq: next_seq,
        corner: event.corner,
        kind: event.kind,
        confidence: event.confidence,
        source: event.source,
        occurred_at: event.occurred_at,
        metadata: event.metadata,
    })
}

/// All events for a round, ordered by sequence number
pub async fn list_events(
    db: &Pool<Sqlite>,
    bout_id: Uuid,
    round_number: u32,
) -> Result<Vec<RawEvent>> {
    let rows = sqlx::query(
        r#"
        SELECT seq, corner, kind, confidence, source, occurred_at, metadata
        FROM round_events
        WHERE bout_id = ? AND round_number = ?
        ORDER BY seq
        "#,
    )
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| {
            let kind: EventKind = serde_json::from_str(&row.get::<String, _>("kind"))
                .map_err(|e| Error::Internal(format!("Corrupt stored event kind: {}", e)))?;
            let metadata: serde_json::Value =
                serde_json::from_str(&row.get::<String, _>("metadata"))
                    .unwrap_or(serde_json::Value::Null);

            Ok(RawEvent {
                bout_id,
                round_number,
                seq: row.get("seq"),
                corner: row.get::<String, _>("corner").parse()?,
                kind,
                confidence: row.get("confidence"),
                source: row.get::<String, _>("source").parse()?,
                occurred_at: parse_timestamp(row.get::<String, _>("occurred_at"))?,
                metadata,
            })
        })
        .collect()
}

/// Highest assigned sequence number for a round (0 when empty)
pub async fn last_seq(db: &Pool<Sqlite>, bout_id: Uuid, round_number: u32) -> Result<i64> {
    let seq: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(seq), 0) FROM round_events WHERE bout_id = ? AND round_number = ?",
    )
    .bind(bout_id.to_string())
    .bind(round_number as i64)
    .fetch_one(db)
    .await?;
    Ok(seq)
}
