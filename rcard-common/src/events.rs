//! Event types for the RoundCard engine event system
//!
//! Broadcast over a `tokio::sync::broadcast` channel and streamed to SSE
//! clients (scoreboards, supervisor dashboards). These are notifications
//! about the engine's own activity, not the scoring events themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Card, Winner};

/// Engine event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// A scoring event was appended to a round's log
    EventAppended {
        bout_id: Uuid,
        round_number: u32,
        seq: i64,
        event_type: String,
        timestamp: DateTime<Utc>,
    },

    /// A round score was (re)computed
    ScoreComputed {
        bout_id: Uuid,
        round_number: u32,
        card: Card,
        winner: Winner,
        delta: f64,
        timestamp: DateTime<Utc>,
    },

    /// Round locked with its authoritative score
    RoundLocked {
        bout_id: Uuid,
        round_number: u32,
        lock_seq: i64,
        timestamp: DateTime<Utc>,
    },

    /// Supervisor unlocked a round for re-scoring
    RoundUnlocked {
        bout_id: Uuid,
        round_number: u32,
        actor: String,
        timestamp: DateTime<Utc>,
    },

    /// Round result confirmed
    RoundConfirmed {
        bout_id: Uuid,
        round_number: u32,
        timestamp: DateTime<Utc>,
    },

    /// Supervisor force-closed a round
    RoundForceClosed {
        bout_id: Uuid,
        round_number: u32,
        actor: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A recompute job reached a terminal status
    RecomputeFinished {
        job_id: Uuid,
        scope: String,
        succeeded: bool,
        rows_updated: u64,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Event type string for the SSE `event:` field
    pub fn type_str(&self) -> &'static str {
        match self {
            EngineEvent::EventAppended { .. } => "EventAppended",
            EngineEvent::ScoreComputed { .. } => "ScoreComputed",
            EngineEvent::RoundLocked { .. } => "RoundLocked",
            EngineEvent::RoundUnlocked { .. } => "RoundUnlocked",
            EngineEvent::RoundConfirmed { .. } => "RoundConfirmed",
            EngineEvent::RoundForceClosed { .. } => "RoundForceClosed",
            EngineEvent::RecomputeFinished { .. } => "RecomputeFinished",
        }
    }
}
