//! Shared engine state
//!
//! Thread-safe state shared across API handlers and background recompute
//! tasks: the engine event broadcaster and the per-round lock registry used
//! to serialize lock transitions.

use rcard_common::events::EngineEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// Shared state accessible by all components
pub struct SharedState {
    /// Event broadcaster for SSE events
    pub event_tx: broadcast::Sender<EngineEvent>,

    /// Per-round mutexes guarding the OPEN -> LOCKED critical section.
    ///
    /// Aggregation itself is pure and may run concurrently anywhere; only
    /// the compute-then-lock sequence needs single-writer semantics.
    round_locks: Mutex<HashMap<(Uuid, u32), Arc<Mutex<()>>>>,
}

impl SharedState {
    /// Create new shared state
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            event_tx,
            round_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: EngineEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the engine event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Mutex guarding lock transitions for one round
    ///
    /// Lazily created; the same Arc is handed to every caller for a given
    /// (bout, round) so concurrent lock attempts serialize on it.
    pub async fn round_lock(&self, bout_id: Uuid, round_number: u32) -> Arc<Mutex<()>> {
        let mut locks = self.round_locks.lock().await;
        locks
            .entry((bout_id, round_number))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the registry entry for a round that reached a terminal state
    ///
    /// CONFIRMED rounds never transition again, so their mutexes would
    /// otherwise accumulate for the lifetime of the process.
    pub async fn release_round_lock(&self, bout_id: Uuid, round_number: u32) {
        let mut locks = self.round_locks.lock().await;
        locks.remove(&(bout_id, round_number));
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
