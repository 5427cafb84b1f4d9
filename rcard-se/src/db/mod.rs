//! Database access layer
//!
//! SQLite-backed storage for bouts, the append-only round event log, round
//! state + scores, tuning profiles, recompute jobs, and settings.

pub mod bouts;
pub mod events;
pub mod init;
pub mod jobs;
pub mod profiles;
pub mod rounds;
pub mod settings;
