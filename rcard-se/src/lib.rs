//! # RoundCard Scoring Engine (rcard-se)
//!
//! Converts streams of timestamped fight events from independent operators
//! and the CV subsystem into official 10-point-must round scorecards.
//!
//! The pipeline (normalize -> aggregate -> gates -> fusion -> card) is a
//! pure function of the round's event log and the active tuning profile, so
//! it can be invoked redundantly at any polling cadence. The round lifecycle
//! guards the single authoritative score per round behind a compare-and-swap
//! lock transition.

pub mod api;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod recompute;
pub mod scoring;
pub mod state;

pub use error::{Error, Result};
