//! # RoundCard Common Library
//!
//! Shared code for RoundCard services including:
//! - Domain model types (events, category totals, round scores)
//! - Engine event types (EngineEvent enum) for the SSE broadcast channel
//! - Tuning profile types and built-in profiles
//! - Common error type
//! - Configuration file resolution

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod profile;

pub use error::{Error, Result};
