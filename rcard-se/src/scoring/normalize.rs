//! Event normalization
//!
//! Maps raw events into scored events via an exhaustive per-type lookup.
//! Unknown event types and malformed payloads are rejected at the ingest
//! boundary; nothing is ever silently coerced to zero points.

use crate::error::{Error, Result};
use rcard_common::model::{
    Category, ControlPosition, EventKind, EventSource, RawEvent, ScoredEvent, SeverityTier,
};

/// Base point values per event type
pub const KNOCKDOWN_BASE: f64 = 25.0;
pub const SIGNIFICANT_STRIKE_BASE: f64 = 2.0;
pub const STRIKE_BASE: f64 = 0.5;
pub const TAKEDOWN_BASE: f64 = 4.0;
pub const SUBMISSION_ATTEMPT_BASE: f64 = 8.0;
pub const TAKEDOWN_STUFFED_BASE: f64 = 2.0;
pub const REVERSAL_BASE: f64 = 3.0;

/// Result of parsing wire fields into a typed event kind
#[derive(Debug, Clone)]
pub struct ParsedKind {
    pub kind: EventKind,
    /// A required tier was absent and defaulted to the lowest; recorded in
    /// event metadata so review tooling can flag it
    pub tier_defaulted: bool,
}

/// Parse the wire representation (type string + optional fields) into a
/// typed [`EventKind`]
pub fn parse_kind(
    event_type: &str,
    tier: Option<&str>,
    position: Option<&str>,
    seconds: Option<f64>,
) -> Result<ParsedKind> {
    match event_type {
        "knockdown" | "submission_attempt" => {
            let (parsed_tier, defaulted) = match tier {
                Some(t) => (
                    t.parse::<SeverityTier>()
                        .map_err(|_| Error::MalformedEvent(format!("Unknown tier: {}", t)))?,
                    false,
                ),
                None => (SeverityTier::LOWEST, true),
            };
            let kind = if event_type == "knockdown" {
                EventKind::Knockdown {
                    tier: Some(parsed_tier),
                }
            } else {
                EventKind::SubmissionAttempt {
                    tier: Some(parsed_tier),
                }
            };
            Ok(ParsedKind {
                kind,
                tier_defaulted: defaulted,
            })
        }
        "significant_strike" => Ok(ParsedKind {
            kind: EventKind::SignificantStrike,
            tier_defaulted: false,
        }),
        "strike" => Ok(ParsedKind {
            kind: EventKind::Strike,
            tier_defaulted: false,
        }),
        "takedown" => Ok(ParsedKind {
            kind: EventKind::Takedown,
            tier_defaulted: false,
        }),
        "takedown_stuffed" => Ok(ParsedKind {
            kind: EventKind::TakedownStuffed,
            tier_defaulted: false,
        }),
        "reversal" => Ok(ParsedKind {
            kind: EventKind::Reversal,
            tier_defaulted: false,
        }),
        "control_time" => {
            let position = position
                .ok_or_else(|| {
                    Error::MalformedEvent("control_time requires a position".to_string())
                })?
                .parse::<ControlPosition>()
                .map_err(|e| Error::MalformedEvent(e.to_string()))?;
            let seconds = seconds.ok_or_else(|| {
                Error::MalformedEvent("control_time requires a duration in seconds".to_string())
            })?;
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(Error::MalformedEvent(format!(
                    "control_time duration must be positive, got {}",
                    seconds
                )));
            }
            Ok(ParsedKind {
                kind: EventKind::ControlTime { position, seconds },
                tier_defaulted: false,
            })
        }
        other => Err(Error::UnknownEventType(other.to_string())),
    }
}

/// Validate the confidence field against the event source
///
/// CV events must carry a confidence in [0, 1]; manual events may omit it.
pub fn validate_confidence(source: EventSource, confidence: Option<f64>) -> Result<()> {
    match (source, confidence) {
        (EventSource::Cv, None) => Err(Error::MalformedEvent(
            "CV events require a confidence value".to_string(),
        )),
        (_, Some(c)) if !(0.0..=1.0).contains(&c) => Err(Error::MalformedEvent(format!(
            "Confidence must be in [0, 1], got {}",
            c
        ))),
        _ => Ok(()),
    }
}

/// Normalize a stored event into its scored contributions
///
/// Most events produce one [`ScoredEvent`]; significant strikes fan out
/// into two, each carrying half the base value — one tagged Damage, one
/// tagged Aggression.
pub fn normalize(event: &RawEvent) -> Vec<ScoredEvent> {
    let confidence = match event.source {
        EventSource::Cv => event.confidence.unwrap_or(1.0),
        EventSource::Manual => 1.0,
    };

    let entry = |category: Category, base: f64, multiplier: f64| ScoredEvent {
        seq: event.seq,
        corner: event.corner,
        source: event.source,
        category,
        base_points: base,
        severity_multiplier: multiplier,
        effective_points: base * multiplier * confidence,
    };

    match &event.kind {
        EventKind::Knockdown { tier } => {
            let multiplier = tier.unwrap_or(SeverityTier::LOWEST).multiplier();
            vec![entry(Category::Damage, KNOCKDOWN_BASE, multiplier)]
        }
        EventKind::SubmissionAttempt { tier } => {
            let multiplier = tier.unwrap_or(SeverityTier::LOWEST).multiplier();
            vec![entry(Category::Control, SUBMISSION_ATTEMPT_BASE, multiplier)]
        }
        EventKind::SignificantStrike => {
            let half = SIGNIFICANT_STRIKE_BASE / 2.0;
            vec![
                entry(Category::Damage, half, 1.0),
                entry(Category::Aggression, half, 1.0),
            ]
        }
        EventKind::Strike => vec![entry(Category::Aggression, STRIKE_BASE, 1.0)],
        EventKind::Takedown => vec![entry(Category::Control, TAKEDOWN_BASE, 1.0)],
        EventKind::TakedownStuffed => {
            vec![entry(Category::Defense, TAKEDOWN_STUFFED_BASE, 1.0)]
        }
        EventKind::Reversal => vec![entry(Category::Control, REVERSAL_BASE, 1.0)],
        EventKind::ControlTime { position, seconds } => {
            let base = seconds * position.rate_per_second();
            vec![entry(Category::Control, base, 1.0)]
        }
    }
}
