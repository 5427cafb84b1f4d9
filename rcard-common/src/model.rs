//! Domain model types for round scoring
//!
//! Shared between the scoring engine and any consumer that reads scores.
//! `RawEvent` is the immutable, append-only input; `RoundScore` is derived
//! output, replaced wholesale on every compute and never field-edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// Fighter corner assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Corner {
    Red,
    Blue,
}

impl Corner {
    /// The other corner
    pub fn opponent(self) -> Corner {
        match self {
            Corner::Red => Corner::Blue,
            Corner::Blue => Corner::Red,
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corner::Red => write!(f, "RED"),
            Corner::Blue => write!(f, "BLUE"),
        }
    }
}

impl FromStr for Corner {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RED" => Ok(Corner::Red),
            "BLUE" => Ok(Corner::Blue),
            other => Err(Error::InvalidInput(format!("Unknown corner: {}", other))),
        }
    }
}

/// Origin of a scoring event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventSource {
    /// Entered by a human operator
    Manual,
    /// Produced by the computer-vision subsystem (carries a confidence)
    Cv,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Manual => write!(f, "MANUAL"),
            EventSource::Cv => write!(f, "CV"),
        }
    }
}

impl FromStr for EventSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(EventSource::Manual),
            "CV" => Ok(EventSource::Cv),
            other => Err(Error::InvalidInput(format!("Unknown source: {}", other))),
        }
    }
}

/// Scoring category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Damage,
    Control,
    Aggression,
    Defense,
}

/// Severity sub-classification of tiered event types (knockdowns,
/// submission attempts). Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Flash,
    Hard,
    NearFinish,
}

impl SeverityTier {
    /// Lowest defined tier, used when an event arrives without one
    pub const LOWEST: SeverityTier = SeverityTier::Flash;

    /// Point multiplier applied to the event type's base value
    pub fn multiplier(self) -> f64 {
        match self {
            SeverityTier::Flash => 0.25,
            SeverityTier::Hard => 0.5,
            SeverityTier::NearFinish => 1.0,
        }
    }
}

impl FromStr for SeverityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flash" => Ok(SeverityTier::Flash),
            "hard" => Ok(SeverityTier::Hard),
            "near_finish" => Ok(SeverityTier::NearFinish),
            other => Err(Error::InvalidInput(format!("Unknown tier: {}", other))),
        }
    }
}

/// Position sub-type for control-time events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPosition {
    Cage,
    Top,
    Back,
}

impl ControlPosition {
    /// Points accrued per second of control.
    ///
    /// Invariant: back >= top >= cage.
    pub fn rate_per_second(self) -> f64 {
        match self {
            ControlPosition::Cage => 0.2,
            ControlPosition::Top => 0.3,
            ControlPosition::Back => 0.4,
        }
    }
}

impl FromStr for ControlPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cage" => Ok(ControlPosition::Cage),
            "top" => Ok(ControlPosition::Top),
            "back" => Ok(ControlPosition::Back),
            other => Err(Error::InvalidInput(format!("Unknown control position: {}", other))),
        }
    }
}

/// Typed per-event payload
///
/// Each event type carries exactly the metadata it needs (tier, control
/// position + duration), so the normalizer's lookup is exhaustive and
/// checked by the compiler rather than driven by an untyped map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Knockdown {
        #[serde(skip_serializing_if = "Option::is_none")]
        tier: Option<SeverityTier>,
    },
    SubmissionAttempt {
        #[serde(skip_serializing_if = "Option::is_none")]
        tier: Option<SeverityTier>,
    },
    SignificantStrike,
    Strike,
    Takedown,
    TakedownStuffed,
    Reversal,
    ControlTime {
        position: ControlPosition,
        seconds: f64,
    },
}

impl EventKind {
    /// Wire name of the event type
    pub fn type_name(&self) -> &'static str {
        match self {
            EventKind::Knockdown { .. } => "knockdown",
            EventKind::SubmissionAttempt { .. } => "submission_attempt",
            EventKind::SignificantStrike => "significant_strike",
            EventKind::Strike => "strike",
            EventKind::Takedown => "takedown",
            EventKind::TakedownStuffed => "takedown_stuffed",
            EventKind::Reversal => "reversal",
            EventKind::ControlTime { .. } => "control_time",
        }
    }
}

/// Immutable stored scoring event
///
/// `seq` is assigned by the event store and is monotonic within
/// (bout_id, round_number). Events are never mutated once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub bout_id: Uuid,
    pub round_number: u32,
    pub seq: i64,
    pub corner: Corner,
    pub kind: EventKind,
    /// CV detection confidence in [0, 1]; None for manual events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub source: EventSource,
    pub occurred_at: DateTime<Utc>,
    /// Free-form annotations (operator notes, normalizer flags)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A normalized event with its point contribution resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEvent {
    pub seq: i64,
    pub corner: Corner,
    pub source: EventSource,
    pub category: Category,
    pub base_points: f64,
    pub severity_multiplier: f64,
    /// base_points * severity_multiplier * (confidence for CV, 1.0 otherwise)
    pub effective_points: f64,
}

/// Per-fighter point sums by category
///
/// Monotonically non-decreasing while a round is open and accruing events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub damage: f64,
    pub control: f64,
    pub aggression: f64,
    pub defense: f64,
}

impl CategoryTotals {
    /// Add points to one category
    pub fn add(&mut self, category: Category, points: f64) {
        match category {
            Category::Damage => self.damage += points,
            Category::Control => self.control += points,
            Category::Aggression => self.aggression += points,
            Category::Defense => self.defense += points,
        }
    }

    /// Weighted total using the literal configured weights
    /// (no assumption that weights sum to 1.0)
    pub fn weighted(&self, weights: &Weights) -> f64 {
        self.damage * weights.damage
            + self.control * weights.control
            + self.aggression * weights.aggression
            + self.defense * weights.defense
    }

    /// True if every category is zero
    pub fn is_empty(&self) -> bool {
        self.damage == 0.0 && self.control == 0.0 && self.aggression == 0.0 && self.defense == 0.0
    }
}

/// Category weight vector from a tuning profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub damage: f64,
    pub control: f64,
    pub aggression: f64,
    pub defense: f64,
}

/// Dominance gate classification for a computed round
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Gates {
    /// One fighter's damage share reached the primacy threshold
    pub damage_primacy: bool,
    /// Which corner holds damage primacy, when flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primacy_corner: Option<Corner>,
    /// |delta| reached the 10-8 ceiling
    pub gate_10_8: bool,
    /// |delta| reached the 10-7 ceiling
    pub gate_10_7: bool,
    /// Near-finish event policy override: round is at least 10-8
    /// regardless of the numeric delta
    pub forced_dominant_round: bool,
}

/// 10-point-must card for a round, ordered from even to most dominant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Card {
    #[serde(rename = "10-10")]
    TenTen,
    #[serde(rename = "10-9")]
    TenNine,
    #[serde(rename = "10-8")]
    TenEight,
    #[serde(rename = "10-7")]
    TenSeven,
}

impl Card {
    /// Points awarded to the round loser (winner always gets 10)
    pub fn loser_points(self) -> u32 {
        match self {
            Card::TenTen => 10,
            Card::TenNine => 9,
            Card::TenEight => 8,
            Card::TenSeven => 7,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::TenTen => write!(f, "10-10"),
            Card::TenNine => write!(f, "10-9"),
            Card::TenEight => write!(f, "10-8"),
            Card::TenSeven => write!(f, "10-7"),
        }
    }
}

/// Round or fight winner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Winner {
    Red,
    Blue,
    Draw,
}

impl From<Corner> for Winner {
    fn from(corner: Corner) -> Self {
        match corner {
            Corner::Red => Winner::Red,
            Corner::Blue => Winner::Blue,
        }
    }
}

/// Event counts by source at compute time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub manual: u32,
    pub cv: u32,
}

/// Authoritative computed score for one round
///
/// Derived entirely from the event log plus the active tuning profile;
/// recomputable at any time. `event_seq` records the last event sequence
/// included in the snapshot this score was computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundScore {
    pub bout_id: Uuid,
    pub round_number: u32,
    pub red_weighted: f64,
    pub blue_weighted: f64,
    /// red_weighted - blue_weighted (positive favors red)
    pub delta: f64,
    pub red_totals: CategoryTotals,
    pub blue_totals: CategoryTotals,
    pub gates: Gates,
    pub card: Card,
    pub winner: Winner,
    pub source_counts: SourceCounts,
    /// Name of the tuning profile the score was computed under
    pub profile: String,
    pub event_seq: i64,
    pub computed_at: DateTime<Utc>,
}

impl RoundScore {
    /// Whether two computed scores represent the same result
    ///
    /// Everything except the compute timestamp; used by the recompute
    /// runner to count only actually-changed rows.
    pub fn same_result(&self, other: &RoundScore) -> bool {
        self.bout_id == other.bout_id
            && self.round_number == other.round_number
            && self.red_weighted == other.red_weighted
            && self.blue_weighted == other.blue_weighted
            && self.delta == other.delta
            && self.red_totals == other.red_totals
            && self.blue_totals == other.blue_totals
            && self.gates == other.gates
            && self.card == other.card
            && self.winner == other.winner
            && self.source_counts == other.source_counts
            && self.profile == other.profile
            && self.event_seq == other.event_seq
    }
}

/// Lifecycle state of a round
///
/// Events may only be appended while `Open`. A stored RoundScore is
/// authoritative only in `Locked` or `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundState {
    Open,
    Locked,
    Confirmed,
    ForceClosed,
}

impl RoundState {
    /// Whether new events may be appended in this state
    pub fn accepts_events(self) -> bool {
        matches!(self, RoundState::Open)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Open => write!(f, "OPEN"),
            RoundState::Locked => write!(f, "LOCKED"),
            RoundState::Confirmed => write!(f, "CONFIRMED"),
            RoundState::ForceClosed => write!(f, "FORCE_CLOSED"),
        }
    }
}

impl FromStr for RoundState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(RoundState::Open),
            "LOCKED" => Ok(RoundState::Locked),
            "CONFIRMED" => Ok(RoundState::Confirmed),
            "FORCE_CLOSED" => Ok(RoundState::ForceClosed),
            other => Err(Error::InvalidInput(format!("Unknown round state: {}", other))),
        }
    }
}

/// Bout metadata (fighters, scheduled round count)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bout {
    pub bout_id: Uuid,
    pub red_fighter: String,
    pub blue_fighter: String,
    pub scheduled_rounds: u32,
    pub created_at: DateTime<Utc>,
}

/// Per-round card summary in a fight result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundCardSummary {
    pub round_number: u32,
    pub card: Card,
    pub winner: Winner,
}

/// Aggregated fight outcome, available once all scheduled rounds are
/// confirmed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FightResult {
    pub bout_id: Uuid,
    pub winner: Winner,
    /// Total 10-point-must points awarded to the red corner
    pub final_red: u32,
    /// Total 10-point-must points awarded to the blue corner
    pub final_blue: u32,
    pub rounds: Vec<RoundCardSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_multipliers_are_ordered() {
        assert!(SeverityTier::Flash.multiplier() < SeverityTier::Hard.multiplier());
        assert!(SeverityTier::Hard.multiplier() < SeverityTier::NearFinish.multiplier());
        assert_eq!(SeverityTier::LOWEST, SeverityTier::Flash);
    }

    #[test]
    fn control_rates_are_ordered() {
        assert!(
            ControlPosition::Back.rate_per_second() >= ControlPosition::Top.rate_per_second()
        );
        assert!(
            ControlPosition::Top.rate_per_second() >= ControlPosition::Cage.rate_per_second()
        );
    }

    #[test]
    fn card_ordering_moves_toward_dominance() {
        assert!(Card::TenTen < Card::TenNine);
        assert!(Card::TenNine < Card::TenEight);
        assert!(Card::TenEight < Card::TenSeven);
        assert_eq!(Card::TenSeven.loser_points(), 7);
    }

    #[test]
    fn round_state_round_trips_through_strings() {
        for state in [
            RoundState::Open,
            RoundState::Locked,
            RoundState::Confirmed,
            RoundState::ForceClosed,
        ] {
            let parsed: RoundState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("BOGUS".parse::<RoundState>().is_err());
    }

    #[test]
    fn event_kind_serializes_tagged() {
        let kind = EventKind::ControlTime {
            position: ControlPosition::Top,
            seconds: 30.0,
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "control_time");
        assert_eq!(json["position"], "top");
    }

    #[test]
    fn weighted_total_uses_literal_weights() {
        let totals = CategoryTotals {
            damage: 10.0,
            control: 10.0,
            aggression: 10.0,
            defense: 10.0,
        };
        // Deliberately not summing to 1.0
        let weights = Weights {
            damage: 1.0,
            control: 1.0,
            aggression: 1.0,
            defense: 1.0,
        };
        assert_eq!(totals.weighted(&weights), 40.0);
    }
}
