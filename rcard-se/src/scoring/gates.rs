//! Dominance gate evaluation
//!
//! Classifies category totals against the active profile: damage primacy,
//! near-finish policy flags, and the numeric 10-8 / 10-7 gates. Evaluation
//! only classifies — it never persists and never mutates category totals.

use rcard_common::model::{
    CategoryTotals, Corner, EventKind, Gates, RawEvent, SeverityTier,
};
use rcard_common::profile::TuningProfile;

/// Near-finish policy flags per corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForcedFlags {
    pub red: bool,
    pub blue: bool,
}

/// Share of total damage held by the more damaging fighter
///
/// Both totals zero is a neutral 0.5, never a division error.
pub fn primacy_ratio(damage_a: f64, damage_b: f64) -> f64 {
    let sum = damage_a + damage_b;
    if sum == 0.0 {
        0.5
    } else {
        damage_a.max(damage_b) / sum
    }
}

/// Damage primacy classification: (flagged, dominant corner)
pub fn evaluate_primacy(
    red: &CategoryTotals,
    blue: &CategoryTotals,
    profile: &TuningProfile,
) -> (bool, Option<Corner>) {
    let ratio = primacy_ratio(red.damage, blue.damage);
    if ratio >= profile.primacy_threshold {
        let corner = if red.damage >= blue.damage {
            Corner::Red
        } else {
            Corner::Blue
        };
        (true, Some(corner))
    } else {
        (false, None)
    }
}

/// Scan the event log for near-finish knockdowns or submission attempts
///
/// These force a minimum 10-8 card for the corner regardless of the
/// numeric delta — a policy override, not a numeric one.
pub fn forced_flags(events: &[RawEvent]) -> ForcedFlags {
    let mut flags = ForcedFlags::default();
    for event in events {
        let near_finish = matches!(
            event.kind,
            EventKind::Knockdown {
                tier: Some(SeverityTier::NearFinish)
            } | EventKind::SubmissionAttempt {
                tier: Some(SeverityTier::NearFinish)
            }
        );
        if near_finish {
            match event.corner {
                Corner::Red => flags.red = true,
                Corner::Blue => flags.blue = true,
            }
        }
    }
    flags
}

/// Assemble the gate flags for a computed round
///
/// `delta` is the final weighted delta (post-fusion, post-primacy-bonus);
/// `forced_dominant_round` is the policy flag the card mapper consulted.
pub fn assemble(
    delta: f64,
    primacy: (bool, Option<Corner>),
    forced_dominant_round: bool,
    profile: &TuningProfile,
) -> Gates {
    let magnitude = delta.abs();
    Gates {
        damage_primacy: primacy.0,
        primacy_corner: primacy.1,
        gate_10_8: magnitude >= profile.ten_nine_ceiling,
        gate_10_7: magnitude >= profile.ten_eight_ceiling,
        forced_dominant_round,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rcard_common::model::EventSource;
    use uuid::Uuid;

    #[test]
    fn primacy_ratio_guards_divide_by_zero() {
        assert_eq!(primacy_ratio(0.0, 0.0), 0.5);
        assert_eq!(primacy_ratio(35.0, 5.0), 0.875);
        assert_eq!(primacy_ratio(5.0, 35.0), 0.875);
    }

    #[test]
    fn primacy_flags_dominant_corner() {
        let profile = TuningProfile::unified_default();
        let red = CategoryTotals {
            damage: 35.0,
            ..Default::default()
        };
        let blue = CategoryTotals {
            damage: 5.0,
            ..Default::default()
        };

        let (flagged, corner) = evaluate_primacy(&red, &blue, &profile);
        assert!(flagged);
        assert_eq!(corner, Some(Corner::Red));

        // 0.875 >= 0.80 regardless of which side dominates
        let (flagged, corner) = evaluate_primacy(&blue, &red, &profile);
        assert!(flagged);
        assert_eq!(corner, Some(Corner::Blue));
    }

    #[test]
    fn even_damage_is_not_primacy() {
        let profile = TuningProfile::unified_default();
        let totals = CategoryTotals {
            damage: 20.0,
            ..Default::default()
        };
        let (flagged, corner) = evaluate_primacy(&totals, &totals, &profile);
        assert!(!flagged);
        assert_eq!(corner, None);
    }

    fn event(corner: Corner, kind: EventKind) -> RawEvent {
        RawEvent {
            bout_id: Uuid::new_v4(),
            round_number: 1,
            seq: 1,
            corner,
            kind,
            confidence: None,
            source: EventSource::Manual,
            occurred_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn near_finish_events_set_forced_flags() {
        let events = vec![
            event(
                Corner::Red,
                EventKind::Knockdown {
                    tier: Some(SeverityTier::NearFinish),
                },
            ),
            event(
                Corner::Blue,
                EventKind::SubmissionAttempt {
                    tier: Some(SeverityTier::Hard),
                },
            ),
        ];

        let flags = forced_flags(&events);
        assert!(flags.red);
        assert!(!flags.blue);
    }

    #[test]
    fn numeric_gates_follow_profile_ceilings() {
        let profile = TuningProfile::unified_default();
        let gates = assemble(-30.0, (false, None), false, &profile);
        assert!(gates.gate_10_8); // |delta| >= 25
        assert!(!gates.gate_10_7); // |delta| < 60
    }
}
