//! Round scoring pipeline
//!
//! normalize -> aggregate -> fusion -> gates -> card. [`score_events`] is a
//! pure function of the event snapshot and tuning profile: no I/O, no side
//! effects, safe to invoke redundantly from any task at any polling cadence.

pub mod aggregate;
pub mod card;
pub mod fusion;
pub mod gates;
pub mod normalize;

use chrono::Utc;
use rcard_common::model::{EventSource, RawEvent, RoundScore, ScoredEvent, SourceCounts};
use rcard_common::profile::TuningProfile;
use uuid::Uuid;

use fusion::WeightedPair;

/// Score a snapshot of a round's event log under a tuning profile
///
/// The returned score is stamped with the snapshot's last sequence number;
/// the lifecycle layer uses it to detect stale snapshots at lock time.
pub fn score_events(
    bout_id: Uuid,
    round_number: u32,
    events: &[RawEvent],
    profile: &TuningProfile,
) -> RoundScore {
    let scored: Vec<ScoredEvent> = events.iter().flat_map(normalize::normalize).collect();

    // Combined totals drive the breakdown and the primacy ratio
    let (red_totals, blue_totals) = aggregate::aggregate(&scored);

    // One engine pass per source, fused into the final weighted pair
    let fused = fuse_sources(&scored, profile);

    // Damage primacy grants its bonus to the dominant corner's weighted
    // total only; the raw category totals shown in breakdowns are untouched
    let primacy = gates::evaluate_primacy(&red_totals, &blue_totals, profile);
    let mut red_weighted = fused.red;
    let mut blue_weighted = fused.blue;
    if let (true, Some(corner)) = primacy {
        match corner {
            rcard_common::model::Corner::Red => red_weighted += profile.primacy_bonus,
            rcard_common::model::Corner::Blue => blue_weighted += profile.primacy_bonus,
        }
    }

    let delta = red_weighted - blue_weighted;
    let forced = gates::forced_flags(events);
    let mapped = card::map_card(delta, &forced, profile);
    let gate_flags = gates::assemble(delta, primacy, mapped.forced_dominant_round, profile);

    let mut source_counts = SourceCounts::default();
    for event in events {
        match event.source {
            EventSource::Manual => source_counts.manual += 1,
            EventSource::Cv => source_counts.cv += 1,
        }
    }

    RoundScore {
        bout_id,
        round_number,
        red_weighted,
        blue_weighted,
        delta,
        red_totals,
        blue_totals,
        gates: gate_flags,
        card: mapped.card,
        winner: mapped.winner,
        source_counts,
        profile: profile.name.clone(),
        event_seq: events.iter().map(|e| e.seq).max().unwrap_or(0),
        computed_at: Utc::now(),
    }
}

/// Per-source engine passes plus the fusion blend
fn fuse_sources(scored: &[ScoredEvent], profile: &TuningProfile) -> WeightedPair {
    let pass = |source: EventSource| -> Option<WeightedPair> {
        let subset: Vec<ScoredEvent> = scored
            .iter()
            .filter(|e| e.source == source)
            .cloned()
            .collect();
        if subset.is_empty() {
            return None;
        }
        let (red, blue) = aggregate::aggregate(&subset);
        let (red_w, blue_w) = aggregate::weighted_totals(&red, &blue, &profile.weights);
        Some(WeightedPair {
            red: red_w,
            blue: blue_w,
        })
    };

    fusion::fuse(pass(EventSource::Manual), pass(EventSource::Cv), profile)
}
