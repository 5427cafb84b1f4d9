//! Card mapping: weighted delta to 10-point-must card
//!
//! Every threshold comes from the active profile; swapping profiles changes
//! scoring behavior without code changes. Sign convention: positive delta
//! favors the red corner.

use rcard_common::model::{Card, Corner, Winner};
use rcard_common::profile::TuningProfile;

use super::gates::ForcedFlags;

/// Mapped card outcome, including whether the near-finish policy override
/// was applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedCard {
    pub card: Card,
    pub winner: Winner,
    pub forced_dominant_round: bool,
}

/// Map a final weighted delta to its card and winner
pub fn map_card(delta: f64, forced: &ForcedFlags, profile: &TuningProfile) -> MappedCard {
    let magnitude = delta.abs();

    let (mut card, mut winner) = if magnitude <= profile.draw_epsilon {
        (Card::TenTen, Winner::Draw)
    } else {
        let tier = if magnitude < profile.ten_nine_ceiling {
            Card::TenNine
        } else if magnitude < profile.ten_eight_ceiling {
            Card::TenEight
        } else {
            Card::TenSeven
        };
        let winner = if delta > 0.0 { Winner::Red } else { Winner::Blue };
        (tier, winner)
    };

    // Near-finish policy: the flag is consulted before falling back to the
    // numeric comparison. It raises the winner's card to at least 10-8; a
    // numerically-even round with exactly one near-finish corner goes to
    // that corner.
    let forced_applies = match winner {
        Winner::Red => forced.red,
        Winner::Blue => forced.blue,
        Winner::Draw => {
            if forced.red != forced.blue {
                winner = if forced.red {
                    Winner::from(Corner::Red)
                } else {
                    Winner::from(Corner::Blue)
                };
                true
            } else {
                false
            }
        }
    };

    if forced_applies && card < Card::TenEight {
        card = Card::TenEight;
    }

    MappedCard {
        card,
        winner,
        forced_dominant_round: forced_applies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_FORCE: ForcedFlags = ForcedFlags {
        red: false,
        blue: false,
    };

    #[test]
    fn delta_within_epsilon_is_a_draw() {
        let profile = TuningProfile::unified_default();
        let mapped = map_card(2.0, &NO_FORCE, &profile);
        assert_eq!(mapped.card, Card::TenTen);
        assert_eq!(mapped.winner, Winner::Draw);
    }

    #[test]
    fn tiers_follow_profile_ceilings() {
        let profile = TuningProfile::unified_default(); // eps 3, 25, 60

        assert_eq!(map_card(22.5, &NO_FORCE, &profile).card, Card::TenNine);
        assert_eq!(map_card(-22.5, &NO_FORCE, &profile).winner, Winner::Blue);
        assert_eq!(map_card(40.0, &NO_FORCE, &profile).card, Card::TenEight);
        assert_eq!(map_card(75.0, &NO_FORCE, &profile).card, Card::TenSeven);
    }

    #[test]
    fn profile_substitution_changes_mapping() {
        let legacy = TuningProfile::broadcast_legacy(); // eps 50, 500, 700
        // 10-9 under the default profile's scale, a draw under legacy
        assert_eq!(map_card(22.5, &NO_FORCE, &legacy).card, Card::TenTen);
        assert_eq!(map_card(600.0, &NO_FORCE, &legacy).card, Card::TenEight);
    }

    #[test]
    fn forced_flag_raises_winner_to_ten_eight() {
        let profile = TuningProfile::unified_default();
        let forced_red = ForcedFlags {
            red: true,
            blue: false,
        };

        let mapped = map_card(10.0, &forced_red, &profile);
        assert_eq!(mapped.card, Card::TenEight);
        assert!(mapped.forced_dominant_round);

        // Already at 10-7: the flag does not pull the card down
        let mapped = map_card(80.0, &forced_red, &profile);
        assert_eq!(mapped.card, Card::TenSeven);
    }

    #[test]
    fn forced_flag_for_the_loser_does_not_apply() {
        let profile = TuningProfile::unified_default();
        let forced_blue = ForcedFlags {
            red: false,
            blue: true,
        };
        let mapped = map_card(10.0, &forced_blue, &profile);
        assert_eq!(mapped.card, Card::TenNine);
        assert!(!mapped.forced_dominant_round);
    }

    #[test]
    fn forced_flag_breaks_a_numeric_draw() {
        let profile = TuningProfile::unified_default();
        let forced_red = ForcedFlags {
            red: true,
            blue: false,
        };
        let mapped = map_card(0.0, &forced_red, &profile);
        assert_eq!(mapped.winner, Winner::Red);
        assert_eq!(mapped.card, Card::TenEight);
    }

    #[test]
    fn card_is_monotone_in_delta() {
        let profile = TuningProfile::unified_default();
        let mut last = Card::TenTen;
        for delta in [0.0, 5.0, 24.0, 30.0, 59.0, 61.0, 200.0] {
            let card = map_card(delta, &NO_FORCE, &profile).card;
            assert!(card >= last, "card regressed at delta {}", delta);
            last = card;
        }
    }
}
