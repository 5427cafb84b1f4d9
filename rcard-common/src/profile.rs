//! Tuning profiles: named weight vectors and card thresholds
//!
//! A profile owns every number the scoring pipeline consults — category
//! weights, the draw epsilon, the two card ceilings, primacy parameters,
//! and fusion source weights. Swapping the active profile changes scoring
//! behavior without code changes.
//!
//! Two built-ins are seeded at startup. They use deliberately different
//! threshold scales (small deltas vs hundreds); the two documented scoring
//! variants are not numerically compatible and live as two profiles, never
//! as two code paths.

use serde::{Deserialize, Serialize};

use crate::model::Weights;

/// Named scoring configuration
///
/// Raw coefficients are owner-visible only (the default profile is public);
/// other requesters see a redacted view via [`TuningProfile::view`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningProfile {
    pub name: String,
    pub owner: String,
    pub weights: Weights,
    /// |delta| at or below this maps to 10-10
    pub draw_epsilon: f64,
    /// |delta| below this (and above the epsilon) maps to 10-9
    pub ten_nine_ceiling: f64,
    /// |delta| below this maps to 10-8; at or above maps to 10-7
    pub ten_eight_ceiling: f64,
    /// Damage share at or above this triggers the primacy bonus
    pub primacy_threshold: f64,
    /// Fixed bonus added to the dominant fighter's weighted total
    pub primacy_bonus: f64,
    /// Fusion weight for CV-sourced totals
    pub cv_weight: f64,
    /// Fusion weight for manually-judged totals
    pub judge_weight: f64,
}

impl TuningProfile {
    /// Name of the built-in default profile (coefficients publicly readable)
    pub const DEFAULT_NAME: &'static str = "unified-default";

    /// Owner recorded for built-in profiles
    pub const SYSTEM_OWNER: &'static str = "system";

    /// Built-in default: small-delta threshold scale
    pub fn unified_default() -> Self {
        TuningProfile {
            name: Self::DEFAULT_NAME.to_string(),
            owner: Self::SYSTEM_OWNER.to_string(),
            weights: Weights {
                damage: 0.50,
                control: 0.25,
                aggression: 0.15,
                defense: 0.10,
            },
            draw_epsilon: 3.0,
            ten_nine_ceiling: 25.0,
            ten_eight_ceiling: 60.0,
            primacy_threshold: 0.80,
            primacy_bonus: 20.0,
            cv_weight: 0.3,
            judge_weight: 0.7,
        }
    }

    /// Built-in alternate: large-delta threshold scale used by the
    /// broadcast scoring variant
    pub fn broadcast_legacy() -> Self {
        TuningProfile {
            name: "broadcast-legacy".to_string(),
            owner: Self::SYSTEM_OWNER.to_string(),
            weights: Weights {
                damage: 10.0,
                control: 5.0,
                aggression: 3.0,
                defense: 2.0,
            },
            draw_epsilon: 50.0,
            ten_nine_ceiling: 500.0,
            ten_eight_ceiling: 700.0,
            primacy_threshold: 0.80,
            primacy_bonus: 400.0,
            cv_weight: 0.3,
            judge_weight: 0.7,
        }
    }

    /// Whether `requester` may read raw coefficients
    pub fn coefficients_visible_to(&self, requester: &str) -> bool {
        self.name == Self::DEFAULT_NAME || self.owner == requester
    }

    /// Response view with coefficients withheld from non-owners
    pub fn view(&self, requester: &str) -> ProfileView {
        if self.coefficients_visible_to(requester) {
            ProfileView {
                name: self.name.clone(),
                owner: self.owner.clone(),
                coefficients: Some(ProfileCoefficients {
                    weights: self.weights,
                    draw_epsilon: self.draw_epsilon,
                    ten_nine_ceiling: self.ten_nine_ceiling,
                    ten_eight_ceiling: self.ten_eight_ceiling,
                    primacy_threshold: self.primacy_threshold,
                    primacy_bonus: self.primacy_bonus,
                    cv_weight: self.cv_weight,
                    judge_weight: self.judge_weight,
                }),
            }
        } else {
            ProfileView {
                name: self.name.clone(),
                owner: self.owner.clone(),
                coefficients: None,
            }
        }
    }
}

/// Raw coefficient block of a profile, present only for authorized readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCoefficients {
    pub weights: Weights,
    pub draw_epsilon: f64,
    pub ten_nine_ceiling: f64,
    pub ten_eight_ceiling: f64,
    pub primacy_threshold: f64,
    pub primacy_bonus: f64,
    pub cv_weight: f64,
    pub judge_weight: f64,
}

/// Ownership-gated read view of a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub name: String,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficients: Option<ProfileCoefficients>,
}
