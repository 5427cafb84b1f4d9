//! Fusion mixer: blending CV-sourced and judge-sourced weighted totals
//!
//! Each source gets its own engine pass; when both are present the weighted
//! totals are blended with the profile's source weights (not required to
//! sum to 1). A missing source never dilutes the present one into a 50/50
//! blend — a single source is used unmixed.

use rcard_common::profile::TuningProfile;

/// Weighted totals for both corners from one engine pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPair {
    pub red: f64,
    pub blue: f64,
}

/// Blend per-source weighted totals into the final pair
pub fn fuse(
    manual: Option<WeightedPair>,
    cv: Option<WeightedPair>,
    profile: &TuningProfile,
) -> WeightedPair {
    match (manual, cv) {
        (Some(judge), Some(cv)) => WeightedPair {
            red: profile.cv_weight * cv.red + profile.judge_weight * judge.red,
            blue: profile.cv_weight * cv.blue + profile.judge_weight * judge.blue,
        },
        (Some(judge), None) => judge,
        (None, Some(cv)) => cv,
        (None, None) => WeightedPair {
            red: 0.0,
            blue: 0.0,
        },
    }
}
