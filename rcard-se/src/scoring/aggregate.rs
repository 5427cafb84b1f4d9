//! Category aggregation
//!
//! Pure function of the scored event set. Contributions are summed per
//! (corner, category) in a canonical order (sorted by value) so that
//! permuting the append order of events can never perturb the floating
//! point totals — recompute is frequent and must be byte-identical.

use rcard_common::model::{Category, CategoryTotals, Corner, ScoredEvent, Weights};

/// Sum effective points per category for both corners
pub fn aggregate(scored: &[ScoredEvent]) -> (CategoryTotals, CategoryTotals) {
    const CATEGORIES: [Category; 4] = [
        Category::Damage,
        Category::Control,
        Category::Aggression,
        Category::Defense,
    ];

    let mut red = CategoryTotals::default();
    let mut blue = CategoryTotals::default();

    for corner in [Corner::Red, Corner::Blue] {
        for category in CATEGORIES {
            let mut points: Vec<f64> = scored
                .iter()
                .filter(|e| e.corner == corner && e.category == category)
                .map(|e| e.effective_points)
                .collect();
            // Canonical summation order: append order must not matter
            points.sort_by(f64::total_cmp);
            let total: f64 = points.iter().sum();

            match corner {
                Corner::Red => red.add(category, total),
                Corner::Blue => blue.add(category, total),
            }
        }
    }

    (red, blue)
}

/// Weighted totals for both corners under a profile's weight vector
pub fn weighted_totals(
    red: &CategoryTotals,
    blue: &CategoryTotals,
    weights: &Weights,
) -> (f64, f64) {
    (red.weighted(weights), blue.weighted(weights))
}
