//! Objective and scoring functions.
//!
//! `error` is what the weight optimizer minimizes. `usefulness` only orders
//! candidates for the set builder. `range_score` ranks generator draws when no
//! explicit target exists.

use crate::composition::{aggregate, derive_properties};
use crate::{
    AttributeTarget, AttributeVector, Constants, Ingredient, IngredientDatabase, Mixture,
    OptimizationResult, PropertyRanges, PropertySet,
};

/// Sum of squared differences over the target's specified keys.
pub fn error(achieved: &AttributeVector, target: &AttributeTarget) -> f64 {
    target
        .iter()
        .map(|(attribute, wanted)| {
            let diff = achieved[*attribute] - wanted;
            diff * diff
        })
        .sum()
}

/// Ranking heuristic: how much adding `ingredient` would help close the gap
/// between `achieved` and `target`.
pub fn usefulness(
    ingredient: &Ingredient,
    target: &AttributeTarget,
    achieved: &AttributeVector,
    constants: &Constants,
) -> f64 {
    target
        .iter()
        .map(|(attribute, wanted)| {
            let have = achieved[*attribute];
            let contributes = ingredient.composition[*attribute];
            if have < *wanted {
                (wanted - have).min(contributes)
            } else if contributes <= *wanted {
                constants.usefulness_flat_bonus
            } else {
                -(contributes - wanted) * constants.usefulness_overshoot_penalty
            }
        })
        .sum()
}

/// 0–100 summary of closeness. An empty target matches perfectly.
pub fn match_quality(
    achieved: &AttributeVector,
    target: &AttributeTarget,
    constants: &Constants,
) -> f64 {
    if target.is_empty() {
        return 100.0;
    }
    let total_deviation: f64 = target
        .iter()
        .map(|(attribute, wanted)| (achieved[*attribute] - wanted).abs())
        .sum();
    let mean_deviation = total_deviation / target.len() as f64;
    (100.0 - mean_deviation * constants.match_quality_scale).clamp(0.0, 100.0)
}

/// Full bonus per in-range property; linearly decaying partial credit
/// outside the band, floored at zero.
pub fn range_score(
    properties: &PropertySet,
    ranges: &PropertyRanges,
    constants: &Constants,
) -> f64 {
    ranges
        .iter()
        .map(|(property, range)| {
            let distance = range.distance(properties.get(property));
            (constants.range_bonus - distance * constants.range_decay).max(0.0)
        })
        .sum()
}

pub fn all_properties_in_range(properties: &PropertySet, ranges: &PropertyRanges) -> bool {
    ranges
        .iter()
        .all(|(property, range)| range.contains(properties.get(property)))
}

impl OptimizationResult {
    /// Derives attributes, properties, error and match quality for `mixture`.
    pub fn evaluate(
        mixture: Mixture,
        database: &IngredientDatabase,
        target: &AttributeTarget,
        constants: &Constants,
    ) -> Self {
        let attributes = aggregate(&mixture, database);
        Self {
            properties: derive_properties(&attributes),
            error: error(&attributes, target),
            match_quality: match_quality(&attributes, target, constants),
            attributes,
            mixture,
        }
    }
}
