//! `blend_core`: fat-blend formulation engine.
//!
//! Turns ingredient compositions into properties and searches for blends that
//! hit a target. No IO; all randomness via the passed-in Rng.

mod composition;
mod cupboard;
mod error;
mod generators;
mod greedy;
mod inverse;
mod scoring;
mod shares;
mod types;
mod weights;

pub use composition::{aggregate, derive_properties, normalize_to_percent};
pub use cupboard::{
    optimize_cupboard_recipe, suggest_additions, CupboardOptions, CupboardRecipe, SuggestionOutcome,
};
pub use error::BlendError;
pub use generators::{
    balanced_target, generate_random, GeneratedBlend, GeneratorPhase, RandomOptions,
};
pub use greedy::{find_best_set, find_best_set_for_properties, BestSetOptions};
pub use inverse::{map_properties_to_attributes, validate_property_targets};
pub use scoring::{all_properties_in_range, error, match_quality, range_score, usefulness};
pub use types::*;
pub use weights::{optimize_weights, optimize_weights_from, OptimizeOptions};

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
