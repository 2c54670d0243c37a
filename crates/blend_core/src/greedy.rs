//! Greedy set builder.
//!
//! Decides *which* ingredients go into a blend: starting from locked and
//! required ids, it repeatedly tries every remaining candidate, optimizes the
//! trial set's weights, and commits the candidate with the largest error
//! reduction until the size cap is hit or nothing helps.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::composition::aggregate;
use crate::inverse::{map_properties_to_attributes, validate_property_targets};
use crate::scoring::{error, usefulness};
use crate::weights::{optimize_unchecked, validate_target, OptimizeOptions};
use crate::{
    AttributeTarget, AttributeVector, BlendError, Constants, Exclusions, Hold, IngredientDatabase,
    IngredientId, OptimizationResult, PropertyTarget, Share,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSetOptions {
    pub max_size: usize,
    #[serde(default)]
    pub exclusions: Exclusions,
    /// Must appear in the result; placed after locked ids.
    #[serde(default)]
    pub require: Vec<IngredientId>,
    /// Must appear in the result, at the front, in this order.
    #[serde(default)]
    pub lock: Vec<IngredientId>,
    /// Only the top `n` ranked candidates are ever tried.
    #[serde(default)]
    pub candidate_limit: Option<usize>,
    pub optimize: OptimizeOptions,
}

impl Default for BestSetOptions {
    fn default() -> Self {
        Self::from_constants(&Constants::default())
    }
}

impl BestSetOptions {
    pub fn from_constants(constants: &Constants) -> Self {
        Self {
            max_size: constants.max_set_size,
            exclusions: Exclusions::default(),
            require: Vec::new(),
            lock: Vec::new(),
            candidate_limit: None,
            optimize: OptimizeOptions::from_constants(constants),
        }
    }
}

pub fn find_best_set(
    target: &AttributeTarget,
    database: &IngredientDatabase,
    options: &BestSetOptions,
    constants: &Constants,
) -> Result<OptimizationResult, BlendError> {
    options.optimize.validate(1)?;
    validate_target(target)?;

    let (mut selected, locked_count) = seed_selection(options, database);
    let mut ranked = rank_candidates(target, database, options, &selected, constants);
    if let Some(limit) = options.candidate_limit {
        ranked.truncate(limit);
    }

    while selected.len() < options.max_size && !ranked.is_empty() {
        let baseline = if selected.is_empty() {
            f64::INFINITY
        } else {
            set_error(&selected, target, database, &options.optimize)
        };
        let Some((position, best_error)) =
            best_extension(&selected, &ranked, target, database, &options.optimize)
        else {
            break;
        };
        let reduction = baseline - best_error;
        if reduction <= 0.0 {
            debug!(size = selected.len(), error = baseline, "no candidate improves the set");
            break;
        }
        let committed = ranked.remove(position);
        debug!(ingredient = %committed, error = best_error, "committed candidate");
        selected.push(committed);
    }

    let mut mixture = optimize_unchecked(&selected, target, database, &options.optimize);
    for share in mixture.iter_mut().take(locked_count) {
        share.hold = Hold::Locked;
    }
    Ok(OptimizationResult::evaluate(mixture, database, target, constants))
}

/// Validates and maps a property-level target, then builds a set for it.
pub fn find_best_set_for_properties(
    target: &PropertyTarget,
    database: &IngredientDatabase,
    options: &BestSetOptions,
    constants: &Constants,
) -> Result<OptimizationResult, BlendError> {
    if let Some(message) = validate_property_targets(target) {
        return Err(BlendError::InconsistentProperties(message));
    }
    let mapped = map_properties_to_attributes(target);
    find_best_set(&mapped, database, options, constants)
}

/// Locked ids first, then required ids, deduplicated. Ids the database does
/// not know are dropped.
fn seed_selection(
    options: &BestSetOptions,
    database: &IngredientDatabase,
) -> (Vec<IngredientId>, usize) {
    let mut selected: Vec<IngredientId> = Vec::new();
    let mut locked_count = 0;
    for (position, id) in options.lock.iter().chain(&options.require).enumerate() {
        if !database.contains(id) {
            warn!(ingredient = %id, "seed ingredient not in database; skipped");
            continue;
        }
        if selected.contains(id) {
            continue;
        }
        selected.push(id.clone());
        if position < options.lock.len() {
            locked_count += 1;
        }
    }
    (selected, locked_count)
}

/// Eligible, unselected ids ordered by usefulness against the seed set at
/// equal shares. Stable, so equal scores keep database order.
fn rank_candidates(
    target: &AttributeTarget,
    database: &IngredientDatabase,
    options: &BestSetOptions,
    selected: &[IngredientId],
    constants: &Constants,
) -> Vec<IngredientId> {
    let achieved = if selected.is_empty() {
        AttributeVector::default()
    } else {
        let equal: Vec<Share> = selected
            .iter()
            .map(|id| Share::free(id.clone(), 1.0))
            .collect();
        aggregate(&equal, database)
    };
    let taken: AHashSet<&IngredientId> = selected.iter().collect();
    let mut scored: Vec<(IngredientId, f64)> = database
        .eligible(&options.exclusions)
        .filter(|ingredient| !taken.contains(&ingredient.id))
        .map(|ingredient| {
            (
                ingredient.id.clone(),
                usefulness(ingredient, target, &achieved, constants),
            )
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().map(|(id, _)| id).collect()
}

fn set_error(
    ids: &[IngredientId],
    target: &AttributeTarget,
    database: &IngredientDatabase,
    options: &OptimizeOptions,
) -> f64 {
    let mixture = optimize_unchecked(ids, target, database, options);
    error(&aggregate(&mixture, database), target)
}

/// Position in `ranked` of the candidate whose trial set has the lowest
/// error, with that error. First found wins ties.
fn best_extension(
    selected: &[IngredientId],
    ranked: &[IngredientId],
    target: &AttributeTarget,
    database: &IngredientDatabase,
    options: &OptimizeOptions,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    let mut trial: Vec<IngredientId> = selected.to_vec();
    for (position, candidate) in ranked.iter().enumerate() {
        trial.push(candidate.clone());
        let trial_error = set_error(&trial, target, database, options);
        trial.pop();
        match best {
            Some((_, best_error)) if trial_error >= best_error => {}
            _ => best = Some((position, trial_error)),
        }
    }
    best
}
