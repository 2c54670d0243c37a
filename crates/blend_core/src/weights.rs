//! Local weight optimizer.
//!
//! Tunes the shares of a fixed ingredient list by discretized coordinate
//! descent: every iteration tries moving `step_size` points between each
//! unordered pair in both directions and adopts the single best strictly
//! improving move until converged or stuck, within the iteration budget.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::composition::CompositionTable;
use crate::scoring::error;
use crate::shares::{finalize_shares, project_to_bounds};
use crate::{
    AttributeTarget, BlendError, Constants, IngredientDatabase, IngredientId, Mixture, Share,
};

const TOTAL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizeOptions {
    pub min_share: f64,
    pub max_share: f64,
    pub step_size: f64,
    pub iterations: u32,
    pub threshold: f64,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self::from_constants(&Constants::default())
    }
}

impl OptimizeOptions {
    pub fn from_constants(constants: &Constants) -> Self {
        Self {
            min_share: constants.min_share,
            max_share: constants.max_share,
            step_size: constants.step_size,
            iterations: constants.max_iterations,
            threshold: constants.convergence_threshold,
        }
    }

    /// Rejects malformed options. Feasibility of the bounds is only checked
    /// for two or more shares; a single ingredient always gets 100.
    pub fn validate(&self, count: usize) -> Result<(), BlendError> {
        if !self.min_share.is_finite()
            || !self.max_share.is_finite()
            || self.min_share < 0.0
            || self.min_share > self.max_share
        {
            return Err(BlendError::InvalidBounds {
                min: self.min_share,
                max: self.max_share,
            });
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(BlendError::InvalidStep(self.step_size));
        }
        if count >= 2 && !bounds_feasible(count, self.min_share, self.max_share, TOTAL) {
            return Err(BlendError::InfeasibleBounds {
                count,
                min: self.min_share,
                max: self.max_share,
            });
        }
        Ok(())
    }
}

/// Whether `count` shares within `[min, max]` can sum to `total`.
pub(crate) fn bounds_feasible(count: usize, min: f64, max: f64, total: f64) -> bool {
    let count = count as f64;
    count * min <= total + 1e-9 && count * max >= total - 1e-9
}

pub(crate) fn validate_target(target: &AttributeTarget) -> Result<(), BlendError> {
    for (attribute, value) in target {
        if !value.is_finite() || *value < 0.0 {
            return Err(BlendError::InvalidTarget {
                key: attribute.to_string(),
                value: *value,
            });
        }
    }
    Ok(())
}

/// Optimizes shares for `ids` starting from an equal split.
///
/// Zero ids yield an empty mixture; one id yields a single share of 100.
pub fn optimize_weights(
    ids: &[IngredientId],
    target: &AttributeTarget,
    database: &IngredientDatabase,
    options: &OptimizeOptions,
) -> Result<Mixture, BlendError> {
    options.validate(ids.len())?;
    validate_target(target)?;
    Ok(optimize_unchecked(ids, target, database, options))
}

/// Optimizes starting from the amounts of an existing mixture instead of an
/// equal split. Amounts are first normalized to 100.
pub fn optimize_weights_from(
    seed: &[Share],
    target: &AttributeTarget,
    database: &IngredientDatabase,
    options: &OptimizeOptions,
) -> Result<Mixture, BlendError> {
    options.validate(seed.len())?;
    validate_target(target)?;
    let ids: Vec<IngredientId> = seed.iter().map(|share| share.ingredient.clone()).collect();
    if ids.len() < 2 {
        return Ok(single_or_empty(&ids));
    }
    let mut start: Vec<f64> = seed.iter().map(|share| share.amount).collect();
    project_to_bounds(&mut start, options.min_share, options.max_share, TOTAL);
    Ok(run(&ids, target, database, options, start))
}

/// Same as [`optimize_weights`] without validation. Bounds that the set size
/// cannot satisfy are honored on a best-effort basis; the sum stays 100.
pub(crate) fn optimize_unchecked(
    ids: &[IngredientId],
    target: &AttributeTarget,
    database: &IngredientDatabase,
    options: &OptimizeOptions,
) -> Mixture {
    if ids.len() < 2 {
        return single_or_empty(ids);
    }
    let mut start = vec![TOTAL / ids.len() as f64; ids.len()];
    project_to_bounds(&mut start, options.min_share, options.max_share, TOTAL);
    run(ids, target, database, options, start)
}

fn single_or_empty(ids: &[IngredientId]) -> Mixture {
    ids.first()
        .map(|id| vec![Share::free(id.clone(), TOTAL)])
        .unwrap_or_default()
}

fn run(
    ids: &[IngredientId],
    target: &AttributeTarget,
    database: &IngredientDatabase,
    options: &OptimizeOptions,
    start: Vec<f64>,
) -> Mixture {
    let table = CompositionTable::resolve(ids, database);
    let shares = search(&table, target, options, start);
    let finalized = finalize_shares(&shares, options.min_share, options.max_share, TOTAL);
    ids.iter()
        .zip(finalized)
        .map(|(id, amount)| Share::free(id.clone(), amount))
        .collect()
}

fn search(
    table: &CompositionTable<'_>,
    target: &AttributeTarget,
    options: &OptimizeOptions,
    mut current: Vec<f64>,
) -> Vec<f64> {
    let mut current_error = error(&table.aggregate(&current), target);
    for iteration in 0..options.iterations {
        if current_error < options.threshold {
            trace!(iteration, error = current_error, "weights converged");
            return current;
        }
        let Some((candidate, candidate_error)) =
            best_pair_move(table, target, options, &current, current_error)
        else {
            trace!(iteration, error = current_error, "weights at local optimum");
            return current;
        };
        current = candidate;
        current_error = candidate_error;
    }
    trace!(error = current_error, "weight iteration budget exhausted");
    current
}

/// The best strictly improving single-step move over all ordered pairs.
/// Ties keep the first candidate found.
fn best_pair_move(
    table: &CompositionTable<'_>,
    target: &AttributeTarget,
    options: &OptimizeOptions,
    current: &[f64],
    current_error: f64,
) -> Option<(Vec<f64>, f64)> {
    let n = current.len();
    let mut best: Option<Vec<f64>> = None;
    let mut best_error = current_error;
    for i in 0..n {
        for j in (i + 1)..n {
            for (up, down) in [(i, j), (j, i)] {
                let mut candidate = current.to_vec();
                candidate[up] += options.step_size;
                candidate[down] -= options.step_size;
                project_to_bounds(&mut candidate, options.min_share, options.max_share, TOTAL);
                let candidate_error = error(&table.aggregate(&candidate), target);
                if candidate_error < best_error {
                    best_error = candidate_error;
                    best = Some(candidate);
                }
            }
        }
    }
    best.map(|candidate| (candidate, best_error))
}
