//! Randomized generators for "hit every property range" requests.
//!
//! Two bounded phases run in order: pure random draws, then random subsets
//! whose shares come from the weight optimizer aimed at a fixed balanced
//! target. The first draw inside every range wins; otherwise the best
//! range-scoring draw seen in either phase is returned.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::{all_properties_in_range, range_score};
use crate::shares::finalize_shares;
use crate::weights::{bounds_feasible, optimize_unchecked, OptimizeOptions};
use crate::{
    mixture_total, Attribute, AttributeTarget, BlendError, Constants, Exclusions, Hold,
    IngredientDatabase, IngredientId, Mixture, OptimizationResult, PropertyRanges, Share,
};

const TOTAL: f64 = 100.0;

/// Fatty-acid profile near the middle of the standard bar-soap bands.
pub fn balanced_target() -> AttributeTarget {
    AttributeTarget::from([
        (Attribute::Lauric, 12.0),
        (Attribute::Myristic, 5.0),
        (Attribute::Palmitic, 14.0),
        (Attribute::Stearic, 8.0),
        (Attribute::Oleic, 42.0),
        (Attribute::Linoleic, 10.0),
        (Attribute::Ricinoleic, 3.0),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomOptions {
    #[serde(default)]
    pub exclusions: Exclusions,
    /// Fixed percentages kept at the front of every draw.
    #[serde(default)]
    pub lock: Vec<Share>,
    pub min_count: usize,
    pub max_count: usize,
    pub max_attempts: u32,
    pub optimized_attempts: u32,
    pub min_share: f64,
    pub max_share: f64,
}

impl Default for RandomOptions {
    fn default() -> Self {
        Self::from_constants(&Constants::default())
    }
}

impl RandomOptions {
    pub fn from_constants(constants: &Constants) -> Self {
        Self {
            exclusions: Exclusions::default(),
            lock: Vec::new(),
            min_count: constants.random_min_count,
            max_count: constants.random_max_count,
            max_attempts: constants.random_attempts,
            optimized_attempts: constants.optimized_attempts,
            min_share: constants.random_min_share,
            max_share: constants.random_max_share,
        }
    }

    fn validate(&self) -> Result<f64, BlendError> {
        if self.min_count == 0 || self.min_count > self.max_count {
            return Err(BlendError::InvalidCounts {
                min: self.min_count,
                max: self.max_count,
            });
        }
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
        // Free shares are finalized to whole percentages, so the locks must
        // be whole too for the batch to close at exactly 100.
        let whole = |amount: f64| amount.is_finite() && amount >= 0.0 && amount.fract() == 0.0;
        if let Some(share) = self.lock.iter().find(|share| !whole(share.amount)) {
            return Err(BlendError::InvalidLock {
                ingredient: share.ingredient.to_string(),
                amount: share.amount,
            });
        }
        let remainder = TOTAL - mixture_total(&self.lock);
        if remainder <= 0.0 {
            return Err(BlendError::LockedOverflow(TOTAL - remainder));
        }
        Ok(remainder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorPhase {
    Random,
    Optimized,
}

/// A generated mixture. `all_in_range` must be checked before presenting
/// the blend as satisfactory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedBlend {
    /// Error and match quality are measured against [`balanced_target`].
    pub result: OptimizationResult,
    pub range_score: f64,
    pub all_in_range: bool,
    pub phase: GeneratorPhase,
    /// Draws spent, across both phases, up to and including this one.
    pub attempt: u32,
}

/// Returns `None` when too few ingredients are eligible for `min_count`, or
/// when no allowed count can meet the share bounds.
pub fn generate_random(
    database: &IngredientDatabase,
    options: &RandomOptions,
    ranges: &PropertyRanges,
    constants: &Constants,
    rng: &mut impl Rng,
) -> Result<Option<GeneratedBlend>, BlendError> {
    let remainder = options.validate()?;
    let pool = eligible_pool(database, options);
    let Some(counts) = feasible_counts(options, pool.len(), remainder) else {
        debug!(eligible = pool.len(), "not enough eligible ingredients to generate");
        return Ok(None);
    };
    let ctx = DrawContext {
        database,
        options,
        ranges,
        constants,
        remainder,
        target: balanced_target(),
    };

    let mut best: Option<GeneratedBlend> = None;
    let mut attempt = 0;
    for _ in 0..options.max_attempts {
        attempt += 1;
        let ids = draw_subset(&pool, counts, rng);
        let amounts: Vec<f64> = ids
            .iter()
            .map(|_| rng.gen_range(options.min_share..=options.max_share))
            .collect();
        let blend = ctx.evaluate(&ids, &amounts, GeneratorPhase::Random, attempt);
        if blend.all_in_range {
            debug!(attempt, "random draw landed in range");
            return Ok(Some(blend));
        }
        keep_best(&mut best, blend);
    }

    let optimize = ctx.scaled_optimize_options();
    for _ in 0..options.optimized_attempts {
        attempt += 1;
        let ids = draw_subset(&pool, counts, rng);
        let mixture = optimize_unchecked(&ids, &ctx.target, database, &optimize);
        let amounts: Vec<f64> = mixture.iter().map(|share| share.amount).collect();
        let blend = ctx.evaluate(&ids, &amounts, GeneratorPhase::Optimized, attempt);
        if blend.all_in_range {
            debug!(attempt, "optimized draw landed in range");
            return Ok(Some(blend));
        }
        keep_best(&mut best, blend);
    }

    debug!(attempts = attempt, "no draw satisfied every range; returning best effort");
    Ok(best)
}

fn eligible_pool<'a>(
    database: &'a IngredientDatabase,
    options: &'a RandomOptions,
) -> Vec<&'a IngredientId> {
    database
        .eligible(&options.exclusions)
        .map(|ingredient| &ingredient.id)
        .filter(|id| !options.lock.iter().any(|share| &share.ingredient == *id))
        .collect()
}

/// Ingredient counts that the pool can supply and the share bounds can fill.
fn feasible_counts(
    options: &RandomOptions,
    pool_size: usize,
    remainder: f64,
) -> Option<(usize, usize)> {
    let max = options.max_count.min(pool_size);
    let allowed: Vec<usize> = (options.min_count..=max)
        .filter(|&count| bounds_feasible(count, options.min_share, options.max_share, remainder))
        .collect();
    Some((*allowed.first()?, *allowed.last()?))
}

fn draw_subset(
    pool: &[&IngredientId],
    counts: (usize, usize),
    rng: &mut impl Rng,
) -> Vec<IngredientId> {
    let count = rng.gen_range(counts.0..=counts.1);
    let mut shuffled = pool.to_vec();
    shuffled.shuffle(rng);
    shuffled.into_iter().take(count).cloned().collect()
}

fn keep_best(best: &mut Option<GeneratedBlend>, candidate: GeneratedBlend) {
    match best {
        Some(current) if candidate.range_score <= current.range_score => {}
        _ => *best = Some(candidate),
    }
}

struct DrawContext<'a> {
    database: &'a IngredientDatabase,
    options: &'a RandomOptions,
    ranges: &'a PropertyRanges,
    constants: &'a Constants,
    remainder: f64,
    target: AttributeTarget,
}

impl DrawContext<'_> {
    /// Optimizer bounds expressed relative to the free remainder, so that
    /// after scaling down the shares land inside the batch-level bounds.
    fn scaled_optimize_options(&self) -> OptimizeOptions {
        let scale = TOTAL / self.remainder;
        OptimizeOptions {
            min_share: (self.options.min_share * scale).min(TOTAL),
            max_share: (self.options.max_share * scale).min(TOTAL),
            ..OptimizeOptions::from_constants(self.constants)
        }
    }

    fn evaluate(
        &self,
        ids: &[IngredientId],
        amounts: &[f64],
        phase: GeneratorPhase,
        attempt: u32,
    ) -> GeneratedBlend {
        let free = finalize_shares(
            amounts,
            self.options.min_share,
            self.options.max_share,
            self.remainder,
        );
        let mixture: Mixture = self
            .options
            .lock
            .iter()
            .map(|share| Share {
                hold: Hold::Locked,
                ..share.clone()
            })
            .chain(ids.iter().zip(free).map(|(id, amount)| Share::free(id.clone(), amount)))
            .collect();
        let result =
            OptimizationResult::evaluate(mixture, self.database, &self.target, self.constants);
        GeneratedBlend {
            range_score: range_score(&result.properties, self.ranges, self.constants),
            all_in_range: all_properties_in_range(&result.properties, self.ranges),
            result,
            phase,
            attempt,
        }
    }
}
