//! Cupboard suggestions: complete an existing base blend with a few extra
//! ingredients so every property lands in range.
//!
//! There is no attribute target here, so candidate recipes are compared by
//! [`range_score`] instead of squared error.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::composition::{aggregate, derive_properties};
use crate::scoring::{all_properties_in_range, range_score};
use crate::shares::finalize_shares;
use crate::{
    mixture_total, BlendError, Constants, Exclusions, Hold, IngredientDatabase, IngredientId,
    Mixture, PropertyRanges, PropertySet, Share,
};

const TOTAL: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CupboardOptions {
    #[serde(default)]
    pub exclusions: Exclusions,
    /// Cap on suggestions, locked ones included.
    pub max_suggestions: usize,
    /// Always suggested, ahead of anything the search picks.
    #[serde(default)]
    pub locked_suggestions: Vec<IngredientId>,
    /// Lets the local search trade percentage between base ingredients too.
    #[serde(default)]
    pub allow_base_adjustment: bool,
    /// Percent of the batch kept for the base when suggestions are present.
    pub base_portion: f64,
    pub step_size: f64,
    pub iterations: u32,
    pub min_share: f64,
}

impl Default for CupboardOptions {
    fn default() -> Self {
        Self::from_constants(&Constants::default())
    }
}

impl CupboardOptions {
    pub fn from_constants(constants: &Constants) -> Self {
        Self {
            exclusions: Exclusions::default(),
            max_suggestions: constants.cupboard_max_suggestions,
            locked_suggestions: Vec::new(),
            allow_base_adjustment: false,
            base_portion: constants.cupboard_base_portion,
            step_size: constants.step_size,
            iterations: constants.cupboard_iterations,
            min_share: constants.cupboard_min_share,
        }
    }

    fn validate(&self) -> Result<(), BlendError> {
        if !self.base_portion.is_finite() || self.base_portion <= 0.0 || self.base_portion >= TOTAL
        {
            return Err(BlendError::InvalidPortion(self.base_portion));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(BlendError::InvalidStep(self.step_size));
        }
        if !self.min_share.is_finite() || self.min_share < 0.0 {
            return Err(BlendError::InvalidBounds {
                min: self.min_share,
                max: TOTAL,
            });
        }
        Ok(())
    }
}

/// An evaluated base-plus-suggestions recipe in percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CupboardRecipe {
    pub mixture: Mixture,
    pub properties: PropertySet,
    pub range_score: f64,
    pub all_in_range: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionOutcome {
    pub suggestions: Vec<IngredientId>,
    /// Base followed by suggestions, summing to 100.
    pub mixture: Mixture,
    pub current_properties: PropertySet,
    pub improved_properties: PropertySet,
    pub all_in_range: bool,
}

/// Splits the batch between `base` (kept in its own ratios) and
/// `suggestions` (equal split of the rest), then runs a bounded pairwise
/// search that only accepts strict range-score improvements.
pub fn optimize_cupboard_recipe(
    base: &[Share],
    suggestions: &[IngredientId],
    database: &IngredientDatabase,
    options: &CupboardOptions,
    ranges: &PropertyRanges,
    constants: &Constants,
) -> Result<CupboardRecipe, BlendError> {
    options.validate()?;
    Ok(RecipeSearch::new(base, suggestions, options).run(database, ranges, constants))
}

/// Greedily picks additions for `base` until every property is in range,
/// the suggestion cap is reached, or no candidate improves the recipe.
pub fn suggest_additions(
    base: &[Share],
    database: &IngredientDatabase,
    options: &CupboardOptions,
    ranges: &PropertyRanges,
    constants: &Constants,
) -> Result<SuggestionOutcome, BlendError> {
    options.validate()?;
    let current_properties = derive_properties(&aggregate(base, database));

    let mut selected: Vec<IngredientId> = Vec::new();
    for id in &options.locked_suggestions {
        if !database.contains(id) {
            warn!(%id, "locked suggestion not in database; skipping");
        } else if !selected.contains(id) && !base.iter().any(|share| &share.ingredient == id) {
            selected.push(id.clone());
        }
    }

    let evaluate = |ids: &[IngredientId]| {
        RecipeSearch::new(base, ids, options).run(database, ranges, constants)
    };
    let mut recipe = evaluate(&selected);

    while !recipe.all_in_range && selected.len() < options.max_suggestions {
        let mut best: Option<(IngredientId, CupboardRecipe)> = None;
        for candidate in database.eligible(&options.exclusions) {
            let id = &candidate.id;
            if selected.contains(id) || base.iter().any(|share| &share.ingredient == id) {
                continue;
            }
            let mut trial_ids = selected.clone();
            trial_ids.push(id.clone());
            let trial = evaluate(&trial_ids);
            if best.as_ref().map_or(true, |(_, current)| outranks(&trial, current)) {
                best = Some((id.clone(), trial));
            }
        }
        match best {
            Some((id, trial)) if outranks(&trial, &recipe) => {
                debug!(
                    %id,
                    score = trial.range_score,
                    in_range = trial.all_in_range,
                    "suggesting addition"
                );
                selected.push(id);
                recipe = trial;
            }
            _ => break,
        }
    }

    Ok(SuggestionOutcome {
        suggestions: selected,
        improved_properties: recipe.properties,
        all_in_range: recipe.all_in_range,
        mixture: recipe.mixture,
        current_properties,
    })
}

/// Full coverage beats any partial score; otherwise the higher score wins.
fn outranks(a: &CupboardRecipe, b: &CupboardRecipe) -> bool {
    match (a.all_in_range, b.all_in_range) {
        (true, false) => true,
        (false, true) => false,
        _ => a.range_score > b.range_score,
    }
}

struct RecipeSearch<'a> {
    options: &'a CupboardOptions,
    ids: Vec<IngredientId>,
    amounts: Vec<f64>,
    movable: Vec<usize>,
    /// Leading shares the search never moves.
    fixed_len: usize,
    base_len: usize,
}

impl<'a> RecipeSearch<'a> {
    fn new(base: &[Share], suggestions: &[IngredientId], options: &'a CupboardOptions) -> Self {
        let base_total = mixture_total(base);
        let base_portion = match (base_total > 0.0, suggestions.is_empty()) {
            (false, _) => 0.0,
            (true, true) => TOTAL,
            (true, false) => options.base_portion,
        };
        let suggestion_portion = TOTAL - base_portion;

        let mut ids = Vec::with_capacity(base.len() + suggestions.len());
        let mut amounts = Vec::with_capacity(base.len() + suggestions.len());
        for share in base {
            ids.push(share.ingredient.clone());
            amounts.push(if base_total > 0.0 {
                share.amount / base_total * base_portion
            } else {
                0.0
            });
        }
        for id in suggestions {
            ids.push(id.clone());
            amounts.push(suggestion_portion / suggestions.len() as f64);
        }

        let first_movable = if options.allow_base_adjustment { 0 } else { base.len() };
        Self {
            options,
            movable: (first_movable..ids.len()).collect(),
            fixed_len: first_movable,
            base_len: base.len(),
            ids,
            amounts,
        }
    }

    fn evaluate(&self, amounts: &[f64], database: &IngredientDatabase) -> PropertySet {
        let mixture: Vec<Share> = self
            .ids
            .iter()
            .zip(amounts)
            .map(|(id, amount)| Share::free(id.clone(), *amount))
            .collect();
        derive_properties(&aggregate(&mixture, database))
    }

    /// Rounds to whole percentages summing to 100. Fixed shares keep their
    /// rounded total; movable shares absorb the rest, residual on the first
    /// largest.
    fn finalize(&mut self) {
        let (fixed, movable) = self.amounts.split_at(self.fixed_len);
        let fixed_total = fixed.iter().sum::<f64>().round();
        let mut rounded = finalize_shares(fixed, 0.0, TOTAL, fixed_total);
        rounded.extend(finalize_shares(movable, 0.0, TOTAL, TOTAL - fixed_total));
        self.amounts = rounded;
    }

    fn run(
        mut self,
        database: &IngredientDatabase,
        ranges: &PropertyRanges,
        constants: &Constants,
    ) -> CupboardRecipe {
        let step = self.options.step_size;
        let mut properties = self.evaluate(&self.amounts, database);
        let mut score = range_score(&properties, ranges, constants);

        for _ in 0..self.options.iterations {
            if all_properties_in_range(&properties, ranges) {
                break;
            }
            let mut best: Option<(Vec<f64>, PropertySet, f64)> = None;
            for &up in &self.movable {
                for &down in &self.movable {
                    if up == down || self.amounts[down] - step < self.options.min_share {
                        continue;
                    }
                    let mut trial = self.amounts.clone();
                    trial[up] += step;
                    trial[down] -= step;
                    let trial_properties = self.evaluate(&trial, database);
                    let trial_score = range_score(&trial_properties, ranges, constants);
                    let threshold = best.as_ref().map_or(score, |(_, _, s)| *s);
                    if trial_score > threshold {
                        best = Some((trial, trial_properties, trial_score));
                    }
                }
            }
            let Some((amounts, trial_properties, trial_score)) = best else {
                break;
            };
            self.amounts = amounts;
            properties = trial_properties;
            score = trial_score;
        }

        self.finalize();
        let properties = self.evaluate(&self.amounts, database);
        let score = range_score(&properties, ranges, constants);

        let base_hold = if self.options.allow_base_adjustment {
            Hold::Free
        } else {
            Hold::Locked
        };
        let mixture = self
            .ids
            .into_iter()
            .zip(self.amounts)
            .enumerate()
            .map(|(i, (ingredient, amount))| Share {
                ingredient,
                amount,
                hold: if i < self.base_len { base_hold } else { Hold::Free },
            })
            .collect();
        CupboardRecipe {
            mixture,
            all_in_range: all_properties_in_range(&properties, ranges),
            properties,
            range_score: score,
        }
    }
}
