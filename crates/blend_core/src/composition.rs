//! Composition model: mixture → attribute vector → property set.
//!
//! Pure arithmetic. Nothing here iterates toward a goal; the optimizers call
//! into these functions on every candidate they evaluate.

use crate::{
    mixture_total, Attribute, AttributeVector, IngredientDatabase, IngredientId, PropertySet,
    Share,
};

const HARDNESS: [Attribute; 4] = [
    Attribute::Lauric,
    Attribute::Myristic,
    Attribute::Palmitic,
    Attribute::Stearic,
];
const DEGREASING: [Attribute; 2] = [Attribute::Lauric, Attribute::Myristic];
const MOISTURIZING: [Attribute; 6] = [
    Attribute::Oleic,
    Attribute::Ricinoleic,
    Attribute::Linoleic,
    Attribute::Linolenic,
    Attribute::Palmitoleic,
    Attribute::Erucic,
];
const LATHER_VOLUME: [Attribute; 3] = [
    Attribute::Lauric,
    Attribute::Myristic,
    Attribute::Ricinoleic,
];
const CREAMINESS: [Attribute; 3] = [
    Attribute::Palmitic,
    Attribute::Stearic,
    Attribute::Ricinoleic,
];

/// Returns an amount-weighted average composition given a slice of
/// `(composition, amount)` pairs.
///
/// For each attribute: `sum(value_i * amount_i) / sum(amount_i)`.
///
/// Returns the zero vector when the total amount is zero or near-zero.
pub(crate) fn weighted_average(pairs: &[(&AttributeVector, f64)]) -> AttributeVector {
    let total: f64 = pairs.iter().map(|(_, amount)| amount).sum();
    if total < 1e-9 {
        return AttributeVector::default();
    }
    let mut result = AttributeVector::default();
    for (composition, amount) in pairs {
        for (attribute, value) in composition.iter() {
            result[attribute] += value * amount;
        }
    }
    for attribute in Attribute::ALL {
        result[attribute] /= total;
    }
    result
}

/// Share-weighted average of every attribute across the mixture.
///
/// Shares naming an ingredient the database does not know are skipped and do
/// not count toward the denominator.
pub fn aggregate(mixture: &[Share], database: &IngredientDatabase) -> AttributeVector {
    let pairs: Vec<(&AttributeVector, f64)> = mixture
        .iter()
        .filter_map(|share| {
            database
                .get(&share.ingredient)
                .map(|ingredient| (&ingredient.composition, share.amount))
        })
        .collect();
    weighted_average(&pairs)
}

pub fn derive_properties(attributes: &AttributeVector) -> PropertySet {
    PropertySet {
        hardness: attributes.sum_of(&HARDNESS),
        degreasing: attributes.sum_of(&DEGREASING),
        moisturizing: attributes.sum_of(&MOISTURIZING),
        lather_volume: attributes.sum_of(&LATHER_VOLUME),
        creaminess: attributes.sum_of(&CREAMINESS),
    }
}

/// Rescales a mixture (weights or percentages) so its amounts sum to 100.
/// Holds are preserved. A zero-total mixture is returned unchanged.
pub fn normalize_to_percent(mixture: &[Share]) -> Vec<Share> {
    let total = mixture_total(mixture);
    if total < 1e-9 {
        return mixture.to_vec();
    }
    mixture
        .iter()
        .map(|share| Share {
            amount: share.amount * 100.0 / total,
            ..share.clone()
        })
        .collect()
}

/// Compositions resolved once for a fixed, ordered id list so the optimizers
/// can evaluate candidate share vectors without repeated database lookups.
pub(crate) struct CompositionTable<'a> {
    rows: Vec<Option<&'a AttributeVector>>,
}

impl<'a> CompositionTable<'a> {
    pub(crate) fn resolve(ids: &[IngredientId], database: &'a IngredientDatabase) -> Self {
        Self {
            rows: ids
                .iter()
                .map(|id| database.get(id).map(|ingredient| &ingredient.composition))
                .collect(),
        }
    }

    /// Same semantics as [`aggregate`], over parallel share amounts.
    pub(crate) fn aggregate(&self, amounts: &[f64]) -> AttributeVector {
        let pairs: Vec<(&AttributeVector, f64)> = self
            .rows
            .iter()
            .zip(amounts)
            .filter_map(|(row, amount)| row.map(|composition| (composition, *amount)))
            .collect();
        weighted_average(&pairs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
