//! Type definitions for `blend_core`.
//!
//! Attribute and property keys, ingredient records, mixtures, targets and the
//! tunable constants shared by every optimizer.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::BlendError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Sparse attribute-level target. Unspecified keys are unconstrained.
pub type AttributeTarget = BTreeMap<Attribute, f64>;
/// Sparse property-level target.
pub type PropertyTarget = BTreeMap<Property, f64>;
/// Ordered sequence of shares. Locked entries, when present, form a prefix.
pub type Mixture = Vec<Share>;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(IngredientId);

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Fatty-acid keys tracked per ingredient and per mixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Caprylic,
    Capric,
    Lauric,
    Myristic,
    Palmitic,
    Palmitoleic,
    Stearic,
    Arachidic,
    Behenic,
    Oleic,
    Ricinoleic,
    Linoleic,
    Linolenic,
    Erucic,
}

impl Attribute {
    pub const ALL: [Attribute; 14] = [
        Attribute::Caprylic,
        Attribute::Capric,
        Attribute::Lauric,
        Attribute::Myristic,
        Attribute::Palmitic,
        Attribute::Palmitoleic,
        Attribute::Stearic,
        Attribute::Arachidic,
        Attribute::Behenic,
        Attribute::Oleic,
        Attribute::Ricinoleic,
        Attribute::Linoleic,
        Attribute::Linolenic,
        Attribute::Erucic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Caprylic => "caprylic",
            Attribute::Capric => "capric",
            Attribute::Lauric => "lauric",
            Attribute::Myristic => "myristic",
            Attribute::Palmitic => "palmitic",
            Attribute::Palmitoleic => "palmitoleic",
            Attribute::Stearic => "stearic",
            Attribute::Arachidic => "arachidic",
            Attribute::Behenic => "behenic",
            Attribute::Oleic => "oleic",
            Attribute::Ricinoleic => "ricinoleic",
            Attribute::Linoleic => "linoleic",
            Attribute::Linolenic => "linolenic",
            Attribute::Erucic => "erucic",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = BlendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|attribute| attribute.as_str() == s)
            .ok_or_else(|| BlendError::UnknownAttribute(s.to_string()))
    }
}

/// Percentage of every tracked attribute. Always fully populated; keys
/// missing from JSON default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AttributeVector {
    pub caprylic: f64,
    pub capric: f64,
    pub lauric: f64,
    pub myristic: f64,
    pub palmitic: f64,
    pub palmitoleic: f64,
    pub stearic: f64,
    pub arachidic: f64,
    pub behenic: f64,
    pub oleic: f64,
    pub ricinoleic: f64,
    pub linoleic: f64,
    pub linolenic: f64,
    pub erucic: f64,
}

impl AttributeVector {
    pub fn get(&self, attribute: Attribute) -> f64 {
        self[attribute]
    }

    /// Iterates every attribute in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        Attribute::ALL
            .into_iter()
            .map(move |attribute| (attribute, self[attribute]))
    }

    /// Sum of the listed attributes.
    pub fn sum_of(&self, attributes: &[Attribute]) -> f64 {
        attributes.iter().map(|attribute| self[*attribute]).sum()
    }
}

impl Index<Attribute> for AttributeVector {
    type Output = f64;

    fn index(&self, attribute: Attribute) -> &f64 {
        match attribute {
            Attribute::Caprylic => &self.caprylic,
            Attribute::Capric => &self.capric,
            Attribute::Lauric => &self.lauric,
            Attribute::Myristic => &self.myristic,
            Attribute::Palmitic => &self.palmitic,
            Attribute::Palmitoleic => &self.palmitoleic,
            Attribute::Stearic => &self.stearic,
            Attribute::Arachidic => &self.arachidic,
            Attribute::Behenic => &self.behenic,
            Attribute::Oleic => &self.oleic,
            Attribute::Ricinoleic => &self.ricinoleic,
            Attribute::Linoleic => &self.linoleic,
            Attribute::Linolenic => &self.linolenic,
            Attribute::Erucic => &self.erucic,
        }
    }
}

impl IndexMut<Attribute> for AttributeVector {
    fn index_mut(&mut self, attribute: Attribute) -> &mut f64 {
        match attribute {
            Attribute::Caprylic => &mut self.caprylic,
            Attribute::Capric => &mut self.capric,
            Attribute::Lauric => &mut self.lauric,
            Attribute::Myristic => &mut self.myristic,
            Attribute::Palmitic => &mut self.palmitic,
            Attribute::Palmitoleic => &mut self.palmitoleic,
            Attribute::Stearic => &mut self.stearic,
            Attribute::Arachidic => &mut self.arachidic,
            Attribute::Behenic => &mut self.behenic,
            Attribute::Oleic => &mut self.oleic,
            Attribute::Ricinoleic => &mut self.ricinoleic,
            Attribute::Linoleic => &mut self.linoleic,
            Attribute::Linolenic => &mut self.linolenic,
            Attribute::Erucic => &mut self.erucic,
        }
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Derived quality properties, each a fixed sum of attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Hardness,
    Degreasing,
    Moisturizing,
    LatherVolume,
    Creaminess,
}

impl Property {
    pub const ALL: [Property; 5] = [
        Property::Hardness,
        Property::Degreasing,
        Property::Moisturizing,
        Property::LatherVolume,
        Property::Creaminess,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Property::Hardness => "hardness",
            Property::Degreasing => "degreasing",
            Property::Moisturizing => "moisturizing",
            Property::LatherVolume => "lather_volume",
            Property::Creaminess => "creaminess",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Property {
    type Err = BlendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .into_iter()
            .find(|property| property.as_str() == s)
            .ok_or_else(|| BlendError::UnknownProperty(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    pub hardness: f64,
    pub degreasing: f64,
    pub moisturizing: f64,
    pub lather_volume: f64,
    pub creaminess: f64,
}

impl PropertySet {
    pub fn get(&self, property: Property) -> f64 {
        match property {
            Property::Hardness => self.hardness,
            Property::Degreasing => self.degreasing,
            Property::Moisturizing => self.moisturizing,
            Property::LatherVolume => self.lather_volume,
            Property::Creaminess => self.creaminess,
        }
    }
}

/// Inclusive acceptable band for one property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyRange {
    pub min: f64,
    pub max: f64,
}

impl PropertyRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Distance from `value` to the nearest edge of the band; zero inside it.
    pub fn distance(&self, value: f64) -> f64 {
        if value < self.min {
            self.min - value
        } else if value > self.max {
            value - self.max
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyRanges(pub BTreeMap<Property, PropertyRange>);

impl PropertyRanges {
    /// Commonly published bands for bar soap.
    pub fn standard() -> Self {
        Self(BTreeMap::from([
            (Property::Hardness, PropertyRange { min: 29.0, max: 54.0 }),
            (Property::Degreasing, PropertyRange { min: 12.0, max: 22.0 }),
            (Property::Moisturizing, PropertyRange { min: 44.0, max: 69.0 }),
            (Property::LatherVolume, PropertyRange { min: 14.0, max: 46.0 }),
            (Property::Creaminess, PropertyRange { min: 16.0, max: 48.0 }),
        ]))
    }

    pub fn get(&self, property: Property) -> Option<&PropertyRange> {
        self.0.get(&property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Property, &PropertyRange)> {
        self.0.iter().map(|(property, range)| (*property, range))
    }

    /// Midpoint of every band, used when a generator needs a single target.
    pub fn midpoints(&self) -> PropertyTarget {
        self.iter()
            .map(|(property, range)| (property, (range.min + range.max) / 2.0))
            .collect()
    }
}

impl Default for PropertyRanges {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Ingredients
// ---------------------------------------------------------------------------

/// Dietary and ethical markers used for exclusion filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientFlag {
    AnimalDerived,
    PalmDerived,
    TreeNut,
    Peanut,
    Soy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub composition: AttributeVector,
    #[serde(default)]
    pub flags: Vec<IngredientFlag>,
}

/// Read-only ingredient reference data, iterated in id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Ingredient>", into = "Vec<Ingredient>")]
pub struct IngredientDatabase {
    ingredients: BTreeMap<IngredientId, Ingredient>,
}

impl IngredientDatabase {
    pub fn get(&self, id: &IngredientId) -> Option<&Ingredient> {
        self.ingredients.get(id)
    }

    pub fn contains(&self, id: &IngredientId) -> bool {
        self.ingredients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.values()
    }

    /// Ingredients not ruled out by `exclusions`, in id order.
    pub fn eligible<'a>(
        &'a self,
        exclusions: &'a Exclusions,
    ) -> impl Iterator<Item = &'a Ingredient> {
        self.iter().filter(move |ingredient| !exclusions.excludes(ingredient))
    }
}

impl From<Vec<Ingredient>> for IngredientDatabase {
    fn from(ingredients: Vec<Ingredient>) -> Self {
        Self {
            ingredients: ingredients
                .into_iter()
                .map(|ingredient| (ingredient.id.clone(), ingredient))
                .collect(),
        }
    }
}

impl From<IngredientDatabase> for Vec<Ingredient> {
    fn from(database: IngredientDatabase) -> Self {
        database.ingredients.into_values().collect()
    }
}

/// Ingredients a caller refuses to use, by id or by flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub ids: AHashSet<IngredientId>,
    #[serde(default)]
    pub flags: Vec<IngredientFlag>,
}

impl Exclusions {
    pub fn excludes(&self, ingredient: &Ingredient) -> bool {
        self.ids.contains(&ingredient.id)
            || ingredient.flags.iter().any(|flag| self.flags.contains(flag))
    }
}

// ---------------------------------------------------------------------------
// Mixtures
// ---------------------------------------------------------------------------

/// Whether the optimizer may change a share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hold {
    #[default]
    Free,
    Locked,
}

/// One mixture member. `amount` is a weight or a percentage; consumers
/// normalize by the mixture total, so the basis never matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub ingredient: IngredientId,
    pub amount: f64,
    #[serde(default)]
    pub hold: Hold,
}

impl Share {
    pub fn free(ingredient: IngredientId, amount: f64) -> Self {
        Self {
            ingredient,
            amount,
            hold: Hold::Free,
        }
    }

    pub fn locked(ingredient: IngredientId, amount: f64) -> Self {
        Self {
            ingredient,
            amount,
            hold: Hold::Locked,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.hold == Hold::Locked
    }
}

/// Sum of all share amounts.
pub fn mixture_total(mixture: &[Share]) -> f64 {
    mixture.iter().map(|share| share.amount).sum()
}

/// Fully evaluated mixture. Call-scoped; never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub mixture: Mixture,
    pub attributes: AttributeVector,
    pub properties: PropertySet,
    pub error: f64,
    pub match_quality: f64,
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// Reference data plus tuning, as loaded from the content directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendContent {
    pub content_version: String,
    pub ingredients: IngredientDatabase,
    pub ranges: PropertyRanges,
    pub constants: Constants,
}

/// Hand-tuned heuristics and default search budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    /// Squared-error level treated as converged.
    pub convergence_threshold: f64,
    /// Percentage points moved per pairwise adjustment.
    pub step_size: f64,
    pub max_iterations: u32,
    pub min_share: f64,
    pub max_share: f64,
    /// Points of match quality lost per point of mean absolute deviation.
    pub match_quality_scale: f64,
    pub usefulness_flat_bonus: f64,
    pub usefulness_overshoot_penalty: f64,
    pub range_bonus: f64,
    /// Range-score points lost per point outside a band.
    pub range_decay: f64,
    pub max_set_size: usize,
    pub random_attempts: u32,
    pub optimized_attempts: u32,
    pub random_min_count: usize,
    pub random_max_count: usize,
    pub random_min_share: f64,
    pub random_max_share: f64,
    pub cupboard_base_portion: f64,
    pub cupboard_max_suggestions: usize,
    pub cupboard_iterations: u32,
    pub cupboard_min_share: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            convergence_threshold: 0.01,
            step_size: 2.0,
            max_iterations: 100,
            min_share: 0.0,
            max_share: 100.0,
            match_quality_scale: 2.0,
            usefulness_flat_bonus: 5.0,
            usefulness_overshoot_penalty: 0.5,
            range_bonus: 20.0,
            range_decay: 1.0,
            max_set_size: 5,
            random_attempts: 50,
            optimized_attempts: 20,
            random_min_count: 3,
            random_max_count: 5,
            random_min_share: 5.0,
            random_max_share: 60.0,
            cupboard_base_portion: 75.0,
            cupboard_max_suggestions: 3,
            cupboard_iterations: 50,
            cupboard_min_share: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_hold_defaults_to_free() {
        let free: Share = serde_json::from_str(r#"{"ingredient": "olive_oil", "amount": 40}"#)
            .unwrap();
        assert_eq!(free.hold, Hold::Free);
        assert!((free.amount - 40.0).abs() < 1e-12);

        let locked: Share = serde_json::from_str(
            r#"{"ingredient": "castor_oil", "amount": 5, "hold": "locked"}"#,
        )
        .unwrap();
        assert!(locked.is_locked());
        assert_eq!(locked.ingredient, IngredientId::from("castor_oil"));
    }

    #[test]
    fn database_reads_a_list_and_writes_it_back_in_id_order() {
        let json = r#"[
            {"id": "shea_butter", "name": "Shea Butter",
             "composition": {"stearic": 40, "oleic": 48}, "flags": ["tree_nut"]},
            {"id": "olive_oil", "name": "Olive Oil", "composition": {"oleic": 72}}
        ]"#;
        let database: IngredientDatabase = serde_json::from_str(json).unwrap();
        let olive = database.get(&IngredientId::from("olive_oil")).unwrap();
        assert!(olive.flags.is_empty());
        assert!((olive.composition.oleic - 72.0).abs() < 1e-12);
        assert!(olive.composition.lauric.abs() < 1e-12);

        let written = serde_json::to_value(&database).unwrap();
        let ids: Vec<&str> = written
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["olive_oil", "shea_butter"]);
        assert_eq!(written[1]["flags"][0], "tree_nut");
    }

    #[test]
    fn unknown_attribute_key_is_rejected() {
        let result: Result<AttributeVector, _> =
            serde_json::from_str(r#"{"oleic": 70, "olive": 1}"#);
        assert!(result.is_err());
    }
}
