//! Shared test fixtures for blend_core and downstream crates.
//!
//! `sample_database()` holds fifteen common soap oils with whole-number
//! compositions, so a single ingredient at 100% aggregates exactly.

use crate::{
    Attribute, AttributeVector, BlendContent, Constants, Ingredient, IngredientDatabase,
    IngredientFlag, IngredientId, PropertyRanges,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Ingredient named after its id, with only the given attributes set.
pub fn ingredient(id: &str, composition: &[(Attribute, f64)]) -> Ingredient {
    flagged(id, composition, &[])
}

fn flagged(id: &str, composition: &[(Attribute, f64)], flags: &[IngredientFlag]) -> Ingredient {
    let mut vector = AttributeVector::default();
    for (attribute, value) in composition {
        vector[*attribute] = *value;
    }
    Ingredient {
        id: IngredientId::from(id),
        name: id.replace('_', " "),
        composition: vector,
        flags: flags.to_vec(),
    }
}

pub fn sample_database() -> IngredientDatabase {
    use Attribute::{
        Arachidic, Behenic, Capric, Caprylic, Erucic, Lauric, Linoleic, Linolenic, Myristic, Oleic,
        Palmitic, Palmitoleic, Ricinoleic, Stearic,
    };
    use IngredientFlag::{AnimalDerived, PalmDerived, Peanut, Soy, TreeNut};

    IngredientDatabase::from(vec![
        ingredient(
            "olive_oil",
            &[(Palmitic, 11.0), (Stearic, 4.0), (Oleic, 72.0), (Linoleic, 10.0), (Linolenic, 1.0)],
        ),
        ingredient(
            "coconut_oil",
            &[
                (Caprylic, 6.0),
                (Capric, 5.0),
                (Lauric, 48.0),
                (Myristic, 19.0),
                (Palmitic, 9.0),
                (Stearic, 3.0),
                (Oleic, 8.0),
                (Linoleic, 2.0),
            ],
        ),
        ingredient(
            "babassu_oil",
            &[
                (Capric, 3.0),
                (Lauric, 50.0),
                (Myristic, 20.0),
                (Palmitic, 11.0),
                (Stearic, 4.0),
                (Oleic, 10.0),
                (Linoleic, 2.0),
            ],
        ),
        flagged(
            "palm_oil",
            &[(Myristic, 1.0), (Palmitic, 44.0), (Stearic, 5.0), (Oleic, 39.0), (Linoleic, 10.0)],
            &[PalmDerived],
        ),
        flagged(
            "shea_butter",
            &[(Palmitic, 5.0), (Stearic, 40.0), (Oleic, 48.0), (Linoleic, 6.0), (Linolenic, 1.0)],
            &[TreeNut],
        ),
        ingredient(
            "castor_oil",
            &[(Palmitic, 1.0), (Stearic, 1.0), (Ricinoleic, 90.0), (Oleic, 4.0), (Linoleic, 4.0)],
        ),
        ingredient(
            "cocoa_butter",
            &[(Palmitic, 28.0), (Stearic, 33.0), (Oleic, 35.0), (Linoleic, 3.0)],
        ),
        ingredient(
            "mango_butter",
            &[(Palmitic, 7.0), (Stearic, 42.0), (Arachidic, 2.0), (Oleic, 45.0), (Linoleic, 3.0)],
        ),
        flagged(
            "sweet_almond_oil",
            &[(Palmitic, 7.0), (Stearic, 2.0), (Oleic, 71.0), (Linoleic, 18.0)],
            &[TreeNut],
        ),
        ingredient(
            "sunflower_oil",
            &[(Palmitic, 7.0), (Stearic, 4.0), (Oleic, 16.0), (Linoleic, 70.0), (Linolenic, 1.0)],
        ),
        ingredient(
            "canola_oil",
            &[
                (Palmitic, 4.0),
                (Stearic, 2.0),
                (Oleic, 61.0),
                (Linoleic, 21.0),
                (Linolenic, 9.0),
                (Erucic, 1.0),
            ],
        ),
        flagged(
            "soybean_oil",
            &[(Palmitic, 11.0), (Stearic, 5.0), (Oleic, 24.0), (Linoleic, 50.0), (Linolenic, 8.0)],
            &[Soy],
        ),
        flagged(
            "peanut_oil",
            &[
                (Palmitic, 8.0),
                (Stearic, 3.0),
                (Arachidic, 1.0),
                (Behenic, 3.0),
                (Oleic, 56.0),
                (Linoleic, 26.0),
            ],
            &[Peanut],
        ),
        flagged(
            "lard",
            &[
                (Myristic, 1.0),
                (Palmitic, 28.0),
                (Palmitoleic, 3.0),
                (Stearic, 13.0),
                (Oleic, 46.0),
                (Linoleic, 6.0),
            ],
            &[AnimalDerived],
        ),
        flagged(
            "tallow",
            &[
                (Myristic, 6.0),
                (Palmitic, 28.0),
                (Palmitoleic, 3.0),
                (Stearic, 22.0),
                (Oleic, 36.0),
                (Linoleic, 3.0),
            ],
            &[AnimalDerived],
        ),
    ])
}

/// Sample database with the standard ranges and default constants.
pub fn base_content() -> BlendContent {
    BlendContent {
        content_version: "test".to_string(),
        ingredients: sample_database(),
        ranges: PropertyRanges::standard(),
        constants: Constants::default(),
    }
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
