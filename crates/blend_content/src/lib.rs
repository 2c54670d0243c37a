//! Content loading shared between blend_cli and blend_bench.

use anyhow::{Context, Result};
use blend_core::{
    Attribute, BlendContent, Constants, Ingredient, IngredientDatabase, PropertyRanges,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Compositions are rounded published figures, so a few points over 100 is
/// tolerated.
const MAX_COMPOSITION_TOTAL: f64 = 105.0;

#[derive(Deserialize)]
struct IngredientsFile {
    content_version: String,
    ingredients: Vec<Ingredient>,
}

/// Validates loaded content, panicking on any authoring error.
///
/// Catches mistakes like: an ingredient with an empty id, a composition that
/// adds up to well over 100%, or a property band whose min exceeds its max.
pub fn validate_content(content: &BlendContent) {
    for ingredient in content.ingredients.iter() {
        validate_ingredient(ingredient);
    }

    for (property, range) in content.ranges.iter() {
        assert!(
            range.min.is_finite() && range.max.is_finite() && range.min <= range.max,
            "range for '{property}' has min {} above max {}",
            range.min,
            range.max,
        );
        assert!(
            range.min >= 0.0 && range.max <= 100.0,
            "range for '{property}' ({}..{}) is outside 0..100",
            range.min,
            range.max,
        );
    }

    validate_constants(&content.constants);
}

fn validate_ingredient(ingredient: &Ingredient) {
    assert!(!ingredient.id.0.is_empty(), "ingredient has empty id");
    assert!(
        !ingredient.name.is_empty(),
        "ingredient '{}' has empty name",
        ingredient.id
    );
    for attribute in Attribute::ALL {
        let value = ingredient.composition[attribute];
        assert!(
            value.is_finite() && value >= 0.0,
            "ingredient '{}' has invalid {attribute} value {value}",
            ingredient.id,
        );
    }
    let total: f64 = ingredient.composition.iter().map(|(_, value)| value).sum();
    assert!(
        total <= MAX_COMPOSITION_TOTAL,
        "ingredient '{}' composition sums to {total}, above {MAX_COMPOSITION_TOTAL}",
        ingredient.id,
    );
}

fn validate_constants(c: &Constants) {
    assert!(c.step_size > 0.0, "constants.step_size must be positive");
    assert!(
        c.min_share >= 0.0 && c.min_share <= c.max_share && c.max_share <= 100.0,
        "constants.min_share/max_share must satisfy 0 <= min <= max <= 100",
    );
    assert!(
        c.random_min_count >= 1 && c.random_min_count <= c.random_max_count,
        "constants.random_min_count must be at least 1 and at most random_max_count",
    );
    assert!(
        c.random_min_share >= 0.0 && c.random_min_share <= c.random_max_share,
        "constants.random_min_share must not exceed random_max_share",
    );
    assert!(
        c.cupboard_base_portion > 0.0 && c.cupboard_base_portion < 100.0,
        "constants.cupboard_base_portion must be strictly between 0 and 100",
    );
    assert!(c.range_bonus > 0.0, "constants.range_bonus must be positive");
}

/// Panics if two ingredients share an id; the database would silently keep
/// only the last one.
fn check_unique_ids(ingredients: &[Ingredient]) {
    let mut seen = HashSet::new();
    for ingredient in ingredients {
        assert!(
            seen.insert(&ingredient.id),
            "duplicate ingredient id '{}'",
            ingredient.id
        );
    }
}

pub fn load_content(content_dir: &str) -> Result<BlendContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;
    let ranges: PropertyRanges = serde_json::from_str(
        &std::fs::read_to_string(dir.join("ranges.json")).context("reading ranges.json")?,
    )
    .context("parsing ranges.json")?;
    let ingredients_file: IngredientsFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("ingredients.json"))
            .context("reading ingredients.json")?,
    )
    .context("parsing ingredients.json")?;
    check_unique_ids(&ingredients_file.ingredients);

    let content = BlendContent {
        content_version: ingredients_file.content_version,
        ingredients: IngredientDatabase::from(ingredients_file.ingredients),
        ranges,
        constants,
    };
    validate_content(&content);
    tracing::debug!(
        version = %content.content_version,
        ingredients = content.ingredients.len(),
        "content loaded"
    );
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend_core::test_fixtures::{base_content, ingredient};
    use blend_core::{Property, PropertyRange};

    fn write_content_dir(content: &BlendContent) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let ingredients: Vec<Ingredient> = content.ingredients.iter().cloned().collect();
        let file = serde_json::json!({
            "content_version": content.content_version,
            "ingredients": ingredients,
        });
        std::fs::write(dir.path().join("ingredients.json"), file.to_string()).unwrap();
        std::fs::write(
            dir.path().join("ranges.json"),
            serde_json::to_string(&content.ranges).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("constants.json"),
            serde_json::to_string(&content.constants).unwrap(),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_base_content_passes_validation() {
        validate_content(&base_content());
    }

    #[test]
    fn test_load_round_trips_written_content() {
        let content = base_content();
        let dir = write_content_dir(&content);
        let loaded = load_content(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(loaded, content);
    }

    #[test]
    fn test_missing_file_reports_which() {
        let dir = write_content_dir(&base_content());
        std::fs::remove_file(dir.path().join("ranges.json")).unwrap();
        let err = load_content(dir.path().to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("reading ranges.json"));
    }

    #[test]
    fn test_unknown_attribute_is_a_parse_error() {
        let dir = write_content_dir(&base_content());
        let file = serde_json::json!({
            "content_version": "bad",
            "ingredients": [{
                "id": "mystery_oil",
                "name": "Mystery Oil",
                "composition": { "oleic": 50.0, "vaccenic": 10.0 }
            }],
        });
        std::fs::write(dir.path().join("ingredients.json"), file.to_string()).unwrap();
        let err = load_content(dir.path().to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing ingredients.json"));
    }

    #[test]
    #[should_panic(expected = "duplicate ingredient id")]
    fn test_duplicate_ids_panic() {
        check_unique_ids(&[
            ingredient("olive_oil", &[(Attribute::Oleic, 72.0)]),
            ingredient("olive_oil", &[(Attribute::Oleic, 70.0)]),
        ]);
    }

    #[test]
    #[should_panic(expected = "empty id")]
    fn test_empty_id_panics() {
        let mut content = base_content();
        content.ingredients =
            IngredientDatabase::from(vec![ingredient("", &[(Attribute::Oleic, 50.0)])]);
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "composition sums to")]
    fn test_overfull_composition_panics() {
        let mut content = base_content();
        content.ingredients = IngredientDatabase::from(vec![ingredient(
            "heavy_oil",
            &[(Attribute::Oleic, 80.0), (Attribute::Stearic, 40.0)],
        )]);
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "invalid lauric value")]
    fn test_negative_attribute_panics() {
        let mut content = base_content();
        content.ingredients = IngredientDatabase::from(vec![ingredient(
            "odd_oil",
            &[(Attribute::Lauric, -1.0), (Attribute::Oleic, 50.0)],
        )]);
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "above max")]
    fn test_inverted_range_panics() {
        let mut content = base_content();
        content
            .ranges
            .0
            .insert(Property::Hardness, PropertyRange { min: 60.0, max: 30.0 });
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "cupboard_base_portion")]
    fn test_bad_base_portion_panics() {
        let mut content = base_content();
        content.constants.cupboard_base_portion = 100.0;
        validate_content(&content);
    }
}
