use anyhow::{bail, Result};
use blend_core::Constants;
use std::collections::HashMap;

const VALID_KEYS: &[&str] = &[
    "convergence_threshold",
    "step_size",
    "max_iterations",
    "min_share",
    "max_share",
    "match_quality_scale",
    "usefulness_flat_bonus",
    "usefulness_overshoot_penalty",
    "range_bonus",
    "range_decay",
    "max_set_size",
    "random_attempts",
    "optimized_attempts",
    "random_min_count",
    "random_max_count",
    "random_min_share",
    "random_max_share",
    "cupboard_base_portion",
    "cupboard_max_suggestions",
    "cupboard_iterations",
    "cupboard_min_share",
];

pub fn apply_overrides(
    constants: &mut Constants,
    overrides: &HashMap<String, serde_json::Value>,
) -> Result<()> {
    for (key, value) in overrides {
        match key.as_str() {
            "convergence_threshold" => constants.convergence_threshold = as_f64(key, value)?,
            "step_size" => constants.step_size = as_f64(key, value)?,
            "max_iterations" => constants.max_iterations = as_u32(key, value)?,
            "min_share" => constants.min_share = as_f64(key, value)?,
            "max_share" => constants.max_share = as_f64(key, value)?,
            "match_quality_scale" => constants.match_quality_scale = as_f64(key, value)?,
            "usefulness_flat_bonus" => constants.usefulness_flat_bonus = as_f64(key, value)?,
            "usefulness_overshoot_penalty" => {
                constants.usefulness_overshoot_penalty = as_f64(key, value)?;
            }
            "range_bonus" => constants.range_bonus = as_f64(key, value)?,
            "range_decay" => constants.range_decay = as_f64(key, value)?,
            "max_set_size" => constants.max_set_size = as_usize(key, value)?,
            "random_attempts" => constants.random_attempts = as_u32(key, value)?,
            "optimized_attempts" => constants.optimized_attempts = as_u32(key, value)?,
            "random_min_count" => constants.random_min_count = as_usize(key, value)?,
            "random_max_count" => constants.random_max_count = as_usize(key, value)?,
            "random_min_share" => constants.random_min_share = as_f64(key, value)?,
            "random_max_share" => constants.random_max_share = as_f64(key, value)?,
            "cupboard_base_portion" => constants.cupboard_base_portion = as_f64(key, value)?,
            "cupboard_max_suggestions" => {
                constants.cupboard_max_suggestions = as_usize(key, value)?;
            }
            "cupboard_iterations" => constants.cupboard_iterations = as_u32(key, value)?,
            "cupboard_min_share" => constants.cupboard_min_share = as_f64(key, value)?,
            _ => bail!(
                "unknown override key '{key}'. Valid keys: {}",
                VALID_KEYS.join(", ")
            ),
        }
    }
    Ok(())
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow::anyhow!("override '{key}': expected a number, got {value}"))
}

fn as_u64(key: &str, value: &serde_json::Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        anyhow::anyhow!("override '{key}': expected a positive integer, got {value}")
    })
}

fn as_u32(key: &str, value: &serde_json::Value) -> Result<u32> {
    let val = as_u64(key, value)?;
    u32::try_from(val)
        .map_err(|_| anyhow::anyhow!("override '{key}': value {val} exceeds u32 range"))
}

fn as_usize(key: &str, value: &serde_json::Value) -> Result<usize> {
    let val = as_u64(key, value)?;
    usize::try_from(val)
        .map_err(|_| anyhow::anyhow!("override '{key}': value {val} exceeds usize range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_constants() -> Constants {
        serde_json::from_str(include_str!("../../../content/constants.json")).unwrap()
    }

    #[test]
    fn test_apply_f64_override() {
        let mut constants = default_constants();
        let overrides = HashMap::from([(
            "random_max_share".to_string(),
            serde_json::json!(45.0),
        )]);
        apply_overrides(&mut constants, &overrides).unwrap();
        assert!((constants.random_max_share - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_integer_overrides() {
        let mut constants = default_constants();
        let overrides = HashMap::from([
            ("random_attempts".to_string(), serde_json::json!(200)),
            ("max_set_size".to_string(), serde_json::json!(3)),
        ]);
        apply_overrides(&mut constants, &overrides).unwrap();
        assert_eq!(constants.random_attempts, 200);
        assert_eq!(constants.max_set_size, 3);
    }

    #[test]
    fn test_every_valid_key_is_accepted() {
        let mut constants = default_constants();
        for key in VALID_KEYS {
            let overrides = HashMap::from([(key.to_string(), serde_json::json!(4))]);
            apply_overrides(&mut constants, &overrides)
                .unwrap_or_else(|err| panic!("key {key} rejected: {err}"));
        }
    }

    #[test]
    fn test_unknown_key_errors() {
        let mut constants = default_constants();
        let overrides = HashMap::from([("nonexistent_field".to_string(), serde_json::json!(1.0))]);
        let result = apply_overrides(&mut constants, &overrides);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown override key"));
        assert!(err.contains("nonexistent_field"));
    }

    #[test]
    fn test_type_mismatch_errors() {
        let mut constants = default_constants();
        let overrides = HashMap::from([(
            "random_min_count".to_string(),
            serde_json::json!("three"),
        )]);
        assert!(apply_overrides(&mut constants, &overrides).is_err());

        let negative = HashMap::from([("max_iterations".to_string(), serde_json::json!(-5))]);
        assert!(apply_overrides(&mut constants, &negative).is_err());
    }
}
