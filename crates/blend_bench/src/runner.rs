use crate::run_result::{self, BlendSummary, RunResult, RunStatus};
use crate::scenario::{BenchMode, Scenario};
use anyhow::{Context, Result};
use blend_core::{
    all_properties_in_range, balanced_target, find_best_set, generate_random, range_score,
    AttributeTarget, BestSetOptions, BlendContent, OptimizationResult, RandomOptions,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

pub struct SeedResult {
    pub seed: u64,
    pub run_id: String,
    pub wall_time_ms: u64,
    pub status: RunStatus,
    pub blend: Option<BlendSummary>,
}

pub fn run_seed(
    content: &BlendContent,
    scenario: &Scenario,
    seed: u64,
    seed_dir: &Path,
    scenario_params: &serde_json::Value,
) -> Result<SeedResult> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;

    let blend = match scenario.mode {
        BenchMode::Random => run_random(content, scenario, &mut rng)
            .with_context(|| format!("seed {seed}: random generation"))?,
        BenchMode::BestSet => Some(
            run_best_set(content, scenario, &mut rng)
                .with_context(|| format!("seed {seed}: best-set search"))?,
        ),
    };
    let status = if blend.is_some() {
        RunStatus::Completed
    } else {
        RunStatus::NoSolution
    };

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;
    debug!(seed, wall_time_ms, ?status, "seed finished");

    let run_result = RunResult {
        run_schema_version: 1,
        run_status: status,
        run_id: run_id.clone(),
        git_sha: run_result::git_sha(),
        git_dirty: run_result::git_dirty(),
        seed,
        scenario_name: scenario.name.clone(),
        scenario_params: scenario_params.clone(),
        mode: scenario.mode,
        content_version: content.content_version.clone(),
        wall_time_ms,
        blend,
        error_message: None,
    };
    run_result
        .write_atomic(&seed_dir.join("result.json"))
        .context("writing result.json")?;

    Ok(SeedResult {
        seed,
        run_id,
        wall_time_ms,
        status,
        blend: run_result.blend,
    })
}

fn run_random(
    content: &BlendContent,
    scenario: &Scenario,
    rng: &mut ChaCha8Rng,
) -> Result<Option<BlendSummary>> {
    let mut options = RandomOptions::from_constants(&content.constants);
    options.exclusions = scenario.exclusions.clone();
    options.lock = scenario.lock.clone();
    let generated = generate_random(
        &content.ingredients,
        &options,
        &content.ranges,
        &content.constants,
        rng,
    )?;
    Ok(generated.map(|blend| {
        let mut summary = summarize(blend.result, blend.range_score, blend.all_in_range);
        summary.phase = Some(blend.phase);
        summary.attempt = Some(blend.attempt);
        summary
    }))
}

fn run_best_set(
    content: &BlendContent,
    scenario: &Scenario,
    rng: &mut ChaCha8Rng,
) -> Result<BlendSummary> {
    let target = jittered_target(&balanced_target(), scenario.jitter_pct, rng);
    let mut options = BestSetOptions::from_constants(&content.constants);
    options.exclusions = scenario.exclusions.clone();
    let result = find_best_set(&target, &content.ingredients, &options, &content.constants)?;
    let score = range_score(&result.properties, &content.ranges, &content.constants);
    let in_range = all_properties_in_range(&result.properties, &content.ranges);
    Ok(summarize(result, score, in_range))
}

/// Scales every target value by an independent factor in
/// `[1 - pct/100, 1 + pct/100]`.
fn jittered_target(base: &AttributeTarget, jitter_pct: f64, rng: &mut impl Rng) -> AttributeTarget {
    if jitter_pct <= 0.0 {
        return base.clone();
    }
    let spread = jitter_pct / 100.0;
    base.iter()
        .map(|(&attribute, &value)| (attribute, value * (1.0 + rng.gen_range(-spread..=spread))))
        .collect()
}

fn summarize(result: OptimizationResult, range_score: f64, all_in_range: bool) -> BlendSummary {
    BlendSummary {
        ingredient_count: result.mixture.len(),
        mixture: result.mixture,
        properties: result.properties,
        range_score,
        all_in_range,
        match_quality: result.match_quality,
        error: result.error,
        phase: None,
        attempt: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend_core::{mixture_total, Attribute, IngredientFlag, IngredientId};
    use tempfile::TempDir;

    fn content() -> BlendContent {
        blend_content::load_content("../../content").unwrap()
    }

    fn scenario(json: serde_json::Value) -> Scenario {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_run_seed_produces_output() {
        let content = content();
        let temp_dir = TempDir::new().unwrap();
        let seed_dir = temp_dir.path().join("seed_42");
        let scenario = scenario(serde_json::json!({"name": "test_scenario", "seeds": [42]}));
        let params = serde_json::json!({"mode": "random"});

        let result = run_seed(&content, &scenario, 42, &seed_dir, &params).unwrap();

        assert_eq!(result.seed, 42);
        assert!(!result.run_id.is_empty());
        assert_eq!(result.status, RunStatus::Completed);
        let blend = result.blend.unwrap();
        assert!((mixture_total(&blend.mixture) - 100.0).abs() < 1e-6);
        assert!(blend.phase.is_some());
        assert!(seed_dir.join("result.json").exists());

        let content_str = std::fs::read_to_string(seed_dir.join("result.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content_str).unwrap();
        assert_eq!(parsed["run_schema_version"], 1);
        assert_eq!(parsed["run_status"], "completed");
        assert_eq!(parsed["seed"], 42);
        assert!(parsed["blend"].is_object());
    }

    #[test]
    fn test_run_seed_determinism() {
        let content = content();
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        let scenario = scenario(serde_json::json!({"name": "test", "seeds": [7]}));
        let params = serde_json::json!({});

        let result1 =
            run_seed(&content, &scenario, 7, &dir1.path().join("seed_7"), &params).unwrap();
        let result2 =
            run_seed(&content, &scenario, 7, &dir2.path().join("seed_7"), &params).unwrap();

        let (blend1, blend2) = (result1.blend.unwrap(), result2.blend.unwrap());
        assert_eq!(blend1.mixture, blend2.mixture);
        assert_eq!(blend1.attempt, blend2.attempt);
        assert_ne!(result1.run_id, result2.run_id);
    }

    #[test]
    fn test_best_set_mode_honors_flag_exclusions() {
        let content = content();
        let temp_dir = TempDir::new().unwrap();
        let scenario = scenario(serde_json::json!({
            "name": "vegan",
            "seeds": [3],
            "mode": "best_set",
            "exclusions": { "flags": ["animal_derived"] }
        }));

        let seed_dir = temp_dir.path().join("seed_3");
        let result = run_seed(&content, &scenario, 3, &seed_dir, &serde_json::json!({})).unwrap();

        let blend = result.blend.unwrap();
        assert!(blend.phase.is_none());
        assert!(blend.ingredient_count >= 1);
        for share in &blend.mixture {
            let ingredient = content.ingredients.get(&share.ingredient).unwrap();
            assert!(!ingredient.flags.contains(&IngredientFlag::AnimalDerived));
        }
    }

    #[test]
    fn test_random_mode_without_enough_ingredients_reports_no_solution() {
        let content = content();
        let temp_dir = TempDir::new().unwrap();
        let all_but_two: Vec<IngredientId> = content
            .ingredients
            .iter()
            .skip(2)
            .map(|ingredient| ingredient.id.clone())
            .collect();
        let scenario = scenario(serde_json::json!({
            "name": "starved",
            "seeds": [1],
            "exclusions": { "ids": all_but_two }
        }));
        let seed_dir = temp_dir.path().join("seed_1");

        let result = run_seed(&content, &scenario, 1, &seed_dir, &serde_json::json!({})).unwrap();

        assert_eq!(result.status, RunStatus::NoSolution);
        assert!(result.blend.is_none());
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(seed_dir.join("result.json")).unwrap())
                .unwrap();
        assert_eq!(parsed["run_status"], "no_solution");
    }

    #[test]
    fn test_jitter_stays_within_spread() {
        let base = AttributeTarget::from([(Attribute::Oleic, 50.0), (Attribute::Lauric, 10.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..20 {
            let jittered = jittered_target(&base, 10.0, &mut rng);
            assert!((45.0..=55.0).contains(&jittered[&Attribute::Oleic]));
            assert!((9.0..=11.0).contains(&jittered[&Attribute::Lauric]));
        }
        assert_eq!(jittered_target(&base, 0.0, &mut rng), base);
    }
}
