use crate::scenario::BenchMode;
use blend_core::{GeneratorPhase, Mixture, PropertySet};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub run_schema_version: u32,
    pub run_status: RunStatus,
    pub run_id: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed: u64,
    pub scenario_name: String,
    pub scenario_params: serde_json::Value,
    pub mode: BenchMode,
    pub content_version: String,
    pub wall_time_ms: u64,
    pub blend: Option<BlendSummary>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Too few eligible ingredients to draw a blend.
    NoSolution,
}

/// The scored outcome of one seed.
#[derive(Debug, Clone, Serialize)]
pub struct BlendSummary {
    pub mixture: Mixture,
    pub ingredient_count: usize,
    pub properties: PropertySet,
    pub range_score: f64,
    pub all_in_range: bool,
    pub match_quality: f64,
    pub error: f64,
    /// Generator phase; absent for `best_set` runs.
    pub phase: Option<GeneratorPhase>,
    pub attempt: Option<u32>,
}

impl RunResult {
    /// Write JSON atomically: write to `.tmp` then rename.
    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

pub fn git_sha() -> String {
    env!("GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("GIT_DIRTY") == "true"
}

#[cfg(test)]
mod tests {
    use super::*;
    use blend_core::{IngredientId, Share};

    fn sample_blend() -> BlendSummary {
        BlendSummary {
            mixture: vec![
                Share::free(IngredientId::from("olive_oil"), 60.0),
                Share::free(IngredientId::from("coconut_oil"), 40.0),
            ],
            ingredient_count: 2,
            properties: PropertySet {
                hardness: 40.0,
                degreasing: 19.0,
                moisturizing: 60.0,
                lather_volume: 19.0,
                creaminess: 21.0,
            },
            range_score: 100.0,
            all_in_range: true,
            match_quality: 88.5,
            error: 41.0,
            phase: Some(GeneratorPhase::Random),
            attempt: Some(3),
        }
    }

    fn sample_result(blend: Option<BlendSummary>) -> RunResult {
        RunResult {
            run_schema_version: 1,
            run_status: if blend.is_some() {
                RunStatus::Completed
            } else {
                RunStatus::NoSolution
            },
            run_id: "test-uuid".to_string(),
            git_sha: "abc123".to_string(),
            git_dirty: false,
            seed: 42,
            scenario_name: "test_scenario".to_string(),
            scenario_params: serde_json::json!({"mode": "random"}),
            mode: BenchMode::Random,
            content_version: "test".to_string(),
            wall_time_ms: 5,
            blend,
            error_message: None,
        }
    }

    #[test]
    fn test_run_result_serialization() {
        let result = sample_result(Some(sample_blend()));
        let json = serde_json::to_string_pretty(&result).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["run_schema_version"], 1);
        assert_eq!(parsed["run_status"], "completed");
        assert_eq!(parsed["mode"], "random");
        assert_eq!(parsed["seed"], 42);
        assert_eq!(parsed["blend"]["phase"], "random");
        assert_eq!(parsed["blend"]["mixture"][0]["hold"], "free");
        assert!(parsed["blend"]["properties"]["hardness"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_no_solution_serializes_null_blend() {
        let result = sample_result(None);
        let parsed = serde_json::to_value(&result).unwrap();
        assert_eq!(parsed["run_status"], "no_solution");
        assert!(parsed["blend"].is_null());
    }

    #[test]
    fn test_atomic_write() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        sample_result(Some(sample_blend())).write_atomic(&path).unwrap();
        assert!(path.exists());
        // Tmp file should not remain
        assert!(!path.with_extension("json.tmp").exists());

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["blend"]["ingredient_count"], 2);
    }

    #[test]
    fn test_git_sha_not_empty() {
        assert!(!git_sha().is_empty());
    }
}
