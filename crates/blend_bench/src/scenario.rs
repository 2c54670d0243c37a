use anyhow::{bail, Context, Result};
use blend_core::{Exclusions, Share};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seeds: SeedSpec,
    #[serde(default)]
    pub mode: BenchMode,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    #[serde(default)]
    pub overrides: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub exclusions: Exclusions,
    /// Fixed percentages for `random` mode.
    #[serde(default)]
    pub lock: Vec<Share>,
    /// Per-seed relative perturbation of the balanced target in `best_set`
    /// mode, in percent.
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchMode {
    #[default]
    Random,
    BestSet,
}

fn default_content_dir() -> String {
    "./content".to_string()
}

fn default_jitter_pct() -> f64 {
    10.0
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    List(Vec<u64>),
    Range { range: [u64; 2] },
}

impl SeedSpec {
    pub fn expand(&self) -> Vec<u64> {
        match self {
            SeedSpec::List(seeds) => seeds.clone(),
            SeedSpec::Range { range } => (range[0]..=range[1]).collect(),
        }
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    if scenario.name.is_empty() {
        bail!("scenario 'name' must not be empty");
    }
    if !(0.0..100.0).contains(&scenario.jitter_pct) {
        bail!("scenario 'jitter_pct' must be in [0, 100)");
    }
    let seeds = scenario.seeds.expand();
    if seeds.is_empty() {
        bail!("scenario 'seeds' must produce at least one seed");
    }
    Ok(scenario)
}
