use crate::run_result::{BlendSummary, RunStatus};
use crate::runner::SeedResult;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

type Extractor = (&'static str, Box<dyn Fn(&BlendSummary) -> f64>);

fn extractors() -> Vec<Extractor> {
    vec![
        ("range_score", Box::new(|b| b.range_score)),
        ("match_quality", Box::new(|b| b.match_quality)),
        ("error", Box::new(|b| b.error)),
        ("ingredient_count", Box::new(|b| b.ingredient_count as f64)),
        ("hardness", Box::new(|b| b.properties.hardness)),
        ("degreasing", Box::new(|b| b.properties.degreasing)),
        ("moisturizing", Box::new(|b| b.properties.moisturizing)),
        ("lather_volume", Box::new(|b| b.properties.lather_volume)),
        ("creaminess", Box::new(|b| b.properties.creaminess)),
    ]
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub solved_count: usize,
    pub in_range_count: usize,
    pub in_range_rate: f64,
    /// Computed over solved seeds only; empty when none solved.
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

pub fn compute_summary(results: &[SeedResult]) -> SummaryStats {
    let blends: Vec<&BlendSummary> = results.iter().filter_map(|r| r.blend.as_ref()).collect();
    let in_range_count = blends.iter().filter(|b| b.all_in_range).count();
    let in_range_rate = if results.is_empty() {
        0.0
    } else {
        in_range_count as f64 / results.len() as f64
    };

    let metrics = if blends.is_empty() {
        Vec::new()
    } else {
        extractors()
            .iter()
            .map(|(name, extract)| {
                let values: Vec<f64> = blends.iter().map(|b| extract(b)).collect();
                compute_metric_summary(name, &values)
            })
            .collect()
    };

    SummaryStats {
        seed_count: results.len(),
        solved_count: blends.len(),
        in_range_count,
        in_range_rate,
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> MetricSummary {
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    let stddev = variance.sqrt();

    MetricSummary {
        name: name.to_string(),
        mean,
        min,
        max,
        stddev,
    }
}

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    seed: u64,
    run_id: &'a str,
    status: RunStatus,
    ingredient_count: Option<usize>,
    range_score: Option<f64>,
    match_quality: Option<f64>,
    error: Option<f64>,
    all_in_range: bool,
    wall_time_ms: u64,
}

/// One row per seed, ordered as given.
pub fn write_results_csv(path: &Path, results: &[SeedResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for result in results {
        let blend = result.blend.as_ref();
        writer
            .serialize(ResultRow {
                seed: result.seed,
                run_id: &result.run_id,
                status: result.status,
                ingredient_count: blend.map(|b| b.ingredient_count),
                range_score: blend.map(|b| b.range_score),
                match_quality: blend.map(|b| b.match_quality),
                error: blend.map(|b| b.error),
                all_in_range: blend.is_some_and(|b| b.all_in_range),
                wall_time_ms: result.wall_time_ms,
            })
            .context("writing results row")?;
    }
    writer.flush().context("flushing results.csv")?;
    Ok(())
}

pub fn print_summary(scenario_name: &str, stats: &SummaryStats) {
    println!(
        "\n=== {} ({} seeds, {} solved) ===\n",
        scenario_name, stats.seed_count, stats.solved_count
    );
    println!(
        "{:<30} {:>8} {:>8} {:>8} {:>8}",
        "Metric", "Mean", "Min", "Max", "StdDev"
    );
    println!("{}", "-".repeat(70));
    for metric in &stats.metrics {
        println!(
            "{:<30} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
            metric.name, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
    println!(
        "{:<30} {}/{}",
        "in_range_rate", stats.in_range_count, stats.seed_count
    );
}
