use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod overrides;
mod run_result;
mod runner;
mod scenario;
mod summary;

#[derive(Parser)]
#[command(
    name = "blend_bench",
    about = "Runs blend generator scenarios across many seeds"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file across multiple seeds.
    Run {
        /// Path to the scenario JSON file.
        #[arg(long)]
        scenario: String,
        /// Output directory (default: runs/).
        #[arg(long, default_value = "runs")]
        output_dir: String,
    },
}

fn run(scenario_path: &str, output_dir: &str) -> Result<()> {
    let scenario = scenario::load_scenario(Path::new(scenario_path))?;
    let seeds = scenario.seeds.expand();
    info!(
        scenario = %scenario.name,
        mode = ?scenario.mode,
        seeds = seeds.len(),
        "scenario loaded"
    );

    let mut content = blend_content::load_content(&scenario.content_dir)?;
    overrides::apply_overrides(&mut content.constants, &scenario.overrides)?;

    let scenario_params = serde_json::json!({
        "mode": scenario.mode,
        "content_dir": scenario.content_dir,
        "overrides": scenario.overrides,
        "exclusions": scenario.exclusions,
        "lock": scenario.lock,
        "jitter_pct": scenario.jitter_pct,
    });

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_dir = PathBuf::from(output_dir).join(format!("{}_{}", scenario.name, timestamp));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating output directory: {}", run_dir.display()))?;
    std::fs::copy(scenario_path, run_dir.join("scenario.json")).context("copying scenario file")?;
    info!(output = %run_dir.display(), "running seeds in parallel");

    let results: Vec<Result<runner::SeedResult>> = seeds
        .par_iter()
        .map(|&seed| {
            let seed_dir = run_dir.join(format!("seed_{seed}"));
            runner::run_seed(&content, &scenario, seed, &seed_dir, &scenario_params)
        })
        .collect();

    let mut seed_results = Vec::new();
    for result in results {
        match result {
            Ok(seed_result) => seed_results.push(seed_result),
            Err(err) => error!("seed failed: {err:#}"),
        }
    }
    if seed_results.is_empty() {
        anyhow::bail!("all seeds failed");
    }

    let stats = summary::compute_summary(&seed_results);
    summary::print_summary(&scenario.name, &stats);

    let csv_path = run_dir.join("results.csv");
    summary::write_results_csv(&csv_path, &seed_results)?;

    let batch_id = Uuid::new_v4().to_string();
    let run_ids: Vec<&str> = seed_results.iter().map(|r| r.run_id.as_str()).collect();
    let batch_summary = serde_json::json!({
        "batch_schema_version": 1,
        "batch_id": batch_id,
        "scenario_name": scenario.name,
        "scenario_params": scenario_params,
        "content_version": content.content_version,
        "run_ids": run_ids,
        "stats": stats,
    });

    let summary_path = run_dir.join("summary.json");
    let summary_tmp = summary_path.with_extension("json.tmp");
    let summary_json =
        serde_json::to_string_pretty(&batch_summary).context("serializing summary")?;
    let mut summary_file = std::fs::File::create(&summary_tmp)
        .with_context(|| format!("creating {}", summary_tmp.display()))?;
    summary_file
        .write_all(summary_json.as_bytes())
        .context("writing summary")?;
    summary_file.sync_all()?;
    std::fs::rename(&summary_tmp, &summary_path).context("renaming summary")?;

    info!(
        summary = %summary_path.display(),
        results = %csv_path.display(),
        "batch written"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            scenario,
            output_dir,
        } => run(&scenario, &output_dir)?,
    }
    Ok(())
}
