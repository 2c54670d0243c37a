use anyhow::{bail, Result};
use blend_content::load_content;
use blend_core::{
    find_best_set, find_best_set_for_properties, generate_random, map_properties_to_attributes,
    optimize_weights, suggest_additions, validate_property_targets, BestSetOptions, BlendContent,
    CupboardOptions, OptimizationResult, OptimizeOptions, RandomOptions,
};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod args;

use args::{
    ensure_known, parse_attribute_target, parse_exclusions, parse_ids, parse_property_target,
    parse_shares,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "blend_cli", about = "Fat blend formulation CLI")]
struct Cli {
    #[arg(long, default_value = "./content", global = true)]
    content_dir: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize shares for a fixed set of ingredients.
    Optimize(OptimizeArgs),
    /// Greedily choose which ingredients to use for a target.
    BestSet(BestSetArgs),
    /// Draw random blends until every property is in range.
    Random(RandomArgs),
    /// Suggest additions that bring an existing base into range.
    Suggest(SuggestArgs),
    /// Map property targets to attribute targets and check consistency.
    MapProperties {
        /// e.g. hardness=42,degreasing=15,moisturizing=55
        properties: String,
    },
}

#[derive(Args)]
struct OptimizeArgs {
    /// Comma-separated ingredient ids.
    #[arg(long)]
    ids: String,
    /// Attribute target, e.g. oleic=70,lauric=15
    #[arg(long)]
    target: String,
    #[arg(long)]
    min_share: Option<f64>,
    #[arg(long)]
    max_share: Option<f64>,
    #[arg(long)]
    step_size: Option<f64>,
    #[arg(long)]
    iterations: Option<u32>,
}

#[derive(Args)]
struct BestSetArgs {
    /// Attribute target. Mutually exclusive with --properties.
    #[arg(long, conflicts_with = "properties", required_unless_present = "properties")]
    target: Option<String>,
    /// Property target, validated and mapped to attributes first.
    #[arg(long)]
    properties: Option<String>,
    #[arg(long)]
    max_size: Option<usize>,
    #[arg(long)]
    exclude: Option<String>,
    #[arg(long = "exclude-flag")]
    exclude_flags: Vec<String>,
    #[arg(long)]
    require: Option<String>,
    #[arg(long)]
    lock: Option<String>,
}

#[derive(Args)]
struct RandomArgs {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    min_count: Option<usize>,
    #[arg(long)]
    max_count: Option<usize>,
    #[arg(long)]
    max_attempts: Option<u32>,
    /// Fixed percentages, e.g. castor_oil=5
    #[arg(long)]
    lock: Option<String>,
    #[arg(long)]
    exclude: Option<String>,
    #[arg(long = "exclude-flag")]
    exclude_flags: Vec<String>,
}

#[derive(Args)]
struct SuggestArgs {
    /// Base weights or percentages, e.g. olive_oil=500,coconut_oil=200
    #[arg(long)]
    base: String,
    #[arg(long)]
    max_suggestions: Option<usize>,
    #[arg(long)]
    allow_base_adjustment: bool,
    /// Ingredients that must be among the suggestions.
    #[arg(long)]
    with: Option<String>,
    #[arg(long)]
    exclude: Option<String>,
    #[arg(long = "exclude-flag")]
    exclude_flags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn optimize(content: &BlendContent, args: OptimizeArgs) -> Result<()> {
    let ids = parse_ids(&args.ids);
    ensure_known(&ids, &content.ingredients)?;
    let target = parse_attribute_target(&args.target)?;
    let defaults = OptimizeOptions::from_constants(&content.constants);
    let options = OptimizeOptions {
        min_share: args.min_share.unwrap_or(defaults.min_share),
        max_share: args.max_share.unwrap_or(defaults.max_share),
        step_size: args.step_size.unwrap_or(defaults.step_size),
        iterations: args.iterations.unwrap_or(defaults.iterations),
        ..defaults
    };
    let mixture = optimize_weights(&ids, &target, &content.ingredients, &options)?;
    let result =
        OptimizationResult::evaluate(mixture, &content.ingredients, &target, &content.constants);
    print_json(&result)
}

fn best_set(content: &BlendContent, args: BestSetArgs) -> Result<()> {
    let mut options = BestSetOptions::from_constants(&content.constants);
    options.exclusions = parse_exclusions(args.exclude.as_deref(), &args.exclude_flags)?;
    if let Some(max_size) = args.max_size {
        options.max_size = max_size;
    }
    if let Some(require) = &args.require {
        options.require = parse_ids(require);
    }
    if let Some(lock) = &args.lock {
        options.lock = parse_ids(lock);
    }
    ensure_known(options.lock.iter().chain(&options.require), &content.ingredients)?;

    let result = match (&args.target, &args.properties) {
        (Some(target), _) => find_best_set(
            &parse_attribute_target(target)?,
            &content.ingredients,
            &options,
            &content.constants,
        )?,
        (None, Some(properties)) => find_best_set_for_properties(
            &parse_property_target(properties)?,
            &content.ingredients,
            &options,
            &content.constants,
        )?,
        (None, None) => bail!("one of --target or --properties is required"),
    };
    print_json(&result)
}

#[derive(Serialize)]
struct RandomReport {
    seed: u64,
    blend: Option<blend_core::GeneratedBlend>,
}

fn random(content: &BlendContent, args: RandomArgs) -> Result<()> {
    let mut options = RandomOptions::from_constants(&content.constants);
    options.exclusions = parse_exclusions(args.exclude.as_deref(), &args.exclude_flags)?;
    if let Some(lock) = &args.lock {
        options.lock = parse_shares(lock, true)?;
        ensure_known(options.lock.iter().map(|share| &share.ingredient), &content.ingredients)?;
    }
    options.min_count = args.min_count.unwrap_or(options.min_count);
    options.max_count = args.max_count.unwrap_or(options.max_count);
    options.max_attempts = args.max_attempts.unwrap_or(options.max_attempts);

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let blend = generate_random(
        &content.ingredients,
        &options,
        &content.ranges,
        &content.constants,
        &mut rng,
    )?;
    match &blend {
        Some(b) if b.all_in_range => info!(seed, attempt = b.attempt, "found an in-range blend"),
        Some(b) => info!(seed, score = b.range_score, "no in-range blend; reporting best effort"),
        None => info!(seed, "not enough eligible ingredients"),
    }
    print_json(&RandomReport { seed, blend })
}

fn suggest(content: &BlendContent, args: SuggestArgs) -> Result<()> {
    let base = parse_shares(&args.base, false)?;
    ensure_known(base.iter().map(|share| &share.ingredient), &content.ingredients)?;
    let mut options = CupboardOptions::from_constants(&content.constants);
    options.exclusions = parse_exclusions(args.exclude.as_deref(), &args.exclude_flags)?;
    options.allow_base_adjustment = args.allow_base_adjustment;
    options.max_suggestions = args.max_suggestions.unwrap_or(options.max_suggestions);
    if let Some(with) = &args.with {
        options.locked_suggestions = parse_ids(with);
    }
    let outcome = suggest_additions(
        &base,
        &content.ingredients,
        &options,
        &content.ranges,
        &content.constants,
    )?;
    print_json(&outcome)
}

#[derive(Serialize)]
struct MappingReport {
    attributes: blend_core::AttributeTarget,
    problem: Option<String>,
}

fn map_properties(properties: &str) -> Result<()> {
    let targets = parse_property_target(properties)?;
    print_json(&MappingReport {
        attributes: map_properties_to_attributes(&targets),
        problem: validate_property_targets(&targets),
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Commands::MapProperties { properties } = &cli.command {
        return map_properties(properties);
    }
    let content = load_content(&cli.content_dir)?;
    info!(
        version = %content.content_version,
        ingredients = content.ingredients.len(),
        "content loaded"
    );
    match cli.command {
        Commands::Optimize(args) => optimize(&content, args),
        Commands::BestSet(args) => best_set(&content, args),
        Commands::Random(args) => random(&content, args),
        Commands::Suggest(args) => suggest(&content, args),
        Commands::MapProperties { .. } => Ok(()),
    }
}
