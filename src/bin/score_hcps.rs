//! Score an HCP batch, decompose market share and assign segments
//!
//! Reads a joined HCP CSV and a model directory, writes the augmented table
//! and optionally a JSON summary.

use anyhow::{Context, Result};
use clap::Parser;
use hcp_engine::{
    load_hcps,
    output::{write_csv_path, write_summary_path},
    scoring::AlignmentPolicy,
    Engine, EngineConfig, ModelRegistry,
};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(
    name = "score_hcps",
    version,
    about = "Score HCPs, reconstruct competitor volume and assign sales segments."
)]
struct Args {
    /// Joined HCP input table (CSV)
    input: PathBuf,

    /// Directory holding `<product>_<outcome>.json` model files
    #[clap(long)]
    models: PathBuf,

    /// Output CSV path
    #[clap(long, default_value = "hcp_scores.csv")]
    output: PathBuf,

    /// Engine configuration (JSON)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Also write a JSON batch summary here
    #[clap(long)]
    summary: Option<PathBuf>,

    /// Pad/truncate features when a model's width differs from the input
    #[clap(long)]
    lossy_alignment: bool,

    /// Override the per-unit revenue proxy used for expected ROI
    #[clap(long)]
    unit_value: Option<f64>,

    /// Disable rayon parallelism
    #[clap(long)]
    sequential: bool,
}

fn build_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.lossy_alignment {
        config.alignment = AlignmentPolicy::Lossy;
    }
    if let Some(unit_value) = args.unit_value {
        config.unit_value = unit_value;
    }
    if args.sequential {
        config.parallel = false;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let start = Instant::now();
    let config = build_config(args)?;

    println!("Loading HCPs from {}...", args.input.display());
    let batch = load_hcps(&args.input, &config.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    println!(
        "Loaded {} HCPs ({} features) in {:?}",
        batch.len(),
        batch.feature_width(),
        start.elapsed()
    );

    let registry = ModelRegistry::load_dir(&args.models);
    let engine = Engine::new(config, registry);
    let result = engine.run(&batch);

    write_csv_path(&result, &args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Output written to {}", args.output.display());

    let summary = result.summary();
    if let Some(path) = &args.summary {
        write_summary_path(&summary, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    println!("\nBatch Summary:");
    println!("  HCPs:   {}", summary.hcp_count);
    println!("  Models: {}/{} scored", summary.models_scored, summary.model_slots);
    for (segment, count) in &summary.segments {
        println!("  {segment:<22} {count}");
    }
    for (channel, totals) in &summary.channels {
        println!(
            "  {}: IBSA={:.0}, Market={:.0}, Competitor={:.0}",
            channel.to_uppercase(),
            totals.ibsa_volume,
            totals.total_market_volume,
            totals.competitor_volume
        );
    }
    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
