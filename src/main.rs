//! Levy Rebalancing CLI
//!
//! Builds the levies from the scheme tables, runs every configured scenario
//! and writes levy rates, levy costs, bills and a wide summary per archetype.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use levy_rebalancing::config::{ModelInputs, DEFAULT_CONFIG_PATH};
use levy_rebalancing::output::{summary_table, write_rows_to_path};
use levy_rebalancing::{levy_rate_table, ModelConfig, OutputFormat, PaymentMethod, ScenarioProcessor};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPaymentMethod {
    StandardCredit,
    OtherPayment,
    Ppm,
}

impl From<CliPaymentMethod> for PaymentMethod {
    fn from(value: CliPaymentMethod) -> Self {
        match value {
            CliPaymentMethod::StandardCredit => PaymentMethod::StandardCredit,
            CliPaymentMethod::OtherPayment => PaymentMethod::OtherPayment,
            CliPaymentMethod::Ppm => PaymentMethod::Prepayment,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliFormat {
    Csv,
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(value: CliFormat) -> Self {
        match value {
            CliFormat::Csv => OutputFormat::Csv,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

/// Rebalance UK energy policy levies and model household bills
#[derive(Parser, Debug)]
#[command(name = "levy_rebalancing", version, about)]
struct Args {
    /// Model configuration (JSON); defaults apply when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of scheme tables
    #[arg(long)]
    scheme_tables: Option<PathBuf>,

    /// Directory of tariff component tables
    #[arg(long)]
    tariff_tables: Option<PathBuf>,

    /// Archetype table
    #[arg(long)]
    archetypes: Option<PathBuf>,

    #[arg(long, value_enum)]
    payment_method: Option<CliPaymentMethod>,

    /// Keep published rates instead of restating them on model denominators
    #[arg(long)]
    no_normalise: bool,

    /// Skip schemes whose tables cannot produce a levy
    #[arg(long)]
    lenient: bool,

    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    #[arg(short, long, value_enum, default_value_t = CliFormat::Csv)]
    format: CliFormat,
}

fn load_config(args: &Args) -> Result<ModelConfig> {
    let mut config = match &args.config {
        Some(path) => ModelConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            ModelConfig::load(Path::new(DEFAULT_CONFIG_PATH)).context("loading default configuration")?
        }
        None => ModelConfig::default(),
    };

    if let Some(path) = &args.scheme_tables {
        config.scheme_tables = path.clone();
    }
    if let Some(path) = &args.tariff_tables {
        config.tariff_tables = path.clone();
    }
    if let Some(path) = &args.archetypes {
        config.archetypes = path.clone();
    }
    if let Some(method) = args.payment_method {
        config.payment_method = method.into();
    }
    if args.no_normalise {
        config.normalise_baseline = false;
    }
    if args.lenient {
        config.lenient = true;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let format: OutputFormat = args.format.into();

    println!("Levy Rebalancing v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");

    let start = Instant::now();
    let config = load_config(&args)?;
    let inputs = ModelInputs::load(&config).context("loading model inputs")?;
    println!(
        "Loaded {} levies and {} archetypes in {:?}",
        inputs.levies.len(),
        inputs.archetypes.len(),
        start.elapsed()
    );

    println!("\nBaseline levies:");
    for levy in &inputs.levies {
        println!("  {}", levy);
    }

    let weights = config.scenario_weights().context("building scenario weights")?;
    println!("\nScenarios ({}):", weights.len());
    for name in weights.keys() {
        println!("  {}", name);
    }

    let processor = ScenarioProcessor::new(config.processing.clone());
    let run_start = Instant::now();
    let costs = processor
        .process_costs(&inputs.levies, &weights, &inputs.archetypes)
        .context("processing levy costs")?;
    let bills = processor
        .process_bills(&inputs.tariffs, &inputs.levies, &weights, &inputs.archetypes)
        .context("processing bills")?;
    println!("\nProcessed {} cost and {} bill records in {:?}", costs.len(), bills.len(), run_start.elapsed());

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let path = |name: &str| args.output_dir.join(format!("{}.{}", name, format.extension()));

    write_rows_to_path(&path("levy_rates"), &levy_rate_table(&inputs.levies), format)?;
    write_rows_to_path(&path("levy_costs"), &costs, format)?;
    write_rows_to_path(&path("bills"), &bills, format)?;

    let mut records = costs;
    records.extend(bills);
    let summary = summary_table(&records, &inputs.archetypes);
    let summary_path = args.output_dir.join("summary.csv");
    summary.write_csv_to_path(&summary_path)?;

    println!("\nResults written to {}", args.output_dir.display());
    println!("Total time: {:?}", start.elapsed());
    Ok(())
}
