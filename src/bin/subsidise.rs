//! Overlay targeted rebates on scenario bills
//!
//! Usage: cargo run --bin subsidise -- --eligibility data/eligibility.csv \
//!     --scenario "All gas, status quo fixed or variable" --rebate 150 --criteria "Warm Homes Discount"
//!
//! Without `--scenario` the rebates listed in the model configuration are run.

use anyhow::{bail, Context, Result};
use clap::Parser;
use levy_rebalancing::archetype::{collapse_income_deciles, load_eligibility, EligibilityTable};
use levy_rebalancing::config::{ModelInputs, DEFAULT_CONFIG_PATH};
use levy_rebalancing::output::write_rows_to_path;
use levy_rebalancing::scenario::BASELINE;
use levy_rebalancing::{
    subsidisation_table, EligibilityCriteria, ModelConfig, OutputFormat, RebateRequest, ScenarioProcessor,
    ScenarioWeights,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "subsidise", version, about = "Apply a targeted rebate to scenario bills")]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Eligibility table; overrides the configuration
    #[arg(long)]
    eligibility: Option<PathBuf>,

    /// Income decile table, used with the Income Deciles criteria
    #[arg(long)]
    income_deciles: Option<PathBuf>,

    #[arg(long)]
    scenario: Option<String>,

    /// £ off each eligible household's bill
    #[arg(long, default_value_t = 0.0)]
    rebate: f64,

    #[arg(long, default_value = "Warm Homes Discount")]
    criteria: String,

    /// Lowest income deciles eligible
    #[arg(long, default_value_t = 0)]
    deciles: usize,

    /// Do not recover the rebate fund from ineligible households
    #[arg(long)]
    no_recovery: bool,

    #[arg(short, long, default_value = "subsidisation.csv")]
    output: PathBuf,
}

fn requests(args: &Args, config: &ModelConfig) -> Result<Vec<RebateRequest>> {
    match &args.scenario {
        Some(scenario) => {
            let criteria: EligibilityCriteria = args.criteria.parse()?;
            Ok(vec![RebateRequest {
                scenario: scenario.clone(),
                rebate: args.rebate,
                criteria,
                eligible_deciles: args.deciles,
                ineligible_households_pay: !args.no_recovery,
            }])
        }
        None if !config.rebates.is_empty() => Ok(config.rebates.clone()),
        None => bail!("no rebate requested: pass --scenario or list rebates in the configuration"),
    }
}

fn eligibility_for(request: &RebateRequest, args: &Args, table: &EligibilityTable) -> Result<EligibilityTable> {
    if request.criteria != EligibilityCriteria::IncomeDeciles {
        return Ok(table.clone());
    }
    let path = args
        .income_deciles
        .as_ref()
        .context("--income-deciles is required for the Income Deciles criteria")?;
    let deciles = load_eligibility(path).with_context(|| format!("loading {}", path.display()))?;
    Ok(collapse_income_deciles(&deciles, request.eligible_deciles))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = if config_path.exists() {
        ModelConfig::load(&config_path).with_context(|| format!("loading {}", config_path.display()))?
    } else {
        ModelConfig::default()
    };

    let requests = requests(&args, &config)?;
    let eligibility_path = args
        .eligibility
        .clone()
        .or_else(|| config.eligibility.clone())
        .context("no eligibility table: pass --eligibility or set it in the configuration")?;
    let eligibility = load_eligibility(&eligibility_path)
        .with_context(|| format!("loading {}", eligibility_path.display()))?;

    println!("Loading model inputs...");
    let inputs = ModelInputs::load(&config).context("loading model inputs")?;

    // Only the requested scenarios need bills
    let all_weights = config.scenario_weights()?;
    let mut weights = ScenarioWeights::new();
    for request in requests.iter().filter(|r| r.scenario != BASELINE) {
        let set = all_weights
            .get(&request.scenario)
            .with_context(|| format!("unknown scenario '{}'", request.scenario))?;
        weights.insert(request.scenario.clone(), set.clone());
    }

    let mut processing = config.processing.clone();
    processing.include_baseline = true;
    let processor = ScenarioProcessor::new(processing);
    let bills = processor.process_bills(&inputs.tariffs, &inputs.levies, &weights, &inputs.archetypes)?;

    let mut rows = Vec::new();
    for request in &requests {
        let table = eligibility_for(request, &args, &eligibility)?;
        let subsidised = subsidisation_table(&bills, &inputs.archetypes, &table, request)
            .with_context(|| format!("subsidising '{}'", request.scenario))?;
        println!(
            "{}: £{:.2} rebate for {} ({} archetypes)",
            request.scenario,
            request.rebate,
            request.criteria_label(),
            subsidised.len()
        );
        rows.extend(subsidised);
    }

    write_rows_to_path(&args.output, &rows, OutputFormat::Csv)?;
    println!("Output written to {}", args.output.display());
    Ok(())
}
