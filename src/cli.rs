use clap::{Parser, Subcommand};
use settlement_waterfall::audit::collections_digest;
use settlement_waterfall::collections::{aggregate, parse_entries, AggregatedCollection};
use settlement_waterfall::config::Config;
use settlement_waterfall::engine::{run_waterfall, Pool, StatutoryRate};
use settlement_waterfall::error::{Error, Result};
use settlement_waterfall::logger::Logger;
use settlement_waterfall::money::Money;
use settlement_waterfall::registry::TierRegistry;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "settlement-waterfall")]
#[command(about = "Treasury waterfall allocation, statutory split and collections rollup")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: "human" or "json"
    #[arg(short, long)]
    pub format: Option<String>,

    /// Tier registry JSON file
    #[arg(short, long)]
    pub registry: Option<String>,

    /// Statutory rate in basis points (default 500 = 5%)
    #[arg(long, allow_hyphen_values = true)]
    pub rate_bps: Option<i64>,

    /// Log filter, e.g. "debug"
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the waterfall for a pool amount (minor units)
    Allocate {
        /// Total available pool, in minor units
        #[arg(long, allow_hyphen_values = true)]
        pool: String,
    },

    /// Apply the statutory split to a single disbursement
    Split {
        /// Gross amount, in minor units
        #[arg(long, allow_hyphen_values = true)]
        gross: String,

        /// Disbursement id to stamp on the split
        #[arg(long, default_value = "manual")]
        id: String,
    },

    /// Roll up collection entries (JSON array) by entity and period
    Aggregate {
        /// Entries file path (reads stdin if not provided)
        #[arg(long)]
        file: Option<String>,
    },

    /// Validate a tier registry file
    Validate,
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(path) = &cli.registry {
        config.set_registry_path(PathBuf::from(path));
    }
    if let Some(format) = &cli.format {
        config.set_output_format(format.clone());
    }
    if let Some(bps) = cli.rate_bps {
        config.set_statutory_rate_bps(bps)?;
    }
    if let Some(level) = &cli.log_level {
        config.set_log_level(level.clone());
    }
    Ok(config)
}

fn load_registry(config: &Config) -> Result<TierRegistry> {
    let path = config.get_registry_path().ok_or_else(|| {
        Error::Config("No tier registry given (use --registry or WATERFALL_REGISTRY_PATH)".to_string())
    })?;
    TierRegistry::load(path)
}

fn parse_money(raw: &str, what: &str) -> Result<Money> {
    raw.parse::<Money>()
        .map_err(|e| Error::Input(format!("Invalid {} '{}': {}", what, raw, e)))
}

/// Read entries from file or stdin
fn read_entries(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| Error::Input(format!("Failed to read file {}: {}", path, e))),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| Error::Input(format!("Failed to read from stdin: {}", e)))?;
            Ok(buffer)
        }
    }
}

/// Format output based on format type
fn format_output<T: serde::Serialize + std::fmt::Debug>(data: &T, format: &str) -> Result<String> {
    match format {
        "json" => serde_json::to_string_pretty(data)
            .map_err(|e| Error::Input(format!("Failed to serialize JSON: {}", e))),
        _ => Ok(format!("{:#?}", data)),
    }
}

/// JSON output carries no banner so it stays machine-readable.
fn render_validation(output: &ValidateOutput, format: &str) -> Result<String> {
    let body = format_output(output, format)?;
    if format == "json" {
        Ok(body)
    } else {
        Ok(format!("✓ Registry is valid\n{}", body))
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    Logger::init(config.get_log_level());
    let format = config.get_output_format().to_string();

    match cli.command {
        Commands::Allocate { pool } => {
            let registry = load_registry(&config)?;
            let pool = Pool::new(parse_money(&pool, "pool")?)?;
            let report = run_waterfall(&pool, &registry, config.statutory_rate()?)?;
            println!("{}", format_output(&report, &format)?);
            Ok(())
        }

        Commands::Split { gross, id } => {
            let rate: StatutoryRate = config.statutory_rate()?;
            let split = rate.apply(&id, parse_money(&gross, "gross amount")?)?;
            let output = SplitOutput {
                statutory_recipient: config.statutory_recipient.clone(),
                rate_bps: rate.bps(),
                disbursement_id: split.disbursement_id,
                gross_amount: split.gross_amount,
                recipient_share: split.recipient_share,
                statutory_share: split.statutory_share,
            };
            println!("{}", format_output(&output, &format)?);
            Ok(())
        }

        Commands::Aggregate { file } => {
            let json = read_entries(file.as_deref())?;
            let entries = parse_entries(&json)?;
            let groups = aggregate(&entries)?;
            let output = AggregateOutput {
                entry_count: entries.len(),
                digest: collections_digest(&groups),
                groups,
            };
            println!("{}", format_output(&output, &format)?);
            Ok(())
        }

        Commands::Validate => {
            let registry = load_registry(&config)?;
            let output = ValidateOutput {
                tiers: registry.tiers().len(),
                recipients: registry.tiers().iter().map(|t| t.recipients.len()).sum(),
                total_required: registry.total_required()?,
            };
            println!("{}", render_validation(&output, &format)?);
            Ok(())
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct SplitOutput {
    statutory_recipient: String,
    rate_bps: u16,
    disbursement_id: String,
    gross_amount: Money,
    recipient_share: Money,
    statutory_share: Money,
}

#[derive(Debug, serde::Serialize)]
struct AggregateOutput {
    entry_count: usize,
    digest: String,
    groups: Vec<AggregatedCollection>,
}

#[derive(Debug, serde::Serialize)]
struct ValidateOutput {
    tiers: usize,
    recipients: usize,
    total_required: Money,
}
