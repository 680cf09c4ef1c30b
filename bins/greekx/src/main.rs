//! GreekX command line binary
//!
//! Prices options through the background greeks worker and prints the
//! results as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, load_or_default, save_config, validate_config, GreeksConfig};
use greeks::{BatchItem, OptionQuoteInput};
use observability::{init_logging, init_metrics, LogFormat};
use offload::{ClientFacade, OffloadChannel};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config = load_or_default(&cli.config)?;
    let format = LogFormat::parse(&config.logging.format).unwrap_or_default();
    init_logging("greekx", format, &config.logging.level)?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Single {
            spot,
            strike,
            days,
            vol,
            option_type,
            rate,
        } => {
            let facade = start_facade(&config)?;
            let mut input = OptionQuoteInput::new(spot, strike, days, vol, option_type.into());
            input.risk_free_rate = rate;

            let result = facade.calculate_single(input).await;
            print_json(&result)
        }
        Commands::Batch { spot, rate, file } => {
            let items = read_batch(file.as_deref())?;
            info!(items = items.len(), spot, "Executing 'batch' command");

            let facade = start_facade(&config)?;
            let results = facade.calculate_batch(items, spot, rate).await;
            print_json(&results)
        }
        Commands::Ping => {
            let facade = start_facade(&config)?;
            let alive = facade.ping().await;
            print_json(&serde_json::json!({
                "alive": alive,
                "state": OffloadChannel::shared().state(),
                "stats": OffloadChannel::shared().stats(),
            }))?;
            if !alive {
                anyhow::bail!("greeks worker did not answer");
            }
            Ok(())
        }
        Commands::Validate => validate_command(&cli.config),
        Commands::Init { output } => init_command(output),
    }
}

/// Validate `config`, start metrics if asked to, and build the facade
fn start_facade(config: &GreeksConfig) -> Result<ClientFacade> {
    let report = validate_config(config);
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot price options due to configuration errors");
    }

    if config.metrics.enabled {
        init_metrics(config.metrics.port)?;
    }

    Ok(ClientFacade::from_config(config))
}

fn read_batch(file: Option<&Path>) -> Result<Vec<BatchItem>> {
    let content = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file: {:?}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read batch from stdin")?;
            buf
        }
    };

    serde_json::from_str(&content).context("Batch input must be a JSON array of {strike, type, iv, daysToExpiry}")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn validate_command(config_path: &Path) -> Result<()> {
    info!(path = ?config_path, "Validating configuration");

    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            return Err(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Default risk-free rate: {}", config.pricing.default_risk_free_rate);
    println!("Days per year: {}", config.pricing.days_per_year);
    println!(
        "Offload: {} (timeout {} ms, thread '{}')",
        if config.offload.enabled { "enabled" } else { "disabled" },
        config.offload.request_timeout_ms,
        config.offload.worker_thread_name
    );
    println!("Single fallback: {:?}", config.fallback.single_fidelity);

    Ok(())
}

fn init_command(output_path: PathBuf) -> Result<()> {
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, &output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Edit the configuration file to customize settings");
    println!("  2. Run 'greekx validate --config {:?}' to check configuration", output_path);
    println!("  3. Run 'greekx single --config {:?} --spot 100 --strike 100 --days 30 --vol 0.2'", output_path);

    Ok(())
}
