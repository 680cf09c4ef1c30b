use clap::{Parser, Subcommand, ValueEnum};
use greeks::OptionType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "greekx")]
#[command(about = "GreekX - Black-Scholes-Merton greeks with a background worker")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Path to the configuration file; defaults apply when it does not exist
    #[arg(short, long, global = true, default_value = "greekx.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Greeks for one contract
    Single {
        /// Spot price of the underlying
        #[arg(long)]
        spot: f64,

        /// Strike price
        #[arg(long)]
        strike: f64,

        /// Calendar days to expiry
        #[arg(long)]
        days: f64,

        /// Volatility as a decimal (0.2 = 20%)
        #[arg(long)]
        vol: f64,

        /// Call (CE) or put (PE)
        #[arg(short = 't', long = "type", value_enum, default_value = "ce")]
        option_type: OptionKind,

        /// Annual risk-free rate as a decimal; configured default when omitted
        #[arg(long)]
        rate: Option<f64>,
    },

    /// Greeks for a JSON array of {strike, type, iv, daysToExpiry}
    Batch {
        /// Spot price shared by the whole batch
        #[arg(long)]
        spot: f64,

        /// Annual risk-free rate as a decimal; configured default when omitted
        #[arg(long)]
        rate: Option<f64>,

        /// File holding the JSON array; stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Check that the background worker answers
    Ping,

    /// Validate the configuration file
    Validate,

    /// Write a configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "greekx.yaml")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    /// Call
    #[value(alias = "call")]
    Ce,
    /// Put
    #[value(alias = "put")]
    Pe,
}

impl From<OptionKind> for OptionType {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::Ce => OptionType::Call,
            OptionKind::Pe => OptionType::Put,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
