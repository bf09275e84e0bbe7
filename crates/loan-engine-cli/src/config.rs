use clap::Args;
use log::debug;
use rust_decimal::Decimal;

use loan_engine_core::{RateConfig, RateSource};

use crate::input;

/// Where the monthly nominal rate comes from
#[derive(Args, Debug, Clone)]
pub struct RateArgs {
    /// Monthly nominal rate as a fraction (0.03 = 3% per 30 days)
    #[arg(long, env = "LOANCALC_MONTHLY_RATE")]
    pub monthly_rate: Option<Decimal>,

    /// JSON rate configuration file, e.g. {"nominal_rate": "0.03"}
    #[arg(long)]
    pub rate_file: Option<String>,
}

impl RateArgs {
    /// Resolve the configured rate source: flag or environment first, then the file.
    pub fn source(&self) -> Result<RateConfig, Box<dyn std::error::Error>> {
        if let Some(rate) = self.monthly_rate {
            debug!("monthly rate {rate} from flag/environment");
            return Ok(RateConfig {
                nominal_rate: Some(rate),
            });
        }
        if let Some(ref path) = self.rate_file {
            debug!("monthly rate from {path}");
            return input::file::read_json(path);
        }
        Ok(RateConfig::default())
    }

    /// Read the rate once for this invocation.
    pub fn monthly_rate(&self) -> Result<Decimal, Box<dyn std::error::Error>> {
        Ok(self.source()?.monthly_rate()?)
    }
}
