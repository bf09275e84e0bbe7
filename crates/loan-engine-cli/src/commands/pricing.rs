use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_engine_core::calculator::{self, EstimateInput};
use loan_engine_core::{InterestMethod, LoanTerms};

use crate::config::RateArgs;
use crate::input;

/// Arguments for pricing a single installment
#[derive(Args)]
pub struct InstallmentArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Loan duration in days (periods are 30 days)
    #[arg(long)]
    pub days: Option<u32>,

    /// Interest method: simple or amortized
    #[arg(long, default_value = "amortized")]
    pub method: InterestMethod,

    /// Loan identifier; when given, the projected rate record is included
    #[arg(long)]
    pub loan_id: Option<String>,

    #[command(flatten)]
    pub rate: RateArgs,

    /// Path to JSON loan terms (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a borrower-facing loan estimate
#[derive(Args)]
pub struct EstimateArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Loan duration in days
    #[arg(long)]
    pub days: Option<u32>,

    /// Interest method: simple or amortized
    #[arg(long, default_value = "amortized")]
    pub method: InterestMethod,

    #[command(flatten)]
    pub rate: RateArgs,

    /// Path to JSON estimate input (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_installment(args: InstallmentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let terms = LoanTerms::new(
            args.principal
                .ok_or("--principal is required (or provide --input)")?,
            args.days.ok_or("--days is required (or provide --input)")?,
            args.method,
            args.rate.monthly_rate()?,
        )?;
        match args.loan_id {
            Some(ref id) => terms.with_loan_id(id.as_str()),
            None => terms,
        }
    };

    let priced = calculator::price_terms(&terms)?;
    let mut value = serde_json::to_value(&priced)?;
    if let Some(ref id) = terms.loan_id {
        let record = calculator::projected_rate_record(id, &priced)?;
        value["projected_rate"] = serde_json::to_value(record)?;
    }
    Ok(value)
}

pub fn run_estimate(args: EstimateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut est_input: EstimateInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        EstimateInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            duration_days: args.days.ok_or("--days is required (or provide --input)")?,
            method: args.method,
            monthly_rate: Some(args.rate.monthly_rate()?),
        }
    };
    if est_input.monthly_rate.is_none() {
        est_input.monthly_rate = Some(args.rate.monthly_rate()?);
    }
    let result = calculator::estimate_loan(&est_input)?;
    Ok(serde_json::to_value(result)?)
}
