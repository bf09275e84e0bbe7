use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_engine_core::effective_rate::{self, EffectiveRateInput, LoanEffectiveRateInput};

use crate::input;

/// Arguments for the effective rate of a cash flow summary
#[derive(Args)]
pub struct EffectiveRateArgs {
    /// Principal disbursed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Total payments received
    #[arg(long)]
    pub total_payments: Option<Decimal>,

    /// Days between disbursement and the last payment
    #[arg(long)]
    pub days: Option<i64>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the effective rate of a loan and its repayment history
#[derive(Args)]
pub struct LoanEffectiveRateArgs {
    /// Path to JSON with the loan record and its repayments
    #[arg(long)]
    pub input: Option<String>,

    /// End of the holding period for undated histories; defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn run_effective_rate(args: EffectiveRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let er_input: EffectiveRateInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        EffectiveRateInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            total_payments: args
                .total_payments
                .ok_or("--total-payments is required (or provide --input)")?,
            elapsed_days: args.days.ok_or("--days is required (or provide --input)")?,
        }
    };
    let result = effective_rate::analyze_effective_rate(&er_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_loan_effective_rate(
    args: LoanEffectiveRateArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut ler_input: LoanEffectiveRateInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for loan effective rate".into());
    };
    if args.as_of.is_some() {
        ler_input.as_of = args.as_of;
    } else if ler_input.as_of.is_none() {
        ler_input.as_of = Some(Local::now().date_naive());
    }
    let result = effective_rate::analyze_loan_effective_rate(&ler_input)?;
    Ok(serde_json::to_value(result)?)
}
