use chrono::{Local, NaiveDate};
use clap::Args;
use log::info;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_engine_core::reconciliation::{self, ReconcileInput};
use loan_engine_core::schedule::{self, ScheduleInput};
use loan_engine_core::{InterestMethod, LoanTerms};

use crate::config::RateArgs;
use crate::input;

/// Arguments for generating a repayment schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Loan duration in days
    #[arg(long)]
    pub days: Option<u32>,

    /// Interest method: simple or amortized
    #[arg(long, default_value = "amortized")]
    pub method: InterestMethod,

    /// Loan start date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Loan identifier
    #[arg(long)]
    pub loan_id: Option<String>,

    #[command(flatten)]
    pub rate: RateArgs,

    /// Path to JSON schedule input (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for reconciling recorded repayments
#[derive(Args)]
pub struct ReconcileArgs {
    /// Path to JSON with terms, start_date and repayments
    #[arg(long)]
    pub input: Option<String>,

    /// Fold repayments dated after the last period into the final period
    #[arg(long)]
    pub fold_late_payments: bool,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sched_input: ScheduleInput = if let Some(ref path) = args.input {
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
        let terms = match args.loan_id {
            Some(ref id) => terms.with_loan_id(id.as_str()),
            None => terms,
        };
        let start_date = args.start_date.unwrap_or_else(|| {
            let today = Local::now().date_naive();
            info!("no --start-date given; schedule starts today ({today})");
            today
        });
        ScheduleInput { terms, start_date }
    };
    let result = schedule::build_schedule(&sched_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_reconcile(args: ReconcileArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut rec_input: ReconcileInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file.json> or stdin required for reconciliation".into());
    };
    if args.fold_late_payments {
        rec_input.options.fold_late_payments = true;
    }
    let result = reconciliation::reconcile_loan(&rec_input)?;
    Ok(serde_json::to_value(result)?)
}
