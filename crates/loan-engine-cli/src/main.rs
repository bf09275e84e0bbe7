mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::effective_rate::{EffectiveRateArgs, LoanEffectiveRateArgs};
use commands::pricing::{EstimateArgs, InstallmentArgs};
use commands::schedule::{ReconcileArgs, ScheduleArgs};

/// Loan repayment calculations
#[derive(Parser)]
#[command(
    name = "loancalc",
    version,
    about = "Loan installment pricing, repayment schedules and effective rates",
    long_about = "A CLI for pricing loan installments with decimal precision. Supports \
                  simple and amortized interest, 30-day repayment schedules, reconciliation \
                  of recorded repayments, and realised effective rates."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a single installment
    Installment(InstallmentArgs),
    /// Borrower-facing loan estimate (recoverable amount, projected rates)
    Estimate(EstimateArgs),
    /// Generate a repayment schedule
    Schedule(ScheduleArgs),
    /// Reconcile recorded repayments against the projected schedule
    Reconcile(ReconcileArgs),
    /// Effective rate from principal, total payments and elapsed days
    EffectiveRate(EffectiveRateArgs),
    /// Effective rate of a loan from its recorded repayments
    LoanEffectiveRate(LoanEffectiveRateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Installment(args) => commands::pricing::run_installment(args),
        Commands::Estimate(args) => commands::pricing::run_estimate(args),
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::Reconcile(args) => commands::schedule::run_reconcile(args),
        Commands::EffectiveRate(args) => commands::effective_rate::run_effective_rate(args),
        Commands::LoanEffectiveRate(args) => {
            commands::effective_rate::run_loan_effective_rate(args)
        }
        Commands::Version => {
            println!("loancalc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
