//! Installment pricing for simple-interest and amortized loans.
//!
//! Periods are 30-day months. A loan shorter than one period is a single
//! installment whose interest is the monthly rate prorated by `days / 30`.
//! Monetary outputs are rounded to cents once, at the end of each calculation.

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::LoanEngineError;
use crate::rate_source::RateSource;
use crate::terms::{period_count, validate_terms, InterestMethod, LoanTerms};
use crate::time_value::annuity_payment;
use crate::types::{
    checked_add, checked_div, checked_mul, round_money, to_percentage, with_metadata,
    ComputationOutput, Money, Rate, DAYS_PER_PERIOD,
};
use crate::LoanResult;

// ---------------------------------------------------------------------------
// Input / Output Types
// ---------------------------------------------------------------------------

/// Priced installment for one set of loan terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentResult {
    /// Amount due each period, in cents.
    pub installment: Money,
    pub months: u32,
    /// Monthly nominal rate as a percentage (3 = 3% per period).
    pub rate_used: Decimal,
    /// Rate actually charged per period as a fraction; prorated for partial periods.
    pub period_rate_applied: Rate,
    pub total_interest: Money,
    /// Principal plus total interest.
    pub total_payable: Money,
    pub method: InterestMethod,
    pub duration_days: u32,
    pub partial_period: bool,
}

/// Request for a loan estimate. The rate is whatever the rate source returned;
/// `None` means the source had nothing configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateInput {
    pub principal: Money,
    pub duration_days: u32,
    pub method: InterestMethod,
    #[serde(default)]
    pub monthly_rate: Option<Rate>,
}

/// Borrower-facing summary of a priced loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanEstimate {
    pub principal: Money,
    /// Installment x months: everything the lender expects to collect.
    pub recoverable_amount: Money,
    /// Average interest per period (constant for simple loans).
    pub monthly_interest_amount: Money,
    /// Monthly nominal rate, percentage to 4 dp.
    pub monthly_interest_rate: Decimal,
    /// Total interest / principal, percentage over the whole term.
    pub effective_rate: Decimal,
    /// Total projected interest.
    pub effective_amount: Money,
    pub loan_tenure_days: u32,
    pub loan_tenure_months: u32,
    pub method: InterestMethod,
    pub instalments: Money,
}

/// What gets stored against a loan at origination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedRate {
    pub loan_id: String,
    /// Monthly nominal rate used, as a percentage.
    pub effective_interest: Decimal,
    /// Projected total interest.
    pub effective_amount: Money,
    pub method: InterestMethod,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price a single installment.
pub fn compute_installment(
    principal: Money,
    duration_days: u32,
    method: InterestMethod,
    monthly_rate: Rate,
) -> LoanResult<InstallmentResult> {
    validate_terms(principal, duration_days, monthly_rate)?;

    let months = period_count(duration_days);
    let partial_period = duration_days < DAYS_PER_PERIOD;

    let n = Decimal::from(months);
    let (installment, total_interest, period_rate_applied) = if partial_period {
        let prorated = checked_mul("monthly_rate", monthly_rate, Decimal::from(duration_days))?
            / Decimal::from(DAYS_PER_PERIOD);
        warn!(
            "{duration_days}-day loan is shorter than one period; single installment at prorated rate {prorated}"
        );
        let interest = checked_mul("principal", principal, prorated)?;
        (checked_add("principal", principal, interest)?, interest, prorated)
    } else {
        match method {
            InterestMethod::Simple => {
                let per_period = checked_mul("principal", principal, monthly_rate)?;
                let interest = checked_mul("duration_days", per_period, n)?;
                let payable = checked_add("principal", principal, interest)?;
                (payable / n, interest, monthly_rate)
            }
            InterestMethod::Amortized => {
                let payment = annuity_payment(monthly_rate, months, principal)?;
                let interest = checked_mul("duration_days", payment, n)? - principal;
                (payment, interest, monthly_rate)
            }
        }
    };

    let installment = round_money(installment);
    // The schedule and the estimate both total `installment * months`.
    checked_mul("duration_days", installment, n)?;

    let total_interest = round_money(total_interest);
    let result = InstallmentResult {
        installment,
        months,
        rate_used: to_percentage(monthly_rate)?,
        period_rate_applied,
        total_interest,
        total_payable: checked_add("principal", round_money(principal), total_interest)?,
        method,
        duration_days,
        partial_period,
    };

    debug!(
        "priced {method} loan: principal={principal} days={duration_days} months={months} installment={}",
        result.installment
    );
    Ok(result)
}

/// Price an installment, reading the rate from `source` for this call only.
pub fn compute_installment_from_source<S: RateSource + ?Sized>(
    principal: Money,
    duration_days: u32,
    method: InterestMethod,
    source: &S,
) -> LoanResult<InstallmentResult> {
    let monthly_rate = source.monthly_rate()?;
    compute_installment(principal, duration_days, method, monthly_rate)
}

/// Price an installment for a full set of terms.
pub fn price_terms(terms: &LoanTerms) -> LoanResult<InstallmentResult> {
    compute_installment(
        terms.principal,
        terms.duration_days,
        terms.method,
        terms.monthly_rate,
    )
}

/// Borrower-facing estimate: installment, recoverable amount and projected rates.
pub fn estimate_loan(input: &EstimateInput) -> LoanResult<ComputationOutput<LoanEstimate>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let monthly_rate = input.monthly_rate.ok_or_else(|| {
        LoanEngineError::Configuration("Could not retrieve monthly rate".into())
    })?;

    let priced = compute_installment(
        input.principal,
        input.duration_days,
        input.method,
        monthly_rate,
    )?;

    if priced.partial_period {
        warnings.push(format!(
            "Duration of {} days is shorter than one period; interest prorated by {}/{}",
            input.duration_days, input.duration_days, DAYS_PER_PERIOD
        ));
    }
    if monthly_rate.is_zero() {
        warnings.push("Monthly rate is zero; installments carry no interest".into());
    }

    let months = Decimal::from(priced.months);
    let estimate = LoanEstimate {
        principal: round_money(input.principal),
        recoverable_amount: round_money(checked_mul("duration_days", priced.installment, months)?),
        monthly_interest_amount: round_money(priced.total_interest / months),
        monthly_interest_rate: priced.rate_used.round_dp(4),
        effective_rate: round_money(to_percentage(checked_div(
            "principal",
            priced.total_interest,
            input.principal,
        )?)?),
        effective_amount: priced.total_interest,
        loan_tenure_days: input.duration_days,
        loan_tenure_months: priced.months,
        method: input.method,
        instalments: priced.installment,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Loan Estimate: 30-day periods, monthly nominal rate",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "duration_days": input.duration_days,
            "method": input.method,
            "monthly_rate": monthly_rate.to_string(),
        }),
        warnings,
        elapsed,
        estimate,
    )
}

/// The origination record: monthly rate used and projected interest.
pub fn projected_rate_record(loan_id: &str, priced: &InstallmentResult) -> LoanResult<ProjectedRate> {
    if loan_id.trim().is_empty() {
        return Err(LoanEngineError::invalid("loan_id", "Loan id is required"));
    }
    Ok(ProjectedRate {
        loan_id: loan_id.to_string(),
        effective_interest: priced.rate_used,
        effective_amount: priced.total_interest,
        method: priced.method,
    })
}
