//! Overlay recorded repayments onto a projected schedule.
//!
//! Repayments are bucketed into the schedule's 30-day windows. Where a window
//! holds at least one repayment, the latest one's reported interest, principal
//! and balance replace the projection; windows with no repayment keep their
//! projected figures. The input schedule is never modified.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculator::price_terms;
use crate::error::LoanEngineError;
use crate::schedule::{generate, PaymentStatus, Schedule, ScheduleTotals};
use crate::terms::{LoanTerms, RepaymentRecord};
use crate::types::{checked_sum, with_metadata, ComputationOutput, DAYS_PER_PERIOD};
use crate::LoanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Bucket repayments dated after the last window into the final period
    /// instead of rejecting them.
    #[serde(default)]
    pub fold_late_payments: bool,
}

/// Terms, start date and the loan's recorded repayments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileInput {
    pub terms: LoanTerms,
    pub start_date: NaiveDate,
    pub repayments: Vec<RepaymentRecord>,
    #[serde(default)]
    pub options: ReconcileOptions,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Merge recorded repayments into `schedule`, rejecting repayments dated
/// after its final due date.
///
/// Overpayment notes only reach the log here; use [`reconcile_with`] or
/// [`reconcile_loan`] to receive them.
pub fn reconcile(schedule: &Schedule, repayments: &[RepaymentRecord]) -> LoanResult<Schedule> {
    reconcile_with(schedule, repayments, &ReconcileOptions::default()).map(|(merged, _)| merged)
}

/// Merge under explicit `options`, returning the reconciled schedule together
/// with the warnings raised (overpaid periods, late repayments folded).
pub fn reconcile_with(
    schedule: &Schedule,
    repayments: &[RepaymentRecord],
    options: &ReconcileOptions,
) -> LoanResult<(Schedule, Vec<String>)> {
    let mut warnings = Vec::new();
    let merged = merge(schedule, repayments, options, &mut warnings)?;
    Ok((merged, warnings))
}

/// Generate the schedule for `input.terms` and reconcile the recorded repayments against it.
pub fn reconcile_loan(input: &ReconcileInput) -> LoanResult<ComputationOutput<Schedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let priced = price_terms(&input.terms)?;
    let projected = generate(&input.terms, &priced, input.start_date)?;
    let reconciled = merge(&projected, &input.repayments, &input.options, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Schedule Reconciliation: recorded repayments supersede projection per 30-day window",
        &serde_json::json!({
            "principal": input.terms.principal.to_string(),
            "duration_days": input.terms.duration_days,
            "method": input.terms.method,
            "monthly_rate": input.terms.monthly_rate.to_string(),
            "start_date": input.start_date,
            "repayments": input.repayments.len(),
            "fold_late_payments": input.options.fold_late_payments,
        }),
        warnings,
        elapsed,
        reconciled,
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn merge(
    schedule: &Schedule,
    repayments: &[RepaymentRecord],
    options: &ReconcileOptions,
    warnings: &mut Vec<String>,
) -> LoanResult<Schedule> {
    let months = schedule.months();
    let final_due = match schedule.final_period() {
        Some(last) => last.due_date,
        None => {
            return Err(LoanEngineError::InvariantViolation(
                "cannot reconcile against an empty schedule".into(),
            ))
        }
    };

    // period index -> (input position, payment date, record)
    let mut buckets: BTreeMap<u32, Vec<(usize, NaiveDate, &RepaymentRecord)>> = BTreeMap::new();
    let mut late: Vec<u32> = Vec::new();

    for (pos, record) in repayments.iter().enumerate() {
        let date = validate_record(schedule, pos, record)?;
        let implied = period_of(schedule.start_date, date);
        // The final due date closes the last window rather than opening a new one.
        let index = if implied <= months {
            implied
        } else if date <= final_due {
            months
        } else {
            late.push(implied);
            months
        };
        buckets.entry(index).or_default().push((pos, date, record));
    }

    if let Some(&furthest) = late.iter().max() {
        if !options.fold_late_payments {
            return Err(LoanEngineError::ReconciliationMismatch {
                expected_periods: months,
                implied_periods: furthest,
                reason: format!(
                    "repayments dated after the final due date {final_due}; terms may have changed since the schedule was generated"
                ),
            });
        }
        warn!(
            "{} repayment(s) dated past period {months} folded into the final period",
            late.len()
        );
        warnings.push(format!(
            "{} repayment(s) after the final due window were counted against period {months}",
            late.len()
        ));
    }

    let mut periods = schedule.periods.clone();
    for period in periods.iter_mut() {
        if let Some(records) = buckets.get(&period.index) {
            let paid = checked_sum("payment_amount", records.iter().map(|(_, _, r)| r.payment_amount))?;
            if let Some((_, _, latest)) = records.iter().max_by_key(|(pos, date, _)| (*date, *pos)) {
                period.interest_component = latest.interest_amount;
                period.principal_component = latest.principal_amount;
                period.ending_balance = latest.balance;
            }
            period.actual_paid = paid;
        }

        period.payment_due = period.scheduled_payment - period.actual_paid;
        period.status = if period.payment_due <= Decimal::ZERO {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        };

        if period.payment_due < Decimal::ZERO {
            warn!(
                "period {} overpaid by {}",
                period.index,
                -period.payment_due
            );
            warnings.push(format!(
                "Period {} overpaid by {}",
                period.index,
                -period.payment_due
            ));
        }
    }

    let totals = ScheduleTotals::from_periods(schedule.terms.principal, &periods)?;
    debug!(
        "reconciled {} repayment(s): paid={} outstanding={} periods_paid={}",
        repayments.len(),
        totals.total_paid,
        totals.total_outstanding,
        totals.periods_paid
    );

    Ok(Schedule {
        terms: schedule.terms.clone(),
        start_date: schedule.start_date,
        installment: schedule.installment,
        periods,
        totals,
    })
}

/// 1-based period whose window `[start + 30(i-1), start + 30i)` contains `date`.
fn period_of(start_date: NaiveDate, date: NaiveDate) -> u32 {
    let days = (date - start_date).num_days().max(0) as u64;
    let index = days / u64::from(DAYS_PER_PERIOD) + 1;
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn validate_record(
    schedule: &Schedule,
    pos: usize,
    record: &RepaymentRecord,
) -> LoanResult<NaiveDate> {
    if record.payment_amount <= Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "payment_amount",
            format!("Repayment #{pos} has non-positive amount {}", record.payment_amount),
        ));
    }
    if record.balance < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "balance",
            format!("Repayment #{pos} reports negative balance {}", record.balance),
        ));
    }
    if let (Some(expected), Some(actual)) = (schedule.loan_id(), record.loan_id.as_deref()) {
        if expected != actual {
            return Err(LoanEngineError::invalid(
                "loan_id",
                format!("Repayment #{pos} belongs to loan {actual}, schedule is for {expected}"),
            ));
        }
    }
    if let Some(method) = record.method {
        if method != schedule.terms.method {
            return Err(LoanEngineError::ReconciliationMismatch {
                expected_periods: schedule.months(),
                implied_periods: schedule.months(),
                reason: format!(
                    "repayment #{pos} was booked under {method} interest but the schedule uses {}",
                    schedule.terms.method
                ),
            });
        }
    }

    let date = record.payment_date.ok_or_else(|| {
        LoanEngineError::invalid(
            "payment_date",
            format!("Repayment #{pos} has no payment date"),
        )
    })?;
    if date < schedule.start_date {
        return Err(LoanEngineError::invalid(
            "payment_date",
            format!(
                "Repayment #{pos} dated {date} precedes loan start {}",
                schedule.start_date
            ),
        ));
    }
    Ok(date)
}
