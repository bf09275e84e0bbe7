//! Period-by-period repayment schedules.
//!
//! A schedule is an immutable snapshot of one set of [`LoanTerms`]. Periods fall
//! every 30 days from the start date. Interest components are rounded to cents
//! as they are computed; the last period takes whatever principal is left so
//! the loan always closes at exactly zero.

use chrono::{Days, NaiveDate};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::calculator::{price_terms, InstallmentResult};
use crate::error::LoanEngineError;
use crate::terms::{InterestMethod, LoanTerms};
use crate::types::{
    checked_div, checked_mul, checked_sum, round_money, to_percentage, with_metadata,
    ComputationOutput, Money, DAYS_PER_PERIOD, MONEY_TOLERANCE,
};
use crate::LoanResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
}

/// One 30-day period of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPeriod {
    /// 1-based period number.
    pub index: u32,
    pub due_date: NaiveDate,
    pub beginning_balance: Money,
    pub scheduled_payment: Money,
    pub interest_component: Money,
    pub principal_component: Money,
    pub ending_balance: Money,
    /// Monthly rate applied, as a percentage.
    pub rate_applied: Decimal,
    pub actual_paid: Money,
    /// `scheduled_payment - actual_paid`; negative when overpaid.
    pub payment_due: Money,
    pub status: PaymentStatus,
}

/// Aggregate figures over a schedule's periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleTotals {
    pub total_scheduled: Money,
    pub total_interest: Money,
    pub total_principal: Money,
    /// Total interest / principal, percentage over the whole term.
    pub effective_rate: Decimal,
    pub total_paid: Money,
    /// Sum of unpaid amounts across periods still owing.
    pub total_outstanding: Money,
    pub periods_paid: u32,
}

/// An amortization or simple-interest table for one loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub terms: LoanTerms,
    pub start_date: NaiveDate,
    pub installment: Money,
    pub periods: Vec<PaymentPeriod>,
    pub totals: ScheduleTotals,
}

/// Request for a freshly generated schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub terms: LoanTerms,
    pub start_date: NaiveDate,
}

impl ScheduleTotals {
    pub fn from_periods(principal: Money, periods: &[PaymentPeriod]) -> LoanResult<Self> {
        let total_scheduled = checked_sum("scheduled_payment", periods.iter().map(|p| p.scheduled_payment))?;
        let total_interest = checked_sum("interest_component", periods.iter().map(|p| p.interest_component))?;
        let total_principal = checked_sum("principal_component", periods.iter().map(|p| p.principal_component))?;
        let total_paid = checked_sum("actual_paid", periods.iter().map(|p| p.actual_paid))?;
        let total_outstanding = checked_sum(
            "payment_due",
            periods.iter().map(|p| p.payment_due.max(Decimal::ZERO)),
        )?;
        let periods_paid = periods
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid)
            .count() as u32;

        let effective_rate = if principal.is_zero() {
            Decimal::ZERO
        } else {
            round_money(to_percentage(checked_div("principal", total_interest, principal)?)?)
        };

        Ok(ScheduleTotals {
            total_scheduled,
            total_interest,
            total_principal,
            effective_rate,
            total_paid,
            total_outstanding,
            periods_paid,
        })
    }
}

impl Schedule {
    pub fn loan_id(&self) -> Option<&str> {
        self.terms.loan_id.as_deref()
    }

    pub fn months(&self) -> u32 {
        self.periods.len() as u32
    }

    pub fn final_period(&self) -> Option<&PaymentPeriod> {
        self.periods.last()
    }

    /// First day of period `index` (1-based): `start_date + 30 * (index - 1)`.
    pub fn window_start(&self, index: u32) -> LoanResult<NaiveDate> {
        offset_periods(self.start_date, index.saturating_sub(1))
    }

    /// Half-open date window `[start, end)` covered by period `index`.
    pub fn window(&self, index: u32) -> LoanResult<(NaiveDate, NaiveDate)> {
        Ok((self.window_start(index)?, offset_periods(self.start_date, index)?))
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Expand a priced installment into a full schedule starting at `start_date`.
pub fn generate(
    terms: &LoanTerms,
    installment: &InstallmentResult,
    start_date: NaiveDate,
) -> LoanResult<Schedule> {
    terms.validate()?;
    validate_installment(terms, installment)?;

    let months = installment.months;
    // Fail on an unrepresentable final due date before walking any periods.
    offset_periods(start_date, months)?;

    let payment = installment.installment;
    let rate = terms.monthly_rate;
    let rate_applied = to_percentage(rate)?;
    let simple_interest = round_money(checked_mul("principal", terms.principal, rate)?);

    let mut periods: Vec<PaymentPeriod> = Vec::with_capacity(months as usize);
    let mut balance = terms.principal;

    for index in 1..=months {
        let beginning_balance = balance;

        let (interest_component, principal_component) = if index == months {
            // Final period clears the balance exactly; rounding drift lands in interest.
            (payment - beginning_balance, beginning_balance)
        } else {
            let interest = match terms.method {
                InterestMethod::Simple => simple_interest,
                InterestMethod::Amortized => {
                    round_money(checked_mul("principal", beginning_balance, rate)?)
                }
            };
            (interest, payment - interest)
        };

        let ending_balance = (beginning_balance - principal_component).max(Decimal::ZERO);

        periods.push(PaymentPeriod {
            index,
            due_date: offset_periods(start_date, index)?,
            beginning_balance,
            scheduled_payment: payment,
            interest_component,
            principal_component,
            ending_balance,
            rate_applied,
            actual_paid: Decimal::ZERO,
            payment_due: payment,
            status: PaymentStatus::Pending,
        });

        balance = ending_balance;
    }

    check_invariants(terms, &periods)?;

    let totals = ScheduleTotals::from_periods(terms.principal, &periods)?;
    debug!(
        "generated {} schedule: {} periods, installment={}, total_interest={}",
        terms.method, months, payment, totals.total_interest
    );

    Ok(Schedule {
        terms: terms.clone(),
        start_date,
        installment: payment,
        periods,
        totals,
    })
}

/// Price the terms and generate their schedule.
pub fn build_schedule(input: &ScheduleInput) -> LoanResult<ComputationOutput<Schedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let priced = price_terms(&input.terms)?;
    let schedule = generate(&input.terms, &priced, input.start_date)?;

    if priced.partial_period {
        warnings.push(format!(
            "Duration of {} days is shorter than one period; single installment with prorated interest",
            input.terms.duration_days
        ));
    }
    let stalled = schedule
        .periods
        .iter()
        .filter(|p| p.index < schedule.months() && p.principal_component <= Decimal::ZERO)
        .count();
    if stalled > 0 {
        warnings.push(format!(
            "{stalled} of {} periods repay no principal: the rounded installment of {} does not exceed the interest on the balance",
            schedule.months(),
            schedule.installment
        ));
    }
    if let Some(last) = schedule.final_period() {
        if last.interest_component < Decimal::ZERO {
            warn!(
                "final-period interest is negative ({}) after balance correction",
                last.interest_component
            );
            warnings.push(format!(
                "Final period repays {} of principal against an installment of {}; interest of {} absorbs the rounding drift",
                last.principal_component, last.scheduled_payment, last.interest_component
            ));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        match input.terms.method {
            InterestMethod::Simple => "Simple-interest schedule: constant interest on original principal",
            InterestMethod::Amortized => "Amortization schedule: interest on declining balance",
        },
        &serde_json::json!({
            "principal": input.terms.principal.to_string(),
            "duration_days": input.terms.duration_days,
            "method": input.terms.method,
            "monthly_rate": input.terms.monthly_rate.to_string(),
            "start_date": input.start_date,
            "period_days": DAYS_PER_PERIOD,
        }),
        warnings,
        elapsed,
        schedule,
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn offset_periods(start_date: NaiveDate, periods: u32) -> LoanResult<NaiveDate> {
    let days = u64::from(periods) * u64::from(DAYS_PER_PERIOD);
    start_date.checked_add_days(Days::new(days)).ok_or_else(|| {
        LoanEngineError::DateError(format!(
            "{start_date} plus {periods} periods is out of the supported date range"
        ))
    })
}

fn validate_installment(terms: &LoanTerms, installment: &InstallmentResult) -> LoanResult<()> {
    if installment.method != terms.method {
        return Err(LoanEngineError::invalid(
            "installment",
            format!(
                "Installment was priced for {} interest but terms use {}",
                installment.method, terms.method
            ),
        ));
    }
    if installment.months != terms.months() {
        return Err(LoanEngineError::invalid(
            "installment",
            format!(
                "Installment was priced over {} periods but terms imply {}",
                installment.months,
                terms.months()
            ),
        ));
    }
    if installment.installment <= Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "installment",
            "Installment must be positive",
        ));
    }
    Ok(())
}

fn check_invariants(terms: &LoanTerms, periods: &[PaymentPeriod]) -> LoanResult<()> {
    let repaid: Money = periods.iter().map(|p| p.principal_component).sum();
    if (repaid - terms.principal).abs() > MONEY_TOLERANCE {
        return Err(LoanEngineError::InvariantViolation(format!(
            "principal components sum to {repaid}, expected {}",
            terms.principal
        )));
    }

    match periods.last() {
        Some(last) if last.ending_balance.is_zero() => {}
        Some(last) => {
            return Err(LoanEngineError::InvariantViolation(format!(
                "final balance is {} instead of zero",
                last.ending_balance
            )))
        }
        None => {
            return Err(LoanEngineError::InvariantViolation(
                "schedule has no periods".into(),
            ))
        }
    }

    for p in periods {
        if (p.interest_component + p.principal_component - p.scheduled_payment).abs()
            > MONEY_TOLERANCE
        {
            return Err(LoanEngineError::InvariantViolation(format!(
                "period {} components do not add up to its payment",
                p.index
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::compute_installment;
    use rust_decimal_macros::dec;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    fn schedule_for(principal: Decimal, days: u32, method: InterestMethod, rate: Decimal) -> Schedule {
        let terms = LoanTerms::new(principal, days, method, rate).unwrap();
        let priced = compute_installment(principal, days, method, rate).unwrap();
        generate(&terms, &priced, start()).unwrap()
    }

    // -----------------------------------------------------------------------
    // 1. Amortized: interest on current balance, period by period
    // -----------------------------------------------------------------------
    #[test]
    fn test_amortized_period_by_period() {
        let s = schedule_for(dec!(10000), 180, InterestMethod::Amortized, dec!(0.03));
        assert_eq!(s.periods.len(), 6);

        let expected_interest = [
            dec!(300.00),
            dec!(253.62),
            dec!(205.85),
            dec!(156.65),
            dec!(105.97),
            dec!(53.79),
        ];
        for (p, want) in s.periods.iter().zip(expected_interest) {
            assert_eq!(p.interest_component, want, "period {}", p.index);
            assert_eq!(p.scheduled_payment, dec!(1845.98));
        }

        assert_eq!(s.periods[0].ending_balance, dec!(8454.02));
        assert_eq!(s.periods[4].ending_balance, dec!(1792.19));
        assert_eq!(s.periods[5].principal_component, dec!(1792.19));
        assert_eq!(s.periods[5].ending_balance, dec!(0));
        assert_eq!(s.totals.total_principal, dec!(10000));
        assert_eq!(s.totals.total_interest, dec!(1075.88));
    }

    // -----------------------------------------------------------------------
    // 2. Simple: constant interest, final period absorbs rounding
    // -----------------------------------------------------------------------
    #[test]
    fn test_simple_constant_interest() {
        let s = schedule_for(dec!(10000), 180, InterestMethod::Simple, dec!(0.03));
        for p in &s.periods[..5] {
            assert_eq!(p.interest_component, dec!(300));
            assert_eq!(p.principal_component, dec!(1666.67));
        }
        let last = s.final_period().unwrap();
        assert_eq!(last.principal_component, dec!(1666.65));
        assert_eq!(last.interest_component, dec!(300.02));
        assert_eq!(last.ending_balance, dec!(0));
        assert_eq!(s.totals.total_principal, dec!(10000));
    }

    #[test]
    fn test_due_dates_every_thirty_days() {
        let s = schedule_for(dec!(1000), 90, InterestMethod::Simple, dec!(0.05));
        assert_eq!(s.periods[0].due_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(s.periods[1].due_date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(s.periods[2].due_date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
    }

    #[test]
    fn test_partial_period_single_row() {
        let s = schedule_for(dec!(5000), 15, InterestMethod::Amortized, dec!(0.03));
        assert_eq!(s.periods.len(), 1);
        let p = &s.periods[0];
        assert_eq!(p.scheduled_payment, dec!(5075));
        assert_eq!(p.principal_component, dec!(5000));
        assert_eq!(p.interest_component, dec!(75));
        assert_eq!(p.ending_balance, dec!(0));
    }

    #[test]
    fn test_fresh_schedule_is_all_pending() {
        let s = schedule_for(dec!(2000), 60, InterestMethod::Amortized, dec!(0.02));
        assert!(s.periods.iter().all(|p| p.status == PaymentStatus::Pending));
        assert!(s.periods.iter().all(|p| p.payment_due == p.scheduled_payment));
        assert_eq!(s.totals.periods_paid, 0);
        assert_eq!(s.totals.total_outstanding, s.totals.total_scheduled);
    }

    #[test]
    fn test_zero_rate_final_interest_absorbs_drift() {
        let terms = LoanTerms::new(dec!(1000), 90, InterestMethod::Amortized, dec!(0)).unwrap();
        let out = build_schedule(&ScheduleInput {
            terms,
            start_date: start(),
        })
        .unwrap();
        let last = out.result.final_period().unwrap().clone();
        assert_eq!(last.principal_component, dec!(333.34));
        assert_eq!(last.interest_component, dec!(-0.01));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_installment_equal_to_interest_defers_all_principal() {
        // 1.03^360 makes the annuity round to exactly one period's interest.
        let terms = LoanTerms::new(dec!(1000), 10800, InterestMethod::Amortized, dec!(0.03)).unwrap();
        let out = build_schedule(&ScheduleInput {
            terms,
            start_date: start(),
        })
        .unwrap();
        let s = &out.result;
        assert_eq!(s.months(), 360);
        assert_eq!(s.installment, dec!(30));
        assert_eq!(s.periods[0].interest_component, dec!(30));
        assert_eq!(s.periods[0].principal_component, dec!(0));
        assert_eq!(s.periods[358].ending_balance, dec!(1000));

        let last = s.final_period().unwrap();
        assert_eq!(last.principal_component, dec!(1000));
        assert_eq!(last.interest_component, dec!(-970));
        assert_eq!(last.ending_balance, dec!(0));

        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings[0].starts_with("359 of 360 periods repay no principal"));
        assert!(out.warnings[1].contains("repays 1000.00 of principal"));
        assert!(out.warnings[1].contains("interest of -970.00"));
    }

    #[test]
    fn test_mismatched_installment_rejected() {
        let terms = LoanTerms::new(dec!(10000), 180, InterestMethod::Simple, dec!(0.03)).unwrap();
        let priced = compute_installment(dec!(10000), 90, InterestMethod::Simple, dec!(0.03)).unwrap();
        let err = generate(&terms, &priced, start()).unwrap_err();
        match err {
            LoanEngineError::InvalidParameter { field, .. } => assert_eq!(field, "installment"),
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }

        let priced = compute_installment(dec!(10000), 180, InterestMethod::Amortized, dec!(0.03)).unwrap();
        assert!(generate(&terms, &priced, start()).is_err());
    }

    #[test]
    fn test_overpriced_installment_violates_invariant() {
        let terms = LoanTerms::new(dec!(10000), 180, InterestMethod::Simple, dec!(0.03)).unwrap();
        let mut priced = compute_installment(dec!(10000), 180, InterestMethod::Simple, dec!(0.03)).unwrap();
        // Installment so large the balance is exhausted before the final period.
        priced.installment = dec!(5000);
        let err = generate(&terms, &priced, start()).unwrap_err();
        assert!(matches!(err, LoanEngineError::InvariantViolation(_)));
    }

    #[test]
    fn test_date_out_of_range() {
        let terms = LoanTerms::new(dec!(1000), 90, InterestMethod::Simple, dec!(0.01)).unwrap();
        let priced = compute_installment(dec!(1000), 90, InterestMethod::Simple, dec!(0.01)).unwrap();
        let err = generate(&terms, &priced, NaiveDate::MAX).unwrap_err();
        assert!(matches!(err, LoanEngineError::DateError(_)));
    }

    #[test]
    fn test_windows() {
        let s = schedule_for(dec!(1000), 90, InterestMethod::Simple, dec!(0.05));
        let (from, to) = s.window(2).unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(s.window_start(1).unwrap(), start());
    }
}
