//! Realised return on a loan from the cash actually received.
//!
//! The effective rate is total interest over principal for the whole holding
//! period; the annualised figure compounds that multiple to a 365-day year.

use std::time::Instant;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoanEngineError;
use crate::terms::{LoanRecord, RepaymentRecord};
use crate::time_value::annualized_growth;
use crate::types::{
    checked_div, checked_sum, round_money, to_percentage, with_metadata, ComputationOutput, Money,
    DAYS_PER_YEAR,
};
use crate::LoanResult;

// ---------------------------------------------------------------------------
// Input / Output Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRateResult {
    /// Total interest / principal, percentage.
    pub effective_rate: Decimal,
    /// Effective rate compounded to a 365-day year, percentage.
    pub annualized_effective_rate: Decimal,
    /// Negative when the borrower has repaid less than principal.
    pub total_interest: Money,
    pub elapsed_years: Decimal,
}

/// Effective rate of one loan together with the figures it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanEffectiveRate {
    #[serde(flatten)]
    pub rate: EffectiveRateResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<String>,
    pub principal: Money,
    pub total_payments: Money,
    pub actual_duration_days: i64,
    pub loan_start_date: NaiveDate,
    pub latest_payment_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveRateInput {
    pub principal: Money,
    pub total_payments: Money,
    pub elapsed_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanEffectiveRateInput {
    pub loan: LoanRecord,
    pub repayments: Vec<RepaymentRecord>,
    /// End of the holding period when no repayment carries a date.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Effective and annualised rate from principal, cash received and days elapsed.
pub fn from_payments(
    principal: Money,
    total_payments: Money,
    elapsed_days: i64,
) -> LoanResult<EffectiveRateResult> {
    if principal <= Decimal::ZERO {
        return Err(LoanEngineError::invalid("principal", "Principal must be positive"));
    }
    if total_payments <= Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "total_payments",
            "Total payments must be positive",
        ));
    }
    if elapsed_days <= 0 {
        return Err(LoanEngineError::invalid(
            "elapsed_days",
            "Elapsed days must be positive",
        ));
    }

    let total_interest = total_payments - principal;
    let effective_rate = to_percentage(checked_div("principal", total_interest, principal)?)?;
    let elapsed_years = Decimal::from(elapsed_days) / DAYS_PER_YEAR;
    let multiple = checked_div("principal", total_payments, principal)?;
    let annualized = to_percentage(annualized_growth(multiple, elapsed_years)?)?;

    debug!(
        "effective rate: principal={principal} received={total_payments} days={elapsed_days} rate={effective_rate}"
    );

    Ok(EffectiveRateResult {
        effective_rate: round_money(effective_rate),
        annualized_effective_rate: round_money(annualized),
        total_interest: round_money(total_interest),
        elapsed_years: elapsed_years.round_dp(2),
    })
}

/// Effective rate of a loan from its recorded repayments.
///
/// The holding period runs from the loan's start date to the latest dated
/// repayment, or to `as_of` when none of the repayments is dated.
pub fn from_loan_records(
    loan: &LoanRecord,
    repayments: &[RepaymentRecord],
    as_of: NaiveDate,
) -> LoanResult<LoanEffectiveRate> {
    if repayments.is_empty() {
        return Err(LoanEngineError::NoRepayments(format!(
            "no repayments recorded for loan {}",
            loan.loan_id.as_deref().unwrap_or("<unidentified>")
        )));
    }

    if let Some(expected) = loan.loan_id.as_deref() {
        if let Some(stray) = repayments
            .iter()
            .filter_map(|r| r.loan_id.as_deref())
            .find(|id| *id != expected)
        {
            return Err(LoanEngineError::invalid(
                "loan_id",
                format!("Repayment for loan {stray} supplied with loan {expected}"),
            ));
        }
    }

    let total_payments = checked_sum("payment_amount", repayments.iter().map(|r| r.payment_amount))?;
    let latest_payment_date = repayments
        .iter()
        .filter_map(|r| r.payment_date)
        .max()
        .unwrap_or(as_of);
    let actual_duration_days = (latest_payment_date - loan.start_date).num_days();

    let rate = from_payments(loan.principal, total_payments, actual_duration_days)?;

    Ok(LoanEffectiveRate {
        rate,
        loan_id: loan.loan_id.clone(),
        principal: loan.principal,
        total_payments,
        actual_duration_days,
        loan_start_date: loan.start_date,
        latest_payment_date,
    })
}

pub fn analyze_effective_rate(
    input: &EffectiveRateInput,
) -> LoanResult<ComputationOutput<EffectiveRateResult>> {
    let start = Instant::now();

    let result = from_payments(input.principal, input.total_payments, input.elapsed_days)?;
    let warnings = rate_warnings(&result, input.elapsed_days);

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Effective Rate: realised interest over principal, annualised on a 365-day year",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "total_payments": input.total_payments.to_string(),
            "elapsed_days": input.elapsed_days,
        }),
        warnings,
        elapsed,
        result,
    )
}

pub fn analyze_loan_effective_rate(
    input: &LoanEffectiveRateInput,
) -> LoanResult<ComputationOutput<LoanEffectiveRate>> {
    let start = Instant::now();

    let dated = input.repayments.iter().any(|r| r.payment_date.is_some());
    let as_of = match input.as_of {
        Some(d) => d,
        None if dated || input.repayments.is_empty() => input.loan.start_date,
        None => {
            return Err(LoanEngineError::invalid(
                "as_of",
                "An as-of date is required when no repayment is dated",
            ))
        }
    };

    let result = from_loan_records(&input.loan, &input.repayments, as_of)?;
    let mut warnings = rate_warnings(&result.rate, result.actual_duration_days);
    if !dated {
        warnings.push(format!(
            "No repayment carries a date; holding period measured to {as_of}"
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Loan Effective Rate: recorded repayments from loan start to latest payment",
        &serde_json::json!({
            "loan_id": input.loan.loan_id,
            "principal": input.loan.principal.to_string(),
            "start_date": input.loan.start_date,
            "repayments": input.repayments.len(),
        }),
        warnings,
        elapsed,
        result,
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn rate_warnings(result: &EffectiveRateResult, elapsed_days: i64) -> Vec<String> {
    let mut warnings = Vec::new();
    if result.total_interest < Decimal::ZERO {
        warnings.push("Payments received are below principal; effective rate is negative".into());
    }
    if elapsed_days < 365 {
        warnings.push(format!(
            "Annualised from {elapsed_days} days of history; short periods magnify the annual figure"
        ));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn paid(amount: Decimal, on: Option<NaiveDate>) -> RepaymentRecord {
        RepaymentRecord {
            loan_id: None,
            payment_amount: amount,
            payment_date: on,
            interest_amount: dec!(0),
            principal_amount: amount,
            balance: dec!(0),
            method: None,
        }
    }

    #[test]
    fn test_from_payments_half_year() {
        let r = from_payments(dec!(10000), dec!(10800), 180).unwrap();
        assert_eq!(r.effective_rate, dec!(8.00));
        assert_eq!(r.total_interest, dec!(800));
        assert_eq!(r.elapsed_years, dec!(0.49));
        // 1.08^(365/180) - 1 ≈ 16.89%
        assert!((r.annualized_effective_rate - dec!(16.89)).abs() <= dec!(0.01));
    }

    #[test]
    fn test_full_year_annualised_equals_effective() {
        let r = from_payments(dec!(1000), dec!(1120), 365).unwrap();
        assert_eq!(r.effective_rate, dec!(12));
        assert!((r.annualized_effective_rate - dec!(12)).abs() <= dec!(0.01));
    }

    #[test]
    fn test_effective_rate_sign() {
        let under = from_payments(dec!(10000), dec!(9000), 90).unwrap();
        assert!(under.effective_rate < Decimal::ZERO);
        assert_eq!(under.total_interest, dec!(-1000));
        assert!(under.annualized_effective_rate < Decimal::ZERO);

        let flat = from_payments(dec!(10000), dec!(10000), 90).unwrap();
        assert_eq!(flat.effective_rate, Decimal::ZERO);
        assert_eq!(flat.annualized_effective_rate, Decimal::ZERO);
    }

    #[test]
    fn test_from_payments_rejects_non_positive() {
        for (p, t, d, field) in [
            (dec!(0), dec!(100), 30, "principal"),
            (dec!(100), dec!(0), 30, "total_payments"),
            (dec!(100), dec!(110), 0, "elapsed_days"),
            (dec!(100), dec!(110), -5, "elapsed_days"),
        ] {
            match from_payments(p, t, d).unwrap_err() {
                LoanEngineError::InvalidParameter { field: f, .. } => assert_eq!(f, field),
                other => panic!("Expected InvalidParameter, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_from_payments_multiple_out_of_range() {
        let err = from_payments(dec!(0.0000000001), Decimal::MAX, 400).unwrap_err();
        match err {
            LoanEngineError::InvalidParameter { field, .. } => assert_eq!(field, "principal"),
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_from_loan_records() {
        let loan = LoanRecord {
            loan_id: Some("loan-7".into()),
            principal: dec!(10000),
            start_date: date(2025, 1, 1),
        };
        let repayments = vec![
            paid(dec!(5400), Some(date(2025, 3, 2))),
            paid(dec!(5400), Some(date(2025, 6, 30))),
        ];
        let r = from_loan_records(&loan, &repayments, date(2030, 1, 1)).unwrap();
        assert_eq!(r.total_payments, dec!(10800));
        assert_eq!(r.actual_duration_days, 180);
        assert_eq!(r.latest_payment_date, date(2025, 6, 30));
        assert_eq!(r.rate.effective_rate, dec!(8));
    }

    #[test]
    fn test_from_loan_records_without_dates_uses_as_of() {
        let loan = LoanRecord {
            loan_id: None,
            principal: dec!(1000),
            start_date: date(2025, 1, 1),
        };
        let r = from_loan_records(&loan, &[paid(dec!(1100), None)], date(2026, 1, 1)).unwrap();
        assert_eq!(r.actual_duration_days, 365);
        assert_eq!(r.latest_payment_date, date(2026, 1, 1));
    }

    #[test]
    fn test_no_repayments() {
        let loan = LoanRecord {
            loan_id: Some("loan-9".into()),
            principal: dec!(1000),
            start_date: date(2025, 1, 1),
        };
        let err = from_loan_records(&loan, &[], date(2025, 6, 1)).unwrap_err();
        assert!(matches!(err, LoanEngineError::NoRepayments(_)));
    }

    #[test]
    fn test_same_day_repayment_is_invalid() {
        let loan = LoanRecord {
            loan_id: None,
            principal: dec!(1000),
            start_date: date(2025, 1, 1),
        };
        let err = from_loan_records(&loan, &[paid(dec!(1000), Some(date(2025, 1, 1)))], date(2025, 1, 1))
            .unwrap_err();
        assert!(matches!(err, LoanEngineError::InvalidParameter { .. }));
    }

    #[test]
    fn test_foreign_repayment_rejected() {
        let loan = LoanRecord {
            loan_id: Some("a".into()),
            principal: dec!(1000),
            start_date: date(2025, 1, 1),
        };
        let mut rec = paid(dec!(1100), Some(date(2025, 3, 1)));
        rec.loan_id = Some("b".into());
        assert!(from_loan_records(&loan, &[rec], date(2025, 6, 1)).is_err());
    }

    #[test]
    fn test_analyze_loan_requires_as_of_for_undated() {
        let input = LoanEffectiveRateInput {
            loan: LoanRecord {
                loan_id: None,
                principal: dec!(1000),
                start_date: date(2025, 1, 1),
            },
            repayments: vec![paid(dec!(1100), None)],
            as_of: None,
        };
        let err = analyze_loan_effective_rate(&input).unwrap_err();
        match err {
            LoanEngineError::InvalidParameter { field, .. } => assert_eq!(field, "as_of"),
            other => panic!("Expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_analyze_warnings() {
        let out = analyze_effective_rate(&EffectiveRateInput {
            principal: dec!(1000),
            total_payments: dec!(900),
            elapsed_days: 100,
        })
        .unwrap();
        assert_eq!(out.warnings.len(), 2);
    }
}
