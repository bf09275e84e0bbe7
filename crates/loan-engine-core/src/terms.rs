//! Loan terms and repayment facts: the inputs every calculation starts from.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LoanEngineError;
use crate::types::{Money, Rate, DAYS_PER_PERIOD};
use crate::LoanResult;

// ---------------------------------------------------------------------------
// Interest method
// ---------------------------------------------------------------------------

/// How interest accrues over the life of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestMethod {
    /// Interest on the original principal every period.
    Simple,
    /// Level installments; interest on the declining balance.
    #[serde(alias = "amortised", alias = "amortisation", alias = "amortization")]
    Amortized,
}

impl InterestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestMethod::Simple => "simple",
            InterestMethod::Amortized => "amortized",
        }
    }
}

impl fmt::Display for InterestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterestMethod {
    type Err = LoanEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(InterestMethod::Simple),
            "amortized" | "amortised" | "amortisation" | "amortization" => {
                Ok(InterestMethod::Amortized)
            }
            other => Err(LoanEngineError::invalid(
                "method",
                format!("Unknown interest method '{other}' (expected simple or amortized)"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Loan terms
// ---------------------------------------------------------------------------

/// Contracted terms of a loan. A schedule is a snapshot of one set of terms;
/// changing any field means generating a new schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<String>,
    pub principal: Money,
    pub duration_days: u32,
    pub method: InterestMethod,
    /// Monthly nominal rate as a fraction (0.03 = 3% per 30-day period).
    pub monthly_rate: Rate,
}

impl LoanTerms {
    pub fn new(
        principal: Money,
        duration_days: u32,
        method: InterestMethod,
        monthly_rate: Rate,
    ) -> LoanResult<Self> {
        let terms = LoanTerms {
            loan_id: None,
            principal,
            duration_days,
            method,
            monthly_rate,
        };
        terms.validate()?;
        Ok(terms)
    }

    pub fn with_loan_id(mut self, loan_id: impl Into<String>) -> Self {
        self.loan_id = Some(loan_id.into());
        self
    }

    /// Build terms from raw form values, coercing each to its numeric type.
    pub fn parse(
        principal: &str,
        duration_days: &str,
        method: &str,
        monthly_rate: Rate,
    ) -> LoanResult<Self> {
        let principal = parse_decimal("principal", principal)?;
        let duration_days = parse_days(duration_days)?;
        let method = method.parse()?;
        LoanTerms::new(principal, duration_days, method, monthly_rate)
    }

    pub fn validate(&self) -> LoanResult<()> {
        validate_terms(self.principal, self.duration_days, self.monthly_rate)
    }

    /// Number of 30-day periods: `round(duration_days / 30)`, at least one.
    pub fn months(&self) -> u32 {
        period_count(self.duration_days)
    }

    /// Loans shorter than one period are a single, prorated installment.
    pub fn is_partial_period(&self) -> bool {
        self.duration_days < DAYS_PER_PERIOD
    }
}

// ---------------------------------------------------------------------------
// Recorded facts
// ---------------------------------------------------------------------------

/// A repayment as recorded by the persistence layer. Read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<String>,
    pub payment_amount: Money,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub interest_amount: Money,
    pub principal_amount: Money,
    pub balance: Money,
    /// Interest method the repayment was booked under, when the ledger keeps it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<InterestMethod>,
}

/// The loan as originated: what effective-rate analysis needs besides repayments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<String>,
    pub principal: Money,
    pub start_date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn validate_terms(principal: Money, duration_days: u32, monthly_rate: Rate) -> LoanResult<()> {
    if principal <= Decimal::ZERO {
        return Err(LoanEngineError::invalid("principal", "Principal must be positive"));
    }
    if duration_days == 0 {
        return Err(LoanEngineError::invalid(
            "duration_days",
            "Duration must be at least one day",
        ));
    }
    if monthly_rate < Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "monthly_rate",
            "Monthly rate cannot be negative",
        ));
    }
    Ok(())
}

/// `round(days / 30)` with banker's rounding, floored at one period.
pub(crate) fn period_count(duration_days: u32) -> u32 {
    if duration_days < DAYS_PER_PERIOD {
        return 1;
    }
    let periods = (Decimal::from(duration_days) / Decimal::from(DAYS_PER_PERIOD)).round_dp(0);
    periods.to_u32().unwrap_or(u32::MAX).max(1)
}

/// Coerce a raw string into a decimal, naming the field on failure.
pub fn parse_decimal(field: &str, raw: &str) -> LoanResult<Decimal> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| LoanEngineError::invalid(field, format!("'{raw}' is not a number")))
}

fn parse_days(raw: &str) -> LoanResult<u32> {
    let days = parse_decimal("duration_days", raw)?;
    if days.fract() != dec!(0) {
        return Err(LoanEngineError::invalid(
            "duration_days",
            format!("'{raw}' is not a whole number of days"),
        ));
    }
    days.to_u32().ok_or_else(|| {
        LoanEngineError::invalid("duration_days", format!("'{raw}' is out of range"))
    })
}
