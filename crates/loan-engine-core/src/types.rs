use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LoanEngineError;
use crate::LoanResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.03 = 3%). Percentages are always named `*_pct`
/// or documented as such.
pub type Rate = Decimal;

/// Length of one repayment period. Every loan runs on a fixed 30-day cadence.
pub const DAYS_PER_PERIOD: u32 = 30;

/// Day count used when annualising realised returns.
pub const DAYS_PER_YEAR: Decimal = dec!(365);

/// Tolerance for schedule reconciliation laws (one cent).
pub const MONEY_TOLERANCE: Money = dec!(0.01);

/// Round a monetary amount to cents, always carrying two decimal places.
pub fn round_money(value: Decimal) -> Money {
    let mut cents = value.round_dp(2);
    cents.rescale(2);
    cents
}

/// Convert a decimal fraction to a percentage (0.03 -> 3).
pub fn to_percentage(rate: Rate) -> LoanResult<Decimal> {
    checked_mul("rate", rate, dec!(100))
}

// ---------------------------------------------------------------------------
// Overflow-checked arithmetic
// ---------------------------------------------------------------------------

/// `a * b`, or an `InvalidParameter` on `field` when the product leaves decimal range.
pub(crate) fn checked_mul(field: &str, a: Decimal, b: Decimal) -> LoanResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(field))
}

/// `a / b` for a divisor the caller has already checked is non-zero.
pub(crate) fn checked_div(field: &str, a: Decimal, b: Decimal) -> LoanResult<Decimal> {
    a.checked_div(b).ok_or_else(|| overflow(field))
}

pub(crate) fn checked_add(field: &str, a: Decimal, b: Decimal) -> LoanResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(field))
}

pub(crate) fn checked_sum(field: &str, values: impl IntoIterator<Item = Decimal>) -> LoanResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| checked_add(field, acc, v))
}

fn overflow(field: &str) -> LoanEngineError {
    LoanEngineError::invalid(field, "Result is outside the representable decimal range")
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> LoanResult<ComputationOutput<T>> {
    Ok(ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions)?,
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    })
}
