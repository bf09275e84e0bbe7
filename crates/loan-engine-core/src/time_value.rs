use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::LoanEngineError;
use crate::types::{checked_div, checked_mul, Money, Rate};
use crate::LoanResult;

/// Compound growth factor (1 + r)^n.
pub fn compound_factor(rate: Rate, nper: u32) -> LoanResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(LoanEngineError::invalid(
            "rate",
            "Periodic rate must be greater than -100%",
        ));
    }
    (Decimal::ONE + rate)
        .checked_powd(Decimal::from(nper))
        .ok_or_else(|| {
            LoanEngineError::invalid(
                "duration_days",
                format!("Compounding {nper} periods overflows decimal range"),
            )
        })
}

/// Level payment that retires `principal` over `nper` periods (annuity-immediate).
///
/// `principal * r * (1+r)^n / ((1+r)^n - 1)`, or `principal / n` when the rate is zero.
/// The growth ratio is taken first so the intermediate stays near `principal * r`.
pub fn annuity_payment(rate: Rate, nper: u32, principal: Money) -> LoanResult<Money> {
    if nper == 0 {
        return Err(LoanEngineError::invalid(
            "nper",
            "Number of periods must be > 0",
        ));
    }

    if rate.is_zero() {
        return Ok(principal / Decimal::from(nper));
    }

    let factor = compound_factor(rate, nper)?;
    let denominator = factor - Decimal::ONE;

    if denominator.is_zero() {
        return Err(LoanEngineError::DivisionByZero {
            context: "annuity factor".into(),
        });
    }

    let ratio = checked_div("duration_days", factor, denominator)?;
    let periodic_interest = checked_mul("principal", principal, rate)?;
    checked_mul("principal", periodic_interest, ratio)
}

/// Annualise a total growth multiple realised over `years`: `multiple^(1/years) - 1`.
pub fn annualized_growth(multiple: Decimal, years: Decimal) -> LoanResult<Rate> {
    if years.is_zero() {
        return Err(LoanEngineError::DivisionByZero {
            context: "annualisation over zero elapsed years".into(),
        });
    }
    if multiple <= Decimal::ZERO {
        return Err(LoanEngineError::invalid(
            "total_payments",
            "Growth multiple must be positive to annualise",
        ));
    }

    let exponent = Decimal::ONE / years;
    let annual = multiple.checked_powd(exponent).ok_or_else(|| {
        LoanEngineError::invalid(
            "elapsed_days",
            "Annualised growth overflows decimal range for this duration",
        )
    })?;

    Ok(annual - Decimal::ONE)
}
