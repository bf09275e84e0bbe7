//! Supply of the monthly nominal rate.
//!
//! The rate is owned by whoever configures the lending business; calculations
//! receive it through [`RateSource`] and read it once per call. Nothing here
//! caches a rate between calls.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LoanEngineError;
use crate::types::Rate;
use crate::LoanResult;

/// Point-in-time read of the monthly nominal rate, as a decimal fraction.
pub trait RateSource {
    fn monthly_rate(&self) -> LoanResult<Rate>;
}

/// A rate known up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRate(pub Rate);

impl RateSource for FixedRate {
    fn monthly_rate(&self) -> LoanResult<Rate> {
        validate_rate(self.0)
    }
}

/// Rate configuration as stored by the business, e.g. `{ "nominal_rate": "0.03" }`.
///
/// A missing value is a configuration error; it is never replaced by a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateConfig {
    #[serde(default)]
    pub nominal_rate: Option<Rate>,
}

impl RateConfig {
    pub fn from_json(json: &str) -> LoanResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            LoanEngineError::Configuration(format!("Unreadable rate configuration: {e}"))
        })
    }
}

impl RateSource for RateConfig {
    fn monthly_rate(&self) -> LoanResult<Rate> {
        match self.nominal_rate {
            Some(rate) => validate_rate(rate),
            None => Err(LoanEngineError::Configuration(
                "No nominal rate configured".into(),
            )),
        }
    }
}

impl<S: RateSource + ?Sized> RateSource for &S {
    fn monthly_rate(&self) -> LoanResult<Rate> {
        (**self).monthly_rate()
    }
}

fn validate_rate(rate: Rate) -> LoanResult<Rate> {
    if rate < Decimal::ZERO {
        return Err(LoanEngineError::Configuration(format!(
            "Configured monthly rate {rate} is negative"
        )));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fixed_rate() {
        assert_eq!(FixedRate(dec!(0.03)).monthly_rate().unwrap(), dec!(0.03));
    }

    #[test]
    fn test_negative_fixed_rate_is_configuration_error() {
        let err = FixedRate(dec!(-0.01)).monthly_rate().unwrap_err();
        assert!(matches!(err, LoanEngineError::Configuration(_)));
    }

    #[test]
    fn test_rate_config_from_json() {
        let cfg = RateConfig::from_json(r#"{ "nominal_rate": "0.035" }"#).unwrap();
        assert_eq!(cfg.monthly_rate().unwrap(), dec!(0.035));

        let cfg = RateConfig::from_json(r#"{ "nominal_rate": 0.02 }"#).unwrap();
        assert_eq!(cfg.monthly_rate().unwrap(), dec!(0.02));
    }

    #[test]
    fn test_missing_rate_is_configuration_error() {
        let cfg = RateConfig::from_json(r#"{ "nominal_rate": null }"#).unwrap();
        let err = cfg.monthly_rate().unwrap_err();
        assert!(matches!(err, LoanEngineError::Configuration(_)));

        let err = RateConfig::from_json("{}").unwrap().monthly_rate().unwrap_err();
        assert!(matches!(err, LoanEngineError::Configuration(_)));
    }

    #[test]
    fn test_garbage_rate_config() {
        let err = RateConfig::from_json(r#"{ "nominal_rate": "three" }"#).unwrap_err();
        assert!(matches!(err, LoanEngineError::Configuration(_)));
    }

    #[test]
    fn test_reference_forwarding() {
        let source = FixedRate(dec!(0.01));
        let by_ref: &dyn RateSource = &source;
        assert_eq!((&by_ref).monthly_rate().unwrap(), dec!(0.01));
    }
}
