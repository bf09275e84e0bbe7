pub mod calculator;
pub mod error;
pub mod rate_source;
pub mod terms;
pub mod time_value;
pub mod types;

#[cfg(feature = "schedule")]
pub mod schedule;

#[cfg(feature = "reconciliation")]
pub mod reconciliation;

#[cfg(feature = "effective_rate")]
pub mod effective_rate;

pub use error::LoanEngineError;
pub use rate_source::{FixedRate, RateConfig, RateSource};
pub use terms::{InterestMethod, LoanRecord, LoanTerms, RepaymentRecord};
pub use types::*;

/// Standard result type for all loan-engine operations
pub type LoanResult<T> = Result<T, LoanEngineError>;
