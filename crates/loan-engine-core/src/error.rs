use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanEngineError {
    #[error("Invalid parameter {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("No repayments: {0}")]
    NoRepayments(String),

    #[error("Reconciliation mismatch: schedule has {expected_periods} periods, records imply {implied_periods}: {reason}")]
    ReconciliationMismatch {
        expected_periods: u32,
        implied_periods: u32,
        reason: String,
    },

    #[error("Schedule invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LoanEngineError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LoanEngineError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LoanEngineError {
    fn from(e: serde_json::Error) -> Self {
        LoanEngineError::Serialization(e.to_string())
    }
}
