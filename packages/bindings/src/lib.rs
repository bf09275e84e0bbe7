use napi::Result as NapiResult;
use napi_derive::napi;

use loan_engine_core::{calculator, effective_rate, reconciliation, schedule, LoanTerms};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_installment(terms_json: String) -> NapiResult<String> {
    let terms: LoanTerms = serde_json::from_str(&terms_json).map_err(to_napi_error)?;
    let output = calculator::price_terms(&terms).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn estimate_loan(input_json: String) -> NapiResult<String> {
    let input: calculator::EstimateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = calculator::estimate_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

#[napi]
pub fn build_schedule(input_json: String) -> NapiResult<String> {
    let input: schedule::ScheduleInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::build_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn reconcile_loan(input_json: String) -> NapiResult<String> {
    let input: reconciliation::ReconcileInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = reconciliation::reconcile_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Effective rates
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_effective_rate(input_json: String) -> NapiResult<String> {
    let input: effective_rate::EffectiveRateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = effective_rate::analyze_effective_rate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_loan_effective_rate(input_json: String) -> NapiResult<String> {
    let input: effective_rate::LoanEffectiveRateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = effective_rate::analyze_loan_effective_rate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
