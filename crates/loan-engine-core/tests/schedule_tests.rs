use chrono::NaiveDate;
use loan_engine_core::calculator::{compute_installment, compute_installment_from_source};
use loan_engine_core::schedule::{build_schedule, generate, ScheduleInput};
use loan_engine_core::{FixedRate, InterestMethod, LoanEngineError, LoanTerms, RateConfig};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 15).unwrap()
}

fn principals() -> Vec<Decimal> {
    vec![dec!(150), dec!(999.99), dec!(5000), dec!(10000), dec!(123456.78)]
}

fn durations() -> Vec<u32> {
    vec![1, 15, 29, 30, 45, 75, 90, 180, 365, 730]
}

fn rates() -> Vec<Decimal> {
    vec![dec!(0), dec!(0.005), dec!(0.03), dec!(0.1)]
}

// ===========================================================================
// Laws over a grid of terms
// ===========================================================================

#[test]
fn test_principal_sum_and_zero_final_balance_hold_everywhere() {
    for method in [InterestMethod::Simple, InterestMethod::Amortized] {
        for principal in principals() {
            for days in durations() {
                for rate in rates() {
                    let terms = LoanTerms::new(principal, days, method, rate).unwrap();
                    let priced = compute_installment(principal, days, method, rate).unwrap();
                    let s = generate(&terms, &priced, start()).unwrap();

                    let repaid: Decimal = s.periods.iter().map(|p| p.principal_component).sum();
                    assert!(
                        (repaid - principal).abs() <= dec!(0.01),
                        "{method} {principal} {days}d @{rate}: repaid {repaid}"
                    );
                    assert_eq!(s.final_period().unwrap().ending_balance, Decimal::ZERO);
                    assert_eq!(s.months(), terms.months());
                    for p in &s.periods {
                        assert!(p.ending_balance >= Decimal::ZERO);
                        assert!(
                            (p.interest_component + p.principal_component - p.scheduled_payment).abs()
                                <= dec!(0.01)
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_simple_interest_constant_until_final_period() {
    for principal in principals() {
        for days in durations() {
            let s = build_schedule(&ScheduleInput {
                terms: LoanTerms::new(principal, days, InterestMethod::Simple, dec!(0.03)).unwrap(),
                start_date: start(),
            })
            .unwrap()
            .result;
            let n = s.periods.len();
            if n < 2 {
                continue;
            }
            let first = s.periods[0].interest_component;
            assert!(s.periods[..n - 1].iter().all(|p| p.interest_component == first));
        }
    }
}

#[test]
fn test_amortized_interest_declines() {
    let s = build_schedule(&ScheduleInput {
        terms: LoanTerms::new(dec!(50000), 730, InterestMethod::Amortized, dec!(0.02)).unwrap(),
        start_date: start(),
    })
    .unwrap()
    .result;
    for pair in s.periods.windows(2) {
        assert!(pair[1].interest_component <= pair[0].interest_component);
        assert!(pair[1].beginning_balance < pair[0].beginning_balance);
    }
}

// ===========================================================================
// Concrete scenarios
// ===========================================================================

#[test]
fn test_ten_thousand_over_six_months_amortized() {
    let terms = LoanTerms::new(dec!(10000), 180, InterestMethod::Amortized, dec!(0.03)).unwrap();
    let priced = compute_installment(dec!(10000), 180, InterestMethod::Amortized, dec!(0.03)).unwrap();
    assert_eq!(priced.months, 6);
    assert_eq!(priced.installment, dec!(1845.98));

    let s = generate(&terms, &priced, start()).unwrap();
    assert_eq!(s.final_period().unwrap().ending_balance, dec!(0.00));
    assert_eq!(s.totals.total_principal, dec!(10000.00));
}

#[test]
fn test_fifteen_day_loan_single_installment() {
    for method in [InterestMethod::Simple, InterestMethod::Amortized] {
        let priced = compute_installment(dec!(5000), 15, method, dec!(0.03)).unwrap();
        assert_eq!(priced.months, 1);
        assert_eq!(priced.installment, dec!(5075.00));
    }
}

// ===========================================================================
// Idempotence and rate sourcing
// ===========================================================================

#[test]
fn test_generation_is_idempotent() {
    let terms = LoanTerms::new(dec!(7500), 365, InterestMethod::Amortized, dec!(0.025))
        .unwrap()
        .with_loan_id("loan-abc");
    let priced = compute_installment(dec!(7500), 365, InterestMethod::Amortized, dec!(0.025)).unwrap();

    let a = generate(&terms, &priced, start()).unwrap();
    let b = generate(&terms, &priced, start()).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_rate_change_between_calls_is_honoured() {
    let before =
        compute_installment_from_source(dec!(1000), 90, InterestMethod::Simple, &FixedRate(dec!(0.03)))
            .unwrap();
    let after =
        compute_installment_from_source(dec!(1000), 90, InterestMethod::Simple, &FixedRate(dec!(0.04)))
            .unwrap();
    assert_eq!(before.total_interest, dec!(90));
    assert_eq!(after.total_interest, dec!(120));
}

#[test]
fn test_unconfigured_rate_never_defaults() {
    let err = compute_installment_from_source(
        dec!(1000),
        90,
        InterestMethod::Amortized,
        &RateConfig { nominal_rate: None },
    )
    .unwrap_err();
    assert!(matches!(err, LoanEngineError::Configuration(_)));
}

#[test]
fn test_schedule_serialises_dates_and_decimals_as_strings() {
    let s = build_schedule(&ScheduleInput {
        terms: LoanTerms::new(dec!(1000), 60, InterestMethod::Simple, dec!(0.05)).unwrap(),
        start_date: start(),
    })
    .unwrap();
    let json = serde_json::to_value(&s).unwrap();
    let first = &json["result"]["periods"][0];
    assert_eq!(first["due_date"], "2024-12-15");
    assert_eq!(first["status"], "pending");
    assert_eq!(first["interest_component"], "50.00");
}
