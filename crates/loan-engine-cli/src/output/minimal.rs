use serde_json::Value;

use super::{result_of, scalar_text};

/// Print the headline figure of a result: the installment for pricing and
/// schedules, the annualised rate for rate analysis.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    let priority_keys = [
        "instalments",
        "installment",
        "annualized_effective_rate",
        "effective_rate",
    ];

    if let Value::Object(map) = result {
        for key in &priority_keys {
            if let Some(val) = map.get(*key).filter(|v| !v.is_null()) {
                println!("{}", scalar_text(val));
                return;
            }
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, scalar_text(val));
            return;
        }
    }

    println!("{}", scalar_text(result));
}
