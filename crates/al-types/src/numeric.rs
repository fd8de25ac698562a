//! Numeric boundary adapters.
//!
//! Internally everything is `f64`. Two explicit conversions exist at the
//! system boundary: [`store_decimal`] produces the exact-decimal
//! representation used for persisted record fields, and [`wire_f64`] produces
//! the floating-point representation used in JSON responses. Conversion
//! happens only at the boundary, never ambiently.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Round to `digits` decimal places, matching the reported precision of every
/// figure that leaves the core (2 for KD/scores, 3 for model stats, 1 for
/// yields).
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Deterministic f64 → Decimal conversion for persisted fields.
///
/// Goes through the shortest decimal string representation so that the stored
/// value round-trips the printed value exactly.
pub fn store_decimal(value: f64) -> Decimal {
    let text = format!("{value}");
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| Decimal::from_f64_retain(value))
        .unwrap_or(Decimal::ZERO)
}

/// Decimal → f64 conversion for wire/JSON payloads.
pub fn wire_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_to_reported_precision() {
        assert_eq!(round_to(1.456, 2), 1.46);
        assert_eq!(round_to(0.8451, 3), 0.845);
        assert_eq!(round_to(62.34, 1), 62.3);
    }

    #[test]
    fn store_decimal_is_exact_for_printed_value() {
        assert_eq!(store_decimal(2.5), dec!(2.5));
        assert_eq!(store_decimal(0.85), dec!(0.85));
        assert_eq!(store_decimal(-1.96), dec!(-1.96));
    }

    #[test]
    fn store_decimal_handles_scientific_notation() {
        // f64 Display switches to scientific notation for small magnitudes
        let d = store_decimal(0.0000003);
        assert!(d > Decimal::ZERO);
        assert_eq!(wire_f64(d), 0.0000003);
    }

    #[test]
    fn roundtrip_preserves_value() {
        for v in [0.4, 1.45, 2.8, 7.0, 100.0, 0.015] {
            assert_eq!(wire_f64(store_decimal(v)), v);
        }
    }
}
