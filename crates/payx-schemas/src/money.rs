//! Money helpers. Amounts are base-10 fixed-point with exactly two
//! fractional digits (NUMERIC(18,2)); the daily-limit cache counter uses an
//! integer-cents shadow of the same value.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Convert an amount to integer cents. Amounts carry exactly two
/// fractional digits so the scaling is exact; anything finer rounds to the
/// nearest even cent. Saturates at i64 bounds, far outside the 18.2
/// domain.
pub fn decimal_to_cents(amount: Decimal) -> i64 {
    let scaled = (amount * Decimal::new(100, 0)).round();
    scaled.to_i64().unwrap_or(if scaled.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cents_roundtrip() {
        assert_eq!(decimal_to_cents(dec!(10.00)), 1000);
        assert_eq!(decimal_to_cents(dec!(0.01)), 1);
        assert_eq!(cents_to_decimal(1000), dec!(10.00));
        assert_eq!(cents_to_decimal(1), dec!(0.01));
    }

    #[test]
    fn sub_cent_amounts_round_to_nearest_even_cent() {
        assert_eq!(decimal_to_cents(dec!(0.005)), 0);
        assert_eq!(decimal_to_cents(dec!(0.015)), 2);
        assert_eq!(decimal_to_cents(dec!(0.004)), 0);
        assert_eq!(decimal_to_cents(dec!(0.006)), 1);
    }

    #[test]
    fn eighteen_two_domain_fits() {
        let max = dec!(9999999999999999.99);
        assert_eq!(decimal_to_cents(max), 999_999_999_999_999_999);
        assert_eq!(cents_to_decimal(999_999_999_999_999_999), max);
    }
}
