//! IVA (Spanish VAT) rate helpers.

use rust_decimal::Decimal;

/// Standard Spanish IVA rates in percent: general, reduced, super-reduced.
pub const SPANISH_IVA_RATES: [u32; 3] = [21, 10, 4];

/// Lowest rate accepted when a rate is inferred from amounts (3%).
pub const MIN_IMPLIED_RATE: Decimal = Decimal::from_parts(3, 0, 0, false, 2);

/// Highest rate accepted when a rate is inferred from amounts (25%).
pub const MAX_IMPLIED_RATE: Decimal = Decimal::from_parts(25, 0, 0, false, 2);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Convert a printed percentage (`10`, `10,00`) into a fraction, rejecting values outside (0, 100].
pub fn rate_from_percent(percent: Decimal) -> Option<Decimal> {
    if percent > Decimal::ZERO && percent <= HUNDRED {
        Some(percent / HUNDRED)
    } else {
        None
    }
}

/// `tax / base` when both are positive.
pub fn implied_rate(base: Decimal, tax: Decimal) -> Option<Decimal> {
    if base > Decimal::ZERO && tax > Decimal::ZERO {
        Some(tax / base)
    } else {
        None
    }
}

/// Whether an inferred rate is within the band real IVA rates live in.
pub fn is_plausible_rate(rate: Decimal) -> bool {
    rate >= MIN_IMPLIED_RATE && rate <= MAX_IMPLIED_RATE
}

/// Whether a fraction is a usable tax rate at all.
pub fn is_valid_rate(rate: Decimal) -> bool {
    rate > Decimal::ZERO && rate <= Decimal::ONE
}

/// Round a rate to whole-percent precision.
///
/// Rates inferred from rounded amounts (`3.27 / 32.73`) land a hair off the printed rate.
/// Rates below half a percent keep their precision so they never collapse to zero.
pub fn round_rate(rate: Decimal) -> Decimal {
    let rounded = rate.round_dp(2);
    if rounded.is_zero() { rate } else { rounded }
}

/// Calculate the base from a tax-inclusive amount.
pub fn base_from_total(total: Decimal, rate: Decimal) -> Decimal {
    let divisor = Decimal::ONE + rate;
    if divisor.is_zero() {
        total
    } else {
        total / divisor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_rate_from_percent() {
        assert_eq!(rate_from_percent(dec("10.00")), Some(dec("0.1")));
        assert_eq!(rate_from_percent(dec("21")), Some(dec("0.21")));
        assert_eq!(rate_from_percent(dec("100")), Some(Decimal::ONE));
        assert_eq!(rate_from_percent(Decimal::ZERO), None);
        assert_eq!(rate_from_percent(dec("101")), None);
    }

    #[test]
    fn test_implied_rate_and_plausibility() {
        let rate = implied_rate(dec("32.73"), dec("3.27")).unwrap();
        assert!(is_plausible_rate(rate));
        assert_eq!(round_rate(rate), dec("0.10"));

        assert_eq!(implied_rate(Decimal::ZERO, dec("1")), None);
        assert!(!is_plausible_rate(dec("0.5")));
        assert!(!is_plausible_rate(dec("0.01")));
    }

    #[test]
    fn test_round_rate_keeps_tiny_rates() {
        assert_eq!(round_rate(dec("0.0999")), dec("0.10"));
        assert_eq!(round_rate(dec("0.004")), dec("0.004"));
    }

    #[test]
    fn test_base_from_total() {
        assert_eq!(base_from_total(dec("121"), dec("0.21")), dec("100"));
    }
}
