//! Arithmetic reconciliation of extracted amounts.
//!
//! Enforces `total = subtotal + tax`, derives whatever can be derived from the fields present and
//! repairs values that OCR put in the wrong slot. Total over every combination of present and
//! absent fields.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::config::Tolerances;

use super::rules::vat::{base_from_total, implied_rate, is_valid_rate};
use super::rules::MonetaryAccumulator;

/// Largest gap at which a total still counts as equal to the subtotal.
const UNTAXED_TOTAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Reconcile with the default tolerances.
pub fn reconcile(acc: MonetaryAccumulator) -> MonetaryAccumulator {
    reconcile_with(acc, &Tolerances::default())
}

/// Reconcile an accumulator produced by the extraction strategies.
pub fn reconcile_with(acc: MonetaryAccumulator, tolerances: &Tolerances) -> MonetaryAccumulator {
    let acc = resolve_mismatch(acc, tolerances.reconciliation);
    let acc = fill_missing(acc);
    let acc = restore_rated_tax(acc);
    let acc = derive_rate(acc);
    enforce_ordering(acc)
}

/// All three amounts present but not adding up.
fn resolve_mismatch(mut acc: MonetaryAccumulator, tolerance: Decimal) -> MonetaryAccumulator {
    let (Some(total), Some(subtotal), Some(tax)) = (acc.total, acc.subtotal, acc.tax) else {
        return acc;
    };

    let expected = subtotal + tax;
    if (total - expected).abs() <= tolerance {
        return acc;
    }
    warn!(%total, %subtotal, %tax, "Amounts do not add up");

    if expected > total {
        acc.total = Some(expected);
    } else {
        // Smallest is the tax, largest the total.
        let mut sorted = [total, subtotal, tax];
        sorted.sort();
        let [tax, subtotal, total] = sorted;

        acc.tax = Some(if (total - (subtotal + tax)).abs() > tolerance {
            total - subtotal
        } else {
            tax
        });
        acc.subtotal = Some(subtotal);
        acc.total = Some(total);
    }

    debug!(total = ?acc.total, subtotal = ?acc.subtotal, tax = ?acc.tax, "Amounts corrected");
    acc
}

fn fill_missing(mut acc: MonetaryAccumulator) -> MonetaryAccumulator {
    match (acc.total, acc.subtotal, acc.tax, acc.tax_rate) {
        (Some(total), Some(subtotal), None, _) => acc.tax = Some(total - subtotal),
        (Some(total), None, Some(tax), _) => acc.subtotal = Some(total - tax),
        (None, Some(subtotal), Some(tax), _) => acc.total = Some(subtotal + tax),
        (Some(total), None, None, Some(rate)) => {
            let subtotal = base_from_total(total, rate);
            acc.subtotal = Some(subtotal);
            acc.tax = Some(total - subtotal);
        }
        (None, Some(subtotal), None, Some(rate)) => {
            let tax = subtotal * rate;
            acc.tax = Some(tax);
            acc.total = Some(subtotal + tax);
        }
        _ => return acc,
    }

    debug!(total = ?acc.total, subtotal = ?acc.subtotal, tax = ?acc.tax, "Missing amounts derived");
    acc
}

/// A known rate with zero tax and `total == subtotal` means the total missed the tax.
fn restore_rated_tax(mut acc: MonetaryAccumulator) -> MonetaryAccumulator {
    let (Some(total), Some(subtotal), Some(rate)) = (acc.total, acc.subtotal, acc.tax_rate) else {
        return acc;
    };
    if subtotal <= Decimal::ZERO
        || !is_valid_rate(rate)
        || acc.tax.is_some_and(|tax| !tax.is_zero())
        || (total - subtotal).abs() >= UNTAXED_TOTAL_TOLERANCE
    {
        return acc;
    }

    let tax = subtotal * rate;
    warn!(%rate, %subtotal, "Rate present but no tax in the total, recomputing");
    acc.tax = Some(tax);
    acc.total = Some(subtotal + tax);
    acc
}

fn derive_rate(mut acc: MonetaryAccumulator) -> MonetaryAccumulator {
    if acc.tax_rate.is_none() {
        if let (Some(subtotal), Some(tax)) = (acc.subtotal, acc.tax) {
            if subtotal > Decimal::ZERO {
                acc.tax_rate = Some(tax / subtotal);
            }
        }
    }
    acc
}

/// Restore `tax <= subtotal <= total` and keep the rate a fraction in (0, 1].
fn enforce_ordering(mut acc: MonetaryAccumulator) -> MonetaryAccumulator {
    if let (Some(mut total), Some(mut subtotal), Some(mut tax)) = (acc.total, acc.subtotal, acc.tax)
    {
        // A negative difference means two inputs were swapped before subtracting.
        if [total, subtotal, tax].iter().any(|v| *v < Decimal::ZERO) {
            let mut magnitudes = [total.abs(), subtotal.abs(), tax.abs()];
            magnitudes.sort();
            [tax, subtotal, total] = magnitudes;
        }

        if tax > subtotal {
            warn!(%tax, %subtotal, "Tax above subtotal, swapping");
            std::mem::swap(&mut tax, &mut subtotal);
        }
        if subtotal > total {
            warn!(%subtotal, %total, "Subtotal above total, recomputing total");
            total = subtotal + tax;
        }

        acc.total = Some(total);
        acc.subtotal = Some(subtotal);
        acc.tax = Some(tax);
    }

    if !acc.tax_rate.is_some_and(is_valid_rate) {
        acc.tax_rate = acc
            .subtotal
            .zip(acc.tax)
            .and_then(|(subtotal, tax)| implied_rate(subtotal, tax))
            .filter(|r| is_valid_rate(*r));
    }

    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn acc(
        total: Option<&str>,
        subtotal: Option<&str>,
        tax: Option<&str>,
        tax_rate: Option<&str>,
    ) -> MonetaryAccumulator {
        MonetaryAccumulator {
            total: total.map(dec),
            subtotal: subtotal.map(dec),
            tax: tax.map(dec),
            tax_rate: tax_rate.map(dec),
        }
    }

    #[test]
    fn test_consistent_amounts_untouched() {
        let input = acc(Some("36.85"), Some("33.50"), Some("3.35"), Some("0.10"));
        assert_eq!(reconcile(input), input);
    }

    #[test]
    fn test_total_raised_to_subtotal_plus_tax() {
        let out = reconcile(acc(Some("18.80"), Some("108.00"), Some("10.80"), Some("0.10")));
        assert_eq!(out.total, Some(dec("118.80")));
        assert_eq!(out.subtotal, Some(dec("108.00")));
        assert_eq!(out.tax, Some(dec("10.80")));
    }

    #[test]
    fn test_misplaced_amounts_are_sorted() {
        let out = reconcile(acc(Some("10.00"), Some("110.00"), Some("50.00"), None));
        // 110 + 50 > 10, so the total is raised first.
        assert_eq!(out.total, Some(dec("160.00")));

        let out = reconcile(acc(Some("200.00"), Some("10.00"), Some("100.00"), None));
        assert_eq!(out.tax, Some(dec("100.00")));
        assert_eq!(out.subtotal, Some(dec("100.00")));
        assert_eq!(out.total, Some(dec("200.00")));
    }

    #[test]
    fn test_missing_tax_from_total_and_subtotal() {
        let out = reconcile(acc(Some("110.00"), Some("100.00"), None, None));
        assert_eq!(out.tax, Some(dec("10.00")));
        assert_eq!(out.tax_rate, Some(dec("0.1")));
    }

    #[test]
    fn test_missing_subtotal_from_total_and_tax() {
        let out = reconcile(acc(Some("121.00"), None, Some("21.00"), Some("0.21")));
        assert_eq!(out.subtotal, Some(dec("100.00")));
        assert_eq!(out.tax_rate, Some(dec("0.21")));
    }

    #[test]
    fn test_missing_total_from_subtotal_and_tax() {
        let out = reconcile(acc(None, Some("49.64"), Some("4.96"), None));
        assert_eq!(out.total, Some(dec("54.60")));
    }

    #[test]
    fn test_total_and_rate_only() {
        let out = reconcile(acc(Some("121"), None, None, Some("0.21")));
        assert_eq!(out.subtotal, Some(dec("100")));
        assert_eq!(out.tax, Some(dec("21")));
    }

    #[test]
    fn test_subtotal_and_rate_only() {
        let out = reconcile(acc(None, Some("100"), None, Some("0.10")));
        assert_eq!(out.tax, Some(dec("10")));
        assert_eq!(out.total, Some(dec("110")));
    }

    #[test]
    fn test_tax_larger_than_subtotal_is_swapped() {
        let out = reconcile(acc(None, Some("3.35"), Some("33.50"), None));
        assert_eq!(out.tax, Some(dec("3.35")));
        assert_eq!(out.subtotal, Some(dec("33.50")));
        assert_eq!(out.total, Some(dec("36.85")));
        assert_eq!(out.tax_rate.map(|r| r.round_dp(2)), Some(dec("0.10")));
    }

    #[test]
    fn test_negative_difference_is_reordered() {
        // Tax larger than the total leaves a negative subtotal.
        let out = reconcile(acc(Some("3.35"), None, Some("36.85"), None));
        assert_eq!(out.tax, Some(dec("3.35")));
        assert_eq!(out.subtotal, Some(dec("33.50")));
        assert_eq!(out.total, Some(dec("36.85")));
        assert_eq!(out.tax_rate.map(|r| r.round_dp(2)), Some(dec("0.10")));
    }

    #[test]
    fn test_nothing_to_do() {
        assert_eq!(reconcile(MonetaryAccumulator::default()), MonetaryAccumulator::default());

        let only_rate = acc(None, None, None, Some("0.21"));
        assert_eq!(reconcile(only_rate), only_rate);
    }

    #[test]
    fn test_rate_restores_tax_missing_from_total() {
        let out = reconcile(acc(Some("100.00"), Some("100.00"), None, Some("0.10")));
        assert_eq!(out.tax, Some(dec("10.00")));
        assert_eq!(out.total, Some(dec("110.00")));
        assert_eq!(out.tax_rate, Some(dec("0.10")));

        let out = reconcile(acc(Some("50.00"), Some("50.00"), Some("0"), Some("0.21")));
        assert_eq!(out.tax, Some(dec("10.50")));
        assert_eq!(out.total, Some(dec("60.50")));
    }

    #[test]
    fn test_rate_leaves_taxed_total_alone() {
        let input = acc(Some("110.00"), Some("100.00"), Some("10.00"), Some("0.10"));
        assert_eq!(reconcile(input), input);

        // Total differs from the subtotal, so the zero tax stands.
        let out = reconcile(acc(Some("100.05"), Some("100.00"), None, Some("0.10")));
        assert_eq!(out.tax, Some(dec("0.05")));
        assert_eq!(out.total, Some(dec("100.05")));
    }

    #[test]
    fn test_zero_tax_drops_derived_rate() {
        let out = reconcile(acc(Some("10.00"), Some("10.00"), None, None));
        assert_eq!(out.tax, Some(Decimal::ZERO));
        assert_eq!(out.tax_rate, None);
    }

    fn cents() -> impl Strategy<Value = Option<Decimal>> {
        prop::option::of((0i64..10_000_000).prop_map(|c| Decimal::new(c, 2)))
    }

    fn rate() -> impl Strategy<Value = Option<Decimal>> {
        prop::option::of((1i64..=100).prop_map(|p| Decimal::new(p, 2)))
    }

    proptest! {
        #[test]
        fn reconciled_amounts_add_up(total in cents(), subtotal in cents(), tax in cents(), tax_rate in rate()) {
            let tolerances = Tolerances::default();
            let out = reconcile_with(MonetaryAccumulator { total, subtotal, tax, tax_rate }, &tolerances);

            if let (Some(t), Some(s), Some(x)) = (out.total, out.subtotal, out.tax) {
                prop_assert!((t - (s + x)).abs() <= tolerances.reconciliation);
                prop_assert!(x <= s);
                prop_assert!(s <= t);
            }
        }

        #[test]
        fn reconciled_rate_is_a_fraction(total in cents(), subtotal in cents(), tax in cents(), tax_rate in rate()) {
            let out = reconcile(MonetaryAccumulator { total, subtotal, tax, tax_rate });
            if let Some(r) = out.tax_rate {
                prop_assert!(r > Decimal::ZERO && r <= Decimal::ONE);
            }
        }

        #[test]
        fn reconcile_never_loses_fields(total in cents(), subtotal in cents(), tax in cents()) {
            let input = MonetaryAccumulator { total, subtotal, tax, tax_rate: None };
            let out = reconcile(input);
            prop_assert!(out.total.is_some() || input.total.is_none());
            prop_assert!(out.subtotal.is_some() || input.subtotal.is_none());
            prop_assert!(out.tax.is_some() || input.tax.is_none());
        }
    }
}
