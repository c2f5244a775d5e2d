//! Property tests for `Money` arithmetic.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::money::{Money, SCALE};

/// Amounts up to one trillion with 8 fractional digits.
fn arb_money() -> impl Strategy<Value = Money> {
    (-100_000_000_000_000_000_000_i128..100_000_000_000_000_000_000_i128).prop_map(|units| {
        Money::from_decimal(Decimal::from_i128_with_scale(units, SCALE)).unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_add_then_subtract_is_identity(a in arb_money(), b in arb_money()) {
        let sum = a.checked_add(b).unwrap();
        prop_assert_eq!(sum.checked_sub(b).unwrap(), a);
    }

    #[test]
    fn prop_addition_commutes(a in arb_money(), b in arb_money()) {
        prop_assert_eq!(a.checked_add(b).unwrap(), b.checked_add(a).unwrap());
    }

    #[test]
    fn prop_scale_is_fixed(a in arb_money(), b in arb_money()) {
        prop_assert_eq!(a.checked_add(b).unwrap().amount().scale(), SCALE);
        prop_assert_eq!(a.multiply(Decimal::new(3, 1)).unwrap().amount().scale(), SCALE);
    }

    #[test]
    fn prop_text_round_trips(a in arb_money()) {
        prop_assert_eq!(Money::parse(&a.to_string()).unwrap(), a);
    }

    #[test]
    fn prop_multiply_by_one_and_full_percentage_are_identity(a in arb_money()) {
        prop_assert_eq!(a.multiply(Decimal::ONE).unwrap(), a);
        prop_assert_eq!(a.percentage(Decimal::ONE_HUNDRED).unwrap(), a);
    }

    #[test]
    fn prop_amount_plus_negation_is_zero(a in arb_money()) {
        prop_assert!(a.checked_add(a.negate()).unwrap().is_zero());
    }

    #[test]
    fn prop_sum_matches_fold(values in prop::collection::vec(arb_money(), 0..20)) {
        let mut expected = Money::ZERO;
        for v in &values {
            expected = expected.checked_add(*v).unwrap();
        }
        prop_assert_eq!(Money::try_sum(values).unwrap(), expected);
    }
}
