//! Property-based tests for journal line and balance validation.

use proptest::prelude::*;
use tally_shared::types::{AccountId, Money};

use super::error::LedgerError;
use super::types::NewJournalLine;
use super::validation::{check_balanced, validate_line, validate_lines};

/// Positive amounts with up to 8 fractional digits.
fn positive_amount() -> impl Strategy<Value = Money> {
    (1i64..10_000_000_000i64, 0u32..=8).prop_map(|(units, scale)| {
        Money::from_decimal(rust_decimal::Decimal::new(units, scale)).unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A one-sided positive line is always valid, on either side.
    #[test]
    fn prop_one_sided_line_is_valid(amount in positive_amount(), debit_side in any::<bool>()) {
        let (debit, credit) = if debit_side {
            (amount, Money::ZERO)
        } else {
            (Money::ZERO, amount)
        };
        prop_assert!(validate_line(0, debit, credit).is_ok());
    }

    /// A line carrying both sides is never valid.
    #[test]
    fn prop_two_sided_line_is_invalid(a in positive_amount(), b in positive_amount()) {
        prop_assert!(
            matches!(validate_line(3, a, b), Err(LedgerError::InvalidLine { index: 3, .. })),
            "two-sided line accepted"
        );
    }

    /// A negative amount is never valid.
    #[test]
    fn prop_negative_line_is_invalid(amount in positive_amount()) {
        prop_assert!(validate_line(0, amount.negate(), Money::ZERO).is_err());
        prop_assert!(validate_line(0, Money::ZERO, amount.negate()).is_err());
    }

    /// Splitting one credit over several lines still balances.
    #[test]
    fn prop_split_entry_balances(parts in prop::collection::vec(positive_amount(), 1..6)) {
        let total = Money::try_sum(parts.iter().copied()).unwrap();
        let mut lines: Vec<NewJournalLine> = parts
            .iter()
            .map(|p| NewJournalLine::debit(AccountId::new(), *p))
            .collect();
        lines.push(NewJournalLine::credit(AccountId::new(), total));

        prop_assert!(validate_lines(&lines).is_ok());
        let balanced = check_balanced(lines.iter().map(|l| (l.debit, l.credit)));
        prop_assert_eq!(balanced.unwrap(), total);
    }

    /// Any difference at all, down to the last stored digit, is rejected.
    #[test]
    fn prop_smallest_difference_is_unbalanced(amount in positive_amount()) {
        let epsilon = Money::parse("0.00000001").unwrap();
        let credit = amount.checked_add(epsilon).unwrap();
        let result = check_balanced([(amount, Money::ZERO), (Money::ZERO, credit)]);
        prop_assert!(
            matches!(result, Err(LedgerError::UnbalancedEntry { .. })),
            "one-unit difference accepted"
        );
    }
}
