//! Business rule validation for journal entries.

use tally_shared::types::Money;

use super::error::LedgerError;
use super::types::NewJournalLine;

/// Validates a single line: exactly one side strictly positive, the other
/// exactly zero.
///
/// # Errors
///
/// Returns `InvalidLine` describing the broken rule.
pub fn validate_line(index: usize, debit: Money, credit: Money) -> Result<(), LedgerError> {
    let reason = if debit.is_negative() || credit.is_negative() {
        "amounts must not be negative"
    } else if debit.is_zero() && credit.is_zero() {
        "either debit or credit must be positive"
    } else if !debit.is_zero() && !credit.is_zero() {
        "a line cannot carry both debit and credit"
    } else {
        return Ok(());
    };
    Err(LedgerError::InvalidLine { index, reason })
}

/// Validates every line of a draft input.
///
/// # Errors
///
/// Returns `InvalidLine` for the first offending line.
pub fn validate_lines(lines: &[NewJournalLine]) -> Result<(), LedgerError> {
    lines
        .iter()
        .enumerate()
        .try_for_each(|(index, line)| validate_line(index, line.debit, line.credit))
}

/// Checks the posting preconditions on a set of `(debit, credit)` pairs:
/// at least two lines, and debits equal to credits at full scale.
///
/// Returns the balanced total.
///
/// # Errors
///
/// - `EmptyEntry` if there are fewer than two lines
/// - `UnbalancedEntry` if the sums differ
/// - `Money` if a sum overflows
pub fn check_balanced<I>(lines: I) -> Result<Money, LedgerError>
where
    I: IntoIterator<Item = (Money, Money)>,
{
    let mut count = 0usize;
    let mut debit = Money::ZERO;
    let mut credit = Money::ZERO;

    for (d, c) in lines {
        count += 1;
        debit = debit.checked_add(d)?;
        credit = credit.checked_add(c)?;
    }

    if count < 2 {
        return Err(LedgerError::EmptyEntry);
    }
    if debit != credit {
        return Err(LedgerError::UnbalancedEntry { debit, credit });
    }
    Ok(debit)
}
