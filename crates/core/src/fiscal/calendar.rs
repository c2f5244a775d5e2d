//! Pure calendar rules: monthly period generation and partition checks.

use chrono::{Datelike, Months, NaiveDate};

use super::period::FiscalPeriod;
use crate::ledger::LedgerError;

/// A named date range, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRange {
    /// Period name (e.g., "January 2026").
    pub name: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
}

/// Checks if two inclusive date ranges overlap.
///
/// `[a_start, a_end]` and `[b_start, b_end]` overlap if
/// `a_start <= b_end && a_end >= b_start`.
#[must_use]
pub fn date_ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Validates a new period range against a tenant's existing periods.
///
/// The existing periods form one contiguous span; a new range must not
/// intersect it and must touch it at one end. The first period of a tenant
/// may start anywhere.
///
/// # Errors
///
/// - `InvalidDateRange` if `start > end`
/// - `OverlappingPeriod` if the range intersects an existing period
/// - `PeriodGap` if the range is not adjacent to the existing span
pub fn validate_new_range(
    existing: &[FiscalPeriod],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), LedgerError> {
    if start > end {
        return Err(LedgerError::InvalidDateRange { start, end });
    }

    if existing
        .iter()
        .any(|p| date_ranges_overlap(p.start_date, p.end_date, start, end))
    {
        return Err(LedgerError::OverlappingPeriod { start, end });
    }

    let (Some(span_start), Some(span_end)) = (
        existing.iter().map(|p| p.start_date).min(),
        existing.iter().map(|p| p.end_date).max(),
    ) else {
        return Ok(());
    };

    let extends_forward = span_end.succ_opt() == Some(start);
    let extends_backward = end.succ_opt() == Some(span_start);
    if extends_forward || extends_backward {
        Ok(())
    } else {
        Err(LedgerError::PeriodGap { start, end })
    }
}

/// Splits `[start, end]` into calendar-month periods.
///
/// The first and last periods are clipped to the range, so a fiscal year
/// starting mid-month yields a short first period.
///
/// # Errors
///
/// Returns `InvalidDateRange` if `start > end` or the range runs past the
/// supported calendar.
pub fn monthly_ranges(start: NaiveDate, end: NaiveDate) -> Result<Vec<PeriodRange>, LedgerError> {
    let invalid = || LedgerError::InvalidDateRange { start, end };
    if start > end {
        return Err(invalid());
    }

    let mut ranges = Vec::new();
    let mut current = start;

    while current <= end {
        let month_end = last_day_of_month(current).ok_or_else(invalid)?;
        let period_end = month_end.min(end);

        ranges.push(PeriodRange {
            name: format!("{} {}", month_name(current.month()), current.year()),
            start_date: current,
            end_date: period_end,
        });

        match month_end.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }

    Ok(ranges)
}

/// Returns the last day of the month containing `date`.
fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// Returns the English month name.
fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}
