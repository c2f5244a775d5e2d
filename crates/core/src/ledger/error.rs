//! Ledger error types for validation and state errors.
//!
//! Every failure of an administrative ledger call surfaces as a typed
//! [`LedgerError`]. Each variant maps to an [`ErrorKind`] so callers can tell
//! caller mistakes from stale transitions, integrity failures and storage
//! outages.

use chrono::NaiveDate;
use tally_shared::types::{AccountId, FiscalPeriodId, JournalEntryId, Money};
use tally_shared::{ErrorKind, MoneyError};
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry has fewer than two lines.
    #[error("Journal entry must have at least 2 lines")]
    EmptyEntry,

    /// Entry lines do not balance at full scale.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Sum of line debits.
        debit: Money,
        /// Sum of line credits.
        credit: Money,
    },

    /// A line breaks the one-sided amount rule.
    #[error("Line {index} is invalid: {reason}")]
    InvalidLine {
        /// Zero-based line position.
        index: usize,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Account parent is missing, foreign, or would form a cycle.
    #[error("Invalid account hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Account code already used by the tenant.
    #[error("Account code already exists: {0}")]
    DuplicateAccountCode(String),

    /// Account code or name is blank, or a system code is held by an
    /// account of the wrong type.
    #[error("Invalid account: {0}")]
    InvalidAccount(&'static str),

    /// Period start is after its end.
    #[error("Invalid date range: {start} to {end}")]
    InvalidDateRange {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// Period intersects an existing period.
    #[error("Period {start} to {end} overlaps an existing period")]
    OverlappingPeriod {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// Period is not adjacent to the existing calendar.
    #[error("Period {start} to {end} leaves a gap in the fiscal calendar")]
    PeriodGap {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// Reversal dated before the entry it reverses.
    #[error("Reversal date {requested} is before the original entry date {original}")]
    InvalidReversalDate {
        /// Date of the entry being reversed.
        original: NaiveDate,
        /// Requested reversal date.
        requested: NaiveDate,
    },

    // ========== State Errors ==========
    /// Entry is not a draft.
    #[error("Journal entry {0} is not a draft")]
    EntryNotDraft(JournalEntryId),

    /// Entry is not posted.
    #[error("Journal entry {0} is not posted")]
    EntryNotPosted(JournalEntryId),

    /// Period is not open.
    #[error("Fiscal period {0} is not open")]
    PeriodNotOpen(FiscalPeriodId),

    /// Period is not closed.
    #[error("Fiscal period {0} is not closed")]
    PeriodNotClosed(FiscalPeriodId),

    /// The period covering the entry date no longer accepts postings.
    #[error("Fiscal period {period_id} covering {date} is closed")]
    PeriodClosed {
        /// Entry date.
        date: NaiveDate,
        /// Covering period.
        period_id: FiscalPeriodId,
    },

    /// No open period covers the date.
    #[error("No open fiscal period for date {0}")]
    NoOpenPeriod(NaiveDate),

    /// Account is inactive and cannot be posted to.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    /// Account has journal lines and cannot be deleted.
    #[error("Account {0} has journal lines and cannot be deleted")]
    AccountHasLines(AccountId),

    /// An entry with the same idempotency key already exists.
    #[error("Posting {key} already recorded as entry {existing}")]
    DuplicatePosting {
        /// The idempotency key.
        key: String,
        /// The entry recorded under it.
        existing: JournalEntryId,
    },

    // ========== Not Found Errors ==========
    /// Journal entry not found for the tenant.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Account id or code not found for the tenant.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Fiscal period not found for the tenant.
    #[error("Fiscal period not found: {0}")]
    PeriodNotFound(FiscalPeriodId),

    // ========== Integrity Errors ==========
    /// Monetary arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),

    // ========== Storage Errors ==========
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for structured output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyEntry => "EMPTY_ENTRY",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::InvalidHierarchy(_) => "INVALID_HIERARCHY",
            Self::DuplicateAccountCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::InvalidAccount(_) => "INVALID_ACCOUNT",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::OverlappingPeriod { .. } => "OVERLAPPING_PERIOD",
            Self::PeriodGap { .. } => "PERIOD_GAP",
            Self::InvalidReversalDate { .. } => "INVALID_REVERSAL_DATE",
            Self::EntryNotDraft(_) => "ENTRY_NOT_DRAFT",
            Self::EntryNotPosted(_) => "ENTRY_NOT_POSTED",
            Self::PeriodNotOpen(_) => "PERIOD_NOT_OPEN",
            Self::PeriodNotClosed(_) => "PERIOD_NOT_CLOSED",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::NoOpenPeriod(_) => "NO_OPEN_PERIOD",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AccountHasLines(_) => "ACCOUNT_HAS_LINES",
            Self::DuplicatePosting { .. } => "DUPLICATE_POSTING",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
            Self::Money(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyEntry
            | Self::UnbalancedEntry { .. }
            | Self::InvalidLine { .. }
            | Self::InvalidHierarchy(_)
            | Self::DuplicateAccountCode(_)
            | Self::InvalidAccount(_)
            | Self::InvalidDateRange { .. }
            | Self::OverlappingPeriod { .. }
            | Self::PeriodGap { .. }
            | Self::InvalidReversalDate { .. } => ErrorKind::Validation,

            Self::EntryNotDraft(_)
            | Self::EntryNotPosted(_)
            | Self::PeriodNotOpen(_)
            | Self::PeriodNotClosed(_)
            | Self::PeriodClosed { .. }
            | Self::NoOpenPeriod(_)
            | Self::AccountInactive(_)
            | Self::AccountHasLines(_)
            | Self::DuplicatePosting { .. } => ErrorKind::State,

            Self::EntryNotFound(_) | Self::AccountNotFound(_) | Self::PeriodNotFound(_) => {
                ErrorKind::NotFound
            }

            Self::Money(e) => e.kind(),
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns true if retrying the same request may succeed.
    ///
    /// Only a transient storage outage qualifies. State errors repeat until
    /// something outside the ledger changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(StoreError::Unavailable(_)))
    }

    /// Returns true for the errors reported as the `period_closed` signal.
    #[must_use]
    pub fn is_period_closed(&self) -> bool {
        matches!(self, Self::PeriodClosed { .. } | Self::NoOpenPeriod(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::EmptyEntry.error_code(), "EMPTY_ENTRY");
        assert_eq!(
            LedgerError::UnbalancedEntry {
                debit: Money::parse("100").unwrap(),
                credit: Money::parse("50").unwrap(),
            }
            .error_code(),
            "UNBALANCED_ENTRY"
        );
        assert_eq!(
            LedgerError::NoOpenPeriod(date(2026, 1, 1)).error_code(),
            "NO_OPEN_PERIOD"
        );
        assert_eq!(
            LedgerError::Money(MoneyError::ArithmeticOverflow).error_code(),
            "ARITHMETIC_OVERFLOW"
        );
        assert_eq!(
            LedgerError::Storage(StoreError::Unavailable("down".into())).error_code(),
            "STORAGE_UNAVAILABLE"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(LedgerError::EmptyEntry.kind(), ErrorKind::Validation);
        assert_eq!(
            LedgerError::DuplicateAccountCode("1000".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::EntryNotDraft(JournalEntryId::new()).kind(),
            ErrorKind::State
        );
        assert_eq!(
            LedgerError::PeriodClosed {
                date: date(2026, 1, 15),
                period_id: FiscalPeriodId::new(),
            }
            .kind(),
            ErrorKind::State
        );
        assert_eq!(
            LedgerError::EntryNotFound(JournalEntryId::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LedgerError::Money(MoneyError::ArithmeticOverflow).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            LedgerError::Storage(StoreError::Database("x".into())).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::Storage(StoreError::Unavailable("timeout".into())).is_retryable());
        assert!(!LedgerError::Storage(StoreError::Database("syntax".into())).is_retryable());
        assert!(!LedgerError::PeriodNotOpen(FiscalPeriodId::new()).is_retryable());
        assert!(!LedgerError::EntryNotDraft(JournalEntryId::new()).is_retryable());
    }

    #[test]
    fn test_period_closed_signal() {
        assert!(LedgerError::NoOpenPeriod(date(2026, 3, 1)).is_period_closed());
        assert!(!LedgerError::EmptyEntry.is_period_closed());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::UnbalancedEntry {
            debit: Money::parse("100").unwrap(),
            credit: Money::parse("50").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Journal entry is not balanced. Debit: 100.00000000, Credit: 50.00000000"
        );

        let err = LedgerError::InvalidReversalDate {
            original: date(2026, 2, 10),
            requested: date(2026, 2, 1),
        };
        assert_eq!(
            err.to_string(),
            "Reversal date 2026-02-01 is before the original entry date 2026-02-10"
        );
    }
}
