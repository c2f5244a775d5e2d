//! Journal entry domain types.
//!
//! An entry is created as a `Draft`, transitions to `Posted` exactly once,
//! and may later be flagged `Reversed` when a mirror entry offsets it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::MoneyError;
use tally_shared::types::{AccountId, JournalEntryId, JournalLineId, Money, TenantId};

use crate::accounts::AccountRef;

/// Journal entry lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Being drafted; lines may change and the entry may be deleted.
    Draft,
    /// Applied to balances; immutable.
    Posted,
    /// Posted and later offset by a reversal entry; immutable.
    Reversed,
}

impl EntryStatus {
    /// Returns true if the entry can be modified or deleted.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the entry's lines count toward account balances.
    #[must_use]
    pub const fn affects_balances(self) -> bool {
        matches!(self, Self::Posted | Self::Reversed)
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Reversed => "reversed",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "posted" => Ok(Self::Posted),
            "reversed" => Ok(Self::Reversed),
            _ => Err(format!("Unknown entry status: {s}")),
        }
    }
}

/// One line of a journal entry.
///
/// Exactly one of `debit`/`credit` is strictly positive; the other is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Unique identifier.
    pub id: JournalLineId,
    /// Account the line posts to.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Money,
    /// Credit amount.
    pub credit: Money,
    /// Optional line memo.
    pub description: Option<String>,
}

/// A journal entry with its ordered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Sequential number, unique per tenant.
    pub entry_number: i64,
    /// Accounting date; selects the fiscal period.
    pub entry_date: NaiveDate,
    /// Human-readable description.
    pub description: String,
    /// Free-form origin tag (e.g. "sales_order_confirmed:42").
    pub source_reference: Option<String>,
    /// Key guarding against duplicate automatic postings.
    pub idempotency_key: Option<String>,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// The other half of a reversal pair.
    pub reversed_entry_id: Option<JournalEntryId>,
    /// Lines in entry order.
    pub lines: Vec<JournalLine>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// When the entry was posted.
    pub posted_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    /// Returns the sum of line debits.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the sum is out of range.
    pub fn total_debit(&self) -> Result<Money, MoneyError> {
        Money::try_sum(self.lines.iter().map(|l| l.debit))
    }

    /// Returns the sum of line credits.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the sum is out of range.
    pub fn total_credit(&self) -> Result<Money, MoneyError> {
        Money::try_sum(self.lines.iter().map(|l| l.credit))
    }

    /// Human-facing entry reference, e.g. `JE-000042`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("JE-{:06}", self.entry_number)
    }
}

/// Input for one line of a new or updated draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJournalLine {
    /// Account to post to.
    pub account_id: AccountId,
    /// Debit amount (zero for a credit line).
    pub debit: Money,
    /// Credit amount (zero for a debit line).
    pub credit: Money,
    /// Optional line memo.
    pub description: Option<String>,
}

impl NewJournalLine {
    /// Creates a debit line.
    #[must_use]
    pub const fn debit(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Money::ZERO,
            description: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub const fn credit(account_id: AccountId, amount: Money) -> Self {
        Self {
            account_id,
            debit: Money::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Input for creating or replacing a draft entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJournalEntry {
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Human-readable description.
    pub description: String,
    /// Free-form origin tag.
    pub source_reference: Option<String>,
    /// Optional idempotency key, unique per tenant.
    pub idempotency_key: Option<String>,
    /// Lines in entry order.
    pub lines: Vec<NewJournalLine>,
}

impl NewJournalEntry {
    /// Creates an input without lines.
    #[must_use]
    pub fn new(entry_date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            entry_date,
            description: description.into(),
            source_reference: None,
            idempotency_key: None,
            lines: Vec::new(),
        }
    }

    /// Appends a line.
    #[must_use]
    pub fn line(mut self, line: NewJournalLine) -> Self {
        self.lines.push(line);
        self
    }
}

/// One line of a [`PostingDraft`], naming its account symbolically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    /// Account reference, resolved inside the posting unit.
    pub account: AccountRef,
    /// Debit amount.
    pub debit: Money,
    /// Credit amount.
    pub credit: Money,
    /// Optional line memo.
    pub description: Option<String>,
}

/// A journal-entry creation request produced by a translator.
///
/// Unlike [`NewJournalEntry`] it names accounts symbolically, so it can be
/// built without touching storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingDraft {
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Human-readable description.
    pub description: String,
    /// Free-form origin tag.
    pub source_reference: Option<String>,
    /// Key guarding against duplicate postings.
    pub idempotency_key: Option<String>,
    /// Lines in entry order.
    pub lines: Vec<DraftLine>,
}

impl PostingDraft {
    /// Creates a draft without lines.
    #[must_use]
    pub fn new(entry_date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            entry_date,
            description: description.into(),
            source_reference: None,
            idempotency_key: None,
            lines: Vec::new(),
        }
    }

    /// Sets the origin tag.
    #[must_use]
    pub fn with_source(mut self, source_reference: impl Into<String>) -> Self {
        self.source_reference = Some(source_reference.into());
        self
    }

    /// Sets the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Appends a debit line.
    #[must_use]
    pub fn debit(mut self, account: AccountRef, amount: Money, description: Option<String>) -> Self {
        self.lines.push(DraftLine {
            account,
            debit: amount,
            credit: Money::ZERO,
            description,
        });
        self
    }

    /// Appends a credit line.
    #[must_use]
    pub fn credit(mut self, account: AccountRef, amount: Money, description: Option<String>) -> Self {
        self.lines.push(DraftLine {
            account,
            debit: Money::ZERO,
            credit: amount,
            description,
        });
        self
    }

    /// Returns `(total debit, total credit)`.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if a sum is out of range.
    pub fn totals(&self) -> Result<(Money, Money), MoneyError> {
        let debit = Money::try_sum(self.lines.iter().map(|l| l.debit))?;
        let credit = Money::try_sum(self.lines.iter().map(|l| l.credit))?;
        Ok((debit, credit))
    }
}

/// Result of a reversal: the original entry and its mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversal {
    /// The original entry, now `Reversed`.
    pub original: JournalEntry,
    /// The posted mirror entry.
    pub reversal: JournalEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::SystemAccount;

    fn m(text: &str) -> Money {
        Money::parse(text).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
    }

    #[test]
    fn test_status_flags() {
        assert!(EntryStatus::Draft.is_editable());
        assert!(!EntryStatus::Posted.is_editable());
        assert!(!EntryStatus::Reversed.is_editable());
        assert!(EntryStatus::Posted.affects_balances());
        assert!(EntryStatus::Reversed.affects_balances());
        assert!(!EntryStatus::Draft.affects_balances());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for s in [EntryStatus::Draft, EntryStatus::Posted, EntryStatus::Reversed] {
            assert_eq!(s.as_str().parse::<EntryStatus>().unwrap(), s);
        }
    }

    #[test]
    fn test_entry_reference_is_zero_padded() {
        let entry = JournalEntry {
            id: JournalEntryId::new(),
            tenant_id: TenantId::new("t1").unwrap(),
            entry_number: 42,
            entry_date: date(),
            description: String::new(),
            source_reference: None,
            idempotency_key: None,
            status: EntryStatus::Draft,
            reversed_entry_id: None,
            lines: vec![],
            created_at: Utc::now(),
            posted_at: None,
        };
        assert_eq!(entry.reference(), "JE-000042");
    }

    #[test]
    fn test_posting_draft_builder_totals() {
        let draft = PostingDraft::new(date(), "Payroll")
            .with_idempotency_key("payroll_completed:run-1")
            .debit(AccountRef::System(SystemAccount::SalaryExpense), m("100"), None)
            .credit(AccountRef::System(SystemAccount::SalaryPayable), m("85"), None)
            .credit(
                AccountRef::System(SystemAccount::PayrollDeductionsPayable),
                m("15"),
                None,
            );
        assert_eq!(draft.lines.len(), 3);
        assert_eq!(draft.totals().unwrap(), (m("100"), m("100")));
        assert_eq!(
            draft.idempotency_key.as_deref(),
            Some("payroll_completed:run-1")
        );
    }
}
