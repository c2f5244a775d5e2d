//! Storage seam for the ledger engine.
//!
//! The engine never talks to a database directly. It opens a tenant-scoped
//! unit of work with [`LedgerStore::begin`] and performs every read and write
//! through the returned [`LedgerTx`]. A unit either commits as a whole or,
//! when dropped without [`LedgerTx::commit`], leaves no trace.
//!
//! Implementations must provide:
//! - row-level serialisation of a tenant's entry sequence and of the period
//!   row read by `period_*_for_update`, held until the unit ends
//! - atomic balance increments in [`LedgerTx::apply_balance_delta`]
//! - compare-and-swap semantics for status transitions

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tally_shared::ErrorKind;
use tally_shared::types::{AccountId, FiscalPeriodId, JournalEntryId, Money, TenantId, UserId};
use thiserror::Error;

use crate::accounts::{Account, LineTotals};
use crate::fiscal::{FiscalPeriod, FiscalPeriodStatus};
use crate::ledger::JournalEntry;

pub use memory::MemoryLedgerStore;

/// Storage backend failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Query or mapping failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A uniqueness or exclusion constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The backend could not be reached or timed out.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns the error code for structured output.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "STORAGE_ERROR",
            Self::UniqueViolation(_) => "UNIQUE_VIOLATION",
            Self::Unavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Storage failures always classify as [`ErrorKind::Storage`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

/// A status change on a fiscal period, applied only if the period is still
/// in `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodTransition {
    /// Status the period must currently have.
    pub from: FiscalPeriodStatus,
    /// Status to move to.
    pub to: FiscalPeriodStatus,
    /// Who performed the transition.
    pub actor: UserId,
    /// When it happened.
    pub at: DateTime<Utc>,
}

/// Opens tenant-scoped units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    /// Unit-of-work type.
    type Tx: LedgerTx;

    /// Begins a unit of work scoped to one tenant.
    async fn begin(&self, tenant: &TenantId) -> Result<Self::Tx, StoreError>;
}

/// One tenant-scoped atomic unit of work.
///
/// Every method only sees and touches rows of [`LedgerTx::tenant`].
#[async_trait]
pub trait LedgerTx: Send + Sized {
    /// Tenant this unit is scoped to.
    fn tenant(&self) -> &TenantId;

    // ---- accounts ----

    /// Inserts a new account.
    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Loads an account by id.
    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Loads an account by code.
    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError>;

    /// Lists all accounts ordered by code.
    async fn list_accounts(&mut self) -> Result<Vec<Account>, StoreError>;

    /// Replaces an account's parent.
    async fn set_account_parent(
        &mut self,
        id: AccountId,
        parent_id: Option<AccountId>,
    ) -> Result<(), StoreError>;

    /// Sets the active flag.
    async fn set_account_active(&mut self, id: AccountId, active: bool) -> Result<(), StoreError>;

    /// Deletes an account.
    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError>;

    /// Returns true if any journal line (of any status) references the account.
    async fn account_has_lines(&mut self, id: AccountId) -> Result<bool, StoreError>;

    /// Atomically adds `delta` to the account's balance and returns the new
    /// balance.
    async fn apply_balance_delta(
        &mut self,
        id: AccountId,
        delta: Money,
    ) -> Result<Money, StoreError>;

    /// Sums the lines of Posted and Reversed entries against the account.
    async fn posted_line_totals(&mut self, id: AccountId) -> Result<LineTotals, StoreError>;

    // ---- fiscal periods ----

    /// Inserts a new period.
    async fn insert_period(&mut self, period: &FiscalPeriod) -> Result<(), StoreError>;

    /// Lists all periods ordered by start date.
    async fn list_periods(&mut self) -> Result<Vec<FiscalPeriod>, StoreError>;

    /// Loads and locks a period by id.
    async fn period_for_update(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, StoreError>;

    /// Loads and locks the period whose range contains `date`.
    async fn period_containing_for_update(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<FiscalPeriod>, StoreError>;

    /// Applies a status transition if the period is still in
    /// `transition.from`. Returns false if it was not.
    async fn transition_period(
        &mut self,
        id: FiscalPeriodId,
        transition: &PeriodTransition,
    ) -> Result<bool, StoreError>;

    // ---- journal entries ----

    /// Reserves the tenant's next entry number, locking the sequence until
    /// the unit ends.
    async fn next_entry_number(&mut self) -> Result<i64, StoreError>;

    /// Inserts an entry with its lines.
    async fn insert_entry(&mut self, entry: &JournalEntry) -> Result<(), StoreError>;

    /// Loads an entry with its lines.
    async fn entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, StoreError>;

    /// Loads and locks an entry with its lines.
    async fn entry_for_update(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, StoreError>;

    /// Loads the entry recorded under an idempotency key.
    async fn entry_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<JournalEntry>, StoreError>;

    /// Lists all entries ordered by entry number.
    async fn list_entries(&mut self) -> Result<Vec<JournalEntry>, StoreError>;

    /// Replaces the header fields and lines of a draft. Returns false if the
    /// entry is no longer a draft.
    async fn replace_draft(&mut self, entry: &JournalEntry) -> Result<bool, StoreError>;

    /// Moves a draft to Posted. Returns false if it was not a draft.
    async fn mark_posted(
        &mut self,
        id: JournalEntryId,
        posted_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Moves a posted entry to Reversed and links it to its reversal.
    /// Returns false if it was not posted.
    async fn mark_reversed(
        &mut self,
        id: JournalEntryId,
        reversal_id: JournalEntryId,
    ) -> Result<bool, StoreError>;

    /// Deletes a draft. Returns false if it was not a draft.
    async fn delete_draft(&mut self, id: JournalEntryId) -> Result<bool, StoreError>;

    /// Commits the unit.
    async fn commit(self) -> Result<(), StoreError>;
}
