//! In-memory ledger store.
//!
//! Each tenant's book sits behind its own `tokio::sync::Mutex`. A unit of
//! work holds that mutex for its whole life and edits a private copy of the
//! book, which replaces the shared one on commit. Tenants never contend with
//! each other. Uniqueness rules mirror the Postgres constraints.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tally_shared::types::{AccountId, FiscalPeriodId, JournalEntryId, Money, TenantId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerTx, PeriodTransition, StoreError};
use crate::accounts::{Account, LineTotals};
use crate::fiscal::{FiscalPeriod, FiscalPeriodStatus, date_ranges_overlap};
use crate::ledger::{EntryStatus, JournalEntry};

#[derive(Debug, Clone, Default)]
struct TenantBook {
    accounts: BTreeMap<AccountId, Account>,
    periods: BTreeMap<FiscalPeriodId, FiscalPeriod>,
    entries: BTreeMap<JournalEntryId, JournalEntry>,
    last_entry_number: i64,
}

/// Ledger store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    books: DashMap<TenantId, Arc<Mutex<TenantBook>>>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTx;

    async fn begin(&self, tenant: &TenantId) -> Result<Self::Tx, StoreError> {
        let book = Arc::clone(self.books.entry(tenant.clone()).or_default().value());
        let guard = book.lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx {
            tenant: tenant.clone(),
            guard,
            work,
        })
    }
}

/// Unit of work over one tenant's in-memory book.
#[derive(Debug)]
pub struct MemoryTx {
    tenant: TenantId,
    guard: OwnedMutexGuard<TenantBook>,
    work: TenantBook,
}

impl MemoryTx {
    fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, StoreError> {
        self.work
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Database(format!("account {id} does not exist")))
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if self.work.accounts.values().any(|a| a.code == account.code) {
            return Err(StoreError::UniqueViolation(
                "accounts_tenant_code_key".to_string(),
            ));
        }
        self.work.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.work.accounts.get(&id).cloned())
    }

    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .work
            .accounts
            .values()
            .find(|a| a.code == code)
            .cloned())
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self.work.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn set_account_parent(
        &mut self,
        id: AccountId,
        parent_id: Option<AccountId>,
    ) -> Result<(), StoreError> {
        self.account_mut(id)?.parent_id = parent_id;
        Ok(())
    }

    async fn set_account_active(&mut self, id: AccountId, active: bool) -> Result<(), StoreError> {
        self.account_mut(id)?.is_active = active;
        Ok(())
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        self.work.accounts.remove(&id);
        Ok(())
    }

    async fn account_has_lines(&mut self, id: AccountId) -> Result<bool, StoreError> {
        Ok(self
            .work
            .entries
            .values()
            .flat_map(|e| &e.lines)
            .any(|l| l.account_id == id))
    }

    async fn apply_balance_delta(
        &mut self,
        id: AccountId,
        delta: Money,
    ) -> Result<Money, StoreError> {
        let account = self.account_mut(id)?;
        let balance = account
            .current_balance
            .checked_add(delta)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        account.current_balance = balance;
        Ok(balance)
    }

    async fn posted_line_totals(&mut self, id: AccountId) -> Result<LineTotals, StoreError> {
        let lines = self
            .work
            .entries
            .values()
            .filter(|e| e.status.affects_balances())
            .flat_map(|e| &e.lines)
            .filter(|l| l.account_id == id);

        let mut totals = LineTotals::default();
        for line in lines {
            totals.debit = totals
                .debit
                .checked_add(line.debit)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            totals.credit = totals
                .credit
                .checked_add(line.credit)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        Ok(totals)
    }

    async fn insert_period(&mut self, period: &FiscalPeriod) -> Result<(), StoreError> {
        if self.work.periods.values().any(|p| {
            date_ranges_overlap(p.start_date, p.end_date, period.start_date, period.end_date)
        }) {
            return Err(StoreError::UniqueViolation(
                "fiscal_periods_no_overlap".to_string(),
            ));
        }
        self.work.periods.insert(period.id, period.clone());
        Ok(())
    }

    async fn list_periods(&mut self) -> Result<Vec<FiscalPeriod>, StoreError> {
        let mut periods: Vec<FiscalPeriod> = self.work.periods.values().cloned().collect();
        periods.sort_by_key(|p| p.start_date);
        Ok(periods)
    }

    async fn period_for_update(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, StoreError> {
        Ok(self.work.periods.get(&id).cloned())
    }

    async fn period_containing_for_update(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<FiscalPeriod>, StoreError> {
        Ok(self
            .work
            .periods
            .values()
            .find(|p| p.contains_date(date))
            .cloned())
    }

    async fn transition_period(
        &mut self,
        id: FiscalPeriodId,
        transition: &PeriodTransition,
    ) -> Result<bool, StoreError> {
        let Some(period) = self.work.periods.get_mut(&id) else {
            return Ok(false);
        };
        if period.status != transition.from {
            return Ok(false);
        }
        period.status = transition.to;
        match transition.to {
            FiscalPeriodStatus::Closed => {
                period.closed_by = Some(transition.actor);
                period.closed_at = Some(transition.at);
            }
            FiscalPeriodStatus::Locked => {
                period.locked_by = Some(transition.actor);
                period.locked_at = Some(transition.at);
            }
            FiscalPeriodStatus::Open => {}
        }
        Ok(true)
    }

    async fn next_entry_number(&mut self) -> Result<i64, StoreError> {
        self.work.last_entry_number += 1;
        Ok(self.work.last_entry_number)
    }

    async fn insert_entry(&mut self, entry: &JournalEntry) -> Result<(), StoreError> {
        for existing in self.work.entries.values() {
            if existing.entry_number == entry.entry_number {
                return Err(StoreError::UniqueViolation(
                    "journal_entries_tenant_number_key".to_string(),
                ));
            }
            if entry.idempotency_key.is_some() && existing.idempotency_key == entry.idempotency_key
            {
                return Err(StoreError::UniqueViolation(
                    "journal_entries_tenant_idempotency_key".to_string(),
                ));
            }
        }
        self.work.entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self.work.entries.get(&id).cloned())
    }

    async fn entry_for_update(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self.work.entries.get(&id).cloned())
    }

    async fn entry_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<JournalEntry>, StoreError> {
        Ok(self
            .work
            .entries
            .values()
            .find(|e| e.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn list_entries(&mut self) -> Result<Vec<JournalEntry>, StoreError> {
        let mut entries: Vec<JournalEntry> = self.work.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.entry_number);
        Ok(entries)
    }

    async fn replace_draft(&mut self, entry: &JournalEntry) -> Result<bool, StoreError> {
        if let Some(key) = entry.idempotency_key.as_deref()
            && self
                .work
                .entries
                .values()
                .any(|e| e.id != entry.id && e.idempotency_key.as_deref() == Some(key))
        {
            return Err(StoreError::UniqueViolation(
                "journal_entries_tenant_idempotency_key".to_string(),
            ));
        }
        match self.work.entries.get_mut(&entry.id) {
            Some(existing) if existing.status == EntryStatus::Draft => {
                existing.entry_date = entry.entry_date;
                existing.description.clone_from(&entry.description);
                existing.source_reference.clone_from(&entry.source_reference);
                existing.idempotency_key.clone_from(&entry.idempotency_key);
                existing.lines.clone_from(&entry.lines);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_posted(
        &mut self,
        id: JournalEntryId,
        posted_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.work.entries.get_mut(&id) {
            Some(entry) if entry.status == EntryStatus::Draft => {
                entry.status = EntryStatus::Posted;
                entry.posted_at = Some(posted_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_reversed(
        &mut self,
        id: JournalEntryId,
        reversal_id: JournalEntryId,
    ) -> Result<bool, StoreError> {
        match self.work.entries.get_mut(&id) {
            Some(entry) if entry.status == EntryStatus::Posted => {
                entry.status = EntryStatus::Reversed;
                entry.reversed_entry_id = Some(reversal_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_draft(&mut self, id: JournalEntryId) -> Result<bool, StoreError> {
        match self.work.entries.get(&id) {
            Some(entry) if entry.status == EntryStatus::Draft => {
                self.work.entries.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = std::mem::take(&mut self.work);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{AccountType, NewAccount};

    fn tenant(key: &str) -> TenantId {
        TenantId::new(key).unwrap()
    }

    fn account(t: &TenantId, code: &str) -> Account {
        Account::new(t.clone(), NewAccount::new(code, code, AccountType::Asset))
    }

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let store = MemoryLedgerStore::new();
        let t1 = tenant("t1");

        let mut tx = store.begin(&t1).await.unwrap();
        tx.insert_account(&account(&t1, "1000")).await.unwrap();
        drop(tx);

        let mut tx = store.begin(&t1).await.unwrap();
        assert!(tx.list_accounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_committed_work_is_visible() {
        let store = MemoryLedgerStore::new();
        let t1 = tenant("t1");

        let mut tx = store.begin(&t1).await.unwrap();
        tx.insert_account(&account(&t1, "1000")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(&t1).await.unwrap();
        assert!(tx.account_by_code("1000").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let store = MemoryLedgerStore::new();
        let (t1, t2) = (tenant("t1"), tenant("t2"));

        let mut tx = store.begin(&t1).await.unwrap();
        tx.insert_account(&account(&t1, "1000")).await.unwrap();
        tx.commit().await.unwrap();

        // Holding t1's unit open must not block t2.
        let _held = store.begin(&t1).await.unwrap();
        let mut tx = store.begin(&t2).await.unwrap();
        assert!(tx.account_by_code("1000").await.unwrap().is_none());
        tx.insert_account(&account(&t2, "1000")).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_code_violates_uniqueness() {
        let store = MemoryLedgerStore::new();
        let t1 = tenant("t1");
        let mut tx = store.begin(&t1).await.unwrap();
        tx.insert_account(&account(&t1, "1000")).await.unwrap();
        assert!(matches!(
            tx.insert_account(&account(&t1, "1000")).await,
            Err(StoreError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_entry_numbers_roll_back_with_the_unit() {
        let store = MemoryLedgerStore::new();
        let t1 = tenant("t1");

        let mut tx = store.begin(&t1).await.unwrap();
        assert_eq!(tx.next_entry_number().await.unwrap(), 1);
        drop(tx);

        let mut tx = store.begin(&t1).await.unwrap();
        assert_eq!(tx.next_entry_number().await.unwrap(), 1);
        assert_eq!(tx.next_entry_number().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_period_transition_is_compare_and_swap() {
        let store = MemoryLedgerStore::new();
        let t1 = tenant("t1");
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let period = FiscalPeriod::open(t1.clone(), "January 2026", start, end);

        let mut tx = store.begin(&t1).await.unwrap();
        tx.insert_period(&period).await.unwrap();

        let close = PeriodTransition {
            from: FiscalPeriodStatus::Open,
            to: FiscalPeriodStatus::Closed,
            actor: tally_shared::types::UserId::new(),
            at: Utc::now(),
        };
        assert!(tx.transition_period(period.id, &close).await.unwrap());
        assert!(!tx.transition_period(period.id, &close).await.unwrap());

        let stored = tx.period_for_update(period.id).await.unwrap().unwrap();
        assert_eq!(stored.status, FiscalPeriodStatus::Closed);
        assert_eq!(stored.closed_by, Some(close.actor));
    }
}
