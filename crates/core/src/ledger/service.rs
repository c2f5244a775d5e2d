//! Ledger service: the posting engine.
//!
//! Every operation runs in one tenant-scoped unit of work. `post` checks the
//! covering fiscal period and applies balances inside the same unit, with
//! the period row locked, so a period cannot close between the check and
//! the mutation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tally_shared::config::LedgerConfig;
use tally_shared::types::{AccountId, JournalEntryId, JournalLineId, Money, TenantId};
use tracing::info;

use super::error::LedgerError;
use super::reversal::{build_reversal, reversal_description};
use super::types::{
    EntryStatus, JournalEntry, JournalLine, NewJournalEntry, NewJournalLine, PostingDraft,
    Reversal,
};
use super::validation::{check_balanced, validate_line, validate_lines};
use crate::accounts::chart::{apply_line, require_account, resolve_code};
use crate::accounts::{AccountCodeMap, AccountRef};
use crate::store::{LedgerStore, LedgerTx};

/// The posting engine.
///
/// Owns the journal entry state machine `Draft -> Posted -> Reversed` and
/// is the only writer of account balances.
pub struct Ledger<S> {
    store: Arc<S>,
    reversal_prefix: String,
}

impl<S> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            reversal_prefix: self.reversal_prefix.clone(),
        }
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Creates a ledger with the default configuration.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &LedgerConfig::default())
    }

    /// Creates a ledger from configuration.
    #[must_use]
    pub fn with_config(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            store,
            reversal_prefix: config.reversal_description_prefix.clone(),
        }
    }

    /// Creates a draft entry and assigns it the tenant's next entry number.
    ///
    /// # Errors
    ///
    /// - `InvalidLine` if a line is not one-sided and positive
    /// - `AccountNotFound` if a line names an account outside the tenant
    /// - `DuplicatePosting` if the idempotency key is already recorded
    pub async fn create_draft(
        &self,
        tenant: &TenantId,
        input: NewJournalEntry,
    ) -> Result<JournalEntry, LedgerError> {
        validate_lines(&input.lines)?;

        let mut tx = self.store.begin(tenant).await?;
        ensure_accounts_exist(&mut tx, &input.lines).await?;

        let entry_number = tx.next_entry_number().await?;
        if let Some(key) = &input.idempotency_key {
            ensure_key_unused(&mut tx, key).await?;
        }

        let entry = JournalEntry {
            id: JournalEntryId::new(),
            tenant_id: tenant.clone(),
            entry_number,
            entry_date: input.entry_date,
            description: input.description.trim().to_string(),
            source_reference: input.source_reference,
            idempotency_key: input.idempotency_key,
            status: EntryStatus::Draft,
            reversed_entry_id: None,
            lines: input.lines.into_iter().map(journal_line).collect(),
            created_at: Utc::now(),
            posted_at: None,
        };
        tx.insert_entry(&entry).await?;
        tx.commit().await?;

        info!(
            tenant = %tenant,
            entry_id = %entry.id,
            entry_number = entry.entry_number,
            "journal entry drafted"
        );
        Ok(entry)
    }

    /// Replaces the header and lines of a draft.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the tenant has no such entry
    /// - `EntryNotDraft` if it is posted or reversed
    /// - the validation errors of [`Ledger::create_draft`]
    pub async fn update_draft(
        &self,
        tenant: &TenantId,
        id: JournalEntryId,
        input: NewJournalEntry,
    ) -> Result<JournalEntry, LedgerError> {
        validate_lines(&input.lines)?;

        let mut tx = self.store.begin(tenant).await?;
        let current = tx
            .entry_for_update(id)
            .await?
            .ok_or(LedgerError::EntryNotFound(id))?;
        if !current.status.is_editable() {
            return Err(LedgerError::EntryNotDraft(id));
        }
        ensure_accounts_exist(&mut tx, &input.lines).await?;
        if let Some(key) = &input.idempotency_key
            && current.idempotency_key.as_ref() != Some(key)
        {
            ensure_key_unused(&mut tx, key).await?;
        }

        let updated = JournalEntry {
            entry_date: input.entry_date,
            description: input.description.trim().to_string(),
            source_reference: input.source_reference,
            idempotency_key: input.idempotency_key,
            lines: input.lines.into_iter().map(journal_line).collect(),
            ..current
        };
        if !tx.replace_draft(&updated).await? {
            return Err(LedgerError::EntryNotDraft(id));
        }
        tx.commit().await?;

        info!(tenant = %tenant, entry_id = %id, "journal draft updated");
        Ok(updated)
    }

    /// Deletes a draft. Posted and reversed entries are never deleted.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the tenant has no such entry
    /// - `EntryNotDraft` if it is posted or reversed
    pub async fn delete_draft(&self, tenant: &TenantId, id: JournalEntryId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let entry = tx
            .entry_for_update(id)
            .await?
            .ok_or(LedgerError::EntryNotFound(id))?;
        if !entry.status.is_editable() || !tx.delete_draft(id).await? {
            return Err(LedgerError::EntryNotDraft(id));
        }
        tx.commit().await?;

        info!(tenant = %tenant, entry_id = %id, "journal draft deleted");
        Ok(())
    }

    /// Returns an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if the tenant has no such entry.
    pub async fn get(&self, tenant: &TenantId, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        tx.entry(id).await?.ok_or(LedgerError::EntryNotFound(id))
    }

    /// Lists the tenant's entries ordered by entry number.
    pub async fn list(&self, tenant: &TenantId) -> Result<Vec<JournalEntry>, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.list_entries().await?)
    }

    /// Posts a draft, applying its lines to account balances.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound`, `EntryNotDraft`
    /// - `EmptyEntry` for fewer than two lines
    /// - `UnbalancedEntry` unless debits equal credits at full scale
    /// - `NoOpenPeriod` if no period covers the entry date
    /// - `PeriodClosed` if the covering period is closed or locked
    /// - `AccountInactive` if a line posts to an inactive account
    ///
    /// On any error the entry stays a draft and no balance changes.
    pub async fn post(&self, tenant: &TenantId, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let posted = post_in(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            tenant = %tenant,
            entry_id = %posted.id,
            entry_number = posted.entry_number,
            entry_date = %posted.entry_date,
            "journal entry posted"
        );
        Ok(posted)
    }

    /// Reverses a posted entry.
    ///
    /// Creates and posts a mirror entry dated `reversal_date` with every
    /// line's debit and credit swapped, then marks the original `Reversed`.
    /// The two entries reference each other. If the mirror cannot be posted
    /// the whole reversal is abandoned and the original stays `Posted`.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound`, `EntryNotPosted`
    /// - `InvalidReversalDate` if `reversal_date` precedes the original
    /// - every error of [`Ledger::post`] for the mirror entry
    pub async fn reverse(
        &self,
        tenant: &TenantId,
        id: JournalEntryId,
        reversal_date: NaiveDate,
        reason: &str,
    ) -> Result<Reversal, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let original = tx
            .entry_for_update(id)
            .await?
            .ok_or(LedgerError::EntryNotFound(id))?;
        if original.status != EntryStatus::Posted {
            return Err(LedgerError::EntryNotPosted(id));
        }

        let entry_number = tx.next_entry_number().await?;
        let description = reversal_description(&self.reversal_prefix, &original, reason);
        let mirror = build_reversal(&original, entry_number, reversal_date, description)?;
        tx.insert_entry(&mirror).await?;
        let reversal = post_in(&mut tx, mirror.id).await?;

        if !tx.mark_reversed(id, reversal.id).await? {
            return Err(LedgerError::EntryNotPosted(id));
        }
        let original = tx.entry(id).await?.ok_or(LedgerError::EntryNotFound(id))?;
        tx.commit().await?;

        info!(
            tenant = %tenant,
            entry_id = %id,
            reversal_id = %reversal.id,
            reversal_number = reversal.entry_number,
            "journal entry reversed"
        );
        Ok(Reversal { original, reversal })
    }

    /// Resolves a symbolic draft, then creates and posts it in one unit.
    ///
    /// This is the path used by automatic postings. Nothing is written
    /// unless the entry is posted.
    ///
    /// # Errors
    ///
    /// - `DuplicatePosting` if the idempotency key is already recorded
    /// - `AccountNotFound` if a reference does not resolve in the tenant
    /// - `InvalidLine` and every error of [`Ledger::post`]
    pub async fn post_draft(
        &self,
        tenant: &TenantId,
        draft: PostingDraft,
        codes: &AccountCodeMap,
    ) -> Result<JournalEntry, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;

        let entry_number = tx.next_entry_number().await?;
        if let Some(key) = &draft.idempotency_key {
            ensure_key_unused(&mut tx, key).await?;
        }

        let mut lines = Vec::with_capacity(draft.lines.len());
        for (index, line) in draft.lines.into_iter().enumerate() {
            validate_line(index, line.debit, line.credit)?;
            let account_id = resolve_ref(&mut tx, &line.account, codes).await?;
            lines.push(JournalLine {
                id: JournalLineId::new(),
                account_id,
                debit: line.debit,
                credit: line.credit,
                description: line.description,
            });
        }

        let entry = JournalEntry {
            id: JournalEntryId::new(),
            tenant_id: tenant.clone(),
            entry_number,
            entry_date: draft.entry_date,
            description: draft.description.trim().to_string(),
            source_reference: draft.source_reference,
            idempotency_key: draft.idempotency_key,
            status: EntryStatus::Draft,
            reversed_entry_id: None,
            lines,
            created_at: Utc::now(),
            posted_at: None,
        };
        tx.insert_entry(&entry).await?;
        let posted = post_in(&mut tx, entry.id).await?;
        tx.commit().await?;

        info!(
            tenant = %tenant,
            entry_id = %posted.id,
            entry_number = posted.entry_number,
            source = posted.source_reference.as_deref().unwrap_or_default(),
            "journal entry posted from draft"
        );
        Ok(posted)
    }
}

/// Posts a draft inside an open unit. The caller commits.
async fn post_in<T: LedgerTx>(tx: &mut T, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
    let mut entry = tx
        .entry_for_update(id)
        .await?
        .ok_or(LedgerError::EntryNotFound(id))?;
    if entry.status != EntryStatus::Draft {
        return Err(LedgerError::EntryNotDraft(id));
    }

    check_balanced(entry.lines.iter().map(|l| (l.debit, l.credit)))?;

    match tx.period_containing_for_update(entry.entry_date).await? {
        None => return Err(LedgerError::NoOpenPeriod(entry.entry_date)),
        Some(period) if !period.is_open() => {
            return Err(LedgerError::PeriodClosed {
                date: entry.entry_date,
                period_id: period.id,
            });
        }
        Some(_) => {}
    }

    // One balance update per account, in id order.
    let mut per_account: BTreeMap<AccountId, (Money, Money)> = BTreeMap::new();
    for line in &entry.lines {
        let sums = per_account.entry(line.account_id).or_insert((Money::ZERO, Money::ZERO));
        sums.0 = sums.0.checked_add(line.debit)?;
        sums.1 = sums.1.checked_add(line.credit)?;
    }

    let mut accounts = Vec::with_capacity(per_account.len());
    for (&account_id, &(debit, credit)) in &per_account {
        let account = require_account(tx, account_id).await?;
        if !account.is_active {
            return Err(LedgerError::AccountInactive(account_id));
        }
        accounts.push((account, debit, credit));
    }
    for (account, debit, credit) in &accounts {
        apply_line(tx, account, *debit, *credit).await?;
    }

    let posted_at = Utc::now();
    if !tx.mark_posted(id, posted_at).await? {
        return Err(LedgerError::EntryNotDraft(id));
    }
    entry.status = EntryStatus::Posted;
    entry.posted_at = Some(posted_at);
    Ok(entry)
}

async fn ensure_accounts_exist<T: LedgerTx>(
    tx: &mut T,
    lines: &[NewJournalLine],
) -> Result<(), LedgerError> {
    let ids: BTreeSet<AccountId> = lines.iter().map(|l| l.account_id).collect();
    for id in ids {
        require_account(tx, id).await?;
    }
    Ok(())
}

async fn ensure_key_unused<T: LedgerTx>(tx: &mut T, key: &str) -> Result<(), LedgerError> {
    match tx.entry_by_idempotency_key(key).await? {
        Some(existing) => Err(LedgerError::DuplicatePosting {
            key: key.to_string(),
            existing: existing.id,
        }),
        None => Ok(()),
    }
}

async fn resolve_ref<T: LedgerTx>(
    tx: &mut T,
    account: &AccountRef,
    codes: &AccountCodeMap,
) -> Result<AccountId, LedgerError> {
    match account {
        AccountRef::Id(id) => Ok(require_account(tx, *id).await?.id),
        AccountRef::Code(_) | AccountRef::System(_) => {
            let code = account.code(codes).unwrap_or_default();
            Ok(resolve_code(tx, code).await?.id)
        }
    }
}

fn journal_line(line: NewJournalLine) -> JournalLine {
    JournalLine {
        id: JournalLineId::new(),
        account_id: line.account_id,
        debit: line.debit,
        credit: line.credit,
        description: line.description,
    }
}
