//! PostgreSQL implementation of the ledger storage traits.
//!
//! A unit of work is one `DatabaseTransaction` with the tenant context set
//! (see [`crate::rls`]). Every query also filters on `tenant_id` explicitly.
//! Serialisation relies on row locks: `SELECT ... FOR UPDATE` on periods and
//! entries, and the upsert on the tenant's `entry_sequences` row.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tally_core::accounts::{Account, LineTotals};
use tally_core::fiscal::{FiscalPeriod, FiscalPeriodStatus};
use tally_core::ledger::{EntryStatus, JournalEntry};
use tally_core::store::{LedgerStore, LedgerTx, PeriodTransition, StoreError};
use tally_shared::types::{AccountId, FiscalPeriodId, JournalEntryId, Money, TenantId};
use tracing::debug;

use crate::entities::{accounts, entry_sequences, fiscal_periods, journal_entries, journal_lines};
use crate::error::store_error;
use crate::mapping::{
    account_from_model, account_to_active, entry_from_models, entry_to_active, fixed,
    lines_to_active, money, period_from_model, period_to_active,
};
use crate::rls::begin_tenant_scope;

/// Ledger store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self, tenant: &TenantId) -> Result<Self::Tx, StoreError> {
        let txn = begin_tenant_scope(&self.db, tenant)
            .await
            .map_err(store_error)?;
        debug!(tenant = %tenant, "Opened ledger unit of work");
        Ok(PgLedgerTx {
            txn,
            tenant: tenant.clone(),
        })
    }
}

/// Unit of work over one tenant's rows. Dropping it without
/// [`LedgerTx::commit`] rolls the transaction back.
pub struct PgLedgerTx {
    txn: DatabaseTransaction,
    tenant: TenantId,
}

impl PgLedgerTx {
    fn tenant_key(&self) -> &str {
        self.tenant.as_str()
    }

    async fn attach_lines(
        &self,
        header: Option<journal_entries::Model>,
    ) -> Result<Option<JournalEntry>, StoreError> {
        let Some(header) = header else {
            return Ok(None);
        };
        let lines = journal_lines::Entity::find()
            .filter(journal_lines::Column::TenantId.eq(self.tenant_key()))
            .filter(journal_lines::Column::EntryId.eq(header.id))
            .order_by_asc(journal_lines::Column::LineNo)
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        entry_from_models(header, lines).map(Some)
    }

    async fn insert_lines(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        let lines = lines_to_active(entry);
        if lines.is_empty() {
            return Ok(());
        }
        journal_lines::Entity::insert_many(lines)
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    fn entries(&self) -> sea_orm::Select<journal_entries::Entity> {
        journal_entries::Entity::find()
            .filter(journal_entries::Column::TenantId.eq(self.tenant_key()))
    }

    fn periods(&self) -> sea_orm::Select<fiscal_periods::Entity> {
        fiscal_periods::Entity::find()
            .filter(fiscal_periods::Column::TenantId.eq(self.tenant_key()))
    }

    fn accounts(&self) -> sea_orm::Select<accounts::Entity> {
        accounts::Entity::find().filter(accounts::Column::TenantId.eq(self.tenant_key()))
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    // ---- accounts ----

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        account_to_active(account)
            .insert(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.accounts()
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(account_from_model)
            .transpose()
    }

    async fn account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError> {
        self.accounts()
            .filter(accounts::Column::Code.eq(code))
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(account_from_model)
            .transpose()
    }

    async fn list_accounts(&mut self) -> Result<Vec<Account>, StoreError> {
        self.accounts()
            .order_by_asc(accounts::Column::Code)
            .all(&self.txn)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(account_from_model)
            .collect()
    }

    async fn set_account_parent(
        &mut self,
        id: AccountId,
        parent_id: Option<AccountId>,
    ) -> Result<(), StoreError> {
        accounts::Entity::update_many()
            .col_expr(
                accounts::Column::ParentId,
                Expr::value(parent_id.map(AccountId::into_inner)),
            )
            .filter(accounts::Column::TenantId.eq(self.tenant_key()))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn set_account_active(&mut self, id: AccountId, active: bool) -> Result<(), StoreError> {
        accounts::Entity::update_many()
            .col_expr(accounts::Column::IsActive, Expr::value(active))
            .filter(accounts::Column::TenantId.eq(self.tenant_key()))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_account(&mut self, id: AccountId) -> Result<(), StoreError> {
        accounts::Entity::delete_many()
            .filter(accounts::Column::TenantId.eq(self.tenant_key()))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn account_has_lines(&mut self, id: AccountId) -> Result<bool, StoreError> {
        let count = journal_lines::Entity::find()
            .filter(journal_lines::Column::TenantId.eq(self.tenant_key()))
            .filter(journal_lines::Column::AccountId.eq(id.into_inner()))
            .count(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(count > 0)
    }

    async fn apply_balance_delta(
        &mut self,
        id: AccountId,
        delta: Money,
    ) -> Result<Money, StoreError> {
        // Single-statement increment: concurrent units never lose an update.
        let updated = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::CurrentBalance,
                Expr::col(accounts::Column::CurrentBalance).add(delta.amount()),
            )
            .filter(accounts::Column::TenantId.eq(self.tenant_key()))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec_with_returning(&self.txn)
            .await
            .map_err(store_error)?;

        let model = updated
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database(format!("account {id} vanished during posting")))?;
        money("balance", model.current_balance)
    }

    async fn posted_line_totals(&mut self, id: AccountId) -> Result<LineTotals, StoreError> {
        let sums: Option<(Option<Decimal>, Option<Decimal>)> = journal_lines::Entity::find()
            .select_only()
            .column_as(
                Expr::col((journal_lines::Entity, journal_lines::Column::Debit)).sum(),
                "debit",
            )
            .column_as(
                Expr::col((journal_lines::Entity, journal_lines::Column::Credit)).sum(),
                "credit",
            )
            .inner_join(journal_entries::Entity)
            .filter(journal_lines::Column::TenantId.eq(self.tenant_key()))
            .filter(journal_lines::Column::AccountId.eq(id.into_inner()))
            .filter(journal_entries::Column::Status.is_in([
                EntryStatus::Posted.as_str(),
                EntryStatus::Reversed.as_str(),
            ]))
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(store_error)?;

        let (debit, credit) = sums.unwrap_or_default();
        Ok(LineTotals {
            debit: money("debit total", debit.unwrap_or_default())?,
            credit: money("credit total", credit.unwrap_or_default())?,
        })
    }

    // ---- fiscal periods ----

    async fn insert_period(&mut self, period: &FiscalPeriod) -> Result<(), StoreError> {
        period_to_active(period)
            .insert(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn list_periods(&mut self) -> Result<Vec<FiscalPeriod>, StoreError> {
        self.periods()
            .order_by_asc(fiscal_periods::Column::StartDate)
            .all(&self.txn)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(period_from_model)
            .collect()
    }

    async fn period_for_update(
        &mut self,
        id: FiscalPeriodId,
    ) -> Result<Option<FiscalPeriod>, StoreError> {
        self.periods()
            .filter(fiscal_periods::Column::Id.eq(id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(period_from_model)
            .transpose()
    }

    async fn period_containing_for_update(
        &mut self,
        date: NaiveDate,
    ) -> Result<Option<FiscalPeriod>, StoreError> {
        self.periods()
            .filter(fiscal_periods::Column::StartDate.lte(date))
            .filter(fiscal_periods::Column::EndDate.gte(date))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(period_from_model)
            .transpose()
    }

    async fn transition_period(
        &mut self,
        id: FiscalPeriodId,
        transition: &PeriodTransition,
    ) -> Result<bool, StoreError> {
        let mut update = fiscal_periods::Entity::update_many().col_expr(
            fiscal_periods::Column::Status,
            Expr::value(transition.to.as_str()),
        );
        let actor = Expr::value(transition.actor.into_inner());
        let at = Expr::value(fixed(transition.at));
        update = match transition.to {
            FiscalPeriodStatus::Closed => update
                .col_expr(fiscal_periods::Column::ClosedBy, actor)
                .col_expr(fiscal_periods::Column::ClosedAt, at),
            FiscalPeriodStatus::Locked => update
                .col_expr(fiscal_periods::Column::LockedBy, actor)
                .col_expr(fiscal_periods::Column::LockedAt, at),
            FiscalPeriodStatus::Open => update,
        };

        let result = update
            .filter(fiscal_periods::Column::TenantId.eq(self.tenant_key()))
            .filter(fiscal_periods::Column::Id.eq(id.into_inner()))
            .filter(fiscal_periods::Column::Status.eq(transition.from.as_str()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected == 1)
    }

    // ---- journal entries ----

    async fn next_entry_number(&mut self) -> Result<i64, StoreError> {
        // The upsert keeps the sequence row locked until the unit ends.
        let row = entry_sequences::Entity::insert(entry_sequences::ActiveModel {
            tenant_id: Set(self.tenant_key().to_string()),
            last_number: Set(1),
        })
        .on_conflict(
            OnConflict::column(entry_sequences::Column::TenantId)
                .value(
                    entry_sequences::Column::LastNumber,
                    Expr::col((entry_sequences::Entity, entry_sequences::Column::LastNumber))
                        .add(1),
                )
                .to_owned(),
        )
        .exec_with_returning(&self.txn)
        .await
        .map_err(store_error)?;
        Ok(row.last_number)
    }

    async fn insert_entry(&mut self, entry: &JournalEntry) -> Result<(), StoreError> {
        entry_to_active(entry)
            .insert(&self.txn)
            .await
            .map_err(store_error)?;
        self.insert_lines(entry).await
    }

    async fn entry(&mut self, id: JournalEntryId) -> Result<Option<JournalEntry>, StoreError> {
        let header = self
            .entries()
            .filter(journal_entries::Column::Id.eq(id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        self.attach_lines(header).await
    }

    async fn entry_for_update(
        &mut self,
        id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, StoreError> {
        let header = self
            .entries()
            .filter(journal_entries::Column::Id.eq(id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        self.attach_lines(header).await
    }

    async fn entry_by_idempotency_key(
        &mut self,
        key: &str,
    ) -> Result<Option<JournalEntry>, StoreError> {
        let header = self
            .entries()
            .filter(journal_entries::Column::IdempotencyKey.eq(key))
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        self.attach_lines(header).await
    }

    async fn list_entries(&mut self) -> Result<Vec<JournalEntry>, StoreError> {
        self.entries()
            .order_by_asc(journal_entries::Column::EntryNumber)
            .find_with_related(journal_lines::Entity)
            .all(&self.txn)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(|(header, lines)| entry_from_models(header, lines))
            .collect()
    }

    async fn replace_draft(&mut self, entry: &JournalEntry) -> Result<bool, StoreError> {
        let result = journal_entries::Entity::update_many()
            .col_expr(
                journal_entries::Column::EntryDate,
                Expr::value(entry.entry_date),
            )
            .col_expr(
                journal_entries::Column::Description,
                Expr::value(entry.description.clone()),
            )
            .col_expr(
                journal_entries::Column::SourceReference,
                Expr::value(entry.source_reference.clone()),
            )
            .col_expr(
                journal_entries::Column::IdempotencyKey,
                Expr::value(entry.idempotency_key.clone()),
            )
            .filter(journal_entries::Column::TenantId.eq(self.tenant_key()))
            .filter(journal_entries::Column::Id.eq(entry.id.into_inner()))
            .filter(journal_entries::Column::Status.eq(EntryStatus::Draft.as_str()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        if result.rows_affected == 0 {
            return Ok(false);
        }

        journal_lines::Entity::delete_many()
            .filter(journal_lines::Column::TenantId.eq(self.tenant_key()))
            .filter(journal_lines::Column::EntryId.eq(entry.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        self.insert_lines(entry).await?;
        Ok(true)
    }

    async fn mark_posted(
        &mut self,
        id: JournalEntryId,
        posted_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = journal_entries::Entity::update_many()
            .col_expr(
                journal_entries::Column::Status,
                Expr::value(EntryStatus::Posted.as_str()),
            )
            .col_expr(journal_entries::Column::PostedAt, Expr::value(fixed(posted_at)))
            .filter(journal_entries::Column::TenantId.eq(self.tenant_key()))
            .filter(journal_entries::Column::Id.eq(id.into_inner()))
            .filter(journal_entries::Column::Status.eq(EntryStatus::Draft.as_str()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected == 1)
    }

    async fn mark_reversed(
        &mut self,
        id: JournalEntryId,
        reversal_id: JournalEntryId,
    ) -> Result<bool, StoreError> {
        let result = journal_entries::Entity::update_many()
            .col_expr(
                journal_entries::Column::Status,
                Expr::value(EntryStatus::Reversed.as_str()),
            )
            .col_expr(
                journal_entries::Column::ReversedEntryId,
                Expr::value(reversal_id.into_inner()),
            )
            .filter(journal_entries::Column::TenantId.eq(self.tenant_key()))
            .filter(journal_entries::Column::Id.eq(id.into_inner()))
            .filter(journal_entries::Column::Status.eq(EntryStatus::Posted.as_str()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected == 1)
    }

    async fn delete_draft(&mut self, id: JournalEntryId) -> Result<bool, StoreError> {
        let result = journal_entries::Entity::delete_many()
            .filter(journal_entries::Column::TenantId.eq(self.tenant_key()))
            .filter(journal_entries::Column::Id.eq(id.into_inner()))
            .filter(journal_entries::Column::Status.eq(EntryStatus::Draft.as_str()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected == 1)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(store_error)
    }
}
