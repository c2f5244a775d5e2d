//! Chart of accounts service.

use std::collections::BTreeSet;
use std::sync::Arc;

use tally_shared::types::{AccountId, Money, TenantId};
use tracing::{info, warn};

use super::codes::AccountCodeMap;
use super::types::{Account, NewAccount, TrialBalance, TrialBalanceRow};
use crate::ledger::LedgerError;
use crate::store::{LedgerStore, LedgerTx, StoreError};

/// Administrative operations over a tenant's chart of accounts.
///
/// Balances are not writable here. They move only through
/// [`apply_line`], which the ledger calls while posting.
pub struct ChartOfAccounts<S> {
    store: Arc<S>,
}

impl<S> Clone for ChartOfAccounts<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> ChartOfAccounts<S> {
    /// Creates a chart service over a store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// - `InvalidAccount` if the code or name is blank
    /// - `DuplicateAccountCode` if the code exists for the tenant
    /// - `InvalidHierarchy` if the parent is not an account of this tenant
    pub async fn create(&self, tenant: &TenantId, input: NewAccount) -> Result<Account, LedgerError> {
        if input.code.trim().is_empty() {
            return Err(LedgerError::InvalidAccount("account code must not be blank"));
        }
        if input.name.trim().is_empty() {
            return Err(LedgerError::InvalidAccount("account name must not be blank"));
        }

        let mut tx = self.store.begin(tenant).await?;
        let account = Account::new(tenant.clone(), input);

        if tx.account_by_code(&account.code).await?.is_some() {
            return Err(LedgerError::DuplicateAccountCode(account.code));
        }
        if let Some(parent_id) = account.parent_id {
            require_parent(&mut tx, parent_id).await?;
        }

        match tx.insert_account(&account).await {
            Err(StoreError::UniqueViolation(_)) => {
                return Err(LedgerError::DuplicateAccountCode(account.code));
            }
            other => other?,
        }
        tx.commit().await?;

        info!(
            tenant = %tenant,
            account_id = %account.id,
            code = %account.code,
            account_type = %account.account_type,
            "account created"
        );
        Ok(account)
    }

    /// Returns an account by id.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the tenant has no such account.
    pub async fn get(&self, tenant: &TenantId, id: AccountId) -> Result<Account, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        require_account(&mut tx, id).await
    }

    /// Resolves an account code, e.g. a symbolic code like
    /// `DEPRECIATION-EXPENSE`, to the tenant's account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the code is unknown for the tenant.
    pub async fn resolve(&self, tenant: &TenantId, code: &str) -> Result<Account, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        resolve_code(&mut tx, code).await
    }

    /// Lists the tenant's accounts ordered by code.
    pub async fn list(&self, tenant: &TenantId) -> Result<Vec<Account>, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.list_accounts().await?)
    }

    /// Soft-deactivates an account. Inactive accounts reject postings but
    /// keep their history and balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the tenant has no such account.
    pub async fn deactivate(&self, tenant: &TenantId, id: AccountId) -> Result<Account, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let mut account = require_account(&mut tx, id).await?;
        tx.set_account_active(id, false).await?;
        tx.commit().await?;

        account.is_active = false;
        info!(tenant = %tenant, account_id = %id, "account deactivated");
        Ok(account)
    }

    /// Deletes an account that has never been used.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the tenant has no such account
    /// - `AccountHasLines` if any journal line references it
    /// - `InvalidHierarchy` if other accounts sit under it
    pub async fn delete(&self, tenant: &TenantId, id: AccountId) -> Result<(), LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        require_account(&mut tx, id).await?;

        if tx.account_has_lines(id).await? {
            return Err(LedgerError::AccountHasLines(id));
        }
        if tx
            .list_accounts()
            .await?
            .iter()
            .any(|a| a.parent_id == Some(id))
        {
            return Err(LedgerError::InvalidHierarchy(format!(
                "account {id} has child accounts"
            )));
        }

        tx.delete_account(id).await?;
        tx.commit().await?;
        info!(tenant = %tenant, account_id = %id, "account deleted");
        Ok(())
    }

    /// Moves an account under a new parent, or to the top level.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the tenant has no such account
    /// - `InvalidHierarchy` if the parent is foreign or the move forms a cycle
    pub async fn move_account(
        &self,
        tenant: &TenantId,
        id: AccountId,
        new_parent: Option<AccountId>,
    ) -> Result<Account, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let mut account = require_account(&mut tx, id).await?;

        if let Some(parent_id) = new_parent {
            require_parent(&mut tx, parent_id).await?;
            ensure_no_cycle(&mut tx, id, parent_id).await?;
        }

        tx.set_account_parent(id, new_parent).await?;
        tx.commit().await?;

        account.parent_id = new_parent;
        Ok(account)
    }

    /// Creates every missing system account for a tenant.
    ///
    /// Returns the accounts created by this call; running it again creates
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAccount` if an existing account already holds a system
    /// code with a different account type. Nothing is installed in that case.
    pub async fn install_system_accounts(
        &self,
        tenant: &TenantId,
        codes: &AccountCodeMap,
    ) -> Result<Vec<Account>, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let mut created = Vec::new();

        for (system, code) in codes.iter() {
            if let Some(existing) = tx.account_by_code(code).await? {
                if existing.account_type != system.account_type() {
                    warn!(
                        tenant = %tenant,
                        code,
                        expected = ?system.account_type(),
                        found = ?existing.account_type,
                        "system account code is taken by an account of another type"
                    );
                    return Err(LedgerError::InvalidAccount(
                        "system account code is held by an account of another type",
                    ));
                }
                continue;
            }
            let account = Account::new(
                tenant.clone(),
                NewAccount::new(code, system.default_name(), system.account_type()),
            );
            tx.insert_account(&account).await?;
            created.push(account);
        }

        tx.commit().await?;
        info!(tenant = %tenant, created = created.len(), "system accounts installed");
        Ok(created)
    }

    /// Recomputes an account's balance from its posted lines, independently
    /// of the stored running balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the tenant has no such account.
    pub async fn recompute_balance(&self, tenant: &TenantId, id: AccountId) -> Result<Money, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let account = require_account(&mut tx, id).await?;
        let totals = tx.posted_line_totals(id).await?;
        Ok(account
            .normal_balance
            .balance_change(totals.debit, totals.credit)?)
    }

    /// Builds the tenant's trial balance from current balances.
    pub async fn trial_balance(&self, tenant: &TenantId) -> Result<TrialBalance, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let rows: Vec<TrialBalanceRow> = tx
            .list_accounts()
            .await?
            .iter()
            .map(TrialBalanceRow::from_account)
            .collect();

        let total_debit = Money::try_sum(rows.iter().map(|r| r.debit))?;
        let total_credit = Money::try_sum(rows.iter().map(|r| r.credit))?;

        Ok(TrialBalance {
            tenant_id: tenant.clone(),
            rows,
            total_debit,
            total_credit,
        })
    }
}

/// Applies one posted line to an account balance and returns the new
/// balance.
///
/// A debit-normal account increases on debit and decreases on credit; a
/// credit-normal account the other way round. Only the ledger calls this,
/// inside its posting unit.
pub(crate) async fn apply_line<T: LedgerTx>(
    tx: &mut T,
    account: &Account,
    debit: Money,
    credit: Money,
) -> Result<Money, LedgerError> {
    let delta = account.normal_balance.balance_change(debit, credit)?;
    Ok(tx.apply_balance_delta(account.id, delta).await?)
}

/// Loads an account or fails with `AccountNotFound`.
pub(crate) async fn require_account<T: LedgerTx>(
    tx: &mut T,
    id: AccountId,
) -> Result<Account, LedgerError> {
    tx.account(id)
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
}

/// Resolves a code or fails with `AccountNotFound`.
pub(crate) async fn resolve_code<T: LedgerTx>(tx: &mut T, code: &str) -> Result<Account, LedgerError> {
    tx.account_by_code(code.trim())
        .await?
        .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
}

async fn require_parent<T: LedgerTx>(tx: &mut T, parent_id: AccountId) -> Result<(), LedgerError> {
    match tx.account(parent_id).await? {
        Some(_) => Ok(()),
        None => Err(LedgerError::InvalidHierarchy(format!(
            "parent account {parent_id} does not belong to tenant {}",
            tx.tenant()
        ))),
    }
}

/// Walks up from `parent_id`; reaching `id` means the move would make an
/// account its own ancestor.
async fn ensure_no_cycle<T: LedgerTx>(
    tx: &mut T,
    id: AccountId,
    parent_id: AccountId,
) -> Result<(), LedgerError> {
    let mut visited = BTreeSet::new();
    let mut cursor = Some(parent_id);

    while let Some(current) = cursor {
        if current == id || !visited.insert(current) {
            return Err(LedgerError::InvalidHierarchy(format!(
                "moving account {id} under {parent_id} creates a cycle"
            )));
        }
        cursor = tx.account(current).await?.and_then(|a| a.parent_id);
    }
    Ok(())
}
