//! Chart of accounts domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::MoneyError;
use tally_shared::types::{AccountId, Money, TenantId};

/// Account classification.
///
/// The type fixes the normal balance:
/// - Asset/Expense: debit-normal
/// - Liability/Equity/Revenue: credit-normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Resources owned (cash, receivables, inventory).
    Asset,
    /// Obligations owed (payables, accrued salaries).
    Liability,
    /// Owners' residual interest.
    Equity,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// Returns the normal balance implied by this type.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}

/// Side on which an account's balance naturally increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Increases on debit, decreases on credit.
    Debit,
    /// Increases on credit, decreases on debit.
    Credit,
}

impl NormalBalance {
    /// Calculates the balance change caused by a debit/credit pair.
    ///
    /// - Debit-normal: `debit - credit`
    /// - Credit-normal: `credit - debit`
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the difference is out of range.
    pub fn balance_change(self, debit: Money, credit: Money) -> Result<Money, MoneyError> {
        match self {
            Self::Debit => debit.checked_sub(credit),
            Self::Credit => credit.checked_sub(debit),
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for NormalBalance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown normal balance: {s}")),
        }
    }
}

/// An account in a tenant's chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Parent account in the hierarchy.
    pub parent_id: Option<AccountId>,
    /// Code, unique per tenant (e.g. "1100" or "SALARY-EXPENSE").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Stored copy of `account_type.normal_balance()`.
    pub normal_balance: NormalBalance,
    /// Inactive accounts reject new postings.
    pub is_active: bool,
    /// Running balance in the account's normal direction.
    pub current_balance: Money,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Builds a fresh active account with a zero balance.
    ///
    /// The normal balance is always derived from the type.
    #[must_use]
    pub fn new(tenant_id: TenantId, input: NewAccount) -> Self {
        Self {
            id: AccountId::new(),
            tenant_id,
            parent_id: input.parent_id,
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            account_type: input.account_type,
            normal_balance: input.account_type.normal_balance(),
            is_active: true,
            current_balance: Money::ZERO,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Account code, unique per tenant.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Optional parent account.
    pub parent_id: Option<AccountId>,
}

impl NewAccount {
    /// Creates a top-level account input.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            parent_id: None,
        }
    }

    /// Places the account under a parent.
    #[must_use]
    pub const fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Debit and credit totals of the posted lines against one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineTotals {
    /// Sum of posted debits.
    pub debit: Money,
    /// Sum of posted credits.
    pub credit: Money,
}

/// One row of a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialBalanceRow {
    /// The account.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Balance shown in the debit column (zero if in credit).
    pub debit: Money,
    /// Balance shown in the credit column (zero if in debit).
    pub credit: Money,
}

/// Trial balance read model for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialBalance {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// One row per account, ordered by code.
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of the debit column.
    pub total_debit: Money,
    /// Sum of the credit column.
    pub total_credit: Money,
}

impl TrialBalance {
    /// Returns true if the debit and credit columns agree.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

impl TrialBalanceRow {
    /// Places an account's balance in the debit or credit column.
    ///
    /// A positive balance sits on the account's normal side; a negative one
    /// is shown as a positive amount on the opposite side.
    #[must_use]
    pub fn from_account(account: &Account) -> Self {
        let balance = account.current_balance;
        let (debit, credit) = match (account.normal_balance, balance.is_negative()) {
            (NormalBalance::Debit, false) => (balance, Money::ZERO),
            (NormalBalance::Debit, true) => (Money::ZERO, balance.abs()),
            (NormalBalance::Credit, false) => (Money::ZERO, balance),
            (NormalBalance::Credit, true) => (balance.abs(), Money::ZERO),
        };
        Self {
            account_id: account.id,
            code: account.code.clone(),
            name: account.name.clone(),
            account_type: account.account_type,
            debit,
            credit,
        }
    }
}
