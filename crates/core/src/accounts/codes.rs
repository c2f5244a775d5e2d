//! Symbolic system accounts.
//!
//! Translators never hardcode account ids or raw codes. They name a
//! [`SystemAccount`], and the tenant's [`AccountCodeMap`] turns it into the
//! code installed for that tenant at setup time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tally_shared::types::AccountId;
use thiserror::Error;

use super::types::AccountType;

/// The closed set of accounts that automatic postings rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemAccount {
    /// Amounts owed by customers.
    AccountsReceivable,
    /// Amounts owed to suppliers and employees.
    AccountsPayable,
    /// Stock on hand.
    Inventory,
    /// Revenue from confirmed sales orders.
    SalesRevenue,
    /// Revenue from subscription renewals.
    SubscriptionRevenue,
    /// Reimbursable employee expenses.
    EmployeeExpense,
    /// Gross salaries.
    SalaryExpense,
    /// Net salaries owed to employees.
    SalaryPayable,
    /// Withholdings owed to third parties.
    PayrollDeductionsPayable,
    /// Periodic depreciation charge.
    DepreciationExpense,
    /// Contra-asset accumulating depreciation.
    AccumulatedDepreciation,
}

impl SystemAccount {
    /// Every system account, in installation order.
    pub const ALL: [Self; 11] = [
        Self::AccountsReceivable,
        Self::Inventory,
        Self::AccumulatedDepreciation,
        Self::AccountsPayable,
        Self::SalaryPayable,
        Self::PayrollDeductionsPayable,
        Self::SalesRevenue,
        Self::SubscriptionRevenue,
        Self::EmployeeExpense,
        Self::SalaryExpense,
        Self::DepreciationExpense,
    ];

    /// Configuration key (snake_case).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::AccountsReceivable => "accounts_receivable",
            Self::AccountsPayable => "accounts_payable",
            Self::Inventory => "inventory",
            Self::SalesRevenue => "sales_revenue",
            Self::SubscriptionRevenue => "subscription_revenue",
            Self::EmployeeExpense => "employee_expense",
            Self::SalaryExpense => "salary_expense",
            Self::SalaryPayable => "salary_payable",
            Self::PayrollDeductionsPayable => "payroll_deductions_payable",
            Self::DepreciationExpense => "depreciation_expense",
            Self::AccumulatedDepreciation => "accumulated_depreciation",
        }
    }

    /// Code installed when no override is configured.
    #[must_use]
    pub const fn default_code(self) -> &'static str {
        match self {
            Self::AccountsReceivable => "ACCOUNTS-RECEIVABLE",
            Self::AccountsPayable => "ACCOUNTS-PAYABLE",
            Self::Inventory => "INVENTORY",
            Self::SalesRevenue => "SALES-REVENUE",
            Self::SubscriptionRevenue => "SUBSCRIPTION-REVENUE",
            Self::EmployeeExpense => "EMPLOYEE-EXPENSE",
            Self::SalaryExpense => "SALARY-EXPENSE",
            Self::SalaryPayable => "SALARY-PAYABLE",
            Self::PayrollDeductionsPayable => "PAYROLL-DEDUCTIONS-PAYABLE",
            Self::DepreciationExpense => "DEPRECIATION-EXPENSE",
            Self::AccumulatedDepreciation => "ACCUMULATED-DEPRECIATION",
        }
    }

    /// Display name used at installation.
    #[must_use]
    pub const fn default_name(self) -> &'static str {
        match self {
            Self::AccountsReceivable => "Accounts Receivable",
            Self::AccountsPayable => "Accounts Payable",
            Self::Inventory => "Inventory",
            Self::SalesRevenue => "Sales Revenue",
            Self::SubscriptionRevenue => "Subscription Revenue",
            Self::EmployeeExpense => "Employee Expenses",
            Self::SalaryExpense => "Salary Expense",
            Self::SalaryPayable => "Salaries Payable",
            Self::PayrollDeductionsPayable => "Payroll Deductions Payable",
            Self::DepreciationExpense => "Depreciation Expense",
            Self::AccumulatedDepreciation => "Accumulated Depreciation",
        }
    }

    /// Account type used at installation.
    ///
    /// Accumulated depreciation is a contra-asset: an asset account whose
    /// balance runs negative as credits accumulate.
    #[must_use]
    pub const fn account_type(self) -> AccountType {
        match self {
            Self::AccountsReceivable | Self::Inventory | Self::AccumulatedDepreciation => {
                AccountType::Asset
            }
            Self::AccountsPayable | Self::SalaryPayable | Self::PayrollDeductionsPayable => {
                AccountType::Liability
            }
            Self::SalesRevenue | Self::SubscriptionRevenue => AccountType::Revenue,
            Self::EmployeeExpense | Self::SalaryExpense | Self::DepreciationExpense => {
                AccountType::Expense
            }
        }
    }

    /// Looks up a system account by its configuration key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key() == key)
    }
}

impl std::fmt::Display for SystemAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A configured override names an account that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown system account key: {0}")]
pub struct UnknownSystemAccount(pub String);

/// Mapping from each [`SystemAccount`] to a tenant account code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountCodeMap {
    codes: BTreeMap<SystemAccount, String>,
}

impl AccountCodeMap {
    /// Creates a map holding the default codes.
    #[must_use]
    pub fn new() -> Self {
        let codes = SystemAccount::ALL
            .into_iter()
            .map(|a| (a, a.default_code().to_string()))
            .collect();
        Self { codes }
    }

    /// Creates a map from defaults plus configured overrides.
    ///
    /// Keys are [`SystemAccount::key`] values; blank codes are ignored.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSystemAccount` for a key that names no account.
    pub fn from_overrides(
        overrides: &BTreeMap<String, String>,
    ) -> Result<Self, UnknownSystemAccount> {
        let mut map = Self::new();
        for (key, code) in overrides {
            let account = SystemAccount::from_key(key.trim())
                .ok_or_else(|| UnknownSystemAccount(key.clone()))?;
            if !code.trim().is_empty() {
                map = map.with_code(account, code.trim());
            }
        }
        Ok(map)
    }

    /// Replaces the code for one account.
    #[must_use]
    pub fn with_code(mut self, account: SystemAccount, code: impl Into<String>) -> Self {
        self.codes.insert(account, code.into());
        self
    }

    /// Returns the code for an account.
    #[must_use]
    pub fn code(&self, account: SystemAccount) -> &str {
        self.codes
            .get(&account)
            .map_or_else(|| account.default_code(), String::as_str)
    }

    /// Iterates over `(account, code)` pairs in installation order.
    pub fn iter(&self) -> impl Iterator<Item = (SystemAccount, &str)> {
        SystemAccount::ALL.into_iter().map(|a| (a, self.code(a)))
    }
}

impl Default for AccountCodeMap {
    fn default() -> Self {
        Self::new()
    }
}

/// How a draft line names its account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRef {
    /// A concrete account id.
    Id(AccountId),
    /// A tenant account code.
    Code(String),
    /// A symbolic system account, resolved through an [`AccountCodeMap`].
    System(SystemAccount),
}

impl AccountRef {
    /// Returns the code to look up, or `None` for a concrete id.
    #[must_use]
    pub fn code<'a>(&'a self, codes: &'a AccountCodeMap) -> Option<&'a str> {
        match self {
            Self::Id(_) => None,
            Self::Code(code) => Some(code.as_str()),
            Self::System(account) => Some(codes.code(*account)),
        }
    }
}

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Code(code) => f.write_str(code),
            Self::System(account) => write!(f, "system:{account}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_account() {
        let map = AccountCodeMap::new();
        assert_eq!(map.iter().count(), 11);
        assert_eq!(map.code(SystemAccount::SalaryExpense), "SALARY-EXPENSE");
        assert_eq!(
            map.code(SystemAccount::DepreciationExpense),
            "DEPRECIATION-EXPENSE"
        );
    }

    #[test]
    fn test_keys_are_unique_and_round_trip() {
        for account in SystemAccount::ALL {
            assert_eq!(SystemAccount::from_key(account.key()), Some(account));
        }
        assert_eq!(SystemAccount::from_key("petty_cash"), None);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert("salary_expense".to_string(), " 5100 ".to_string());
        overrides.insert("inventory".to_string(), "  ".to_string());
        let map = AccountCodeMap::from_overrides(&overrides).unwrap();
        assert_eq!(map.code(SystemAccount::SalaryExpense), "5100");
        assert_eq!(map.code(SystemAccount::Inventory), "INVENTORY");
    }

    #[test]
    fn test_unknown_override_key_fails() {
        let mut overrides = BTreeMap::new();
        overrides.insert("petty_cash".to_string(), "1010".to_string());
        assert_eq!(
            AccountCodeMap::from_overrides(&overrides),
            Err(UnknownSystemAccount("petty_cash".to_string()))
        );
    }

    #[test]
    fn test_account_ref_code() {
        let map = AccountCodeMap::new().with_code(SystemAccount::SalesRevenue, "4000");
        assert_eq!(
            AccountRef::System(SystemAccount::SalesRevenue).code(&map),
            Some("4000")
        );
        assert_eq!(AccountRef::Code("1000".into()).code(&map), Some("1000"));
        assert_eq!(AccountRef::Id(AccountId::new()).code(&map), None);
    }

    #[test]
    fn test_system_account_types() {
        assert_eq!(
            SystemAccount::SalaryPayable.account_type(),
            AccountType::Liability
        );
        assert_eq!(
            SystemAccount::SubscriptionRevenue.account_type(),
            AccountType::Revenue
        );
        assert_eq!(
            SystemAccount::EmployeeExpense.account_type(),
            AccountType::Expense
        );
    }
}
