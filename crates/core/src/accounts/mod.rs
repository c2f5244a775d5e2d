//! Chart of accounts.
//!
//! A tenant's accounts form a tree. Each account has a type, a normal
//! balance derived from that type, and a running balance that only posted
//! journal lines may change.

pub mod chart;
pub mod codes;
pub mod types;

pub use chart::ChartOfAccounts;
pub use codes::{AccountCodeMap, AccountRef, SystemAccount, UnknownSystemAccount};
pub use types::{
    Account, AccountType, LineTotals, NewAccount, NormalBalance, TrialBalance, TrialBalanceRow,
};
