//! Property-based tests for the posting engine.
//!
//! - Balances never drift from the signed sum of posted lines
//! - Every posted entry balances at full scale
//! - A reversal cancels the original's effect on every account

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{Money, TenantId};

use super::service::Ledger;
use super::types::{EntryStatus, NewJournalEntry, NewJournalLine};
use crate::accounts::{Account, AccountType, ChartOfAccounts, NewAccount};
use crate::fiscal::FiscalCalendar;
use crate::store::MemoryLedgerStore;

/// Positive amounts from 0.00000001 to 1,000,000.
fn positive_amount() -> impl Strategy<Value = Money> {
    (1i64..100_000_000_000_000i64)
        .prop_map(|units| Money::from_decimal(Decimal::new(units, 8)).unwrap())
}

/// One balanced entry: debit account index, credit account index, amount.
fn entry_strategy() -> impl Strategy<Value = (usize, usize, Money)> {
    (0usize..4, 0usize..4, positive_amount())
}

struct Books {
    ledger: Ledger<MemoryLedgerStore>,
    chart: ChartOfAccounts<MemoryLedgerStore>,
    tenant: TenantId,
    accounts: Vec<Account>,
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn entry_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
}

async fn books() -> Books {
    let store = Arc::new(MemoryLedgerStore::new());
    let tenant = TenantId::new("props").unwrap();
    let chart = ChartOfAccounts::new(Arc::clone(&store));
    FiscalCalendar::new(Arc::clone(&store))
        .create_fiscal_year(
            &tenant,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        )
        .await
        .unwrap();

    let mut accounts = Vec::new();
    for (code, account_type) in [
        ("1000", AccountType::Asset),
        ("2000", AccountType::Liability),
        ("4000", AccountType::Revenue),
        ("6000", AccountType::Expense),
    ] {
        let account = chart
            .create(&tenant, NewAccount::new(code, code, account_type))
            .await
            .unwrap();
        accounts.push(account);
    }

    Books {
        ledger: Ledger::new(store),
        chart,
        tenant,
        accounts,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Running balances always equal an independent recomputation.
    #[test]
    fn prop_balances_never_drift(specs in prop::collection::vec(entry_strategy(), 1..12)) {
        runtime().block_on(async {
            let b = books().await;
            for (debit, credit, amount) in &specs {
                let input = NewJournalEntry::new(entry_date(), "prop")
                    .line(NewJournalLine::debit(b.accounts[*debit].id, *amount))
                    .line(NewJournalLine::credit(b.accounts[*credit].id, *amount));
                let draft = b.ledger.create_draft(&b.tenant, input).await.unwrap();
                let posted = b.ledger.post(&b.tenant, draft.id).await.unwrap();
                prop_assert_eq!(posted.total_debit().unwrap(), posted.total_credit().unwrap());
            }

            for account in &b.accounts {
                let stored = b.chart.get(&b.tenant, account.id).await.unwrap().current_balance;
                let recomputed = b.chart.recompute_balance(&b.tenant, account.id).await.unwrap();
                prop_assert_eq!(stored, recomputed);
            }
            prop_assert!(b.chart.trial_balance(&b.tenant).await.unwrap().is_balanced());
            Ok(())
        })?;
    }

    /// Reversing a posted entry leaves every touched account unchanged.
    #[test]
    fn prop_reversal_nets_to_zero(
        parts in prop::collection::vec((0usize..4, positive_amount()), 1..5),
        credit_index in 0usize..4,
    ) {
        runtime().block_on(async {
            let b = books().await;
            let total = Money::try_sum(parts.iter().map(|(_, amount)| *amount)).unwrap();
            let mut input = NewJournalEntry::new(entry_date(), "prop");
            for (index, amount) in &parts {
                input = input.line(NewJournalLine::debit(b.accounts[*index].id, *amount));
            }
            input = input.line(NewJournalLine::credit(b.accounts[credit_index].id, total));

            let draft = b.ledger.create_draft(&b.tenant, input).await.unwrap();
            b.ledger.post(&b.tenant, draft.id).await.unwrap();
            let reversal = b
                .ledger
                .reverse(&b.tenant, draft.id, entry_date(), "prop")
                .await
                .unwrap();

            prop_assert_eq!(reversal.original.status, EntryStatus::Reversed);
            prop_assert_eq!(reversal.reversal.lines.len(), reversal.original.lines.len());
            for account in &b.accounts {
                let balance = b.chart.get(&b.tenant, account.id).await.unwrap().current_balance;
                prop_assert_eq!(balance, Money::ZERO);
            }
            Ok(())
        })?;
    }
}
