//! Posting gateway: the single entry point for event-driven postings.
//!
//! Ledger-side failures never reach the caller. Every error, and any panic
//! inside a translator or the posting unit, becomes a [`PostingOutcome`]
//! and a structured warning, so the business operation that raised the
//! event completes regardless.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tally_shared::config::LedgerConfig;
use tally_shared::types::JournalEntryId;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::accounts::{AccountCodeMap, UnknownSystemAccount};
use crate::ledger::{Ledger, LedgerError, PostingDraft};
use crate::store::LedgerStore;
use crate::translate::{EventKind, LedgerEvent, SkipReason, Translation, TranslatorRegistry};

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostingOutcome {
    /// An entry was created and posted.
    Posted {
        /// The new entry.
        entry_id: JournalEntryId,
        /// Its tenant-sequential number.
        entry_number: i64,
    },
    /// The translator found nothing to record.
    Skipped(SkipReason),
    /// No translator handles this event.
    Ignored,
    /// The event was already posted earlier.
    Duplicate {
        /// The entry recorded for it.
        existing: JournalEntryId,
    },
    /// Translation or posting failed; details went to the log.
    Failed {
        /// Error code of the failure.
        code: &'static str,
    },
}

/// Snapshot of gateway counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Events posted.
    pub posted: u64,
    /// Events skipped by their translator.
    pub skipped: u64,
    /// Events without a translator.
    pub ignored: u64,
    /// Events already posted.
    pub duplicate: u64,
    /// Events that failed.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    posted: AtomicU64,
    skipped: AtomicU64,
    ignored: AtomicU64,
    duplicate: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &PostingOutcome) {
        let counter = match outcome {
            PostingOutcome::Posted { .. } => &self.posted,
            PostingOutcome::Skipped(_) => &self.skipped,
            PostingOutcome::Ignored => &self.ignored,
            PostingOutcome::Duplicate { .. } => &self.duplicate,
            PostingOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> GatewayStats {
        GatewayStats {
            posted: self.posted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            duplicate: self.duplicate.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Turns events into posted entries, best effort.
pub struct PostingGateway<S> {
    ledger: Ledger<S>,
    registry: Arc<TranslatorRegistry>,
    codes: Arc<AccountCodeMap>,
    counters: Arc<Counters>,
}

impl<S> Clone for PostingGateway<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            registry: Arc::clone(&self.registry),
            codes: Arc::clone(&self.codes),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<S: LedgerStore> PostingGateway<S> {
    /// Creates a gateway.
    #[must_use]
    pub fn new(ledger: Ledger<S>, registry: TranslatorRegistry, codes: AccountCodeMap) -> Self {
        Self {
            ledger,
            registry: Arc::new(registry),
            codes: Arc::new(codes),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Creates a gateway with the built-in translators and configured
    /// account codes.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSystemAccount` if the configuration overrides a code
    /// for an account that does not exist.
    pub fn from_config(store: Arc<S>, config: &LedgerConfig) -> Result<Self, UnknownSystemAccount> {
        let codes = AccountCodeMap::from_overrides(&config.account_codes)?;
        Ok(Self::new(
            Ledger::with_config(store, config),
            TranslatorRegistry::with_defaults(),
            codes,
        ))
    }

    /// Returns the account codes drafts are resolved against.
    #[must_use]
    pub fn codes(&self) -> &AccountCodeMap {
        &self.codes
    }

    /// Handles one event in its own unit of work. Never fails.
    pub async fn handle(&self, event: &LedgerEvent) -> PostingOutcome {
        let outcome = self.process(event).await;
        self.counters.record(&outcome);
        outcome
    }

    /// Handles an event on the runtime without waiting for it.
    pub fn spawn(&self, event: LedgerEvent) -> JoinHandle<PostingOutcome> {
        let gateway = self.clone();
        tokio::spawn(async move { gateway.handle(&event).await })
    }

    /// Returns the counters accumulated since creation.
    #[must_use]
    pub fn stats(&self) -> GatewayStats {
        self.counters.snapshot()
    }

    async fn process(&self, event: &LedgerEvent) -> PostingOutcome {
        let Some(kind) = event.kind() else {
            debug!("ignoring event of unknown type");
            return PostingOutcome::Ignored;
        };
        let Some(translator) = self.registry.get(kind) else {
            debug!(event_kind = %kind, "no translator registered; ignoring event");
            return PostingOutcome::Ignored;
        };

        let translated = std::panic::catch_unwind(AssertUnwindSafe(|| translator.translate(event)));
        let (tenant_id, draft) = match translated {
            Ok(Ok(Translation::Draft { tenant_id, draft })) => (tenant_id, stamp(event, draft)),
            Ok(Ok(Translation::Skip(reason))) => {
                debug!(
                    event_kind = %kind,
                    tenant = event.tenant_id().unwrap_or_default(),
                    reason = %reason,
                    "nothing to record for event"
                );
                return PostingOutcome::Skipped(reason);
            }
            Ok(Err(err)) => {
                warn!(
                    signal = "posting_failed",
                    event_kind = %kind,
                    tenant = event.tenant_id().unwrap_or_default(),
                    source = %event.source_id().unwrap_or_default(),
                    code = err.error_code(),
                    error = %err,
                    "event could not be translated; business operation unaffected"
                );
                return PostingOutcome::Failed {
                    code: err.error_code(),
                };
            }
            Err(_) => return panicked(kind, event, "TRANSLATOR_PANIC"),
        };

        let posting = AssertUnwindSafe(self.ledger.post_draft(&tenant_id, draft, &self.codes))
            .catch_unwind()
            .await;
        match posting {
            Ok(Ok(entry)) => {
                info!(
                    event_kind = %kind,
                    tenant = %tenant_id,
                    entry_id = %entry.id,
                    entry_number = entry.entry_number,
                    "event posted"
                );
                PostingOutcome::Posted {
                    entry_id: entry.id,
                    entry_number: entry.entry_number,
                }
            }
            Ok(Err(LedgerError::DuplicatePosting { key, existing })) => {
                debug!(
                    event_kind = %kind,
                    tenant = %tenant_id,
                    key = %key,
                    existing = %existing,
                    "event already posted"
                );
                PostingOutcome::Duplicate { existing }
            }
            Ok(Err(err)) => {
                let signal = if err.is_period_closed() {
                    "period_closed"
                } else {
                    "posting_failed"
                };
                warn!(
                    signal,
                    event_kind = %kind,
                    tenant = %tenant_id,
                    source = %event.source_id().unwrap_or_default(),
                    code = err.error_code(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "ledger posting failed; business operation unaffected"
                );
                PostingOutcome::Failed {
                    code: err.error_code(),
                }
            }
            Err(_) => panicked(kind, event, "POSTING_PANIC"),
        }
    }
}

/// Anchors a draft to the event it came from. Values a translator already
/// set are kept.
fn stamp(event: &LedgerEvent, mut draft: PostingDraft) -> PostingDraft {
    if let Some(key) = event.idempotency_key() {
        draft.source_reference.get_or_insert_with(|| key.clone());
        draft.idempotency_key.get_or_insert(key);
    }
    draft
}

fn panicked(kind: EventKind, event: &LedgerEvent, code: &'static str) -> PostingOutcome {
    warn!(
        signal = "posting_failed",
        event_kind = %kind,
        tenant = event.tenant_id().unwrap_or_default(),
        source = %event.source_id().unwrap_or_default(),
        code,
        "ledger posting panicked; business operation unaffected"
    );
    PostingOutcome::Failed { code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{ChartOfAccounts, SystemAccount};
    use crate::fiscal::FiscalCalendar;
    use crate::ledger::EntryStatus;
    use crate::store::MemoryLedgerStore;
    use crate::accounts::AccountRef;
    use crate::translate::{
        GoodsReceived, ManualJournal, ManualLine, PayrollCompleted, ReceivedLine,
        SubscriptionRenewed, TranslateError,
    };
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tally_shared::types::{Money, TenantId, UserId};

    struct Fixture {
        gateway: PostingGateway<MemoryLedgerStore>,
        chart: ChartOfAccounts<MemoryLedgerStore>,
        calendar: FiscalCalendar<MemoryLedgerStore>,
        ledger: Ledger<MemoryLedgerStore>,
        tenant: TenantId,
    }

    fn m(text: &str) -> Money {
        Money::parse(text).unwrap()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    async fn fixture_with(config: &LedgerConfig) -> Fixture {
        let store = Arc::new(MemoryLedgerStore::new());
        let gateway = PostingGateway::from_config(Arc::clone(&store), config).unwrap();
        let chart = ChartOfAccounts::new(Arc::clone(&store));
        let calendar = FiscalCalendar::new(Arc::clone(&store));
        let ledger = Ledger::new(store);
        let tenant = TenantId::new("t1").unwrap();

        chart.install_system_accounts(&tenant, gateway.codes()).await.unwrap();
        calendar
            .create_fiscal_year(&tenant, date(1, 1), date(12, 31))
            .await
            .unwrap();

        Fixture {
            gateway,
            chart,
            calendar,
            ledger,
            tenant,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(&LedgerConfig::default()).await
    }

    fn payroll(gross: &str, net: &str, deductions: &str) -> LedgerEvent {
        LedgerEvent::PayrollCompleted(PayrollCompleted {
            tenant_id: Some("t1".into()),
            run_id: "run-4".into(),
            period_label: Some("April 2026".into()),
            paid_on: date(4, 30),
            total_gross: gross.into(),
            total_net: net.into(),
            total_deductions: deductions.into(),
        })
    }

    async fn balance_of(f: &Fixture, code: &str) -> Money {
        f.chart.resolve(&f.tenant, code).await.unwrap().current_balance
    }

    #[tokio::test]
    async fn test_payroll_event_posts_balanced_entry() {
        let f = fixture().await;
        let outcome = f.gateway.handle(&payroll("10000.00", "8500.00", "1500.00")).await;
        let PostingOutcome::Posted { entry_id, entry_number } = outcome else {
            panic!("expected posted, got {outcome:?}");
        };
        assert_eq!(entry_number, 1);

        let entry = f.ledger.get(&f.tenant, entry_id).await.unwrap();
        assert_eq!(entry.status, EntryStatus::Posted);
        assert_eq!(entry.lines.len(), 3);
        assert_eq!(entry.total_debit().unwrap(), entry.total_credit().unwrap());
        assert_eq!(entry.source_reference.as_deref(), Some("payroll_completed:run-4"));

        assert_eq!(balance_of(&f, "SALARY-EXPENSE").await, m("10000"));
        assert_eq!(balance_of(&f, "SALARY-PAYABLE").await, m("8500"));
        assert_eq!(balance_of(&f, "PAYROLL-DEDUCTIONS-PAYABLE").await, m("1500"));
    }

    #[tokio::test]
    async fn test_redelivered_event_is_duplicate() {
        let f = fixture().await;
        let event = payroll("100", "100", "0");
        let PostingOutcome::Posted { entry_id, .. } = f.gateway.handle(&event).await else {
            panic!("first delivery should post");
        };
        assert_eq!(
            f.gateway.handle(&event).await,
            PostingOutcome::Duplicate { existing: entry_id }
        );
        assert_eq!(balance_of(&f, "SALARY-EXPENSE").await, m("100"));
        assert_eq!(f.gateway.stats().duplicate, 1);
    }

    #[tokio::test]
    async fn test_zero_amount_skips_without_entries() {
        let f = fixture().await;
        let event = LedgerEvent::SubscriptionRenewed(SubscriptionRenewed {
            tenant_id: Some("t1".into()),
            subscription_id: "S-1".into(),
            plan_name: None,
            renewed_on: date(5, 1),
            amount: "0".into(),
        });
        assert_eq!(
            f.gateway.handle(&event).await,
            PostingOutcome::Skipped(SkipReason::NonPositiveAmount)
        );
        assert!(f.ledger.list(&f.tenant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_goods_without_prices_skip() {
        let f = fixture().await;
        let event = LedgerEvent::GoodsReceived(GoodsReceived {
            tenant_id: Some("t1".into()),
            receipt_id: "GRN-1".into(),
            purchase_order: None,
            supplier_name: None,
            received_on: date(2, 3),
            lines: vec![ReceivedLine {
                item: None,
                accepted_quantity: "3".into(),
                unit_price: None,
            }],
        });
        assert_eq!(
            f.gateway.handle(&event).await,
            PostingOutcome::Skipped(SkipReason::NoUsableLines)
        );
    }

    #[tokio::test]
    async fn test_unknown_and_unregistered_events_are_ignored() {
        let f = fixture().await;
        assert_eq!(f.gateway.handle(&LedgerEvent::Unknown).await, PostingOutcome::Ignored);

        let mut registry = TranslatorRegistry::with_defaults();
        registry.unregister(EventKind::PayrollCompleted);
        let gateway = PostingGateway::new(f.ledger.clone(), registry, AccountCodeMap::new());
        assert_eq!(
            gateway.handle(&payroll("100", "100", "0")).await,
            PostingOutcome::Ignored
        );
        assert!(f.ledger.list(&f.tenant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_period_is_swallowed() {
        let f = fixture().await;
        let april = f.calendar.find_containing(&f.tenant, date(4, 30)).await.unwrap();
        f.calendar.close(&f.tenant, april.id, UserId::new()).await.unwrap();

        assert_eq!(
            f.gateway.handle(&payroll("100", "100", "0")).await,
            PostingOutcome::Failed {
                code: "PERIOD_CLOSED"
            }
        );
        assert!(f.ledger.list(&f.tenant).await.unwrap().is_empty());
        assert_eq!(balance_of(&f, "SALARY-EXPENSE").await, Money::ZERO);
        assert_eq!(f.gateway.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_inconsistent_payroll_fails_softly() {
        let f = fixture().await;
        assert_eq!(
            f.gateway.handle(&payroll("10000", "8500", "0")).await,
            PostingOutcome::Failed {
                code: "INCONSISTENT_AMOUNTS"
            }
        );
        assert!(f.ledger.list(&f.tenant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_system_account_fails_softly() {
        let f = fixture().await;
        let other = LedgerEvent::PayrollCompleted(PayrollCompleted {
            tenant_id: Some("t2".into()),
            run_id: "run-1".into(),
            period_label: None,
            paid_on: date(4, 30),
            total_gross: "10".into(),
            total_net: "10".into(),
            total_deductions: "0".into(),
        });
        assert_eq!(
            f.gateway.handle(&other).await,
            PostingOutcome::Failed {
                code: "ACCOUNT_NOT_FOUND"
            }
        );
    }

    #[tokio::test]
    async fn test_custom_translator_drafts_are_keyed_by_event() {
        let f = fixture().await;
        let mut registry = TranslatorRegistry::new();
        registry.register(EventKind::PayrollCompleted, |_: &LedgerEvent| {
            let draft = PostingDraft::new(date(4, 30), "Custom payroll")
                .debit(AccountRef::System(SystemAccount::SalaryExpense), m("7"), None)
                .credit(AccountRef::System(SystemAccount::SalaryPayable), m("7"), None);
            Ok::<_, TranslateError>(Translation::Draft {
                tenant_id: TenantId::new("t1").unwrap(),
                draft,
            })
        });
        let gateway = PostingGateway::new(f.ledger.clone(), registry, AccountCodeMap::new());
        let event = payroll("100", "100", "0");

        let PostingOutcome::Posted { entry_id, .. } = gateway.handle(&event).await else {
            panic!("custom draft should post");
        };
        let entry = f.ledger.get(&f.tenant, entry_id).await.unwrap();
        assert_eq!(entry.idempotency_key.as_deref(), Some("payroll_completed:run-4"));
        assert_eq!(entry.source_reference.as_deref(), Some("payroll_completed:run-4"));
        assert_eq!(
            gateway.handle(&event).await,
            PostingOutcome::Duplicate { existing: entry_id }
        );
    }

    #[test]
    fn test_stamp_keeps_translator_values() {
        let event = payroll("100", "100", "0");
        let draft = stamp(&event, PostingDraft::new(date(4, 30), "x").with_source("payroll:april"));
        assert_eq!(draft.source_reference.as_deref(), Some("payroll:april"));
        assert_eq!(draft.idempotency_key.as_deref(), Some("payroll_completed:run-4"));

        let draft = stamp(&LedgerEvent::Unknown, PostingDraft::new(date(4, 30), "x"));
        assert_eq!(draft.idempotency_key, None);
    }

    #[tokio::test]
    async fn test_blank_manual_journal_ids_post_separately() {
        let f = fixture().await;
        let journal = |amount: &str| {
            LedgerEvent::ManualJournal(ManualJournal {
                tenant_id: Some("t1".into()),
                journal_id: "  ".into(),
                entry_date: date(3, 31),
                description: "Accrual".into(),
                lines: vec![
                    ManualLine {
                        account_code: "SALARY-EXPENSE".into(),
                        debit: Some(amount.into()),
                        credit: None,
                        description: None,
                    },
                    ManualLine {
                        account_code: "SALARY-PAYABLE".into(),
                        debit: None,
                        credit: Some(amount.into()),
                        description: None,
                    },
                ],
            })
        };

        for amount in ["10", "15"] {
            let outcome = f.gateway.handle(&journal(amount)).await;
            assert!(matches!(outcome, PostingOutcome::Posted { .. }), "{outcome:?}");
        }
        let entries = f.ledger.list(&f.tenant).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.idempotency_key.is_none()));
        assert_eq!(balance_of(&f, "SALARY-EXPENSE").await, m("25"));
    }

    #[tokio::test]
    async fn test_panicking_translator_is_contained() {
        let f = fixture().await;
        let mut registry = TranslatorRegistry::with_defaults();
        registry.register(
            EventKind::PayrollCompleted,
            |_: &LedgerEvent| -> Result<Translation, TranslateError> { panic!("boom") },
        );
        let gateway = PostingGateway::new(f.ledger.clone(), registry, AccountCodeMap::new());

        assert_eq!(
            gateway.handle(&payroll("100", "100", "0")).await,
            PostingOutcome::Failed {
                code: "TRANSLATOR_PANIC"
            }
        );
        assert_eq!(gateway.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_configured_codes_are_used() {
        let mut account_codes = BTreeMap::new();
        account_codes.insert("salary_expense".to_string(), "5100".to_string());
        let config = LedgerConfig {
            account_codes,
            ..LedgerConfig::default()
        };
        let f = fixture_with(&config).await;

        assert_eq!(f.gateway.codes().code(SystemAccount::SalaryExpense), "5100");
        assert!(matches!(
            f.gateway.handle(&payroll("100", "100", "0")).await,
            PostingOutcome::Posted { .. }
        ));
        assert_eq!(balance_of(&f, "5100").await, m("100"));
    }

    #[test]
    fn test_unknown_override_key_is_rejected() {
        let mut account_codes = BTreeMap::new();
        account_codes.insert("petty_cash".to_string(), "1010".to_string());
        let config = LedgerConfig {
            account_codes,
            ..LedgerConfig::default()
        };
        let store = Arc::new(MemoryLedgerStore::new());
        assert!(PostingGateway::from_config(store, &config).is_err());
    }

    #[tokio::test]
    async fn test_spawned_events_post_independently() {
        let f = fixture().await;
        let handles: Vec<_> = (1..=5)
            .map(|run| {
                let event = LedgerEvent::PayrollCompleted(PayrollCompleted {
                    tenant_id: Some("t1".into()),
                    run_id: format!("run-{run}"),
                    period_label: None,
                    paid_on: date(4, 30),
                    total_gross: "10".into(),
                    total_net: "10".into(),
                    total_deductions: "0".into(),
                });
                f.gateway.spawn(event)
            })
            .collect();

        for handle in handles {
            assert!(matches!(handle.await.unwrap(), PostingOutcome::Posted { .. }));
        }

        let numbers: Vec<i64> = f
            .ledger
            .list(&f.tenant)
            .await
            .unwrap()
            .iter()
            .map(|e| e.entry_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(balance_of(&f, "SALARY-EXPENSE").await, m("50"));
        assert_eq!(f.gateway.stats().posted, 5);
    }
}
