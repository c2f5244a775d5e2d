//! Fiscal calendar service.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tally_shared::types::{FiscalPeriodId, TenantId, UserId};
use tracing::info;

use super::calendar::{monthly_ranges, validate_new_range};
use super::period::{FiscalPeriod, FiscalPeriodStatus};
use crate::ledger::LedgerError;
use crate::store::{LedgerStore, LedgerTx, PeriodTransition, StoreError};

/// Creates, queries, closes and locks fiscal periods.
pub struct FiscalCalendar<S> {
    store: Arc<S>,
}

impl<S> Clone for FiscalCalendar<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> FiscalCalendar<S> {
    /// Creates a calendar service over a store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates one open period adjacent to the tenant's existing periods.
    ///
    /// # Errors
    ///
    /// - `InvalidDateRange` if `start > end`
    /// - `OverlappingPeriod` if it intersects an existing period
    /// - `PeriodGap` if it is not adjacent to the existing span
    pub async fn create_period(
        &self,
        tenant: &TenantId,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FiscalPeriod, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        let existing = tx.list_periods().await?;
        validate_new_range(&existing, start, end)?;

        let period = FiscalPeriod::open(tenant.clone(), name.trim(), start, end);
        insert_period(&mut tx, &period).await?;
        tx.commit().await?;

        info!(
            tenant = %tenant,
            period_id = %period.id,
            start = %start,
            end = %end,
            "fiscal period created"
        );
        Ok(period)
    }

    /// Creates a fiscal year as contiguous monthly periods named like
    /// "January 2026".
    ///
    /// # Errors
    ///
    /// Same as [`FiscalCalendar::create_period`] for the whole year's span.
    pub async fn create_fiscal_year(
        &self,
        tenant: &TenantId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FiscalPeriod>, LedgerError> {
        let ranges = monthly_ranges(start, end)?;

        let mut tx = self.store.begin(tenant).await?;
        let existing = tx.list_periods().await?;
        validate_new_range(&existing, start, end)?;

        let mut periods = Vec::with_capacity(ranges.len());
        for range in ranges {
            let period = FiscalPeriod::open(tenant.clone(), range.name, range.start_date, range.end_date);
            insert_period(&mut tx, &period).await?;
            periods.push(period);
        }
        tx.commit().await?;

        info!(
            tenant = %tenant,
            start = %start,
            end = %end,
            periods = periods.len(),
            "fiscal year created"
        );
        Ok(periods)
    }

    /// Lists the tenant's periods ordered by start date.
    pub async fn list(&self, tenant: &TenantId) -> Result<Vec<FiscalPeriod>, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        Ok(tx.list_periods().await?)
    }

    /// Returns a period by id.
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound` if the tenant has no such period.
    pub async fn get(&self, tenant: &TenantId, id: FiscalPeriodId) -> Result<FiscalPeriod, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        tx.period_for_update(id)
            .await?
            .ok_or(LedgerError::PeriodNotFound(id))
    }

    /// Returns the open period containing `date`.
    ///
    /// # Errors
    ///
    /// Returns `NoOpenPeriod` if no period covers the date or the covering
    /// period is not open.
    pub async fn find_containing(
        &self,
        tenant: &TenantId,
        date: NaiveDate,
    ) -> Result<FiscalPeriod, LedgerError> {
        let mut tx = self.store.begin(tenant).await?;
        match tx.period_containing_for_update(date).await? {
            Some(period) if period.is_open() => Ok(period),
            _ => Err(LedgerError::NoOpenPeriod(date)),
        }
    }

    /// Closes an open period.
    ///
    /// The status change is a compare-and-swap: of two concurrent closes,
    /// the second fails with `PeriodNotOpen`.
    ///
    /// # Errors
    ///
    /// - `PeriodNotFound` if the tenant has no such period
    /// - `PeriodNotOpen` if it is not open
    pub async fn close(
        &self,
        tenant: &TenantId,
        id: FiscalPeriodId,
        closed_by: UserId,
    ) -> Result<FiscalPeriod, LedgerError> {
        let period = self
            .transition(
                tenant,
                id,
                FiscalPeriodStatus::Open,
                FiscalPeriodStatus::Closed,
                closed_by,
            )
            .await?;
        info!(tenant = %tenant, period_id = %id, closed_by = %closed_by, "fiscal period closed");
        Ok(period)
    }

    /// Locks a closed period. Locking is final.
    ///
    /// # Errors
    ///
    /// - `PeriodNotFound` if the tenant has no such period
    /// - `PeriodNotClosed` if it is not closed
    pub async fn lock(
        &self,
        tenant: &TenantId,
        id: FiscalPeriodId,
        locked_by: UserId,
    ) -> Result<FiscalPeriod, LedgerError> {
        let period = self
            .transition(
                tenant,
                id,
                FiscalPeriodStatus::Closed,
                FiscalPeriodStatus::Locked,
                locked_by,
            )
            .await?;
        info!(tenant = %tenant, period_id = %id, locked_by = %locked_by, "fiscal period locked");
        Ok(period)
    }

    async fn transition(
        &self,
        tenant: &TenantId,
        id: FiscalPeriodId,
        from: FiscalPeriodStatus,
        to: FiscalPeriodStatus,
        actor: UserId,
    ) -> Result<FiscalPeriod, LedgerError> {
        let wrong_state = || match from {
            FiscalPeriodStatus::Closed => LedgerError::PeriodNotClosed(id),
            FiscalPeriodStatus::Open | FiscalPeriodStatus::Locked => LedgerError::PeriodNotOpen(id),
        };

        let mut tx = self.store.begin(tenant).await?;
        let period = tx
            .period_for_update(id)
            .await?
            .ok_or(LedgerError::PeriodNotFound(id))?;
        if period.status != from {
            return Err(wrong_state());
        }

        let transition = PeriodTransition {
            from,
            to,
            actor,
            at: Utc::now(),
        };
        if !tx.transition_period(id, &transition).await? {
            return Err(wrong_state());
        }
        let updated = tx
            .period_for_update(id)
            .await?
            .ok_or(LedgerError::PeriodNotFound(id))?;
        tx.commit().await?;
        Ok(updated)
    }
}

async fn insert_period<T: LedgerTx>(tx: &mut T, period: &FiscalPeriod) -> Result<(), LedgerError> {
    match tx.insert_period(period).await {
        Err(StoreError::UniqueViolation(_)) => Err(LedgerError::OverlappingPeriod {
            start: period.start_date,
            end: period.end_date,
        }),
        other => Ok(other?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedgerStore;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn setup() -> (FiscalCalendar<MemoryLedgerStore>, TenantId) {
        let store = Arc::new(MemoryLedgerStore::new());
        (FiscalCalendar::new(store), TenantId::new("t1").unwrap())
    }

    #[tokio::test]
    async fn test_create_fiscal_year() {
        let (calendar, t1) = setup();
        let periods = calendar
            .create_fiscal_year(&t1, date(1, 1), date(12, 31))
            .await
            .unwrap();
        assert_eq!(periods.len(), 12);
        assert!(periods.iter().all(FiscalPeriod::is_open));
        assert_eq!(calendar.list(&t1).await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_fiscal_year_overlap_rejected_atomically() {
        let (calendar, t1) = setup();
        calendar
            .create_period(&t1, "March 2026", date(3, 1), date(3, 31))
            .await
            .unwrap();
        assert!(matches!(
            calendar.create_fiscal_year(&t1, date(1, 1), date(12, 31)).await,
            Err(LedgerError::OverlappingPeriod { .. })
        ));
        assert_eq!(calendar.list(&t1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_period_rejects_gap() {
        let (calendar, t1) = setup();
        calendar
            .create_period(&t1, "January 2026", date(1, 1), date(1, 31))
            .await
            .unwrap();
        assert!(matches!(
            calendar
                .create_period(&t1, "March 2026", date(3, 1), date(3, 31))
                .await,
            Err(LedgerError::PeriodGap { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_containing() {
        let (calendar, t1) = setup();
        let jan = calendar
            .create_period(&t1, "January 2026", date(1, 1), date(1, 31))
            .await
            .unwrap();

        assert_eq!(calendar.find_containing(&t1, date(1, 15)).await.unwrap().id, jan.id);
        assert!(matches!(
            calendar.find_containing(&t1, date(2, 1)).await,
            Err(LedgerError::NoOpenPeriod(_))
        ));

        calendar.close(&t1, jan.id, UserId::new()).await.unwrap();
        assert!(matches!(
            calendar.find_containing(&t1, date(1, 15)).await,
            Err(LedgerError::NoOpenPeriod(_))
        ));
    }

    #[tokio::test]
    async fn test_close_then_lock() {
        let (calendar, t1) = setup();
        let jan = calendar
            .create_period(&t1, "January 2026", date(1, 1), date(1, 31))
            .await
            .unwrap();
        let user = UserId::new();

        assert!(matches!(
            calendar.lock(&t1, jan.id, user).await,
            Err(LedgerError::PeriodNotClosed(_))
        ));

        let closed = calendar.close(&t1, jan.id, user).await.unwrap();
        assert_eq!(closed.status, FiscalPeriodStatus::Closed);
        assert_eq!(closed.closed_by, Some(user));
        assert!(closed.closed_at.is_some());

        assert!(matches!(
            calendar.close(&t1, jan.id, user).await,
            Err(LedgerError::PeriodNotOpen(_))
        ));

        let locked = calendar.lock(&t1, jan.id, user).await.unwrap();
        assert_eq!(locked.status, FiscalPeriodStatus::Locked);
        assert_eq!(locked.locked_by, Some(user));

        assert!(matches!(
            calendar.close(&t1, jan.id, user).await,
            Err(LedgerError::PeriodNotOpen(_))
        ));
        assert!(matches!(
            calendar.lock(&t1, jan.id, user).await,
            Err(LedgerError::PeriodNotClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_close_only_one_wins() {
        let (calendar, t1) = setup();
        let jan = calendar
            .create_period(&t1, "January 2026", date(1, 1), date(1, 31))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let calendar = calendar.clone();
                let t1 = t1.clone();
                tokio::spawn(async move { calendar.close(&t1, jan.id, UserId::new()).await })
            })
            .collect();

        let mut wins = 0;
        let mut not_open = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(LedgerError::PeriodNotOpen(_)) => not_open += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(not_open, 7);
    }

    #[tokio::test]
    async fn test_unknown_period() {
        let (calendar, t1) = setup();
        assert!(matches!(
            calendar.close(&t1, FiscalPeriodId::new(), UserId::new()).await,
            Err(LedgerError::PeriodNotFound(_))
        ));
    }
}
