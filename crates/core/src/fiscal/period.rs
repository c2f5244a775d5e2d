//! Fiscal period types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{FiscalPeriodId, TenantId, UserId};

/// Status of a fiscal period. Transitions only run forward:
/// `Open -> Closed -> Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiscalPeriodStatus {
    /// Period is open for postings.
    Open,
    /// Period is closed, no new postings allowed.
    Closed,
    /// Period is locked, permanently.
    Locked,
}

impl FiscalPeriodStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Locked => "locked",
        }
    }
}

impl std::fmt::Display for FiscalPeriodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FiscalPeriodStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "locked" => Ok(Self::Locked),
            _ => Err(format!("Unknown fiscal period status: {s}")),
        }
    }
}

/// A fiscal period of one tenant. The date range is inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Unique identifier.
    pub id: FiscalPeriodId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Period name (e.g., "January 2026").
    pub name: String,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period.
    pub end_date: NaiveDate,
    /// Current status.
    pub status: FiscalPeriodStatus,
    /// Who closed the period.
    pub closed_by: Option<UserId>,
    /// When the period was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Who locked the period.
    pub locked_by: Option<UserId>,
    /// When the period was locked.
    pub locked_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl FiscalPeriod {
    /// Creates an open period.
    #[must_use]
    pub fn open(
        tenant_id: TenantId,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: FiscalPeriodId::new(),
            tenant_id,
            name: name.into(),
            start_date,
            end_date,
            status: FiscalPeriodStatus::Open,
            closed_by: None,
            closed_at: None,
            locked_by: None,
            locked_at: None,
            created_at: Utc::now(),
        }
    }

    /// Returns true if postings are accepted.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == FiscalPeriodStatus::Open
    }

    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn test_contains_date_is_inclusive() {
        let period = FiscalPeriod::open(
            TenantId::new("t1").unwrap(),
            "January 2026",
            date(1, 1),
            date(1, 31),
        );
        assert!(period.contains_date(date(1, 1)));
        assert!(period.contains_date(date(1, 31)));
        assert!(!period.contains_date(date(2, 1)));
        assert!(period.is_open());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for s in [
            FiscalPeriodStatus::Open,
            FiscalPeriodStatus::Closed,
            FiscalPeriodStatus::Locked,
        ] {
            assert_eq!(s.as_str().parse::<FiscalPeriodStatus>().unwrap(), s);
        }
        assert!("future".parse::<FiscalPeriodStatus>().is_err());
    }
}
