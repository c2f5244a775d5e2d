//! Tenant setup for Tally.
//!
//! Installs the system chart of accounts (honouring configured code
//! overrides) and a fiscal year of monthly periods for one tenant. Running it
//! again is harmless: existing accounts are kept and a year that is already
//! covered is skipped.
//!
//! Usage: seeder <tenant> [year]

use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{Datelike, NaiveDate, Utc};
use tally_core::accounts::AccountCodeMap;
use tally_core::fiscal::date_ranges_overlap;
use tally_core::{ChartOfAccounts, FiscalCalendar};
use tally_db::PgLedgerStore;
use tally_shared::types::TenantId;
use tally_shared::{AppConfig, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init(&config.log)?;

    let (tenant, year) = parse_args(std::env::args().skip(1))?;
    let (start, end) = fiscal_year_bounds(year)?;
    let codes = AccountCodeMap::from_overrides(&config.ledger.account_codes)?;

    let db = tally_db::connect_with(&config.database).await?;
    info!("Connected to database");
    let store = Arc::new(PgLedgerStore::new(db));

    let chart = ChartOfAccounts::new(Arc::clone(&store));
    let created = chart.install_system_accounts(&tenant, &codes).await?;
    info!(tenant = %tenant, created = created.len(), "System accounts installed");

    let calendar = FiscalCalendar::new(store);
    let covered = calendar
        .list(&tenant)
        .await?
        .iter()
        .any(|p| date_ranges_overlap(p.start_date, p.end_date, start, end));
    if covered {
        info!(tenant = %tenant, year, "Fiscal year already has periods, skipping");
    } else {
        let periods = calendar.create_fiscal_year(&tenant, start, end).await?;
        info!(tenant = %tenant, year, periods = periods.len(), "Fiscal year created");
    }

    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<(TenantId, i32)> {
    let Some(tenant) = args.next() else {
        bail!("usage: seeder <tenant> [year]");
    };
    let tenant = TenantId::new(&tenant)?;
    let year = match args.next() {
        Some(text) => text
            .parse()
            .with_context(|| format!("invalid year: {text}"))?,
        None => Utc::now().year(),
    };
    Ok((tenant, year))
}

fn fiscal_year_bounds(year: i32) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1);
    let end = NaiveDate::from_ymd_opt(year, 12, 31);
    start.zip(end).with_context(|| format!("year out of range: {year}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> impl Iterator<Item = String> {
        items
            .iter()
            .map(|s| (*s).to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_parse_tenant_and_year() {
        let (tenant, year) = parse_args(args(&["acme", "2026"])).unwrap();
        assert_eq!(tenant.as_str(), "acme");
        assert_eq!(year, 2026);
    }

    #[test]
    fn test_missing_tenant_is_rejected() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["   "])).is_err());
    }

    #[test]
    fn test_fiscal_year_bounds() {
        let (start, end) = fiscal_year_bounds(2026).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
    }
}
