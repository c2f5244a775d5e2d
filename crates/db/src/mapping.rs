//! Conversions between entity models and domain types.
//!
//! Rows that fail to convert (unknown status text, a malformed tenant key,
//! an amount with excess precision) surface as `StoreError::Database`.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;
use tally_core::accounts::Account;
use tally_core::fiscal::FiscalPeriod;
use tally_core::ledger::{JournalEntry, JournalLine};
use tally_core::store::StoreError;
use tally_shared::types::{
    AccountId, FiscalPeriodId, JournalEntryId, JournalLineId, Money, TenantId, UserId,
};

use crate::entities::{accounts, fiscal_periods, journal_entries, journal_lines};

fn corrupt(what: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Database(format!("invalid stored {what}: {detail}"))
}

fn parse<T: FromStr<Err = String>>(what: &str, text: &str) -> Result<T, StoreError> {
    text.parse().map_err(|e: String| corrupt(what, e))
}

pub(crate) fn tenant(text: &str) -> Result<TenantId, StoreError> {
    TenantId::new(text).map_err(|e| corrupt("tenant id", e))
}

pub(crate) fn money(what: &str, value: Decimal) -> Result<Money, StoreError> {
    Money::from_decimal(value).map_err(|e| corrupt(what, e))
}

pub(crate) fn utc(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

pub(crate) fn fixed(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.fixed_offset()
}

// ---- accounts ----

pub(crate) fn account_from_model(model: accounts::Model) -> Result<Account, StoreError> {
    Ok(Account {
        id: AccountId::from_uuid(model.id),
        tenant_id: tenant(&model.tenant_id)?,
        parent_id: model.parent_id.map(AccountId::from_uuid),
        account_type: parse("account type", &model.account_type)?,
        normal_balance: parse("normal balance", &model.normal_balance)?,
        current_balance: money("balance", model.current_balance)?,
        code: model.code,
        name: model.name,
        is_active: model.is_active,
        created_at: utc(model.created_at),
    })
}

pub(crate) fn account_to_active(account: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        tenant_id: Set(account.tenant_id.as_str().to_string()),
        parent_id: Set(account.parent_id.map(AccountId::into_inner)),
        code: Set(account.code.clone()),
        name: Set(account.name.clone()),
        account_type: Set(account.account_type.as_str().to_string()),
        normal_balance: Set(account.normal_balance.as_str().to_string()),
        is_active: Set(account.is_active),
        current_balance: Set(account.current_balance.amount()),
        created_at: Set(fixed(account.created_at)),
    }
}

// ---- fiscal periods ----

pub(crate) fn period_from_model(model: fiscal_periods::Model) -> Result<FiscalPeriod, StoreError> {
    Ok(FiscalPeriod {
        id: FiscalPeriodId::from_uuid(model.id),
        tenant_id: tenant(&model.tenant_id)?,
        status: parse("period status", &model.status)?,
        name: model.name,
        start_date: model.start_date,
        end_date: model.end_date,
        closed_by: model.closed_by.map(UserId::from_uuid),
        closed_at: model.closed_at.map(utc),
        locked_by: model.locked_by.map(UserId::from_uuid),
        locked_at: model.locked_at.map(utc),
        created_at: utc(model.created_at),
    })
}

pub(crate) fn period_to_active(period: &FiscalPeriod) -> fiscal_periods::ActiveModel {
    fiscal_periods::ActiveModel {
        id: Set(period.id.into_inner()),
        tenant_id: Set(period.tenant_id.as_str().to_string()),
        name: Set(period.name.clone()),
        start_date: Set(period.start_date),
        end_date: Set(period.end_date),
        status: Set(period.status.as_str().to_string()),
        closed_by: Set(period.closed_by.map(UserId::into_inner)),
        closed_at: Set(period.closed_at.map(fixed)),
        locked_by: Set(period.locked_by.map(UserId::into_inner)),
        locked_at: Set(period.locked_at.map(fixed)),
        created_at: Set(fixed(period.created_at)),
    }
}

// ---- journal entries ----

pub(crate) fn entry_from_models(
    header: journal_entries::Model,
    mut lines: Vec<journal_lines::Model>,
) -> Result<JournalEntry, StoreError> {
    lines.sort_by_key(|line| line.line_no);
    let lines = lines
        .into_iter()
        .map(line_from_model)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(JournalEntry {
        id: JournalEntryId::from_uuid(header.id),
        tenant_id: tenant(&header.tenant_id)?,
        status: parse("entry status", &header.status)?,
        entry_number: header.entry_number,
        entry_date: header.entry_date,
        description: header.description,
        source_reference: header.source_reference,
        idempotency_key: header.idempotency_key,
        reversed_entry_id: header.reversed_entry_id.map(JournalEntryId::from_uuid),
        lines,
        created_at: utc(header.created_at),
        posted_at: header.posted_at.map(utc),
    })
}

fn line_from_model(model: journal_lines::Model) -> Result<JournalLine, StoreError> {
    Ok(JournalLine {
        id: JournalLineId::from_uuid(model.id),
        account_id: AccountId::from_uuid(model.account_id),
        debit: money("debit", model.debit)?,
        credit: money("credit", model.credit)?,
        description: model.description,
    })
}

pub(crate) fn entry_to_active(entry: &JournalEntry) -> journal_entries::ActiveModel {
    journal_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        tenant_id: Set(entry.tenant_id.as_str().to_string()),
        entry_number: Set(entry.entry_number),
        entry_date: Set(entry.entry_date),
        description: Set(entry.description.clone()),
        source_reference: Set(entry.source_reference.clone()),
        idempotency_key: Set(entry.idempotency_key.clone()),
        status: Set(entry.status.as_str().to_string()),
        reversed_entry_id: Set(entry.reversed_entry_id.map(JournalEntryId::into_inner)),
        created_at: Set(fixed(entry.created_at)),
        posted_at: Set(entry.posted_at.map(fixed)),
    }
}

pub(crate) fn lines_to_active(entry: &JournalEntry) -> Vec<journal_lines::ActiveModel> {
    entry
        .lines
        .iter()
        .zip(1..)
        .map(|(line, line_no)| journal_lines::ActiveModel {
            id: Set(line.id.into_inner()),
            tenant_id: Set(entry.tenant_id.as_str().to_string()),
            entry_id: Set(entry.id.into_inner()),
            line_no: Set(line_no),
            account_id: Set(line.account_id.into_inner()),
            debit: Set(line.debit.amount()),
            credit: Set(line.credit.amount()),
            description: Set(line.description.clone()),
        })
        .collect()
}
