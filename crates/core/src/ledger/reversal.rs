//! Reversal entry construction.
//!
//! A reversal is a new entry whose every line swaps debit and credit
//! relative to the original, so that posting both leaves every touched
//! account where it started.

use chrono::{NaiveDate, Utc};
use tally_shared::types::{JournalEntryId, JournalLineId};

use super::error::LedgerError;
use super::types::{EntryStatus, JournalEntry, JournalLine};

/// Builds the description of a reversal entry.
///
/// Format: `"{prefix} {reference}: {reason}"`, or `"{prefix} {reference}"`
/// when the reason is blank.
#[must_use]
pub fn reversal_description(prefix: &str, original: &JournalEntry, reason: &str) -> String {
    let reason = reason.trim();
    if reason.is_empty() {
        format!("{prefix} {}", original.reference())
    } else {
        format!("{prefix} {}: {reason}", original.reference())
    }
}

/// Builds the mirror draft for a posted entry.
///
/// The draft carries `reversed_entry_id = original.id`; the caller posts it
/// and then links the original back to it.
///
/// # Errors
///
/// - `EntryNotPosted` if the original is not `Posted`
/// - `InvalidReversalDate` if `reversal_date` is before the original date
pub fn build_reversal(
    original: &JournalEntry,
    entry_number: i64,
    reversal_date: NaiveDate,
    description: String,
) -> Result<JournalEntry, LedgerError> {
    if original.status != EntryStatus::Posted {
        return Err(LedgerError::EntryNotPosted(original.id));
    }
    if reversal_date < original.entry_date {
        return Err(LedgerError::InvalidReversalDate {
            original: original.entry_date,
            requested: reversal_date,
        });
    }

    let lines = original
        .lines
        .iter()
        .map(|line| JournalLine {
            id: JournalLineId::new(),
            account_id: line.account_id,
            debit: line.credit,
            credit: line.debit,
            description: line.description.clone(),
        })
        .collect();

    Ok(JournalEntry {
        id: JournalEntryId::new(),
        tenant_id: original.tenant_id.clone(),
        entry_number,
        entry_date: reversal_date,
        description,
        source_reference: original.source_reference.clone(),
        idempotency_key: None,
        status: EntryStatus::Draft,
        reversed_entry_id: Some(original.id),
        lines,
        created_at: Utc::now(),
        posted_at: None,
    })
}
