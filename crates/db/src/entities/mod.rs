//! `SeaORM` entities for the ledger tables.
//!
//! Status and type columns are stored as text and mapped to the domain enums
//! in [`crate::mapping`]. Amounts are `NUMERIC(28, 8)`.

pub mod accounts;
pub mod entry_sequences;
pub mod fiscal_periods;
pub mod journal_entries;
pub mod journal_lines;
