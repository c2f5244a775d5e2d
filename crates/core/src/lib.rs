//! Ledger engine for Tally.
//!
//! This crate holds the domain and the posting engine with ZERO web or
//! database dependencies. Storage is reached only through the
//! [`store::LedgerStore`] seam; the PostgreSQL implementation lives in
//! `tally-db`.
//!
//! # Modules
//!
//! - `accounts` - Chart of accounts and symbolic system accounts
//! - `fiscal` - Fiscal periods and the calendar service
//! - `ledger` - Journal entries and the posting engine
//! - `translate` - Business events and their journal mappings
//! - `posting` - The best-effort posting gateway
//! - `store` - Storage traits and the in-memory store

pub mod accounts;
pub mod fiscal;
pub mod ledger;
pub mod posting;
pub mod store;
pub mod translate;

pub use accounts::ChartOfAccounts;
pub use fiscal::FiscalCalendar;
pub use ledger::{Ledger, LedgerError};
pub use posting::{PostingGateway, PostingOutcome};
pub use store::{LedgerStore, LedgerTx, MemoryLedgerStore, StoreError};
pub use translate::{LedgerEvent, TranslatorRegistry};
