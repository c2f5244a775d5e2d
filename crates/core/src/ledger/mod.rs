//! Double-entry posting engine.
//!
//! - Journal entry and line types, drafts and symbolic posting drafts
//! - Line and balance validation
//! - Reversal construction
//! - [`Ledger`], the service that owns the `Draft -> Posted -> Reversed`
//!   lifecycle and is the only writer of account balances

pub mod error;
pub mod reversal;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use error::LedgerError;
pub use service::Ledger;
pub use types::{
    DraftLine, EntryStatus, JournalEntry, JournalLine, NewJournalEntry, NewJournalLine,
    PostingDraft, Reversal,
};
