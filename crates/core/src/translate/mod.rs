//! Event translation.
//!
//! Upstream business events are turned into symbolic posting drafts by pure
//! functions, one per event kind, looked up in a [`TranslatorRegistry`].
//! A translator either produces a draft, skips (nothing to record), or
//! reports why the event content cannot yield a balanced entry.

pub mod events;
pub mod mappings;
pub mod registry;

pub use events::{
    AssetDepreciated, EventKind, ExpenseClaimApproved, GoodsReceived, LedgerEvent, ManualJournal,
    ManualLine, OrderLine, PayrollCompleted, ReceivedLine, SalesOrderConfirmed,
    SubscriptionRenewed,
};
pub use registry::{EventTranslator, SkipReason, TranslateError, Translation, TranslatorRegistry};
